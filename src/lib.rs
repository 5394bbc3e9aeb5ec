pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod maintenance;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};

async fn build_state() -> anyhow::Result<AppState> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; login rate limiting disabled");
    } else {
        tracing::info!("Redis connected successfully");
    }

    Ok(AppState::new(settings, db_pool, redis))
}

pub async fn run() -> anyhow::Result<()> {
    let state = build_state().await?;

    if let Err(err) = core::bootstrap::ensure_roles(&state).await {
        tracing::error!(error = %err, "Failed to ensure default roles");
    }
    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Feedback360 API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    state.redis().disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Runs one maintenance command by name against the configured database.
pub async fn run_command(name: &str) -> anyhow::Result<()> {
    let command = maintenance::Command::parse(name)?;
    let state = build_state().await?;

    let result = maintenance::execute(&state, command).await;
    state.redis().disconnect().await;

    let summary = result?;
    println!("{summary}");
    Ok(())
}
