use super::parsing::{
    env_flag, env_optional, env_or_default, looks_like_email, parse_cors_origins,
    parse_environment, parse_u16, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, MailSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("FEEDBACK360_HOST", "0.0.0.0");
        let port = env_or_default("FEEDBACK360_PORT", "8000");

        let environment = parse_environment(
            env_optional("FEEDBACK360_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_flag("FEEDBACK360_STRICT_CONFIG") || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Feedback 360");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let login_rate_limit =
            parse_u64("LOGIN_RATE_LIMIT", env_or_default("LOGIN_RATE_LIMIT", "10"))?;
        let login_rate_window_seconds = parse_u64(
            "LOGIN_RATE_WINDOW_SECONDS",
            env_or_default("LOGIN_RATE_WINDOW_SECONDS", "60"),
        )?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "feedback360");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "feedback360");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let default_from_email =
            env_or_default("DEFAULT_FROM_EMAIL", "noreply@feedback360.local");
        let public_base_url = env_or_default("PUBLIC_BASE_URL", "http://localhost:8000");

        let first_superuser_username = env_or_default("FIRST_SUPERUSER_USERNAME", "admin");
        let first_superuser_email =
            env_or_default("FIRST_SUPERUSER_EMAIL", "admin@feedback360.local");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("FEEDBACK360_LOG_LEVEL", "info");
        let json = env_flag("FEEDBACK360_LOG_JSON");
        let prometheus_enabled = env_flag("PROMETHEUS_ENABLED");

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                login_rate_limit,
                login_rate_window_seconds,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            mail: MailSettings { default_from_email, public_base_url },
            admin: AdminSettings {
                first_superuser_username,
                first_superuser_email,
                first_superuser_password,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn mail(&self) -> &MailSettings {
        &self.mail
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !looks_like_email(&self.mail.default_from_email) {
            return Err(ConfigError::InvalidValue {
                field: "DEFAULT_FROM_EMAIL",
                value: self.mail.default_from_email.clone(),
            });
        }

        if !self.mail.public_base_url.starts_with("http://")
            && !self.mail.public_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "PUBLIC_BASE_URL",
                value: self.mail.public_base_url.clone(),
            });
        }

        if self.security.login_rate_window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "LOGIN_RATE_WINDOW_SECONDS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::{ConfigError, Settings};
    use crate::test_support;

    #[tokio::test]
    async fn strict_mode_requires_superuser_password() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("FEEDBACK360_STRICT_CONFIG", "1");
        std::env::remove_var("FIRST_SUPERUSER_PASSWORD");

        let result = Settings::load();
        std::env::set_var("FEEDBACK360_STRICT_CONFIG", "0");

        assert!(matches!(result, Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"))));
    }

    #[tokio::test]
    async fn invalid_public_base_url_is_rejected() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("PUBLIC_BASE_URL", "feedback.example.com");

        let result = Settings::load();
        std::env::remove_var("PUBLIC_BASE_URL");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "PUBLIC_BASE_URL", .. })
        ));
    }

    #[tokio::test]
    async fn defaults_load_in_test_environment() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();

        let settings = Settings::load().expect("settings");
        assert_eq!(settings.api().api_v1_str, "/api/v1");
        assert_eq!(settings.runtime().environment.as_str(), "test");
        assert_eq!(settings.security().secret_key, "test-secret");
    }
}
