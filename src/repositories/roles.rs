use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Role;

pub(crate) async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
    sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY name")
        .fetch_all(pool)
        .await
}

pub(crate) async fn ensure(
    executor: impl sqlx::PgExecutor<'_>,
    name: &str,
    description: &str,
) -> Result<Role, sqlx::Error> {
    sqlx::query_as::<_, Role>(
        "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3)
         ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, name, description",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(name)
    .bind(description)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_ids_by_names(
    pool: &PgPool,
    names: &[String],
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as::<_, (String, String)>("SELECT id, name FROM roles WHERE name = ANY($1)")
        .bind(names)
        .fetch_all(pool)
        .await
}

pub(crate) async fn names_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT r.name FROM user_roles ur
         JOIN roles r ON r.id = ur.role_id
         WHERE ur.user_id = $1
         ORDER BY r.name",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn grant(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
    role_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)
         ON CONFLICT (user_id, role_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(role_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn clear_for_user(
    executor: impl sqlx::PgExecutor<'_>,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await?;
    Ok(())
}
