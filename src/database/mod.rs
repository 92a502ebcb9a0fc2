use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use teloxide::types::UserId;

use crate::models::Role;

/// Хранилище ролей в PostgreSQL. Роль — единственное, что переживает
/// рестарт бота; диалоговые сессии живут в памяти.
#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                user_id BIGINT PRIMARY KEY,
                role TEXT NOT NULL,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_roles_role ON roles (role)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Роль пользователя; незнакомый пользователь сразу записывается
    /// студентом.
    pub async fn get_role(&self, user_id: UserId) -> Result<Role, sqlx::Error> {
        let row = sqlx::query("SELECT role FROM roles WHERE user_id = $1")
            .bind(user_id.0 as i64)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = row {
            let role: String = row.get("role");
            Ok(Role::from_db(&role))
        } else {
            sqlx::query(
                "INSERT INTO roles (user_id, role) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
            )
            .bind(user_id.0 as i64)
            .bind(Role::Student.as_str())
            .execute(&self.pool)
            .await?;

            Ok(Role::Student)
        }
    }

    pub async fn set_role(&self, user_id: UserId, role: Role) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO roles (user_id, role) VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET role = EXCLUDED.role, updated_at = NOW()
            "#,
        )
        .bind(user_id.0 as i64)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        log::debug!("💾 Роль пользователя {user_id} теперь {role}");
        Ok(())
    }
}
