use async_trait::async_trait;
use sqlx::PgPool;

use super::UserStore;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                _ => "username",
            };
            return AppError::Conflict(format!("{field} already registered"));
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, hashed_password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, hashed_password, is_active, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, is_active, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, hashed_password, is_active, created_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
