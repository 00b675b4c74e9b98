use std::sync::Arc;

use crypto_core::jwt::{AccessToken, JwtKeys};
use crypto_core::password;

use crate::db::UserStore;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: Arc<JwtKeys>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<JwtKeys>) -> Self {
        Self { users, jwt }
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if self.users.find_by_username(username).await?.is_some() {
            return Err(AppError::Conflict("username already registered".to_string()));
        }
        if self.users.find_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("email already registered".to_string()));
        }

        let password = password.to_string();
        let hashed_password =
            tokio::task::spawn_blocking(move || password::hash_password(&password)).await??;

        let user = self
            .users
            .create_user(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
                hashed_password,
            })
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        Ok(user)
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

        let candidate = password.to_string();
        let stored = user.hashed_password.clone();
        let valid =
            tokio::task::spawn_blocking(move || password::verify_password(&candidate, &stored))
                .await??;
        if !valid {
            tracing::warn!("Failed login attempt");
            return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        if !user.is_active {
            return Err(AppError::Forbidden("Inactive user".to_string()));
        }

        let token = self.jwt.issue(user.id, &user.username)?;
        tracing::info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Resolve a bearer token to the active account it was issued for.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.jwt.verify(token)?;

        let user = self
            .users
            .find_by_username(&claims.sub)
            .await?
            .filter(|u| u.id == claims.uid)
            .ok_or_else(|| AppError::Unauthorized("Could not validate credentials".to_string()))?;

        if !user.is_active {
            return Err(AppError::Forbidden("Inactive user".to_string()));
        }

        Ok(user)
    }
}
