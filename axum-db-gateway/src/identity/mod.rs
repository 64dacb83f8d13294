//! User registration, login and profile management
//!
//! Independent of the database gateway: accounts live in an injected
//! [`UserStore`], never in process-wide state.

pub mod password;
pub mod store;

pub use store::{MemoryUserStore, NewUser, UserAccount, UserStore};

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Identity error type
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("{0}")]
    MissingFields(&'static str),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("User not found")]
    UserNotFound,

    #[error("{0}")]
    Internal(String),
}

impl IdentityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IdentityError::MissingFields(_) | IdentityError::UsernameTaken => {
                StatusCode::BAD_REQUEST
            }
            IdentityError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            IdentityError::UserNotFound => StatusCode::NOT_FOUND,
            IdentityError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Profile changes; empty or missing fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub user_id: Option<u64>,
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public view of an account, returned by login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    pub fullname: String,
    pub email: String,
}

impl From<UserAccount> for UserSummary {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username,
            fullname: account.fullname,
            email: account.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: UserSummary,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Account operations over a [`UserStore`]
pub struct IdentityService<S: UserStore> {
    store: Arc<S>,
}

impl<S: UserStore> Clone for IdentityService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: UserStore> IdentityService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserAccount, IdentityError> {
        let (Some(fullname), Some(email), Some(username), Some(password)) = (
            present(request.fullname),
            present(request.email),
            present(request.username),
            present(request.password),
        ) else {
            return Err(IdentityError::MissingFields("All fields are required"));
        };

        if self.store.find_by_username(&username).await?.is_some() {
            return Err(IdentityError::UsernameTaken);
        }

        let account = self
            .store
            .insert(NewUser {
                fullname,
                email,
                username,
                password_hash: password::hash_password(&password)?,
            })
            .await?;

        info!(user_id = account.id, username = %account.username, "registered user");
        Ok(account)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<UserSummary, IdentityError> {
        let (Some(username), Some(password)) = (present(request.username), present(request.password))
        else {
            return Err(IdentityError::MissingFields(
                "Username and password are required",
            ));
        };

        let account = self
            .store
            .find_by_username(&username)
            .await?
            .ok_or(IdentityError::InvalidCredentials)?;

        if !password::verify_password(&password, &account.password_hash)? {
            return Err(IdentityError::InvalidCredentials);
        }

        Ok(account.into())
    }

    pub async fn update_profile(&self, request: ProfileUpdateRequest) -> Result<UserAccount, IdentityError> {
        let user_id = request.user_id.ok_or(IdentityError::UserNotFound)?;
        let mut account = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(IdentityError::UserNotFound)?;

        if let Some(fullname) = present(request.fullname) {
            account.fullname = fullname;
        }
        if let Some(email) = present(request.email) {
            account.email = email;
        }
        if let Some(password) = present(request.password) {
            account.password_hash = password::hash_password(&password)?;
        }

        self.store.save(account.clone()).await?;
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> IdentityService<MemoryUserStore> {
        IdentityService::new(MemoryUserStore::new())
    }

    fn registration(username: &str) -> RegisterRequest {
        RegisterRequest {
            fullname: Some("Ada Lovelace".into()),
            email: Some("ada@example.com".into()),
            username: Some(username.into()),
            password: Some("engine".into()),
        }
    }

    fn login(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service();
        service.register(registration("ada")).await.unwrap();

        let user = service.login(login("ada", "engine")).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.fullname, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let mut request = registration("ada");
        request.email = Some(String::new());

        let error = service().register(request).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.to_string(), "All fields are required");
    }

    #[tokio::test]
    async fn test_duplicate_registration() {
        let service = service();
        service.register(registration("ada")).await.unwrap();

        assert!(matches!(
            service.register(registration("ada")).await,
            Err(IdentityError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let service = service();
        service.register(registration("ada")).await.unwrap();

        let error = service.login(login("ada", "wrong")).await.unwrap_err();
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let error = service.login(login("nobody", "engine")).await.unwrap_err();
        assert!(matches!(error, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_update_profile_changes_password() {
        let service = service();
        let account = service.register(registration("ada")).await.unwrap();

        service
            .update_profile(ProfileUpdateRequest {
                user_id: Some(account.id),
                fullname: None,
                email: Some("countess@example.com".into()),
                password: Some("analytical".into()),
            })
            .await
            .unwrap();

        let user = service.login(login("ada", "analytical")).await.unwrap();
        assert_eq!(user.email, "countess@example.com");
        assert_eq!(user.fullname, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_update_unknown_user() {
        let error = service()
            .update_profile(ProfileUpdateRequest {
                user_id: Some(7),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}
