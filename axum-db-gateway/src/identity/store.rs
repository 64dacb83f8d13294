//! User account storage

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use super::IdentityError;

/// A stored user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: u64,
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Fields of an account that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub fullname: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

/// Storage backend for user accounts
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Store a new account, assigning its id
    ///
    /// # Errors
    ///
    /// [`IdentityError::UsernameTaken`] when the username is already registered
    async fn insert(&self, user: NewUser) -> Result<UserAccount, IdentityError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, IdentityError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<UserAccount>, IdentityError>;

    /// Replace a stored account, matched by id
    async fn save(&self, user: UserAccount) -> Result<(), IdentityError>;
}

/// Process-local store keyed by username; contents are lost on restart
#[derive(Debug)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserAccount>>,
    next_id: AtomicU64,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: NewUser) -> Result<UserAccount, IdentityError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(IdentityError::UsernameTaken);
        }

        let account = UserAccount {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            fullname: user.fullname,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
        };
        users.insert(account.username.clone(), account.clone());

        Ok(account)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserAccount>, IdentityError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<UserAccount>, IdentityError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.id == id)
            .cloned())
    }

    async fn save(&self, user: UserAccount) -> Result<(), IdentityError> {
        let mut users = self.users.write().await;
        match users.values_mut().find(|stored| stored.id == user.id) {
            Some(stored) => {
                *stored = user;
                Ok(())
            }
            None => Err(IdentityError::UserNotFound),
        }
    }
}
