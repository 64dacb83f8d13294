//! # axum-db-gateway
//!
//! A JSON-over-HTTP administration gateway for relational databases, easily
//! mountable as an Axum router.
//!
//! ## Features
//!
//! - Connection credentials supplied per request, one short-lived connection per call
//! - Table listing, column discovery, row fetching and full-text `LIKE` search
//! - Record insert, update and delete with bound parameters
//! - Raw SQL execution
//! - JSON-safe normalization of every driver value
//! - Optional user registration/login/profile endpoints over a pluggable store
//!
//! ## Security Warning
//!
//! **This is an administration tool!**
//!
//! - No authorization of who may run which query
//! - Anyone who can reach the endpoints can try credentials against any reachable database
//! - Raw query execution allows full database access
//! - Should never be exposed on public networks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use axum_db_gateway::{GatewayLayer, MemoryUserStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .route("/health", get(|| async { "ok" }))
//!         .merge(
//!             GatewayLayer::mysql("")
//!                 .with_identity(MemoryUserStore::new())
//!                 .into_router(),
//!         );
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod database;
pub mod dispatch;
pub mod identity;
pub mod layer;
pub mod normalize;
pub mod schema;

// Public exports
pub use dispatch::{Dispatcher, Outcome};
pub use identity::{IdentityError, IdentityService, MemoryUserStore, UserStore};
pub use layer::GatewayLayer;
pub use schema::{ConnectionDescriptor, Operation, Record};

// Re-export database providers
pub use database::traits::{DatabaseConnection, DatabaseProvider};

#[cfg(feature = "mysql")]
pub use database::mysql::MySqlProvider;

// Error type
use axum::http::StatusCode;
use thiserror::Error;

/// Failure of a gateway operation, classified by where it happened
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),

    /// The target database could not be reached or refused the credentials
    #[error("{0}")]
    Connection(String),

    /// Building or executing a statement failed, including errors reported by the database
    #[error("{0}")]
    Statement(String),

    #[error("{0}")]
    Unclassified(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement(message.into())
    }

    /// HTTP status used when this error is returned from an endpoint
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) | Error::Connection(_) | Error::Statement(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Error::Statement(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
