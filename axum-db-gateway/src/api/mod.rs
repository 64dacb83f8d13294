//! REST API endpoints
//!
//! This module contains all endpoint handlers. Every response uses the
//! `{success, message?, ...}` envelope; failures carry the message and the
//! status code of their [`Error`] class.

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use tracing::{error, warn};

use crate::database::traits::DatabaseProvider;
use crate::dispatch::{Dispatcher, Outcome};
use crate::identity::{IdentityService, UserStore};
use crate::schema::{ConnectionDescriptor, MessageResponse, Operation, INVALID_PARAMETERS};
use crate::Error;

pub mod connection;
pub mod query;
pub mod records;
pub mod tables;
pub mod users;

// Re-export handlers for convenience
pub use connection::connect_handler;
pub use query::execute_query_handler;
pub use records::{add_record_handler, delete_record_handler, update_record_handler};
pub use tables::{
    list_tables_handler, search_table_handler, table_columns_handler, table_data_handler,
};
pub use users::{login_handler, register_handler, update_profile_handler};

/// Create the router with every database endpoint
///
/// # Arguments
///
/// * `dispatcher` - Dispatcher wrapping the database provider
pub fn create_database_router<DB: DatabaseProvider>(dispatcher: Dispatcher<DB>) -> Router {
    Router::new()
        .route("/database/connect", post(connect_handler::<DB>))
        .route("/database/tables", post(list_tables_handler::<DB>))
        .route("/database/table/columns", post(table_columns_handler::<DB>))
        .route("/database/table/data", post(table_data_handler::<DB>))
        .route("/database/table/search", post(search_table_handler::<DB>))
        .route("/database/execute", post(execute_query_handler::<DB>))
        .route("/database/table/add", post(add_record_handler::<DB>))
        .route("/database/table/update", post(update_record_handler::<DB>))
        .route("/database/table/delete", post(delete_record_handler::<DB>))
        .with_state(dispatcher)
}

/// Create the router with the registration, login and profile endpoints
pub fn create_identity_router<S: UserStore>(service: IdentityService<S>) -> Router {
    Router::new()
        .route("/register", post(register_handler::<S>))
        .route("/login", post(login_handler::<S>))
        .route("/profile/update", post(update_profile_handler::<S>))
        .with_state(service)
}

/// Unwrap a JSON body, turning a malformed body into a validation error
pub(crate) fn read_body<T>(payload: Result<Json<T>, JsonRejection>) -> crate::Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| {
            Error::validation(format!("{}: {}", INVALID_PARAMETERS, rejection.body_text()))
        })
}

/// Build the failure envelope for an error
///
/// Validation messages are returned as they are; every other error is
/// prefixed with the endpoint's context.
pub(crate) fn error_response(context: &str, error: &Error) -> Response {
    let message = match error {
        Error::Validation(message) => {
            warn!("{}: {}", context, message);
            message.clone()
        }
        other => {
            error!("{}: {}", context, other);
            format!("{}: {}", context, other)
        }
    };

    (error.status_code(), Json(MessageResponse::failure(message))).into_response()
}

/// Run a parsed request through the dispatcher, mapping failures to responses
pub(crate) async fn run_operation<DB: DatabaseProvider>(
    dispatcher: &Dispatcher<DB>,
    context: &str,
    request: crate::Result<(ConnectionDescriptor, Operation)>,
) -> Result<Outcome, Response> {
    let (descriptor, operation) = request.map_err(|error| error_response(context, &error))?;

    dispatcher
        .run(&descriptor, &operation)
        .await
        .map_err(|error| error_response(context, &error))
}

/// Response for an outcome that does not match the endpoint's operation
pub(crate) fn unexpected_outcome(context: &str, outcome: Outcome) -> Response {
    error_response(
        context,
        &Error::Unclassified(format!("unexpected outcome {:?}", outcome)),
    )
}
