//! Connectivity check endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{error_response, read_body};
use crate::database::traits::DatabaseProvider;
use crate::dispatch::Dispatcher;
use crate::schema::{ConnectionRequest, MessageResponse};

const CONTEXT: &str = "Connection failed";

/// Handler for POST /api/database/connect
///
/// Opens a connection with the supplied credentials and closes it again.
///
/// Request body:
/// ```json
/// {
///   "host": "localhost",
///   "port": 3306,
///   "user": "root",
///   "password": "secret",
///   "database": "shop"
/// }
/// ```
pub async fn connect_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<ConnectionRequest>, JsonRejection>,
) -> Response {
    let descriptor = match read_body(payload).and_then(|request| request.descriptor()) {
        Ok(descriptor) => descriptor,
        Err(error) => return error_response(CONTEXT, &error),
    };

    match dispatcher.test_connection(&descriptor).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::success("Connected successfully")),
        )
            .into_response(),
        Err(error) => error_response(CONTEXT, &error),
    }
}
