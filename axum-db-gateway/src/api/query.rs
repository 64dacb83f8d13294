//! Raw SQL query execution endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{read_body, run_operation, unexpected_outcome};
use crate::database::traits::DatabaseProvider;
use crate::dispatch::{Dispatcher, Outcome};
use crate::schema::{ExecuteRequest, QueryResponse};

const CONTEXT: &str = "Query execution failed";

/// Handler for POST /api/database/execute
///
/// Executes a raw SQL query and returns the results.
///
/// # Security Warning
///
/// This endpoint runs ANY statement the credentials allow, verbatim.
///
/// Text starting with `SELECT` is treated as a read; anything else is
/// executed and committed.
///
/// Response (SELECT):
/// ```json
/// {
///   "success": true,
///   "results": [{"id": 1, "name": "Ada"}],
///   "rowCount": 1
/// }
/// ```
///
/// Response (anything else):
/// ```json
/// {
///   "success": true,
///   "results": [],
///   "affectedRows": 5
/// }
/// ```
pub async fn execute_query_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Response {
    let request = read_body(payload).and_then(ExecuteRequest::into_operation);

    let response = match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Rows(results)) => QueryResponse {
            success: true,
            row_count: Some(results.len() as u64),
            results,
            affected_rows: None,
        },
        Ok(Outcome::Written(summary)) => QueryResponse {
            success: true,
            results: Vec::new(),
            row_count: None,
            affected_rows: Some(summary.rows_affected),
        },
        Ok(other) => return unexpected_outcome(CONTEXT, other),
        Err(response) => return response,
    };

    (StatusCode::OK, Json(response)).into_response()
}
