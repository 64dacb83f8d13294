//! Record insert, update and delete endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{read_body, run_operation, unexpected_outcome};
use crate::database::traits::DatabaseProvider;
use crate::dispatch::{Dispatcher, Outcome};
use crate::schema::{
    AddRecordRequest, AffectedRowsResponse, DeleteRecordRequest, InsertResponse,
    UpdateRecordRequest,
};

/// Handler for POST /api/database/table/add
///
/// Inserts `record` into `tableName` and returns the generated id
/// (0 when the table has no auto-increment column).
pub async fn add_record_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<AddRecordRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to add record";

    let request = read_body(payload).and_then(AddRecordRequest::into_operation);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Written(summary)) => (
            StatusCode::OK,
            Json(InsertResponse {
                success: true,
                message: "Record added successfully".to_string(),
                insert_id: summary.last_insert_id.unwrap_or_default(),
            }),
        )
            .into_response(),
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

/// Handler for POST /api/database/table/update
///
/// Sets the columns of `record` on rows where `idField` (default `id`)
/// equals `idValue`.
pub async fn update_record_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<UpdateRecordRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to update record";

    let request = read_body(payload).and_then(UpdateRecordRequest::into_operation);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Written(summary)) => {
            affected_rows_response("Record updated successfully", summary.rows_affected)
        }
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

/// Handler for POST /api/database/table/delete
///
/// Deletes rows where `idField` (default `id`) equals `idValue`.
pub async fn delete_record_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<DeleteRecordRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to delete record";

    let request = read_body(payload).and_then(DeleteRecordRequest::into_operation);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Written(summary)) => {
            affected_rows_response("Record deleted successfully", summary.rows_affected)
        }
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

fn affected_rows_response(message: &str, affected_rows: u64) -> Response {
    (
        StatusCode::OK,
        Json(AffectedRowsResponse {
            success: true,
            message: message.to_string(),
            affected_rows,
        }),
    )
        .into_response()
}
