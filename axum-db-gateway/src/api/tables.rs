//! Table listing, column and row endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use super::{read_body, run_operation, unexpected_outcome};
use crate::database::traits::DatabaseProvider;
use crate::dispatch::{Dispatcher, Outcome};
use crate::schema::{
    ColumnsResponse, ConnectionRequest, Operation, RowsResponse, SearchRequest, TableRequest,
    TablesResponse,
};

/// Handler for POST /api/database/tables
///
/// Returns the names of all tables in the connected database.
pub async fn list_tables_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<ConnectionRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to fetch tables";

    let request = read_body(payload)
        .and_then(|request| request.descriptor())
        .map(|descriptor| (descriptor, Operation::ListTables));

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Tables(tables)) => (
            StatusCode::OK,
            Json(TablesResponse {
                success: true,
                tables,
            }),
        )
            .into_response(),
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

/// Handler for POST /api/database/table/columns
///
/// Returns the column names of `tableName` in declaration order.
pub async fn table_columns_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<TableRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to fetch table columns";

    let request = read_body(payload).and_then(TableRequest::into_describe);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Columns(columns)) => (
            StatusCode::OK,
            Json(ColumnsResponse {
                success: true,
                columns,
            }),
        )
            .into_response(),
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

/// Handler for POST /api/database/table/data
///
/// Returns the first rows of `tableName` (default 100, max 500).
pub async fn table_data_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<TableRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Failed to fetch table data";

    let request = read_body(payload).and_then(TableRequest::into_fetch);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Rows(data)) => rows_response(data),
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

/// Handler for POST /api/database/table/search
///
/// Returns rows where any column contains `query`. An empty query behaves
/// like the table data endpoint.
///
/// Request body:
/// ```json
/// {
///   "host": "localhost", "port": 3306, "user": "root",
///   "password": "secret", "database": "shop",
///   "tableName": "users",
///   "query": "ada"
/// }
/// ```
pub async fn search_table_handler<DB: DatabaseProvider>(
    State(dispatcher): State<Dispatcher<DB>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Response {
    const CONTEXT: &str = "Search failed";

    let request = read_body(payload).and_then(SearchRequest::into_operation);

    match run_operation(&dispatcher, CONTEXT, request).await {
        Ok(Outcome::Rows(data)) => rows_response(data),
        Ok(other) => unexpected_outcome(CONTEXT, other),
        Err(response) => response,
    }
}

fn rows_response(data: Vec<crate::schema::JsonRow>) -> Response {
    (
        StatusCode::OK,
        Json(RowsResponse {
            success: true,
            data,
        }),
    )
        .into_response()
}
