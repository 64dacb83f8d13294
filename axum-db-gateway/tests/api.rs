use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use axum_db_gateway::database::{ExecutionSummary, Statement};
use axum_db_gateway::normalize::{NativeRow, NativeValue};
use axum_db_gateway::{
    ConnectionDescriptor, DatabaseConnection, DatabaseProvider, Error, GatewayLayer,
    MemoryUserStore, Result,
};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Records every statement and lifecycle call made through it, and keeps
/// the rows of a single table that inserts and deletes act on
struct Recorder {
    descriptors: Vec<ConnectionDescriptor>,
    statements: Vec<Statement>,
    commits: usize,
    closes: usize,
    rows: Vec<NativeRow>,
    next_id: u64,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            descriptors: Vec::new(),
            statements: Vec::new(),
            commits: 0,
            closes: 0,
            rows: vec![vec![
                ("id".to_string(), NativeValue::Int(1)),
                text("name", "Ada"),
                (
                    "joined".to_string(),
                    NativeValue::Date(NaiveDate::from_ymd_opt(1843, 7, 1).unwrap()),
                ),
            ]],
            next_id: 17,
        }
    }
}

fn row_id(row: &NativeRow) -> Option<i64> {
    row.iter().find_map(|(column, value)| match (column.as_str(), value) {
        ("id", NativeValue::Int(id)) => Some(*id),
        _ => None,
    })
}

#[derive(Clone, Default)]
struct RecordingProvider {
    recorder: Arc<Mutex<Recorder>>,
    refuse: bool,
    fail_statements: bool,
}

struct RecordingConnection {
    recorder: Arc<Mutex<Recorder>>,
    fail_statements: bool,
}

#[async_trait]
impl DatabaseProvider for RecordingProvider {
    type Connection = RecordingConnection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<RecordingConnection> {
        if self.refuse {
            return Err(Error::connection(
                "Access denied for user 'root'@'localhost'",
            ));
        }
        self.recorder
            .lock()
            .unwrap()
            .descriptors
            .push(descriptor.clone());
        Ok(RecordingConnection {
            recorder: self.recorder.clone(),
            fail_statements: self.fail_statements,
        })
    }
}

fn text(column: &str, value: &str) -> (String, NativeValue) {
    (column.to_string(), NativeValue::Text(value.to_string()))
}

#[async_trait]
impl DatabaseConnection for RecordingConnection {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<NativeRow>> {
        let mut recorder = self.recorder.lock().unwrap();
        recorder.statements.push(statement.clone());
        if self.fail_statements {
            return Err(Error::statement(
                "You have an error in your SQL syntax",
            ));
        }

        let rows = if statement.sql == "SHOW TABLES" {
            vec![
                vec![text("Tables_in_shop", "orders")],
                vec![text("Tables_in_shop", "users")],
            ]
        } else if statement.sql.starts_with("DESCRIBE") {
            vec![
                vec![text("Field", "id"), text("Type", "int")],
                vec![text("Field", "name"), text("Type", "varchar(64)")],
            ]
        } else {
            recorder.rows.clone()
        };
        Ok(rows)
    }

    async fn execute(&mut self, statement: &Statement) -> Result<ExecutionSummary> {
        let mut recorder = self.recorder.lock().unwrap();
        recorder.statements.push(statement.clone());
        if self.fail_statements {
            return Err(Error::statement("Unknown column 'nope' in 'field list'"));
        }

        if statement.sql.starts_with("INSERT") {
            let id = recorder.next_id;
            recorder.next_id += 1;
            recorder
                .rows
                .push(vec![("id".to_string(), NativeValue::Int(id as i64))]);
            return Ok(ExecutionSummary {
                rows_affected: 1,
                last_insert_id: Some(id),
            });
        }

        if statement.sql.starts_with("DELETE") {
            let target = statement.parameters.first().and_then(Value::as_i64);
            let before = recorder.rows.len();
            recorder.rows.retain(|row| row_id(row) != target);
            return Ok(ExecutionSummary {
                rows_affected: (before - recorder.rows.len()) as u64,
                last_insert_id: None,
            });
        }

        Ok(ExecutionSummary {
            rows_affected: if statement.sql.contains("999") { 0 } else { 1 },
            last_insert_id: None,
        })
    }

    async fn commit(&mut self) -> Result<()> {
        self.recorder.lock().unwrap().commits += 1;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.recorder.lock().unwrap().closes += 1;
        Ok(())
    }
}

fn app(provider: RecordingProvider) -> Router {
    GatewayLayer::new("", provider)
        .with_identity(MemoryUserStore::new())
        .into_router()
}

fn with_connection(mut body: Value) -> Value {
    let fields = body.as_object_mut().unwrap();
    fields.insert("host".into(), json!("localhost"));
    fields.insert("port".into(), json!(3306));
    fields.insert("user".into(), json!("root"));
    fields.insert("password".into(), json!("secret"));
    fields.insert("database".into(), json!("shop"));
    body
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

async fn post_raw(app: &Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_connect_success() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(&app, "/api/database/connect", with_connection(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "message": "Connected successfully"}));
    assert_eq!(provider.recorder.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn test_connect_refused() {
    let app = app(RecordingProvider {
        refuse: true,
        ..Default::default()
    });

    let (status, body) = post(&app, "/api/database/connect", with_connection(json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Connection failed: Access denied"));
}

#[tokio::test]
async fn test_missing_credentials_never_connect() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/tables",
        json!({"host": "localhost", "port": 3306, "user": "root"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({"success": false, "message": "Invalid connection information"})
    );
    assert!(provider.recorder.lock().unwrap().descriptors.is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app(RecordingProvider::default());

    let (status, body) = post_raw(&app, "/api/database/tables", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_list_tables() {
    let app = app(RecordingProvider::default());

    let (status, body) = post(&app, "/api/database/tables", with_connection(json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "tables": ["orders", "users"]}));
}

#[tokio::test]
async fn test_table_columns() {
    let app = app(RecordingProvider::default());

    let (status, body) = post(
        &app,
        "/api/database/table/columns",
        with_connection(json!({"tableName": "users"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "columns": ["id", "name"]}));
}

#[tokio::test]
async fn test_table_data_normalizes_values() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/data",
        with_connection(json!({"tableName": "users"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let row = &body["data"][0];
    assert_eq!(row["id"], json!(1));
    assert_eq!(row["name"], json!("Ada"));
    assert!(row["joined"].is_string());

    let recorder = provider.recorder.lock().unwrap();
    assert_eq!(recorder.statements[0].sql, "SELECT * FROM `users` LIMIT 100");
    assert_eq!(recorder.commits, 0);
    assert_eq!(recorder.closes, 1);
}

#[tokio::test]
async fn test_table_name_injection_rejected() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/data",
        with_connection(json!({"tableName": "users` WHERE 1=1; DROP TABLE users; --"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid identifier"));
    assert!(provider.recorder.lock().unwrap().statements.is_empty());
}

#[tokio::test]
async fn test_search_binds_query_per_column() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, _) = post(
        &app,
        "/api/database/table/search",
        with_connection(json!({"tableName": "users", "query": "Ad"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let recorder = provider.recorder.lock().unwrap();
    let search = &recorder.statements[1];
    assert_eq!(
        search.sql,
        "SELECT * FROM `users` WHERE `id` LIKE ? OR `name` LIKE ? LIMIT 100"
    );
    assert_eq!(search.parameters, vec![json!("%Ad%"), json!("%Ad%")]);
}

#[tokio::test]
async fn test_execute_select() {
    let app = app(RecordingProvider::default());

    let (status, body) = post(
        &app,
        "/api/database/execute",
        with_connection(json!({"query": "SELECT 1"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["rowCount"], json!(1));
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
    assert!(body.get("affectedRows").is_none());
}

#[tokio::test]
async fn test_execute_write_without_matches() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/execute",
        with_connection(json!({"query": "UPDATE t SET x=1 WHERE id=999"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "results": [], "affectedRows": 0})
    );
    assert_eq!(provider.recorder.lock().unwrap().commits, 1);
}

#[tokio::test]
async fn test_execute_failure_closes_connection() {
    let provider = RecordingProvider {
        fail_statements: true,
        ..Default::default()
    };
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/execute",
        with_connection(json!({"query": "SELEC nonsense"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Query execution failed: "));
    assert_eq!(provider.recorder.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn test_add_record() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/add",
        with_connection(json!({"tableName": "users", "record": {"name": "Ada", "age": 36}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"success": true, "message": "Record added successfully", "insertId": 17})
    );

    let recorder = provider.recorder.lock().unwrap();
    assert_eq!(
        recorder.statements[0].sql,
        "INSERT INTO `users` (`name`, `age`) VALUES (?, ?)"
    );
    assert_eq!(recorder.commits, 1);
}

#[tokio::test]
async fn test_update_record_with_empty_record_is_rejected() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/update",
        with_connection(json!({"tableName": "users", "record": {}, "idValue": 1})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], json!("Invalid request parameters"));
    assert!(provider.recorder.lock().unwrap().descriptors.is_empty());
}

#[tokio::test]
async fn test_update_record() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/update",
        with_connection(json!({
            "tableName": "users",
            "record": {"name": "Grace"},
            "idField": "user_id",
            "idValue": 5
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["affectedRows"], json!(1));

    let recorder = provider.recorder.lock().unwrap();
    assert_eq!(
        recorder.statements[0].sql,
        "UPDATE `users` SET `name` = ? WHERE `user_id` = ?"
    );
    assert_eq!(recorder.statements[0].parameters, vec![json!("Grace"), json!(5)]);
}

#[tokio::test]
async fn test_delete_record_failure() {
    let provider = RecordingProvider {
        fail_statements: true,
        ..Default::default()
    };
    let app = app(provider.clone());

    let (status, body) = post(
        &app,
        "/api/database/table/delete",
        with_connection(json!({"tableName": "users", "idValue": 5})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to delete record: "));

    let recorder = provider.recorder.lock().unwrap();
    assert_eq!(recorder.commits, 0);
    assert_eq!(recorder.closes, 1);
}

#[tokio::test]
async fn test_insert_then_delete_keeps_row_count() {
    let provider = RecordingProvider::default();
    let app = app(provider.clone());
    let count = |body: &Value| body["data"].as_array().unwrap().len();

    let (_, before) = post(
        &app,
        "/api/database/table/data",
        with_connection(json!({"tableName": "users"})),
    )
    .await;

    let (status, added) = post(
        &app,
        "/api/database/table/add",
        with_connection(json!({"tableName": "users", "record": {"name": "Grace"}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, during) = post(
        &app,
        "/api/database/table/data",
        with_connection(json!({"tableName": "users"})),
    )
    .await;
    assert_eq!(count(&during), count(&before) + 1);

    let (status, deleted) = post(
        &app,
        "/api/database/table/delete",
        with_connection(json!({
            "tableName": "users",
            "idField": "id",
            "idValue": added["insertId"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["affectedRows"], json!(1));

    let (_, after) = post(
        &app,
        "/api/database/table/data",
        with_connection(json!({"tableName": "users"})),
    )
    .await;
    assert_eq!(count(&after), count(&before));
    assert_eq!(provider.recorder.lock().unwrap().commits, 2);
}

#[tokio::test]
async fn test_identity_malformed_body_matches_database_envelope() {
    let app = app(RecordingProvider::default());

    let (status, body) = post_raw(&app, "/api/login", "{not json".to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid request parameters: "));
}

#[tokio::test]
async fn test_identity_flow() {
    let app = app(RecordingProvider::default());

    let (status, _) = post(
        &app,
        "/api/register",
        json!({
            "fullname": "Ada Lovelace",
            "email": "ada@example.com",
            "username": "ada",
            "password": "engine"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/api/login",
        json!({"username": "ada", "password": "engine"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["user"],
        json!({"id": 1, "username": "ada", "fullname": "Ada Lovelace", "email": "ada@example.com"})
    );

    let (status, _) = post(
        &app,
        "/api/login",
        json!({"username": "ada", "password": "wrong"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = post(
        &app,
        "/api/profile/update",
        json!({"userId": 42, "fullname": "Nobody"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "message": "User not found"}));
}
