//! MySQL database provider implementation

use crate::database::statement::Statement;
use crate::database::traits::{DatabaseConnection, DatabaseProvider, ExecutionSummary};
use crate::normalize::{NativeRow, NativeValue};
use crate::schema::ConnectionDescriptor;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::mysql::{
    MySql, MySqlArguments, MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow,
};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::debug;

/// MySQL / MariaDB database provider
///
/// Opens one unpooled connection per request from the caller's credentials.
#[derive(Debug, Clone, Default)]
pub struct MySqlProvider;

impl MySqlProvider {
    /// Create a new MySQL provider
    pub fn new() -> Self {
        Self
    }

    fn connect_options(descriptor: &ConnectionDescriptor) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&descriptor.host)
            .port(descriptor.port)
            .username(&descriptor.user)
            .password(&descriptor.password)
            .database(&descriptor.database)
    }
}

#[async_trait]
impl DatabaseProvider for MySqlProvider {
    type Connection = MySqlSession;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<MySqlSession> {
        let connection = Self::connect_options(descriptor)
            .connect()
            .await
            .map_err(|error| Error::connection(error.to_string()))?;

        Ok(MySqlSession {
            connection,
            in_transaction: false,
        })
    }
}

/// An open MySQL connection owned by one request
pub struct MySqlSession {
    connection: MySqlConnection,
    in_transaction: bool,
}

impl MySqlSession {
    /// Convert a MySQL row to driver values in column order
    fn row_to_native(row: &MySqlRow) -> Result<NativeRow> {
        row.columns()
            .iter()
            .map(|column| {
                let value = Self::extract_column_value(row, column)?;
                Ok((column.name().to_string(), value))
            })
            .collect()
    }

    /// Extract a column value from a MySQL row
    fn extract_column_value(row: &MySqlRow, column: &MySqlColumn) -> Result<NativeValue> {
        let index = column.ordinal();

        // Check if the value is NULL first
        if row.try_get_raw(index)?.is_null() {
            return Ok(NativeValue::Null);
        }

        let value = match decode_kind(column.type_info().name()) {
            DecodeKind::Signed => row.try_get::<i64, _>(index).ok().map(NativeValue::Int),
            DecodeKind::Unsigned => row.try_get::<u64, _>(index).ok().map(NativeValue::UInt),
            DecodeKind::Float => row.try_get::<f64, _>(index).ok().map(NativeValue::Float),
            DecodeKind::Decimal => row.try_get::<Decimal, _>(index).ok().map(NativeValue::Decimal),
            DecodeKind::Date => row.try_get::<NaiveDate, _>(index).ok().map(NativeValue::Date),
            DecodeKind::Time => row.try_get::<NaiveTime, _>(index).ok().map(NativeValue::Time),
            DecodeKind::DateTime => row
                .try_get::<NaiveDateTime, _>(index)
                .ok()
                .map(NativeValue::DateTime),
            DecodeKind::Timestamp => row
                .try_get::<DateTime<Utc>, _>(index)
                .ok()
                .map(NativeValue::Timestamp),
            DecodeKind::Json => row.try_get::<Value, _>(index).ok().map(NativeValue::Json),
            DecodeKind::Bytes => row.try_get::<Vec<u8>, _>(index).ok().map(NativeValue::Bytes),
            DecodeKind::Text => row.try_get::<String, _>(index).ok().map(NativeValue::Text),
        };

        Ok(value.unwrap_or_else(|| Self::fallback_value(row, index)))
    }

    /// Try common types in order when the reported type did not decode
    fn fallback_value(row: &MySqlRow, index: usize) -> NativeValue {
        if let Ok(value) = row.try_get::<i64, _>(index) {
            return NativeValue::Int(value);
        }
        if let Ok(value) = row.try_get::<u64, _>(index) {
            return NativeValue::UInt(value);
        }
        if let Ok(value) = row.try_get::<f64, _>(index) {
            return NativeValue::Float(value);
        }
        if let Ok(value) = row.try_get::<String, _>(index) {
            return NativeValue::Text(value);
        }
        if let Ok(value) = row.try_get::<NaiveDateTime, _>(index) {
            return NativeValue::DateTime(value);
        }

        // Undecodable types still carry their raw bytes
        match row.try_get_unchecked::<Vec<u8>, _>(index) {
            Ok(bytes) => NativeValue::Bytes(bytes),
            Err(_) => NativeValue::Null,
        }
    }

    async fn begin_if_needed(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.connection
                .execute(sqlx::raw_sql("START TRANSACTION"))
                .await?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

/// Rust type a column is decoded into, chosen from its MySQL type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeKind {
    Signed,
    Unsigned,
    Float,
    Decimal,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
    Bytes,
    Text,
}

/// Map a MySQL type name to the decoder for its values
///
/// `BOOLEAN` is how the driver names `TINYINT(1)`, which may hold any
/// tiny integer, so it decodes as an integer rather than a bool.
fn decode_kind(type_name: &str) -> DecodeKind {
    match type_name {
        "BIT" => DecodeKind::Unsigned,
        name if name.ends_with("UNSIGNED") => DecodeKind::Unsigned,
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => DecodeKind::Signed,
        "FLOAT" | "DOUBLE" => DecodeKind::Float,
        "DECIMAL" => DecodeKind::Decimal,
        "DATE" => DecodeKind::Date,
        "TIME" => DecodeKind::Time,
        "DATETIME" => DecodeKind::DateTime,
        "TIMESTAMP" => DecodeKind::Timestamp,
        "JSON" => DecodeKind::Json,
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "GEOMETRY" => {
            DecodeKind::Bytes
        }
        _ => DecodeKind::Text,
    }
}

/// Bind one JSON value to the next placeholder
fn bind_parameter<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(flag) => query.bind(*flag),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                query.bind(integer)
            } else if let Some(unsigned) = number.as_u64() {
                query.bind(unsigned)
            } else {
                query.bind(number.as_f64())
            }
        }
        Value::String(text) => query.bind(text.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

fn build_query(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .parameters
        .iter()
        .fold(sqlx::query(&statement.sql), bind_parameter)
}

#[async_trait]
impl DatabaseConnection for MySqlSession {
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<NativeRow>> {
        debug!(sql = %statement.sql, parameters = statement.parameters.len(), "fetching rows");

        // Statements without parameters use the text protocol, which accepts
        // everything the server understands, including non-preparable commands
        let rows = if statement.parameters.is_empty() {
            self.connection
                .fetch_all(sqlx::raw_sql(&statement.sql))
                .await?
        } else {
            self.connection.fetch_all(build_query(statement)).await?
        };

        rows.iter().map(Self::row_to_native).collect()
    }

    async fn execute(&mut self, statement: &Statement) -> Result<ExecutionSummary> {
        debug!(sql = %statement.sql, parameters = statement.parameters.len(), "executing statement");

        self.begin_if_needed().await?;

        let result = if statement.parameters.is_empty() {
            self.connection
                .execute(sqlx::raw_sql(&statement.sql))
                .await?
        } else {
            self.connection.execute(build_query(statement)).await?
        };

        let last_insert_id = result.last_insert_id();
        Ok(ExecutionSummary {
            rows_affected: result.rows_affected(),
            last_insert_id: (last_insert_id != 0).then_some(last_insert_id),
        })
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.connection.execute(sqlx::raw_sql("COMMIT")).await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.connection
            .close()
            .await
            .map_err(|error| Error::connection(error.to_string()))
    }
}
