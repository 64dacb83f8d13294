//! Request, response and operation types
//!
//! Requests carry the connection credentials alongside the operation fields.
//! Each request converts into a [`ConnectionDescriptor`] plus an [`Operation`];
//! all caller input is validated during that conversion.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::{Error, Result};

/// Port assumed for `connectionId` shortcut requests that omit one
pub const DEFAULT_PORT: u16 = 3306;

/// Host assumed for `connectionId` shortcut requests that omit one
pub const DEFAULT_HOST: &str = "localhost";

/// Rows returned by table data and search requests when no limit is given
pub const DEFAULT_ROW_LIMIT: u64 = 100;

/// Maximum allowed limit to prevent excessive memory usage
pub const MAX_ROW_LIMIT: u64 = 500;

/// Longest identifier MySQL accepts for tables and columns
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Column used to address records when the request names none
const DEFAULT_ID_FIELD: &str = "id";

pub(crate) const INVALID_CONNECTION: &str = "Invalid connection information";
pub(crate) const INVALID_PARAMETERS: &str = "Invalid request parameters";

/// A normalized result row, column name to JSON primitive
pub type JsonRow = Map<String, Value>;

/// Credentials identifying one target database
///
/// Lives for a single request; the password is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConnectionDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}

impl ConnectionDescriptor {
    /// Resolve a descriptor from the connection fields of a request
    ///
    /// Host, user, password and database must be present and non-empty. When
    /// the request carries a `connectionId`, a missing port falls back to
    /// [`DEFAULT_PORT`] and a missing host to [`DEFAULT_HOST`]; otherwise the
    /// port must be supplied.
    pub fn resolve(fields: &ConnectionFields) -> Result<Self> {
        let shortcut = fields.connection_id.is_some();

        let host = fields
            .host
            .clone()
            .or_else(|| shortcut.then(|| DEFAULT_HOST.to_string()));
        let port = fields.port.or(shortcut.then_some(DEFAULT_PORT));

        match (
            non_empty(host),
            port.filter(|port| *port != 0),
            non_empty(fields.user.clone()),
            non_empty(fields.password.clone()),
            non_empty(fields.database.clone()),
        ) {
            (Some(host), Some(port), Some(user), Some(password), Some(database)) => Ok(Self {
                host,
                port,
                user,
                password,
                database,
            }),
            _ => Err(Error::validation(INVALID_CONNECTION)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Connection fields shared by every database request
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFields {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,

    /// Marks a request that refers to a saved connection; only enables defaults
    ///
    /// Presence is what counts, so an explicit `null` still enables them.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub connection_id: Option<Value>,
}

/// Wrap any value that is present in the body, `null` included
fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A table or column name that is safe to interpolate into SQL text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a caller-supplied name against the identifier allow-list
    ///
    /// Only ASCII letters, digits and underscores are accepted, up to 64
    /// characters.
    pub fn parse(name: &str) -> Result<Self> {
        let valid = !name.is_empty()
            && name.len() <= MAX_IDENTIFIER_LENGTH
            && name
                .chars()
                .all(|character| character.is_ascii_alphanumeric() || character == '_');

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::validation(format!("Invalid identifier: {:?}", name)))
        }
    }

    /// Wrap a name reported by the database server itself
    ///
    /// Catalog names skip the allow-list and rely on quoting alone.
    pub fn from_catalog(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Backtick-quote the identifier, doubling any embedded backticks
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0.replace('`', "``"))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Column values for an insert or update, in the order the caller sent them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(Identifier, Value)>,
}

impl Record {
    /// Build a record from a JSON object, validating every column name
    pub fn from_map(map: Map<String, Value>) -> Result<Self> {
        let fields = map
            .into_iter()
            .map(|(column, value)| Ok((Identifier::parse(&column)?, value)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { fields })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &Identifier> {
        self.fields.iter().map(|(column, _)| column)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }
}

/// One logical database action requested by a caller
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListTables,
    DescribeTable {
        table: Identifier,
    },
    FetchRows {
        table: Identifier,
        limit: u64,
    },
    SearchRows {
        table: Identifier,
        query: String,
        limit: u64,
    },
    RawQuery {
        text: String,
    },
    Insert {
        table: Identifier,
        record: Record,
    },
    Update {
        table: Identifier,
        record: Record,
        id_field: Identifier,
        id_value: Value,
    },
    Delete {
        table: Identifier,
        id_field: Identifier,
        id_value: Value,
    },
}

impl Operation {
    /// Whether the operation writes and must be committed
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Operation::Insert { .. } | Operation::Update { .. } | Operation::Delete { .. }
        )
    }
}

fn required_table(table_name: Option<String>) -> Result<Identifier> {
    match non_empty(table_name) {
        Some(name) => Identifier::parse(&name),
        None => Err(Error::validation(INVALID_PARAMETERS)),
    }
}

fn id_field(id_field: Option<String>) -> Result<Identifier> {
    Identifier::parse(id_field.as_deref().unwrap_or(DEFAULT_ID_FIELD))
}

fn required_record(record: Option<Map<String, Value>>) -> Result<Record> {
    match record.filter(|record| !record.is_empty()) {
        Some(record) => Record::from_map(record),
        None => Err(Error::validation(INVALID_PARAMETERS)),
    }
}

fn required_id_value(id_value: Option<Value>) -> Result<Value> {
    id_value.ok_or_else(|| Error::validation(INVALID_PARAMETERS))
}

fn row_limit(limit: Option<u64>) -> u64 {
    limit.unwrap_or(DEFAULT_ROW_LIMIT).min(MAX_ROW_LIMIT)
}

/// Request carrying only connection credentials
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
}

impl ConnectionRequest {
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        ConnectionDescriptor::resolve(&self.connection)
    }
}

/// Request addressing a single table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub table_name: Option<String>,
    pub limit: Option<u64>,
}

impl TableRequest {
    /// Fetch the first rows of the table
    pub fn into_fetch(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;
        let limit = row_limit(self.limit);

        Ok((descriptor, Operation::FetchRows { table, limit }))
    }

    /// List the columns of the table
    pub fn into_describe(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;

        Ok((descriptor, Operation::DescribeTable { table }))
    }
}

/// Request searching every column of a table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub table_name: Option<String>,
    pub query: Option<String>,
    pub limit: Option<u64>,
}

impl SearchRequest {
    pub fn into_operation(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;

        Ok((
            descriptor,
            Operation::SearchRows {
                table,
                query: self.query.unwrap_or_default(),
                limit: row_limit(self.limit),
            },
        ))
    }
}

/// Request to execute a raw SQL query
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub query: Option<String>,
}

impl ExecuteRequest {
    pub fn into_operation(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let text = non_empty(self.query).ok_or_else(|| Error::validation(INVALID_PARAMETERS))?;

        Ok((descriptor, Operation::RawQuery { text }))
    }
}

/// Request to insert one record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecordRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub table_name: Option<String>,
    pub record: Option<Map<String, Value>>,
}

impl AddRecordRequest {
    pub fn into_operation(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;
        let record = required_record(self.record)?;

        Ok((descriptor, Operation::Insert { table, record }))
    }
}

/// Request to update the record matching `idField = idValue`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub table_name: Option<String>,
    pub record: Option<Map<String, Value>>,
    pub id_field: Option<String>,
    pub id_value: Option<Value>,
}

impl UpdateRecordRequest {
    pub fn into_operation(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;
        let record = required_record(self.record)?;
        let id_field = id_field(self.id_field)?;
        let id_value = required_id_value(self.id_value)?;

        Ok((
            descriptor,
            Operation::Update {
                table,
                record,
                id_field,
                id_value,
            },
        ))
    }
}

/// Request to delete the record matching `idField = idValue`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordRequest {
    #[serde(flatten)]
    pub connection: ConnectionFields,
    pub table_name: Option<String>,
    pub id_field: Option<String>,
    pub id_value: Option<Value>,
}

impl DeleteRecordRequest {
    pub fn into_operation(self) -> Result<(ConnectionDescriptor, Operation)> {
        let descriptor = ConnectionDescriptor::resolve(&self.connection)?;
        let table = required_table(self.table_name)?;
        let id_field = id_field(self.id_field)?;
        let id_value = required_id_value(self.id_value)?;

        Ok((
            descriptor,
            Operation::Delete {
                table,
                id_field,
                id_value,
            },
        ))
    }
}

/// Envelope carrying only a message, used for plain successes and all failures
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Response from listing tables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TablesResponse {
    pub success: bool,
    pub tables: Vec<String>,
}

/// Response from describing a table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsResponse {
    pub success: bool,
    pub columns: Vec<String>,
}

/// Response containing table rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsResponse {
    pub success: bool,
    pub data: Vec<JsonRow>,
}

/// Result from executing a raw query
///
/// Reads carry `rowCount`; writes carry `affectedRows` and empty `results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub success: bool,
    pub results: Vec<JsonRow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<u64>,
}

/// Response from inserting a record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResponse {
    pub success: bool,
    pub message: String,
    pub insert_id: u64,
}

/// Response from updating or deleting records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedRowsResponse {
    pub success: bool,
    pub message: String,
    pub affected_rows: u64,
}
