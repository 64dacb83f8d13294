//! Operation dispatch
//!
//! Runs one [`Operation`] per request: open a connection, build the statement,
//! execute it, normalize the rows, and close the connection on every path.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::statement::{self, Statement};
use crate::database::traits::{DatabaseConnection, DatabaseProvider, ExecutionSummary};
use crate::normalize::{column_text, first_column_text, normalize_rows};
use crate::schema::{ConnectionDescriptor, Identifier, JsonRow, Operation};
use crate::Result;

/// Column of a `DESCRIBE` result holding the column name
const DESCRIBE_NAME_COLUMN: &str = "Field";

/// What an operation produced, before it is wrapped in a response envelope
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Tables(Vec<String>),
    Columns(Vec<String>),
    Rows(Vec<JsonRow>),
    Written(ExecutionSummary),
}

/// Executes operations against connections opened by a [`DatabaseProvider`]
pub struct Dispatcher<DB: DatabaseProvider> {
    provider: Arc<DB>,
}

impl<DB: DatabaseProvider> Clone for Dispatcher<DB> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
        }
    }
}

impl<DB: DatabaseProvider> Dispatcher<DB> {
    pub fn new(provider: Arc<DB>) -> Self {
        Self { provider }
    }

    /// Check that the descriptor's database accepts a connection
    pub async fn test_connection(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        info!(
            host = %descriptor.host,
            port = descriptor.port,
            database = %descriptor.database,
            "testing database connection"
        );
        self.provider.test_connection(descriptor).await
    }

    /// Run a single operation on a fresh connection
    ///
    /// The connection is closed exactly once before returning, whether or not
    /// the operation succeeded. A failure while closing is logged and never
    /// replaces the operation's own result.
    pub async fn run(&self, descriptor: &ConnectionDescriptor, operation: &Operation) -> Result<Outcome> {
        info!(
            host = %descriptor.host,
            port = descriptor.port,
            database = %descriptor.database,
            "opening database connection"
        );

        let mut connection = self.provider.connect(descriptor).await?;
        let outcome = perform(&mut connection, operation).await;

        if let Err(error) = connection.close().await {
            warn!(%error, "failed to close database connection");
        }

        outcome
    }
}

async fn perform<C: DatabaseConnection>(connection: &mut C, operation: &Operation) -> Result<Outcome> {
    match operation {
        Operation::ListTables => {
            let rows = connection.fetch(&statement::list_tables()).await?;
            Ok(Outcome::Tables(rows.iter().filter_map(first_column_text).collect()))
        }
        Operation::DescribeTable { table } => Ok(Outcome::Columns(describe(connection, table).await?)),
        Operation::FetchRows { table, limit } => {
            read(connection, &statement::fetch_rows(table, *limit)).await
        }
        Operation::SearchRows { table, query, limit } => {
            let columns: Vec<Identifier> = describe(connection, table)
                .await?
                .into_iter()
                .map(Identifier::from_catalog)
                .collect();

            read(connection, &statement::search_rows(table, &columns, query, *limit)).await
        }
        Operation::RawQuery { text } => {
            let raw = statement::raw(text);
            if statement::is_read_query(text) {
                read(connection, &raw).await
            } else {
                write(connection, &raw).await
            }
        }
        Operation::Insert { table, record } => {
            write(connection, &statement::insert(table, record)?).await
        }
        Operation::Update {
            table,
            record,
            id_field,
            id_value,
        } => write(connection, &statement::update(table, record, id_field, id_value)?).await,
        Operation::Delete {
            table,
            id_field,
            id_value,
        } => write(connection, &statement::delete(table, id_field, id_value)).await,
    }
}

async fn describe<C: DatabaseConnection>(connection: &mut C, table: &Identifier) -> Result<Vec<String>> {
    let rows = connection.fetch(&statement::describe_table(table)).await?;
    Ok(rows
        .iter()
        .filter_map(|row| column_text(row, DESCRIBE_NAME_COLUMN))
        .collect())
}

async fn read<C: DatabaseConnection>(connection: &mut C, statement: &Statement) -> Result<Outcome> {
    let rows = connection.fetch(statement).await?;
    debug!(rows = rows.len(), "statement returned rows");
    Ok(Outcome::Rows(normalize_rows(rows)))
}

async fn write<C: DatabaseConnection>(connection: &mut C, statement: &Statement) -> Result<Outcome> {
    let summary = connection.execute(statement).await?;
    connection.commit().await?;
    debug!(rows_affected = summary.rows_affected, "statement committed");
    Ok(Outcome::Written(summary))
}
