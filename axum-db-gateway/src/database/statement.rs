//! SQL statement construction
//!
//! Every statement is a pair of SQL text and bound parameters. Caller data
//! always travels as a bound parameter; only [`Identifier`]s, which are
//! validated and quoted, are interpolated into the text.

use serde_json::Value;

use crate::schema::{Identifier, Record};
use crate::{Error, Result};

/// SQL text plus the values bound to its `?` placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub parameters: Vec<Value>,
}

impl Statement {
    /// A statement without placeholders
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(sql: impl Into<String>, parameters: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
}

pub fn list_tables() -> Statement {
    Statement::new("SHOW TABLES")
}

/// Column discovery; the `Field` column of the result holds the names
pub fn describe_table(table: &Identifier) -> Statement {
    Statement::new(format!("DESCRIBE {}", table.quoted()))
}

pub fn fetch_rows(table: &Identifier, limit: u64) -> Statement {
    Statement::new(format!("SELECT * FROM {} LIMIT {}", table.quoted(), limit))
}

/// Search every column for `query` as a substring
///
/// An empty query, or a table without columns, degrades to [`fetch_rows`].
pub fn search_rows(table: &Identifier, columns: &[Identifier], query: &str, limit: u64) -> Statement {
    if query.is_empty() || columns.is_empty() {
        return fetch_rows(table, limit);
    }

    let (where_clause, parameters) = build_search_clause(columns, query);
    Statement::with_parameters(
        format!("SELECT * FROM {}{} LIMIT {}", table.quoted(), where_clause, limit),
        parameters,
    )
}

/// Build a ` WHERE a LIKE ? OR b LIKE ?` clause with one `%query%` per column
fn build_search_clause(columns: &[Identifier], query: &str) -> (String, Vec<Value>) {
    let pattern = format!("%{}%", query);

    let conditions: Vec<String> = columns
        .iter()
        .map(|column| format!("{} LIKE ?", column.quoted()))
        .collect();
    let parameters = vec![Value::String(pattern); columns.len()];

    (format!(" WHERE {}", conditions.join(" OR ")), parameters)
}

pub fn insert(table: &Identifier, record: &Record) -> Result<Statement> {
    if record.is_empty() {
        return Err(Error::validation("Record has no fields"));
    }

    let columns: Vec<String> = record.columns().map(Identifier::quoted).collect();
    let placeholders = vec!["?"; record.len()].join(", ");

    Ok(Statement::with_parameters(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table.quoted(),
            columns.join(", "),
            placeholders
        ),
        record.values().cloned().collect(),
    ))
}

/// Update the rows matching `id_field = id_value`
///
/// An empty record is rejected: there would be no `SET` clause.
pub fn update(
    table: &Identifier,
    record: &Record,
    id_field: &Identifier,
    id_value: &Value,
) -> Result<Statement> {
    if record.is_empty() {
        return Err(Error::validation("Record has no fields"));
    }

    let assignments: Vec<String> = record
        .columns()
        .map(|column| format!("{} = ?", column.quoted()))
        .collect();

    let mut parameters: Vec<Value> = record.values().cloned().collect();
    parameters.push(id_value.clone());

    Ok(Statement::with_parameters(
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            table.quoted(),
            assignments.join(", "),
            id_field.quoted()
        ),
        parameters,
    ))
}

pub fn delete(table: &Identifier, id_field: &Identifier, id_value: &Value) -> Statement {
    Statement::with_parameters(
        format!("DELETE FROM {} WHERE {} = ?", table.quoted(), id_field.quoted()),
        vec![id_value.clone()],
    )
}

/// Caller SQL, passed through verbatim
pub fn raw(text: &str) -> Statement {
    Statement::new(text)
}

/// Whether raw SQL is treated as a read
///
/// Only the leading keyword is inspected; the text is not parsed.
pub fn is_read_query(text: &str) -> bool {
    text.trim().to_uppercase().starts_with("SELECT")
}
