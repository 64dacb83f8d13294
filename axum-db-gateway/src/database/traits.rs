//! Database provider traits
//!
//! These traits define the interface every database driver must provide.

use async_trait::async_trait;

use crate::database::statement::Statement;
use crate::normalize::NativeRow;
use crate::schema::ConnectionDescriptor;
use crate::Result;

/// Opens short-lived connections from caller-supplied credentials
///
/// Providers never pool: every call to [`connect`](Self::connect) performs a
/// full handshake and the connection belongs to a single request.
#[async_trait]
pub trait DatabaseProvider: Send + Sync + 'static {
    type Connection: DatabaseConnection;

    /// Open a connection to the database named by the descriptor
    ///
    /// # Errors
    ///
    /// [`Error::Connection`](crate::Error::Connection) when the server cannot
    /// be reached or rejects the credentials
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Connection>;

    /// Open and immediately close a connection
    async fn test_connection(&self, descriptor: &ConnectionDescriptor) -> Result<()> {
        let connection = self.connect(descriptor).await?;
        connection.close().await
    }
}

/// Summary of a statement that does not return rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub rows_affected: u64,

    /// Auto-increment value generated by an insert, if any
    pub last_insert_id: Option<u64>,
}

/// A single open database connection
#[async_trait]
pub trait DatabaseConnection: Send + Sized {
    /// Run a statement and collect every row it returns
    async fn fetch(&mut self, statement: &Statement) -> Result<Vec<NativeRow>>;

    /// Run a statement for its side effects
    ///
    /// Changes stay pending until [`commit`](Self::commit); a connection
    /// closed without committing discards them.
    async fn execute(&mut self, statement: &Statement) -> Result<ExecutionSummary>;

    /// Make pending changes durable; a no-op when nothing is pending
    async fn commit(&mut self) -> Result<()>;

    /// Release the connection
    async fn close(self) -> Result<()>;
}
