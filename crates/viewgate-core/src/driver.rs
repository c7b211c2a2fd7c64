mod dialect;
pub use dialect::{Dialect, Placeholder};

use crate::{
    stmt::{RowStream, Value},
    Result,
};

use std::{fmt::Debug, sync::Arc};

/// A single logical database connection.
///
/// Per-statement parameterization is the driver's job; the engine only
/// hands over SQL text plus ordered arguments. A cancelled call is
/// expected to fail with [`Error::cancelled`](crate::Error::cancelled).
#[async_trait::async_trait]
pub trait Connection: Debug + Send + Sync + 'static {
    /// Execute a query, returning its rows.
    async fn query(&self, sql: &str, args: &[Value]) -> Result<RowStream>;

    /// Execute a DML statement, returning the affected-row count.
    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64>;

    async fn begin(&self) -> Result<()>;
    async fn commit(&self) -> Result<()>;
    async fn rollback(&self) -> Result<()>;

    /// Re-establish the connection after a dropped-connection error.
    /// Drives the statement executor's single retry.
    async fn reconnect(&self) -> Result<()>;
}

/// A logical database source: hands out the connection and dialect the
/// engine uses for one view.
pub trait Source: Debug + Send + Sync + 'static {
    fn connection(&self) -> Arc<dyn Connection>;
    fn dialect(&self) -> &Dialect;
}

/// The trivial source: one connection, one dialect.
#[derive(Debug, Clone)]
pub struct StaticSource {
    connection: Arc<dyn Connection>,
    dialect: Dialect,
}

impl StaticSource {
    pub fn new(connection: Arc<dyn Connection>, dialect: Dialect) -> Self {
        Self {
            connection,
            dialect,
        }
    }
}

impl Source for StaticSource {
    fn connection(&self) -> Arc<dyn Connection> {
        self.connection.clone()
    }

    fn dialect(&self) -> &Dialect {
        &self.dialect
    }
}
