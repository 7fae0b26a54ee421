//! Database access
//!
//! Driver traits and the sqlx-backed implementation, connection
//! configuration, the named-connection registry and the [`Connection`]
//! handle the query builder runs on.

pub mod adapters;
pub mod config;
pub mod driver;
pub mod registry;
pub mod types;

// Re-export main types for convenience
pub use adapters::SqlxConnection;
pub use config::{ConnectionConfig, ConnectionConfigBuilder, DatabasesConfig};
pub use driver::{DatabaseConnection, PreparedStatement};
pub use registry::{Database, DEFAULT_CONNECTION};
pub use types::{DatabaseBackend, Row, SqlValue};

use crate::error::{ErrorChain, Result};
use crate::query_builder::{Query, QueryBuilder};
use std::sync::Arc;

/// Handle to one live connection
#[derive(Clone)]
pub struct Connection {
    driver: Arc<dyn DatabaseConnection>,
}

impl Connection {
    pub fn new(driver: Arc<dyn DatabaseConnection>) -> Self {
        Self { driver }
    }

    /// Wrap a concrete driver
    pub fn from_driver(driver: impl DatabaseConnection + 'static) -> Self {
        Self::new(Arc::new(driver))
    }

    /// Open a sqlx connection from a URL (`sqlite::memory:`, `mysql://...`)
    pub fn connect(url: &str) -> Result<Self> {
        Ok(Self::from_driver(SqlxConnection::connect(url)?))
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseConnection> {
        &self.driver
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.driver.backend()
    }

    /// Start a builder on `table`
    pub fn table(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.driver), table)
    }

    /// Prepare hand-written SQL; bind with [`Query::values`]
    pub fn query(&self, sql: &str) -> Result<Query> {
        Query::prepare(Arc::clone(&self.driver), sql)
    }

    /// Run `work` inside a transaction
    ///
    /// Commits when `work` returns `Ok`. On `Err` the transaction is rolled
    /// back and the error returned unchanged. A failed commit is rolled back
    /// too and its error returned.
    pub fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.driver.begin_transaction()?;

        match work(self) {
            Ok(value) => match self.driver.commit() {
                Ok(()) => Ok(value),
                Err(e) => {
                    log::warn!("Commit failed, rolling back: {}", ErrorChain::new(&e));
                    self.rollback_quietly();
                    Err(e)
                }
            },
            Err(e) => {
                log::warn!("Rolling back transaction: {}", ErrorChain::new(&e));
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    /// Roll back if a transaction is still open; the caller's error wins
    fn rollback_quietly(&self) {
        if !self.driver.in_transaction() {
            return;
        }
        if let Err(e) = self.driver.rollback() {
            log::error!("Rollback failed: {}", e);
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.driver.backend())
            .field("in_transaction", &self.driver.in_transaction())
            .finish()
    }
}
