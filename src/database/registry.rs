//! Named connection registry
//!
//! A [`Database`] owns the configuration for every named connection and
//! opens each one lazily, on first use. Opened connections are cached, so
//! every caller asking for `"local"` shares one live handle.

use crate::database::config::{ConnectionConfig, DatabasesConfig};
use crate::database::driver::DatabaseConnection;
use crate::database::{Connection, SqlxConnection};
use crate::error::{Error, ErrorContext, Result};
use crate::query_builder::{Query, QueryBuilder};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Connection used when no name is given
pub const DEFAULT_CONNECTION: &str = "local";

/// Opens a live connection for a named configuration entry
pub type Connector =
    Box<dyn Fn(&str, &ConnectionConfig) -> Result<Arc<dyn DatabaseConnection>> + Send + Sync>;

/// Registry of named connections
pub struct Database {
    config: DatabasesConfig,
    connector: Connector,
    connections: RwLock<HashMap<String, Connection>>,
}

impl Database {
    /// Registry opening connections through sqlx
    pub fn new(config: DatabasesConfig) -> Self {
        Self::with_connector(config, |name, entry| {
            let dsn = entry.dsn()?;
            let conn = SqlxConnection::connect_named(name, &dsn)?;
            Ok(Arc::new(conn) as Arc<dyn DatabaseConnection>)
        })
    }

    /// Registry opening connections with a custom driver
    pub fn with_connector<F>(config: DatabasesConfig, connector: F) -> Self
    where
        F: Fn(&str, &ConnectionConfig) -> Result<Arc<dyn DatabaseConnection>> + Send + Sync + 'static,
    {
        Self {
            config,
            connector: Box::new(connector),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Load the configuration from a TOML file
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(DatabasesConfig::from_file(path)?))
    }

    pub fn config(&self) -> &DatabasesConfig {
        &self.config
    }

    /// Connection named `name`, opened on first use
    ///
    /// # Returns
    /// * `Ok(connection)` - The cached or newly opened connection
    /// * `Err(Error::UnknownConnection)` - If `name` is not configured
    /// * `Err(Error::Driver)` - If opening the connection failed
    pub fn connection(&self, name: &str) -> Result<Connection> {
        if let Some(conn) = self.read_cache()?.get(name) {
            return Ok(conn.clone());
        }

        let entry = self
            .config
            .get(name)
            .ok_or_else(|| Error::unknown_connection(name))?;

        let driver = (self.connector)(name, entry)
            .with_context(|| format!("Failed to open connection '{}'", name))?;

        let mut cache = self
            .connections
            .write()
            .map_err(|_| Error::driver("Connection cache lock poisoned"))?;
        // Another thread may have won the race; keep its handle
        let conn = cache
            .entry(name.to_string())
            .or_insert_with(|| Connection::new(driver))
            .clone();

        log::debug!("Connection '{}' ready", name);
        Ok(conn)
    }

    /// The [`DEFAULT_CONNECTION`]
    pub fn default_connection(&self) -> Result<Connection> {
        self.connection(DEFAULT_CONNECTION)
    }

    /// Builder on `table` over the default connection
    pub fn table(&self, table: &str) -> Result<QueryBuilder> {
        Ok(self.default_connection()?.table(table))
    }

    /// Hand-written SQL over the default connection
    pub fn query(&self, sql: &str) -> Result<Query> {
        self.default_connection()?.query(sql)
    }

    /// Transaction on the default connection
    pub fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.default_connection()?.transaction(work)
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.read_cache()
            .map(|cache| cache.contains_key(name))
            .unwrap_or(false)
    }

    /// Drop the cached handle for `name`; the next use reconnects
    pub fn disconnect(&self, name: &str) -> bool {
        match self.connections.write() {
            Ok(mut cache) => cache.remove(name).is_some(),
            Err(_) => false,
        }
    }

    fn read_cache(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Connection>>> {
        self.connections
            .read()
            .map_err(|_| Error::driver("Connection cache lock poisoned"))
    }
}
