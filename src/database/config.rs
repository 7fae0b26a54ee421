//! Database configuration structures and parsing
//!
//! Named connection entries, each rendered into a driver URL. A
//! configuration file holds one table per connection:
//!
//! ```toml
//! [local]
//! engine = "mysql"
//! host = "127.0.0.1"
//! name = "shop"
//! user = "root"
//! password = "secret"
//!
//! [cache]
//! engine = "sqlite"
//! name = "/var/lib/shop/cache.db"
//! options = { mode = "rwc" }
//! ```

use crate::database::types::DatabaseBackend;
#[cfg(feature = "config")]
use crate::error::ErrorContext;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Characters left as-is in URL credentials and option values
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Configuration for a single named connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine (`mysql`, `postgres`, `sqlite`)
    pub engine: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    /// Database name, or the file path for SQLite
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Connection charset (ignored by PostgreSQL and SQLite)
    #[serde(default = "default_charset")]
    pub charset: String,

    /// Extra driver options appended to the URL query string
    #[serde(default)]
    pub options: IndexMap<String, String>,
}

impl ConnectionConfig {
    /// Backend family named by `engine`
    pub fn backend(&self) -> Result<DatabaseBackend> {
        DatabaseBackend::from_engine(&self.engine)
            .ok_or_else(|| Error::config(format!("Unsupported database engine '{}'", self.engine)))
    }

    /// Render the driver URL for this entry
    pub fn dsn(&self) -> Result<String> {
        let backend = self.backend()?;

        let mut query: Vec<(String, String)> = Vec::new();
        if backend == DatabaseBackend::MySQL && !self.charset.is_empty() {
            query.push(("charset".to_string(), self.charset.clone()));
        }
        for (key, value) in &self.options {
            query.push((key.clone(), value.clone()));
        }

        let mut dsn = match backend {
            DatabaseBackend::SQLite => {
                if self.name.is_empty() {
                    return Err(Error::config("SQLite connections need a database file name"));
                }
                if self.name == ":memory:" {
                    "sqlite::memory:".to_string()
                } else {
                    format!("sqlite://{}", self.name)
                }
            }
            DatabaseBackend::MySQL | DatabaseBackend::Postgres => {
                let mut dsn = format!("{}://", backend.as_str());
                if !self.user.is_empty() {
                    dsn.push_str(&encode(&self.user));
                    if !self.password.is_empty() {
                        dsn.push(':');
                        dsn.push_str(&encode(&self.password));
                    }
                    dsn.push('@');
                }
                dsn.push_str(&self.host);
                if let Some(port) = self.port {
                    dsn.push_str(&format!(":{}", port));
                }
                dsn.push('/');
                dsn.push_str(&encode(&self.name));
                dsn
            }
        };

        if !query.is_empty() {
            let rendered: Vec<String> = query
                .iter()
                .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
                .collect();
            dsn.push('?');
            dsn.push_str(&rendered.join("&"));
        }

        Ok(dsn)
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, URL_COMPONENT).to_string()
}

/// Configuration for multiple named connections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabasesConfig {
    /// Map of connection name to configuration
    #[serde(flatten)]
    pub connections: IndexMap<String, ConnectionConfig>,
}

impl DatabasesConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named connection
    pub fn add_connection(&mut self, name: impl Into<String>, config: ConnectionConfig) {
        self.connections.insert(name.into(), config);
    }

    /// Builder-style variant of [`DatabasesConfig::add_connection`]
    pub fn with_connection(mut self, name: impl Into<String>, config: ConnectionConfig) -> Self {
        self.add_connection(name, config);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConnectionConfig> {
        self.connections.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Connection names in declaration order
    pub fn names(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Merge with another configuration (other takes precedence)
    pub fn merge(&mut self, other: DatabasesConfig) {
        for (name, config) in other.connections {
            self.connections.insert(name, config);
        }
    }

    /// Parse a TOML document with one table per connection
    #[cfg(feature = "config")]
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DatabasesConfig = toml::from_str(content)?;
        for (name, entry) in &config.connections {
            entry
                .backend()
                .map_err(|e| e.with_context(format!("Invalid connection '{}'", name)))?;
        }
        Ok(config)
    }

    /// Load a TOML configuration file
    #[cfg(feature = "config")]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(Error::from)
            .with_context(|| format!("Failed to read database configuration {}", path.display()))?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded {} database connection(s) from {}",
            config.len(),
            path.display()
        );
        Ok(config)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_charset() -> String {
    "utf8".to_string()
}

/// Builder for ConnectionConfig
pub struct ConnectionConfigBuilder {
    engine: Option<String>,
    host: String,
    port: Option<u16>,
    name: String,
    user: String,
    password: String,
    charset: String,
    options: IndexMap<String, String>,
}

impl ConnectionConfigBuilder {
    pub fn new() -> Self {
        Self {
            engine: None,
            host: default_host(),
            port: None,
            name: String::new(),
            user: String::new(),
            password: String::new(),
            charset: default_charset(),
            options: IndexMap::new(),
        }
    }

    /// Set the engine (required)
    pub fn engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ConnectionConfig> {
        let engine = self
            .engine
            .ok_or_else(|| Error::config("Database engine is required"))?;

        let config = ConnectionConfig {
            engine,
            host: self.host,
            port: self.port,
            name: self.name,
            user: self.user,
            password: self.password,
            charset: self.charset,
            options: self.options,
        };
        config.backend()?;
        Ok(config)
    }
}

impl Default for ConnectionConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
