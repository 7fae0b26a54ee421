//! Driver traits consumed by the query executor
//!
//! The builder never talks to a database directly. Everything it needs from
//! a driver (prepare, bind by name, execute, fetch, last insert id and
//! transaction control) goes through these two blocking traits, so any
//! driver exposing that capability can sit behind a [`Connection`].
//!
//! [`Connection`]: crate::database::Connection

use crate::database::types::{DatabaseBackend, Row, SqlValue};
use crate::error::Result;

/// A live database connection
pub trait DatabaseConnection: Send + Sync {
    /// Backend family, used for placeholder syntax and logging
    fn backend(&self) -> DatabaseBackend;

    /// Prepare a statement using `:name` placeholders
    ///
    /// # Returns
    /// * `Ok(statement)` - Ready for binding
    /// * `Err(Error::Driver)` - If the driver rejects the SQL
    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>>;

    /// Identifier generated by the most recent INSERT on this connection
    ///
    /// Drivers without the concept return `0`.
    fn last_insert_id(&self) -> Result<i64>;

    fn begin_transaction(&self) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Whether a transaction is currently open on this connection
    fn in_transaction(&self) -> bool;
}

/// A prepared statement with named parameters
pub trait PreparedStatement: Send {
    /// The SQL as it was prepared (before any driver-side rewriting)
    fn sql(&self) -> &str;

    /// Bind a scalar value to `:name` (the leading colon is optional)
    fn bind(&mut self, name: &str, value: SqlValue) -> Result<()>;

    /// Run the statement
    ///
    /// # Returns
    /// * `Ok(true)` - The driver reported success
    /// * `Err(Error::Driver)` - If execution failed
    fn execute(&mut self) -> Result<bool>;

    /// First row of the last execution
    fn fetch_one(&mut self) -> Result<Option<Row>>;

    /// Every row of the last execution, in order
    fn fetch_all(&mut self) -> Result<Vec<Row>>;

    /// Rows affected (writes) or returned (reads) by the last execution
    fn row_count(&self) -> u64;

    /// Human-readable dump of the SQL and the bound parameters
    fn debug_dump_params(&self) -> String;
}

/// Normalize a placeholder name as given to [`PreparedStatement::bind`]
pub fn placeholder_key(name: &str) -> &str {
    name.strip_prefix(':').unwrap_or(name)
}

/// Render the parameter dump shared by driver implementations
pub fn format_param_dump<'a, I>(sql: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a SqlValue)>,
{
    let params: Vec<_> = params.into_iter().collect();
    let mut out = format!("SQL: [{}] {}\nParams:  {}\n", sql.len(), sql, params.len());
    for (name, value) in params {
        out.push_str(&format!(
            "Key: Name: [{}] :{}\nvalue={}\n",
            name.len() + 1,
            name,
            value
        ));
    }
    out
}
