//! Query executor
//!
//! A [`Query`] owns one prepared statement. Every accessor executes the
//! statement again before reading from it: `count()` followed by `all()`
//! costs two round-trips and may observe different data.

use crate::database::driver::{DatabaseConnection, PreparedStatement};
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use std::sync::Arc;

/// Result of [`Query::get`], shaped by the number of matched rows
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    None,
    One(Row),
    Many(Vec<Row>),
}

impl Fetched {
    fn from_rows(mut rows: Vec<Row>) -> Self {
        match rows.len() {
            0 => Fetched::None,
            1 => rows.pop().map(Fetched::One).unwrap_or(Fetched::None),
            _ => Fetched::Many(rows),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Fetched::None)
    }

    pub fn len(&self) -> usize {
        match self {
            Fetched::None => 0,
            Fetched::One(_) => 1,
            Fetched::Many(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_none()
    }

    /// Flatten into a row list whatever the shape
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Fetched::None => Vec::new(),
            Fetched::One(row) => vec![row],
            Fetched::Many(rows) => rows,
        }
    }
}

/// A prepared statement plus the connection it was prepared on
pub struct Query {
    connection: Arc<dyn DatabaseConnection>,
    statement: Box<dyn PreparedStatement>,
}

impl Query {
    /// Prepare `sql` on `connection`
    pub fn prepare(connection: Arc<dyn DatabaseConnection>, sql: &str) -> Result<Self> {
        let statement = connection.prepare(sql)?;
        Ok(Self {
            connection,
            statement,
        })
    }

    /// Bind values by placeholder name
    ///
    /// An `Array` value binds each element under `<name><index>`, matching
    /// SQL written as `IN (:ids0, :ids1)`.
    pub fn values<I, K, V>(mut self, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<SqlValue>,
    {
        for (name, value) in values {
            self.bind_value(name.as_ref(), value.into())?;
        }
        Ok(self)
    }

    pub(crate) fn bind_value(&mut self, name: &str, value: SqlValue) -> Result<()> {
        match value {
            SqlValue::Array(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    if item.is_array() {
                        return Err(Error::invalid_argument(format!(
                            "Nested list bound to :{}",
                            name
                        )));
                    }
                    self.statement.bind(&format!("{}{}", name, index), item)?;
                }
                Ok(())
            }
            scalar => self.statement.bind(name, scalar),
        }
    }

    /// Run the statement
    pub fn execute(&mut self) -> Result<bool> {
        self.statement.execute()
    }

    /// Execute and report whether the driver signalled success
    pub fn exec(&mut self) -> Result<bool> {
        self.execute()
    }

    /// Execute, then return the identifier generated by the last INSERT
    ///
    /// MySQL and SQLite report it directly. PostgreSQL has no connection-wide
    /// last id and yields `0`; add `RETURNING id` to the statement and read
    /// it with [`Query::get_one`] instead.
    pub fn last_id(&mut self) -> Result<i64> {
        self.execute()?;
        self.connection.last_insert_id()
    }

    /// Execute, then return the affected or matched row count
    pub fn count(&mut self) -> Result<u64> {
        self.execute()?;
        Ok(self.statement.row_count())
    }

    /// Execute, then return nothing, one row or several rows
    pub fn get(&mut self) -> Result<Fetched> {
        self.execute()?;
        Ok(Fetched::from_rows(self.statement.fetch_all()?))
    }

    /// Execute, then return the first row if any
    pub fn get_one(&mut self) -> Result<Option<Row>> {
        self.execute()?;
        self.statement.fetch_one()
    }

    /// Execute, then return every row; empty when nothing matched
    pub fn all(&mut self) -> Result<Vec<Row>> {
        self.execute()?;
        self.statement.fetch_all()
    }

    /// SQL and bound parameters, without executing
    pub fn debug(&self) -> String {
        self.statement.debug_dump_params()
    }

    /// The prepared SQL
    pub fn sql(&self) -> &str {
        self.statement.sql()
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("backend", &self.connection.backend())
            .field("sql", &self.statement.sql())
            .finish()
    }
}
