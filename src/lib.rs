//! sqlfluent - a fluent SQL builder and executor
//!
//! sqlfluent provides:
//! - A chainable builder compiling to SQL with named placeholders
//! - Nested predicate groups with collision-free placeholder names
//! - A blocking executor over a pluggable driver (sqlx by default)
//! - Named connections, transactions and pagination
//!
//! ```no_run
//! use sqlfluent::prelude::*;
//!
//! # fn main() -> sqlfluent::Result<()> {
//! let conn = Connection::connect("sqlite::memory:")?;
//! let adults = conn
//!     .table("users")
//!     .where_op("age", Operator::Gt, 18)?
//!     .or_where("vip", true)?
//!     .order_by("id DESC")
//!     .limit("10")
//!     .all()?;
//! # Ok(())
//! # }
//! ```

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod database;
pub mod error;
pub mod query_builder;

// Re-export main types for public API
pub use database::{
    Connection, ConnectionConfig, Database, DatabaseBackend, DatabaseConnection, DatabasesConfig,
    PreparedStatement, Row, SqlValue, SqlxConnection,
};
pub use error::{Error, Result};
pub use query_builder::{
    Fetched, Operator, PaginationEnvelope, Query, QueryBuilder, WhereBuilder, WhereClause,
};

/// Everything needed to build and run queries
pub mod prelude {
    pub use crate::database::{Connection, Database, DatabasesConfig, Row, SqlValue};
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::query_builder::{
        Fetched, FixedPage, Operator, PageSource, PaginationEnvelope, Query, QueryBuilder,
        QueryParams, WhereBuilder, WhereClause,
    };
}
