//! Fluent SQL builder and executor
//!
//! A [`QueryBuilder`] accumulates joins, predicates and trailing clauses for
//! one table. Terminal calls compile that state into SQL with `:name`
//! placeholders plus a value map, then run it through a [`Query`].

pub mod compose;
pub mod core;
pub mod dialects;
pub mod executor;
pub mod pagination;
pub mod where_clause;

pub use compose::{CompiledQuery, Join, JoinKind, StatementIntent};
pub use self::core::QueryBuilder;
pub use dialects::{MySQLDialect, PostgresDialect, SQLiteDialect, SqlDialect};
pub use executor::{Fetched, Query};
pub use pagination::{FixedPage, PageSource, PaginationEnvelope, QueryParams};
pub use where_clause::{Condition, Conjunction, Operator, Predicate, WhereBuilder, WhereClause};

// Re-export SqlValue from the unified type system
pub use crate::database::types::SqlValue;
