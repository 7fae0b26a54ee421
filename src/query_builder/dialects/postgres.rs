//! PostgreSQL placeholder dialect

use super::SqlDialect;

/// PostgreSQL dialect, numbered `$n` parameters
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect
    pub fn new() -> Self {
        Self
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for PostgresDialect {
    fn placeholder(&self, position: usize) -> String {
        format!("${}", position)
    }

    fn reuses_positions(&self) -> bool {
        true
    }
}
