//! SQLite placeholder dialect
//!
//! SQLite understands `:name` natively, but the sqlx driver binds strictly
//! by position, so named placeholders are still rewritten to `?`.

use super::SqlDialect;

/// SQLite dialect
pub struct SQLiteDialect;

impl SQLiteDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SQLiteDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for SQLiteDialect {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn reuses_positions(&self) -> bool {
        false
    }
}
