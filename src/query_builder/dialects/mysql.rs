//! MySQL/MariaDB placeholder dialect

use super::SqlDialect;

/// MySQL/MariaDB dialect
pub struct MySQLDialect;

impl MySQLDialect {
    /// Create a new MySQL dialect
    pub fn new() -> Self {
        Self
    }
}

impl Default for MySQLDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlDialect for MySQLDialect {
    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn reuses_positions(&self) -> bool {
        false
    }
}
