//! Placeholder dialects
//!
//! The builder always compiles `:name` placeholders. Drivers that only
//! understand positional parameters use a dialect to rewrite the SQL and to
//! learn in which order the named values have to be bound.

use crate::database::types::DatabaseBackend;

/// Trait for backend-specific placeholder syntax
pub trait SqlDialect: Send + Sync {
    /// Generate a parameter placeholder for the given 1-based position
    fn placeholder(&self, position: usize) -> String;

    /// Whether a placeholder can be referenced more than once by position
    /// (`$1` twice) instead of being bound again
    fn reuses_positions(&self) -> bool;
}

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::MySQLDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SQLiteDialect;

/// Factory function to create the appropriate dialect for a database backend
pub fn create_dialect(backend: DatabaseBackend) -> Box<dyn SqlDialect> {
    match backend {
        DatabaseBackend::Postgres => Box::new(PostgresDialect::new()),
        DatabaseBackend::MySQL => Box::new(MySQLDialect::new()),
        DatabaseBackend::SQLite => Box::new(SQLiteDialect::new()),
    }
}

/// SQL rewritten for a positional driver
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSql {
    pub sql: String,
    /// Placeholder names in bind order; a name repeats when the dialect
    /// cannot reuse positions
    pub bind_order: Vec<String>,
}

/// Rewrite `:name` placeholders into the dialect's positional syntax
///
/// String literals, quoted identifiers, comments and `::` casts are left
/// untouched.
pub fn rewrite_named_placeholders(sql: &str, dialect: &dyn SqlDialect) -> PositionalSql {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut bind_order: Vec<String> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let end = skip_quoted(&chars, i, c);
                out.extend(&chars[i..end]);
                i = end;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                let end = chars[i..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map(|p| i + p)
                    .unwrap_or(chars.len());
                out.extend(&chars[i..end]);
                i = end;
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars.get(i + 1).is_some_and(|ch| ch.is_ascii_alphabetic() || *ch == '_') => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_')
                {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();

                let position = if dialect.reuses_positions() {
                    match bind_order.iter().position(|n| *n == name) {
                        Some(existing) => existing + 1,
                        None => {
                            bind_order.push(name);
                            bind_order.len()
                        }
                    }
                } else {
                    bind_order.push(name);
                    bind_order.len()
                };

                out.push_str(&dialect.placeholder(position));
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    PositionalSql {
        sql: out,
        bind_order,
    }
}

/// Index just past the closing quote; doubled quotes are escapes
fn skip_quoted(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_mark_dialect_repeats_names() {
        let rewritten = rewrite_named_placeholders(
            "SELECT * FROM t WHERE a = :a0 OR b = :a0",
            &SQLiteDialect::new(),
        );
        assert_eq!(rewritten.sql, "SELECT * FROM t WHERE a = ? OR b = ?");
        assert_eq!(rewritten.bind_order, vec!["a0", "a0"]);
    }

    #[test]
    fn test_postgres_reuses_positions() {
        let rewritten = rewrite_named_placeholders(
            "UPDATE t SET a = :a WHERE b = :b1 OR c = :a",
            &PostgresDialect::new(),
        );
        assert_eq!(rewritten.sql, "UPDATE t SET a = $1 WHERE b = $2 OR c = $1");
        assert_eq!(rewritten.bind_order, vec!["a", "b1"]);
    }

    #[test]
    fn test_literals_casts_and_comments_are_skipped() {
        let rewritten = rewrite_named_placeholders(
            "SELECT ':x', \"a:b\", c::text -- :ignored\nFROM t WHERE d = :d0",
            &MySQLDialect::new(),
        );
        assert_eq!(
            rewritten.sql,
            "SELECT ':x', \"a:b\", c::text -- :ignored\nFROM t WHERE d = ?"
        );
        assert_eq!(rewritten.bind_order, vec!["d0"]);
    }

    #[test]
    fn test_escaped_quote_inside_literal() {
        let rewritten =
            rewrite_named_placeholders("SELECT 'it''s :no' WHERE a = :a", &SQLiteDialect::new());
        assert_eq!(rewritten.sql, "SELECT 'it''s :no' WHERE a = ?");
        assert_eq!(rewritten.bind_order, vec!["a"]);
    }

    #[test]
    fn test_time_literal_colon_not_placeholder() {
        // digits after a colon never start a name
        let rewritten =
            rewrite_named_placeholders("SELECT 1 WHERE t > 12:30", &SQLiteDialect::new());
        assert_eq!(rewritten.sql, "SELECT 1 WHERE t > 12:30");
        assert!(rewritten.bind_order.is_empty());
    }
}
