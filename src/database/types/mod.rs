//! Value and row types shared by the builder and the drivers

pub mod row;
pub mod value;

pub use row::Row;
pub use value::SqlValue;

/// Database backend families a driver may speak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    MySQL,
    SQLite,
}

impl DatabaseBackend {
    /// Resolve a backend from a URL scheme or a configured engine name
    pub fn from_engine(engine: &str) -> Option<Self> {
        match engine.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pgsql" => Some(Self::Postgres),
            "mysql" | "mariadb" => Some(Self::MySQL),
            "sqlite" | "sqlite3" => Some(Self::SQLite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySQL => "mysql",
            Self::SQLite => "sqlite",
        }
    }
}
