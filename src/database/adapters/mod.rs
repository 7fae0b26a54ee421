//! Concrete driver implementations

#[cfg(test)]
pub(crate) mod mock;
pub mod sqlx_any;

pub use sqlx_any::{SqlxConnection, SqlxStatement};
