use thiserror::Error;

pub mod context;

pub type Result<T> = std::result::Result<T, Error>;

// Re-export context helpers
pub use context::{ErrorChain, ErrorContext};

/// Main error type for sqlfluent
#[derive(Error, Debug)]
pub enum Error {
    /// A builder call violated its argument contract (BETWEEN arity,
    /// empty IN list, empty INSERT data, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested named connection is absent from the configuration
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    /// Failure reported by the driver while preparing, binding, executing
    /// or managing a transaction
    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Driver(err.to_string())
    }
}

#[cfg(feature = "config")]
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unknown_connection(name: impl Into<String>) -> Self {
        Self::UnknownConnection(name.into())
    }

    pub fn driver(msg: impl Into<String>) -> Self {
        Self::Driver(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether the error originated in the driver, looking through context layers
    pub fn is_driver_error(&self) -> bool {
        match self {
            Error::Driver(_) => true,
            Error::WithContext { source, .. } => source.is_driver_error(),
            _ => false,
        }
    }

    /// Stable error code, e.g. for API responses or log correlation
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "E_INVALID_ARGUMENT",
            Error::UnknownConnection(_) => "E_UNKNOWN_CONNECTION",
            Error::Driver(_) => "E_DRIVER",
            Error::Config(_) => "E_CONFIG",
            Error::Io(_) => "E_IO",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::invalid_argument("x").error_code(),
            "E_INVALID_ARGUMENT"
        );
        assert_eq!(
            Error::unknown_connection("local").error_code(),
            "E_UNKNOWN_CONNECTION"
        );
        assert_eq!(
            Error::driver("boom").with_context("while inserting").error_code(),
            "E_DRIVER"
        );
    }

    #[test]
    fn test_is_driver_error_through_context() {
        let err = Error::driver("disk I/O error").with_context("commit failed");
        assert!(err.is_driver_error());
        assert!(!Error::invalid_argument("bad").is_driver_error());
    }

    #[test]
    fn test_display() {
        let err = Error::unknown_connection("analytics");
        assert_eq!(err.to_string(), "Unknown connection: analytics");
    }
}
