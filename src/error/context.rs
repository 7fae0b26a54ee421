//! Error context and chaining utilities
//!
//! Lets callers wrap driver failures with what the builder was doing at the
//! time ("inserting into users") without losing the root cause.

use super::Error;
use std::fmt;

/// Trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to the error
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>;

    /// Add context with lazy evaluation
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ErrorContext<T> for Result<T, Error> {
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

/// Messages of an error and every context layer under it, outermost first
///
/// Displays as `outer -> inner -> root cause`, which is how the transaction
/// scope logs the failure it rolls back for.
pub struct ErrorChain {
    chain: Vec<String>,
}

impl ErrorChain {
    pub fn new(error: &Error) -> Self {
        let mut chain = vec![error.to_string()];
        let mut current = error;
        while let Error::WithContext { source, .. } = current {
            chain.push(source.to_string());
            current = source;
        }
        Self { chain }
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }
}

impl fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chain.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_formatting() {
        let error = Error::driver("no such table: users")
            .with_context("Failed to execute SELECT")
            .with_context("Cannot paginate users");

        let chain = ErrorChain::new(&error);

        assert_eq!(chain.chain().len(), 3);
        assert_eq!(
            chain.to_string(),
            "Cannot paginate users -> Failed to execute SELECT -> Driver error: no such table: users"
        );
    }

    #[test]
    fn test_result_context() {
        let result: Result<(), Error> = Err(Error::invalid_argument("empty IN list"));
        let with_context = result.context("Building user filter");

        match with_context {
            Err(e @ Error::WithContext { .. }) => {
                assert_eq!(ErrorChain::new(&e).chain().len(), 2);
                assert_eq!(e.error_code(), "E_INVALID_ARGUMENT");
            }
            other => panic!("Expected WithContext error, got {:?}", other),
        }
    }
}
