//! Common error handling utilities and patterns
//!
//! Provides a small shared vocabulary for error construction and context
//! attachment while leaving each crate free to define its own error enum.

use std::fmt;

/// Common error variants that appear across multiple crates
///
/// Each crate-specific error enum implements this trait so that shared
/// helpers can construct errors without knowing the concrete type.
pub trait CommonError: std::error::Error + Send + Sync + 'static {
    /// Create an I/O error variant
    fn io_error(msg: impl Into<String>) -> Self
    where
        Self: Sized;

    /// Create a configuration error variant
    fn config_error(msg: impl Into<String>) -> Self
    where
        Self: Sized;

    /// Create a validation error variant
    fn validation_error(msg: impl Into<String>) -> Self
    where
        Self: Sized;

    /// Create a generic "other" error variant
    fn other_error(msg: impl Into<String>) -> Self
    where
        Self: Sized;
}

/// Trait for adding context to errors
///
/// A consistent way to attach context to errors across all crates, similar
/// to anyhow's context() but producing a plain message.
pub trait ErrorContext<T> {
    /// Add context to an error
    ///
    /// # Errors
    ///
    /// Returns the formatted context + original error as the error value
    fn context<C>(self, context: C) -> Result<T, String>
    where
        C: fmt::Display + Send + Sync + 'static;

    /// Add context with a closure (lazy evaluation)
    ///
    /// # Errors
    ///
    /// Returns the formatted context + original error as the error value
    fn with_context<C, F>(self, f: F) -> Result<T, String>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T, String>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| format!("{context}: {e}"))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, String>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| format!("{}: {}", f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum TestError {
        #[error("IO error: {0}")]
        Io(String),
        #[error("Validation error: {0}")]
        Validation(String),
        #[error("Other error: {0}")]
        Other(String),
    }

    impl CommonError for TestError {
        fn io_error(msg: impl Into<String>) -> Self {
            Self::Io(msg.into())
        }

        fn config_error(msg: impl Into<String>) -> Self {
            Self::Other(msg.into())
        }

        fn validation_error(msg: impl Into<String>) -> Self {
            Self::Validation(msg.into())
        }

        fn other_error(msg: impl Into<String>) -> Self {
            Self::Other(msg.into())
        }
    }

    #[test]
    fn test_common_error_trait() {
        let io_err = TestError::io_error("file not found");
        assert_eq!(io_err.to_string(), "IO error: file not found");

        let validation_err = TestError::validation_error("missing url");
        assert_eq!(validation_err.to_string(), "Validation error: missing url");
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), TestError> = Err(TestError::io_error("original error"));
        let with_context = result.context("while reading file");
        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().contains("while reading file"));
    }

    #[test]
    fn test_lazy_error_context() {
        let result: Result<(), TestError> = Err(TestError::io_error("denied"));
        let with_context = result.with_context(|| format!("syncing {}", "demo"));
        assert_eq!(with_context.unwrap_err(), "syncing demo: IO error: denied");
    }
}
