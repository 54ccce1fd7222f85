//! Builder methods for creating errors with context

use super::types::{BoxError, Error};

impl Error {
    /// Create an action failure from any error type
    ///
    /// An `Error` that was boxed on the way in is returned unchanged.
    #[must_use]
    pub fn action(source: impl Into<BoxError>) -> Self {
        match source.into().downcast::<Error>() {
            Ok(error) => *error,
            Err(source) => Error::Action {
                message: source.to_string(),
                source: Some(source),
            },
        }
    }

    /// Create an error describing a panicked action
    #[must_use]
    pub fn panicked(message: impl Into<String>) -> Self {
        Error::Panicked {
            message: message.into(),
        }
    }

    /// Create a signal registration error
    #[must_use]
    pub fn signal(signals: &[i32], source: std::io::Error) -> Self {
        Error::Signal {
            signals: signals.to_vec(),
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            variable: variable.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from a panicking action
    pub fn is_panic(&self) -> bool {
        matches!(self, Error::Panicked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_action_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = Error::action(io);

        assert_eq!(err.to_string(), "cleanup action failed: pipe closed");
        assert!(err.source().is_some());
        assert!(!err.is_panic());
    }

    #[test]
    fn test_action_unwraps_boxed_error() {
        let inner = Error::panicked("already converted");
        let err = Error::action(inner);
        assert!(err.is_panic());
    }

    #[test]
    fn test_panicked() {
        let err = Error::panicked("boom");
        assert!(err.is_panic());
        assert_eq!(err.to_string(), "cleanup action panicked: boom");
    }
}
