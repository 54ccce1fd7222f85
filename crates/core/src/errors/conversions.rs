//! Conversion implementations for error types

use super::types::Error;

// Lets fallible actions use `?` on I/O calls and return `graceful_core::Result`
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::action(error)
    }
}
