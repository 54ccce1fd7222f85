//! Display implementations for error types

use super::types::Error;
use std::fmt;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Action { message, .. } => {
                write!(f, "cleanup action failed: {message}")
            }
            Error::Panicked { message } => {
                write!(f, "cleanup action panicked: {message}")
            }
            Error::Signal { signals, source } => {
                write!(f, "failed to watch signals {signals:?}: {source}")
            }
            Error::Configuration { variable, message } => {
                write!(f, "configuration variable '{variable}' error: {message}")
            }
        }
    }
}
