//! Core error type definitions

/// Result type alias for graceful operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error accepted from fallible cleanup actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for graceful operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cleanup action reported failure
    Action {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A cleanup action panicked instead of returning
    Panicked { message: String },

    /// Installing OS signal handlers failed
    Signal {
        signals: Vec<i32>,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    Configuration { variable: String, message: String },
}
