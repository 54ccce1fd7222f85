//! Core errors and constants for the `graceful` shutdown coordinator.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the `Error` enum and `Result` alias shared by every
//!   cleanup action, so a cleanup pass reports failures through one channel.
//! - **`constants`**: Default exit codes, the automatic exit code sentinel and
//!   the environment variables read by the exit policy.

pub mod constants;
pub mod errors;

pub use self::{
    constants::*,
    errors::{BoxError, Error, Result},
};
