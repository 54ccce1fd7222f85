//! Error types shared by cleanup actions and the coordinator

mod builders;
mod conversions;
mod display;
mod types;

pub use types::{BoxError, Error, Result};
