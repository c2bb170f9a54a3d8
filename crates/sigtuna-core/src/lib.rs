#![forbid(unsafe_code)]

//! Shared foundations: error taxonomy, namespace constants, algorithm URIs.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{ConfigurationError, ParsingError, SecureError, SigningError};
