#![forbid(unsafe_code)]

//! WS-Security header construction for outbound SOAP messages.
//!
//! The entry point is [`secure_message`]: it validates the envelope,
//! creates the `wsse:Security` header and runs the configured builders in
//! a fixed order, timestamp first, then username token, then signature.

pub mod config;
mod header;
mod secure;
mod signature;
mod timestamp;
mod token;

pub use config::{KeyIdentifierType, SigningConfigBuilder, SigningConfiguration};
pub use secure::secure_message;
