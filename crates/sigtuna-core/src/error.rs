#![forbid(unsafe_code)]

//! Error taxonomy for the securing pipeline.
//!
//! Three families, matching where in the lifecycle a failure can occur:
//! [`ConfigurationError`] at option-setting time, [`ParsingError`] when the
//! inbound message is parsed, and [`SigningError`] for everything that goes
//! wrong while building the security header. [`SecureError`] is the union
//! returned by the top-level entry point.

/// Rejected option value, raised eagerly by a configuration setter.
///
/// The display form is part of the public contract:
/// `Invalid keystore type: YAML. Valid options: JKS, JCEKS, PKCS11`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {option}: {value}. Valid options: {valid}")]
pub struct ConfigurationError {
    /// Human name of the option, e.g. `keystore type`.
    pub option: &'static str,
    /// The rejected value, upper-cased.
    pub value: String,
    /// Comma-separated list of accepted values.
    pub valid: &'static str,
}

/// The inbound message is not a well-formed SOAP envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("XML parsing error: {0}")]
pub struct ParsingError(pub String);

/// Failure while building the security header. Always carries the cause.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("keystore error: {0}")]
    Keystore(String),

    #[error("key alias not found in keystore: {0}")]
    AliasNotFound(String),

    #[error("incorrect password: {0}")]
    BadPassword(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(String),

    #[error("invalid XML structure: {0}")]
    XmlStructure(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Union error for the top-level message securing entry point.
#[derive(Debug, thiserror::Error)]
pub enum SecureError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}
