#![forbid(unsafe_code)]

//! Cryptographic primitives: digest computation and XML-DSig signing.

pub mod digest;
pub mod sign;

pub use digest::DigestAlgorithm;
pub use sign::{signature_method, PrivateKey};
