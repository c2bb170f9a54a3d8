#![forbid(unsafe_code)]

//! Java keystore (JKS/JCEKS) loading and certificate helpers.
//!
//! Both store formats share one container layout; they differ in the
//! proprietary algorithm protecting private key entries. Secret-key
//! entries (JCEKS tag 3) are serialized Java objects and are rejected.

pub mod jks;
pub mod material;
pub mod pbe;
pub mod x509;

#[cfg(test)]
pub(crate) mod testutil;

pub use material::{resolve, KeyMaterial, KeystoreType};
