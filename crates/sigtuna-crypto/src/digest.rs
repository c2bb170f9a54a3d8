#![forbid(unsafe_code)]

//! Digest algorithms referenced from a signature's DigestMethod.

use sha1::Digest;
use sigtuna_core::algorithm;

/// The digest algorithms a signature can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha512,
    Ripemd160,
}

impl DigestAlgorithm {
    /// The algorithm URI for the DigestMethod element.
    pub fn uri(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => algorithm::SHA1,
            DigestAlgorithm::Sha256 => algorithm::SHA256,
            DigestAlgorithm::Sha512 => algorithm::SHA512,
            DigestAlgorithm::Ripemd160 => algorithm::RIPEMD160,
        }
    }

    /// One-shot digest of `data`.
    pub fn compute(&self, data: &[u8]) -> Vec<u8> {
        match self {
            DigestAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            DigestAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
            DigestAlgorithm::Ripemd160 => ripemd::Ripemd160::digest(data).to_vec(),
        }
    }

    /// Output length in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
            DigestAlgorithm::Ripemd160 => 20,
        }
    }
}
