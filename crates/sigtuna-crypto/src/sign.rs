#![forbid(unsafe_code)]

//! Private keys and XML-DSig signature computation.
//!
//! Signing is done over the already-computed digest (prehash form): RSA
//! uses PKCS#1 v1.5 with the digest's DigestInfo OID, ECDSA signs the
//! prehash and emits the raw `r || s` form XML-DSig requires instead of
//! ASN.1 DER.

use rsa::Pkcs1v15Sign;
use signature::hazmat::PrehashSigner;
use sigtuna_core::{algorithm, SigningError};

use crate::digest::DigestAlgorithm;

/// A private key usable for message signing.
pub enum PrivateKey {
    Rsa(rsa::RsaPrivateKey),
    EcP256(p256::ecdsa::SigningKey),
    EcP384(p384::ecdsa::SigningKey),
}

impl PrivateKey {
    pub fn type_name(&self) -> &'static str {
        match self {
            PrivateKey::Rsa(_) => "RSA",
            PrivateKey::EcP256(_) => "EC P-256",
            PrivateKey::EcP384(_) => "EC P-384",
        }
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// The key-type × digest mapping to a SignatureMethod URI.
pub fn signature_method(
    key: &PrivateKey,
    digest: DigestAlgorithm,
) -> Result<&'static str, SigningError> {
    let uri = match (key, digest) {
        (PrivateKey::Rsa(_), DigestAlgorithm::Sha1) => algorithm::RSA_SHA1,
        (PrivateKey::Rsa(_), DigestAlgorithm::Sha256) => algorithm::RSA_SHA256,
        (PrivateKey::Rsa(_), DigestAlgorithm::Sha512) => algorithm::RSA_SHA512,
        (PrivateKey::Rsa(_), DigestAlgorithm::Ripemd160) => algorithm::RSA_RIPEMD160,
        (PrivateKey::EcP256(_) | PrivateKey::EcP384(_), DigestAlgorithm::Sha1) => {
            algorithm::ECDSA_SHA1
        }
        (PrivateKey::EcP256(_) | PrivateKey::EcP384(_), DigestAlgorithm::Sha256) => {
            algorithm::ECDSA_SHA256
        }
        (PrivateKey::EcP256(_) | PrivateKey::EcP384(_), DigestAlgorithm::Sha512) => {
            algorithm::ECDSA_SHA512
        }
        (key, digest) => {
            return Err(SigningError::UnsupportedAlgorithm(format!(
                "no signature method for {} with {}",
                key.type_name(),
                digest.uri()
            )))
        }
    };
    Ok(uri)
}

/// Sign an already-computed digest.
pub fn sign_digest(
    key: &PrivateKey,
    digest_alg: DigestAlgorithm,
    digest: &[u8],
) -> Result<Vec<u8>, SigningError> {
    match key {
        PrivateKey::Rsa(rsa_key) => {
            let padding = match digest_alg {
                DigestAlgorithm::Sha1 => Pkcs1v15Sign::new::<sha1::Sha1>(),
                DigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
                DigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
                DigestAlgorithm::Ripemd160 => Pkcs1v15Sign::new::<ripemd::Ripemd160>(),
            };
            rsa_key
                .sign(padding, digest)
                .map_err(|e| SigningError::Crypto(format!("RSA signing failed: {e}")))
        }
        PrivateKey::EcP256(ec_key) => {
            signature_method(key, digest_alg)?;
            let sig: p256::ecdsa::Signature = ec_key
                .sign_prehash(digest)
                .map_err(|e| SigningError::Crypto(format!("ECDSA signing failed: {e}")))?;
            Ok(ec_raw(sig.split_bytes()))
        }
        PrivateKey::EcP384(ec_key) => {
            signature_method(key, digest_alg)?;
            let sig: p384::ecdsa::Signature = ec_key
                .sign_prehash(digest)
                .map_err(|e| SigningError::Crypto(format!("ECDSA signing failed: {e}")))?;
            Ok(ec_raw(sig.split_bytes()))
        }
    }
}

fn ec_raw<R: AsRef<[u8]>, S: AsRef<[u8]>>((r, s): (R, S)) -> Vec<u8> {
    let mut out = Vec::with_capacity(r.as_ref().len() + s.as_ref().len());
    out.extend_from_slice(r.as_ref());
    out.extend_from_slice(s.as_ref());
    out
}
