#![forbid(unsafe_code)]

//! Sun proprietary key protections used inside JKS and JCEKS stores.

use cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};
use sha1::Sha1;
use sigtuna_core::SigningError;

type Des3CbcDec = cbc::Decryptor<des::TdesEde3>;

/// Passwords enter the container hashes as UTF-16BE code units.
pub fn password_utf16be(password: &str) -> Vec<u8> {
    password
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect()
}

/// Password bytes for the JCEKS PBE scheme: each UTF-16 code unit
/// truncated to its low byte, as the JCA provider does.
fn password_low_bytes(password: &str) -> Vec<u8> {
    password.encode_utf16().map(|unit| unit as u8).collect()
}

// ── JKS key protection (OID 1.3.6.1.4.1.42.2.17.1.1) ────────────────
//
// Layout: salt(20) || ciphertext || check(20). The keystream is a SHA-1
// chain seeded with the salt; the check is SHA-1(passwd || plaintext).

pub fn jks_unprotect(data: &[u8], password: &str) -> Result<Vec<u8>, SigningError> {
    if data.len() < 40 {
        return Err(SigningError::Keystore(
            "protected key blob is too short".to_owned(),
        ));
    }
    let passwd = password_utf16be(password);
    let (salt, rest) = data.split_at(20);
    let (ciphertext, check) = rest.split_at(rest.len() - 20);

    let mut plain = Vec::with_capacity(ciphertext.len());
    let mut block = salt.to_vec();
    while plain.len() < ciphertext.len() {
        let mut hasher = Sha1::new();
        hasher.update(&passwd);
        hasher.update(&block);
        block = hasher.finalize().to_vec();
        for &keystream_byte in &block {
            let i = plain.len();
            if i == ciphertext.len() {
                break;
            }
            plain.push(ciphertext[i] ^ keystream_byte);
        }
    }

    let mut hasher = Sha1::new();
    hasher.update(&passwd);
    hasher.update(&plain);
    if hasher.finalize().as_slice() != check {
        return Err(SigningError::BadPassword(
            "key password rejected for JKS entry".to_owned(),
        ));
    }
    Ok(plain)
}

/// The inverse of [`jks_unprotect`]; the XOR keystream is symmetric.
#[cfg(test)]
pub fn jks_protect(plain: &[u8], password: &str, salt: &[u8; 20]) -> Vec<u8> {
    let passwd = password_utf16be(password);
    let mut out = Vec::with_capacity(plain.len() + 40);
    out.extend_from_slice(salt);
    let mut block = salt.to_vec();
    let mut i = 0;
    while i < plain.len() {
        let mut hasher = Sha1::new();
        hasher.update(&passwd);
        hasher.update(&block);
        block = hasher.finalize().to_vec();
        for &keystream_byte in &block {
            if i == plain.len() {
                break;
            }
            out.push(plain[i] ^ keystream_byte);
            i += 1;
        }
    }
    let mut hasher = Sha1::new();
    hasher.update(&passwd);
    hasher.update(plain);
    out.extend_from_slice(&hasher.finalize());
    out
}

// ── JCEKS key protection (OID 1.3.6.1.4.1.42.2.19.1) ────────────────
//
// PBEWithMD5AndTripleDES: the 8-byte salt is split in halves (the first
// half reversed when both halves are equal), each half is chained through
// MD5 with the password for the iteration count, and the 32 derived bytes
// become a 24-byte DES-EDE3 key plus an 8-byte CBC IV.

pub fn jceks_derive(
    password: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<([u8; 24], [u8; 8]), SigningError> {
    if salt.len() != 8 {
        return Err(SigningError::Keystore(format!(
            "JCEKS PBE salt must be 8 bytes, got {}",
            salt.len()
        )));
    }
    if iterations == 0 {
        return Err(SigningError::Keystore(
            "JCEKS PBE iteration count must be positive".to_owned(),
        ));
    }
    let passwd = password_low_bytes(password);

    let mut first: [u8; 4] = [salt[0], salt[1], salt[2], salt[3]];
    let second: [u8; 4] = [salt[4], salt[5], salt[6], salt[7]];
    if first == second {
        first.reverse();
    }

    let mut derived = Vec::with_capacity(32);
    for half in [first, second] {
        let mut state = half.to_vec();
        for _ in 0..iterations {
            let mut hasher = Md5::new();
            hasher.update(&state);
            hasher.update(&passwd);
            state = hasher.finalize().to_vec();
        }
        derived.extend_from_slice(&state);
    }

    let mut key = [0u8; 24];
    key.copy_from_slice(&derived[..24]);
    let mut iv = [0u8; 8];
    iv.copy_from_slice(&derived[24..32]);
    Ok((key, iv))
}

pub fn jceks_unprotect(
    ciphertext: &[u8],
    salt: &[u8],
    iterations: u32,
    password: &str,
) -> Result<Vec<u8>, SigningError> {
    let (key, iv) = jceks_derive(password, salt, iterations)?;
    let decryptor = Des3CbcDec::new_from_slices(&key, &iv)
        .map_err(|e| SigningError::Crypto(format!("DES-EDE3 setup failed: {e}")))?;
    let mut buf = ciphertext.to_vec();
    let plain = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buf)
        .map_err(|_| {
            SigningError::BadPassword("key password rejected for JCEKS entry".to_owned())
        })?;
    Ok(plain.to_vec())
}

/// The inverse of [`jceks_unprotect`], for building test fixtures.
#[cfg(test)]
pub fn jceks_protect(plain: &[u8], salt: &[u8], iterations: u32, password: &str) -> Vec<u8> {
    use cipher::BlockEncryptMut;
    type Des3CbcEnc = cbc::Encryptor<des::TdesEde3>;

    let (key, iv) = jceks_derive(password, salt, iterations).unwrap();
    let encryptor = Des3CbcEnc::new_from_slices(&key, &iv).unwrap();
    encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jks_protection_round_trips() {
        let plain = b"not really a pkcs8 blob but long enough to span blocks....";
        let protected = jks_protect(plain, "changeit", &[7u8; 20]);
        let recovered = jks_unprotect(&protected, "changeit").unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn jks_wrong_password_is_detected() {
        let protected = jks_protect(b"secret key material", "changeit", &[1u8; 20]);
        let err = jks_unprotect(&protected, "wrong").unwrap_err();
        assert!(matches!(err, SigningError::BadPassword(_)));
    }

    #[test]
    fn jceks_derivation_is_deterministic() {
        let salt = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let (k1, iv1) = jceks_derive("storepass", &salt, 1024).unwrap();
        let (k2, iv2) = jceks_derive("storepass", &salt, 1024).unwrap();
        assert_eq!(k1, k2);
        assert_eq!(iv1, iv2);
        let (k3, _) = jceks_derive("otherpass", &salt, 1024).unwrap();
        assert_ne!(k1, k3);
    }

    #[test]
    fn jceks_equal_salt_halves_change_derivation() {
        // both halves equal triggers the first-half reversal
        let equal = [9u8, 8, 7, 6, 9, 8, 7, 6];
        let plain_halves = [6u8, 7, 8, 9, 9, 8, 7, 6];
        let (k1, _) = jceks_derive("p", &equal, 16).unwrap();
        let (k2, _) = jceks_derive("p", &plain_halves, 16).unwrap();
        assert_eq!(k1, k2);
    }

    #[test]
    fn jceks_protection_round_trips() {
        let salt = [0xA0u8, 1, 2, 3, 4, 5, 6, 7];
        let plain = b"private key bytes";
        let ciphertext = jceks_protect(plain, &salt, 200, "kpass");
        let recovered = jceks_unprotect(&ciphertext, &salt, 200, "kpass").unwrap();
        assert_eq!(recovered, plain);
    }

    #[test]
    fn jceks_rejects_bad_salt_length() {
        assert!(jceks_derive("p", &[1, 2, 3], 10).is_err());
    }
}
