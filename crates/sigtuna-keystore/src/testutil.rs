#![forbid(unsafe_code)]

//! Fixture builders: synthetic JKS/JCEKS stores assembled in memory.

use sha1::{Digest, Sha1};

use crate::jks::{OID_JCEKS_PROTECTION, OID_JKS_PROTECTION};
use crate::pbe;

const JCEKS_SALT: [u8; 8] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
const JCEKS_ITERATIONS: u32 = 1024;

fn write_utf(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// EncryptedPrivateKeyInfo with the JKS XOR protection.
pub fn protect_jks(pkcs8: &[u8], password: &str) -> Vec<u8> {
    let protected = pbe::jks_protect(pkcs8, password, &[0x5Au8; 20]);
    yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            writer.next().write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        OID_JKS_PROTECTION,
                    ));
                writer.next().write_null();
            });
            writer.next().write_bytes(&protected);
        })
    })
}

/// EncryptedPrivateKeyInfo with the JCEKS PBE protection.
pub fn protect_jceks(pkcs8: &[u8], password: &str) -> Vec<u8> {
    let ciphertext = pbe::jceks_protect(pkcs8, &JCEKS_SALT, JCEKS_ITERATIONS, password);
    yasna::construct_der(|writer| {
        writer.write_sequence(|writer| {
            writer.next().write_sequence(|writer| {
                writer
                    .next()
                    .write_oid(&yasna::models::ObjectIdentifier::from_slice(
                        OID_JCEKS_PROTECTION,
                    ));
                writer.next().write_sequence(|writer| {
                    writer.next().write_bytes(&JCEKS_SALT);
                    writer.next().write_u32(JCEKS_ITERATIONS);
                });
            });
            writer.next().write_bytes(&ciphertext);
        })
    })
}

/// A serialized tag-1 entry.
pub fn private_key_entry(alias: &str, epki: &[u8], chain: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&1u32.to_be_bytes());
    write_utf(&mut out, alias);
    out.extend_from_slice(&0u64.to_be_bytes());
    out.extend_from_slice(&(epki.len() as u32).to_be_bytes());
    out.extend_from_slice(epki);
    out.extend_from_slice(&(chain.len() as u32).to_be_bytes());
    for cert in chain {
        write_utf(&mut out, "X.509");
        out.extend_from_slice(&(cert.len() as u32).to_be_bytes());
        out.extend_from_slice(cert);
    }
    out
}

/// A serialized tag-2 entry.
pub fn trusted_cert_entry(alias: &str, der: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&2u32.to_be_bytes());
    write_utf(&mut out, alias);
    out.extend_from_slice(&0u64.to_be_bytes());
    write_utf(&mut out, "X.509");
    out.extend_from_slice(&(der.len() as u32).to_be_bytes());
    out.extend_from_slice(der);
    out
}

fn seal(mut body: Vec<u8>, password: &str) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(pbe::password_utf16be(password));
    hasher.update(b"Mighty Aphrodite");
    hasher.update(&body);
    body.extend_from_slice(&hasher.finalize());
    body
}

/// A complete store with the given serialized entries and integrity hash.
pub fn build_store(magic: u32, password: &str, entries: &[Vec<u8>]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&magic.to_be_bytes());
    body.extend_from_slice(&2u32.to_be_bytes());
    body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for entry in entries {
        body.extend_from_slice(entry);
    }
    seal(body, password)
}

/// A store whose single entry starts with an arbitrary tag.
pub fn build_store_raw_entry(magic: u32, password: &str, tag: u32, alias: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&magic.to_be_bytes());
    body.extend_from_slice(&2u32.to_be_bytes());
    body.extend_from_slice(&1u32.to_be_bytes());
    body.extend_from_slice(&tag.to_be_bytes());
    write_utf(&mut body, alias);
    seal(body, password)
}

/// Recompute the trailing integrity hash after tampering with the body.
pub fn reseal(data: &[u8], password: &str) -> Vec<u8> {
    let body = data[..data.len() - 20].to_vec();
    seal(body, password)
}
