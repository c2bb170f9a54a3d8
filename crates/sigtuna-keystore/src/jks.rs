#![forbid(unsafe_code)]

//! JKS/JCEKS container parsing.
//!
//! Both formats share a big-endian binary layout: magic, version, entry
//! count, entries (tag 1 private key, tag 2 trusted certificate), then a
//! trailing SHA-1 over the store password (UTF-16BE), the ASCII string
//! `Mighty Aphrodite` and the file body.

use sha1::{Digest, Sha1};
use sigtuna_core::SigningError;
use yasna::{ASN1Error, ASN1ErrorKind};

use crate::pbe;

pub const MAGIC_JKS: u32 = 0xFEED_FEED;
pub const MAGIC_JCEKS: u32 = 0xCECE_CECE;

const INTEGRITY_SALT: &[u8] = b"Mighty Aphrodite";

/// Sun JKS key protection
pub(crate) const OID_JKS_PROTECTION: &[u64] = &[1, 3, 6, 1, 4, 1, 42, 2, 17, 1, 1];
/// Sun JCE PBEWithMD5AndTripleDES
pub(crate) const OID_JCEKS_PROTECTION: &[u64] = &[1, 3, 6, 1, 4, 1, 42, 2, 19, 1];

#[derive(Debug)]
pub struct Keystore {
    pub entries: Vec<Entry>,
}

#[derive(Debug)]
pub struct Entry {
    pub alias: String,
    pub kind: EntryKind,
}

#[derive(Debug)]
pub enum EntryKind {
    PrivateKey {
        /// EncryptedPrivateKeyInfo DER.
        protected_key: Vec<u8>,
        /// Certificate chain DER, leaf first.
        chain: Vec<Vec<u8>>,
    },
    TrustedCert {
        der: Vec<u8>,
    },
}

impl Keystore {
    /// Case-insensitive alias lookup; Java lower-cases aliases on storage.
    pub fn find(&self, alias: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.alias.eq_ignore_ascii_case(alias))
    }
}

/// Parse a JKS or JCEKS container and verify its integrity hash against
/// the store password.
pub fn parse_keystore(data: &[u8], store_password: &str) -> Result<Keystore, SigningError> {
    if data.len() < 32 {
        return Err(SigningError::Keystore(
            "keystore file is truncated".to_owned(),
        ));
    }

    // magic first, so a file that is no container at all is reported as
    // a structure error rather than a password failure
    let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    if magic != MAGIC_JKS && magic != MAGIC_JCEKS {
        return Err(SigningError::Keystore(
            "not a JKS or JCEKS keystore (bad magic)".to_owned(),
        ));
    }

    let body_len = data.len() - 20;
    let mut hasher = Sha1::new();
    hasher.update(pbe::password_utf16be(store_password));
    hasher.update(INTEGRITY_SALT);
    hasher.update(&data[..body_len]);
    if hasher.finalize().as_slice() != &data[body_len..] {
        return Err(SigningError::BadPassword(
            "keystore integrity check failed (wrong store password or corrupted file)".to_owned(),
        ));
    }

    let mut r = Reader::new(&data[..body_len]);
    let _magic = r.read_u32()?;
    let version = r.read_u32()?;
    if version != 2 {
        return Err(SigningError::Keystore(format!(
            "unsupported keystore version {version}"
        )));
    }

    let count = r.read_u32()?;
    let mut entries = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = r.read_u32()?;
        match tag {
            1 => {
                let alias = r.read_utf()?;
                let _timestamp = r.read_u64()?;
                let key_len = r.read_u32()? as usize;
                let protected_key = r.take(key_len)?.to_vec();
                let chain_len = r.read_u32()?;
                let mut chain = Vec::with_capacity(chain_len as usize);
                for _ in 0..chain_len {
                    let cert_type = r.read_utf()?;
                    if cert_type != "X.509" {
                        return Err(SigningError::Keystore(format!(
                            "unsupported certificate type {cert_type}"
                        )));
                    }
                    let cert_len = r.read_u32()? as usize;
                    chain.push(r.take(cert_len)?.to_vec());
                }
                entries.push(Entry {
                    alias,
                    kind: EntryKind::PrivateKey {
                        protected_key,
                        chain,
                    },
                });
            }
            2 => {
                let alias = r.read_utf()?;
                let _timestamp = r.read_u64()?;
                let cert_type = r.read_utf()?;
                if cert_type != "X.509" {
                    return Err(SigningError::Keystore(format!(
                        "unsupported certificate type {cert_type}"
                    )));
                }
                let cert_len = r.read_u32()? as usize;
                let der = r.take(cert_len)?.to_vec();
                entries.push(Entry {
                    alias,
                    kind: EntryKind::TrustedCert { der },
                });
            }
            3 => {
                return Err(SigningError::Keystore(
                    "JCEKS secret-key entries are not supported".to_owned(),
                ));
            }
            other => {
                return Err(SigningError::Keystore(format!(
                    "unknown keystore entry tag {other}"
                )));
            }
        }
    }
    Ok(Keystore { entries })
}

enum Protection {
    Jks,
    Jceks { salt: Vec<u8>, iterations: u32 },
}

/// Decrypt a private-key entry's EncryptedPrivateKeyInfo into PKCS#8 DER,
/// dispatching on the Sun protection OID.
pub fn decrypt_private_key(epki: &[u8], password: &str) -> Result<Vec<u8>, SigningError> {
    let jks_oid = yasna::models::ObjectIdentifier::from_slice(OID_JKS_PROTECTION);
    let jceks_oid = yasna::models::ObjectIdentifier::from_slice(OID_JCEKS_PROTECTION);

    let (protection, ciphertext) = yasna::parse_ber(epki, |reader| {
        reader.read_sequence(|reader| {
            let protection = reader.next().read_sequence(|reader| {
                let oid = reader.next().read_oid()?;
                if oid == jks_oid {
                    let _ = reader.read_optional(|r| r.read_null());
                    Ok(Protection::Jks)
                } else if oid == jceks_oid {
                    reader.next().read_sequence(|reader| {
                        let salt = reader.next().read_bytes()?;
                        let iterations = reader.next().read_u32()?;
                        Ok(Protection::Jceks { salt, iterations })
                    })
                } else {
                    Err(ASN1Error::new(ASN1ErrorKind::Invalid))
                }
            })?;
            let ciphertext = reader.next().read_bytes()?;
            Ok((protection, ciphertext))
        })
    })
    .map_err(|e| SigningError::Keystore(format!("malformed encrypted private key: {e}")))?;

    match protection {
        Protection::Jks => pbe::jks_unprotect(&ciphertext, password),
        Protection::Jceks { salt, iterations } => {
            pbe::jceks_unprotect(&ciphertext, &salt, iterations, password)
        }
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SigningError> {
        if self.pos + n > self.buf.len() {
            return Err(SigningError::Keystore(
                "keystore file is truncated".to_owned(),
            ));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16, SigningError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, SigningError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, SigningError> {
        let b = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(b);
        Ok(u64::from_be_bytes(out))
    }

    /// Java `writeUTF` string: u16 byte length followed by (modified)
    /// UTF-8 bytes. Aliases are plain ASCII in practice, so standard UTF-8
    /// decoding is applied.
    fn read_utf(&mut self) -> Result<String, SigningError> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| SigningError::Keystore("non-UTF-8 alias in keystore".to_owned()))
    }
}
