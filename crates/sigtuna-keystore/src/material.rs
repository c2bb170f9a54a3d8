#![forbid(unsafe_code)]

//! Key material resolution: keystore file → private key + certificate chain.

use std::path::Path;

use pkcs8::DecodePrivateKey;
use sigtuna_core::SigningError;
use sigtuna_crypto::PrivateKey;

use crate::jks::{self, EntryKind};

/// Keystore container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeystoreType {
    Jks,
    Jceks,
    Pkcs11,
}

/// A resolved signing key with its certificate chain, leaf first.
#[derive(Debug)]
pub struct KeyMaterial {
    pub key: PrivateKey,
    pub chain: Vec<Vec<u8>>,
    pub alias: String,
}

/// Load and decrypt the signing key for `alias`.
///
/// Re-reads the store on every call; no caching is performed, so the
/// result always reflects the file on disk.
pub fn resolve(
    path: &Path,
    kind: KeystoreType,
    store_password: &str,
    alias: &str,
    key_password: Option<&str>,
) -> Result<KeyMaterial, SigningError> {
    if kind == KeystoreType::Pkcs11 {
        return Err(SigningError::Keystore(
            "PKCS11 keystores are backed by a hardware token and cannot be loaded from a file"
                .to_owned(),
        ));
    }
    let data = std::fs::read(path).map_err(|source| SigningError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let store = jks::parse_keystore(&data, store_password)?;
    let entry = store
        .find(alias)
        .ok_or_else(|| SigningError::AliasNotFound(alias.to_owned()))?;
    let EntryKind::PrivateKey {
        protected_key,
        chain,
    } = &entry.kind
    else {
        return Err(SigningError::Keystore(format!(
            "keystore entry {alias} is not a private key"
        )));
    };
    // the key password defaults to the store password
    let key_pass = key_password.unwrap_or(store_password);
    let pkcs8_der = jks::decrypt_private_key(protected_key, key_pass)?;
    let key = parse_pkcs8(&pkcs8_der)?;
    Ok(KeyMaterial {
        key,
        chain: chain.clone(),
        alias: entry.alias.clone(),
    })
}

fn parse_pkcs8(der: &[u8]) -> Result<PrivateKey, SigningError> {
    if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(PrivateKey::Rsa(key));
    }
    if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(PrivateKey::EcP256(key));
    }
    if let Ok(key) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
        return Ok(PrivateKey::EcP384(key));
    }
    Err(SigningError::Keystore(
        "unsupported private key algorithm (expected RSA or EC P-256/P-384)".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{jks::MAGIC_JKS, testutil};
    use pkcs8::EncodePrivateKey;

    fn rsa_pkcs8() -> Vec<u8> {
        let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        key.to_pkcs8_der().unwrap().as_bytes().to_vec()
    }

    fn temp_store(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("sigtuna-{}-{}", std::process::id(), name));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn resolves_rsa_key_with_separate_key_password() {
        let pkcs8 = rsa_pkcs8();
        let store = testutil::build_store(
            MAGIC_JKS,
            "storepass",
            &[testutil::private_key_entry(
                "signer",
                &testutil::protect_jks(&pkcs8, "keypass"),
                &[b"leaf".to_vec()],
            )],
        );
        let path = temp_store("resolve.jks", &store);
        let material = resolve(&path, KeystoreType::Jks, "storepass", "signer", Some("keypass"))
            .unwrap();
        assert_eq!(material.alias, "signer");
        assert_eq!(material.chain, vec![b"leaf".to_vec()]);
        assert!(matches!(material.key, PrivateKey::Rsa(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn key_password_falls_back_to_store_password() {
        let pkcs8 = rsa_pkcs8();
        let store = testutil::build_store(
            MAGIC_JKS,
            "sharedpass",
            &[testutil::private_key_entry(
                "signer",
                &testutil::protect_jks(&pkcs8, "sharedpass"),
                &[],
            )],
        );
        let path = temp_store("fallback.jks", &store);
        let material = resolve(&path, KeystoreType::Jks, "sharedpass", "signer", None).unwrap();
        assert!(matches!(material.key, PrivateKey::Rsa(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_alias_is_distinguished() {
        let store = testutil::build_store(MAGIC_JKS, "pw", &[]);
        let path = temp_store("noalias.jks", &store);
        let err = resolve(&path, KeystoreType::Jks, "pw", "ghost", None).unwrap_err();
        assert!(matches!(err, SigningError::AliasNotFound(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_reports_path() {
        let err = resolve(
            Path::new("/no/such/store.jks"),
            KeystoreType::Jks,
            "pw",
            "a",
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/no/such/store.jks"));
    }

    #[test]
    fn pkcs11_is_refused() {
        let err = resolve(Path::new("ignored"), KeystoreType::Pkcs11, "pw", "a", None).unwrap_err();
        assert!(err.to_string().contains("hardware token"));
    }
}
