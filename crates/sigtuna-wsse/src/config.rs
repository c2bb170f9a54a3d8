#![forbid(unsafe_code)]

//! Signing configuration with eager option validation.
//!
//! String-valued options are checked in the setter, not at signing time: a
//! bad value is rejected immediately with a [`ConfigurationError`] listing
//! the accepted spellings, and the builder keeps its previous state.

use std::path::PathBuf;

use sigtuna_c14n::C14nMode;
use sigtuna_core::ConfigurationError;
use sigtuna_crypto::DigestAlgorithm;
use sigtuna_keystore::KeystoreType;

pub const VALID_KEY_STORE_TYPES: &str = "JKS, JCEKS, PKCS11";
pub const VALID_KEY_IDENTIFIER_TYPES: &str = "BST_DIRECT_REFERENCE, ISSUER_SERIAL, X509_KEY_IDENTIFIER, SKI_KEY_IDENTIFIER, EMBEDDED_KEYNAME, EMBED_SECURITY_TOKEN_REF";
pub const VALID_CANONICALIZATION_METHODS: &str =
    "INCLUSIVE, INCLUSIVE_WITH_COMMENTS, EXCLUSIVE, EXCLUSIVE_WITH_COMMENTS";
pub const VALID_DIGEST_METHODS: &str = "SHA1, SHA256, SHA512, RIPEMD160";

fn validate_option(
    option: &'static str,
    value: &str,
    valid: &'static str,
) -> Result<String, ConfigurationError> {
    let upper = value.trim().to_ascii_uppercase();
    if valid.split(", ").any(|candidate| candidate == upper) {
        Ok(upper)
    } else {
        Err(ConfigurationError {
            option,
            value: upper,
            valid,
        })
    }
}

/// How the signature's KeyInfo identifies the signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIdentifierType {
    BstDirectReference,
    IssuerSerial,
    X509KeyIdentifier,
    SkiKeyIdentifier,
    EmbeddedKeyName,
    EmbedSecurityTokenRef,
}

impl KeyIdentifierType {
    pub fn from_option(value: &str) -> Result<Self, ConfigurationError> {
        let normalized = validate_option("key identifier type", value, VALID_KEY_IDENTIFIER_TYPES)?;
        Ok(match normalized.as_str() {
            "BST_DIRECT_REFERENCE" => KeyIdentifierType::BstDirectReference,
            "ISSUER_SERIAL" => KeyIdentifierType::IssuerSerial,
            "X509_KEY_IDENTIFIER" => KeyIdentifierType::X509KeyIdentifier,
            "SKI_KEY_IDENTIFIER" => KeyIdentifierType::SkiKeyIdentifier,
            "EMBEDDED_KEYNAME" => KeyIdentifierType::EmbeddedKeyName,
            _ => KeyIdentifierType::EmbedSecurityTokenRef,
        })
    }
}

fn keystore_type_from_option(value: &str) -> Result<KeystoreType, ConfigurationError> {
    let normalized = validate_option("keystore type", value, VALID_KEY_STORE_TYPES)?;
    Ok(match normalized.as_str() {
        "JKS" => KeystoreType::Jks,
        "JCEKS" => KeystoreType::Jceks,
        _ => KeystoreType::Pkcs11,
    })
}

fn canonicalization_from_option(value: &str) -> Result<C14nMode, ConfigurationError> {
    let normalized =
        validate_option("canonicalization method", value, VALID_CANONICALIZATION_METHODS)?;
    Ok(match normalized.as_str() {
        "INCLUSIVE" => C14nMode::Inclusive,
        "INCLUSIVE_WITH_COMMENTS" => C14nMode::InclusiveWithComments,
        "EXCLUSIVE" => C14nMode::Exclusive,
        _ => C14nMode::ExclusiveWithComments,
    })
}

fn digest_from_option(value: &str) -> Result<DigestAlgorithm, ConfigurationError> {
    let normalized = validate_option("digest method", value, VALID_DIGEST_METHODS)?;
    Ok(match normalized.as_str() {
        "SHA1" => DigestAlgorithm::Sha1,
        "SHA256" => DigestAlgorithm::Sha256,
        "SHA512" => DigestAlgorithm::Sha512,
        _ => DigestAlgorithm::Ripemd160,
    })
}

/// Frozen configuration consumed by the securing pipeline.
#[derive(Debug, Clone)]
pub struct SigningConfiguration {
    pub keystore_path: Option<PathBuf>,
    pub keystore_type: KeystoreType,
    pub keystore_password: Option<String>,
    pub key_alias: Option<String>,
    pub key_password: Option<String>,
    pub key_identifier_type: KeyIdentifierType,
    pub canonicalization: C14nMode,
    pub digest: DigestAlgorithm,
    pub single_certificate: bool,
    pub timestamp_ttl: u32,
    pub timestamp_millis: bool,
    pub token_username: Option<String>,
    pub token_password: Option<String>,
    pub token_nonce: bool,
    pub token_created: bool,
    pub apply_timestamp: bool,
    pub apply_username_token: bool,
    pub apply_signature: bool,
}

/// Builder with eagerly validated setters.
#[derive(Debug, Clone)]
pub struct SigningConfigBuilder {
    cfg: SigningConfiguration,
}

impl Default for SigningConfigBuilder {
    fn default() -> Self {
        Self {
            cfg: SigningConfiguration {
                keystore_path: None,
                keystore_type: KeystoreType::Jks,
                keystore_password: None,
                key_alias: None,
                key_password: None,
                key_identifier_type: KeyIdentifierType::IssuerSerial,
                canonicalization: C14nMode::Exclusive,
                digest: DigestAlgorithm::Sha1,
                single_certificate: true,
                timestamp_ttl: 300,
                timestamp_millis: false,
                token_username: None,
                token_password: None,
                token_nonce: false,
                token_created: false,
                apply_timestamp: false,
                apply_username_token: false,
                apply_signature: false,
            },
        }
    }
}

impl SigningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keystore(
        &mut self,
        path: impl Into<PathBuf>,
        keystore_type: &str,
        password: &str,
    ) -> Result<&mut Self, ConfigurationError> {
        let kind = keystore_type_from_option(keystore_type)?;
        self.cfg.keystore_path = Some(path.into());
        self.cfg.keystore_type = kind;
        self.cfg.keystore_password = Some(password.to_owned());
        Ok(self)
    }

    pub fn key_alias(&mut self, alias: &str) -> &mut Self {
        self.cfg.key_alias = Some(alias.to_owned());
        self
    }

    pub fn key_password(&mut self, password: &str) -> &mut Self {
        self.cfg.key_password = Some(password.to_owned());
        self
    }

    pub fn key_identifier_type(&mut self, value: &str) -> Result<&mut Self, ConfigurationError> {
        self.cfg.key_identifier_type = KeyIdentifierType::from_option(value)?;
        Ok(self)
    }

    pub fn canonicalization_method(&mut self, value: &str) -> Result<&mut Self, ConfigurationError> {
        self.cfg.canonicalization = canonicalization_from_option(value)?;
        Ok(self)
    }

    pub fn digest_method(&mut self, value: &str) -> Result<&mut Self, ConfigurationError> {
        self.cfg.digest = digest_from_option(value)?;
        Ok(self)
    }

    pub fn single_certificate(&mut self, single: bool) -> &mut Self {
        self.cfg.single_certificate = single;
        self
    }

    pub fn timestamp_ttl(&mut self, seconds: u32) -> &mut Self {
        self.cfg.timestamp_ttl = seconds;
        self
    }

    pub fn timestamp_millis(&mut self, millis: bool) -> &mut Self {
        self.cfg.timestamp_millis = millis;
        self
    }

    pub fn token_credentials(&mut self, username: &str, password: &str) -> &mut Self {
        self.cfg.token_username = Some(username.to_owned());
        self.cfg.token_password = Some(password.to_owned());
        self
    }

    pub fn token_nonce(&mut self, add: bool) -> &mut Self {
        self.cfg.token_nonce = add;
        self
    }

    pub fn token_created(&mut self, add: bool) -> &mut Self {
        self.cfg.token_created = add;
        self
    }

    pub fn enable_timestamp(&mut self, on: bool) -> &mut Self {
        self.cfg.apply_timestamp = on;
        self
    }

    pub fn enable_username_token(&mut self, on: bool) -> &mut Self {
        self.cfg.apply_username_token = on;
        self
    }

    pub fn enable_signature(&mut self, on: bool) -> &mut Self {
        self.cfg.apply_signature = on;
        self
    }

    pub fn build(&self) -> SigningConfiguration {
        self.cfg.clone()
    }
}
