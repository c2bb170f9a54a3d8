#![forbid(unsafe_code)]

//! Pipeline orchestration.

use sigtuna_core::{SecureError, SigningError};
use sigtuna_xml::SoapDocument;
use tracing::{debug, trace};

use crate::config::SigningConfiguration;
use crate::{header, signature, timestamp, token};

/// Secure an outbound SOAP message according to the configuration.
///
/// With no feature enabled the input is returned untouched, without even
/// parsing it. Otherwise the envelope is validated, a Security header is
/// ensured, and the enabled builders run in a fixed order: timestamp,
/// username token, signature.
pub fn secure_message(xml: &str, cfg: &SigningConfiguration) -> Result<String, SecureError> {
    if !cfg.apply_timestamp && !cfg.apply_username_token && !cfg.apply_signature {
        trace!("no security features enabled, passing message through");
        return Ok(xml.to_owned());
    }

    let mut doc = SoapDocument::parse(xml.to_owned())?;
    doc = header::ensure_security_header(doc)?;

    if cfg.apply_timestamp {
        doc = timestamp::apply(doc, cfg)?;
    }
    if cfg.apply_username_token {
        doc = token::apply(doc, cfg)?;
    }
    if cfg.apply_signature {
        let material = resolve_material(cfg)?;
        doc = signature::apply(doc, cfg, &material)?;
        debug!(alias = %material.alias, "message signed");
    }
    Ok(doc.into_text())
}

/// Key material is re-resolved from the keystore file on every call.
fn resolve_material(
    cfg: &SigningConfiguration,
) -> Result<sigtuna_keystore::KeyMaterial, SigningError> {
    let path = cfg.keystore_path.as_deref().ok_or_else(|| {
        SigningError::MissingConfig("signature requested but no keystore configured".to_owned())
    })?;
    let alias = cfg.key_alias.as_deref().ok_or_else(|| {
        SigningError::MissingConfig("signature requested but no key alias configured".to_owned())
    })?;
    let store_password = cfg.keystore_password.as_deref().unwrap_or("");
    sigtuna_keystore::resolve(
        path,
        cfg.keystore_type,
        store_password,
        alias,
        cfg.key_password.as_deref(),
    )
}
