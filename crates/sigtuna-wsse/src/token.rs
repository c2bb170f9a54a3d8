#![forbid(unsafe_code)]

//! Username token builder.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use rand::RngCore;
use sigtuna_core::{ns, SigningError};
use sigtuna_xml::{SoapDocument, XmlWriter};
use tracing::debug;
use uuid::Uuid;

use crate::config::SigningConfiguration;
use crate::header;
use crate::timestamp::format_instant;

const NONCE_LEN: usize = 16;

/// Append a `wsse:UsernameToken` to the Security header. The password is
/// always sent as PasswordText with an explicit Type attribute; the nonce
/// is 16 fresh random bytes per invocation.
pub(crate) fn apply(
    doc: SoapDocument,
    cfg: &SigningConfiguration,
) -> Result<SoapDocument, SigningError> {
    let username = cfg.token_username.clone().ok_or_else(|| {
        SigningError::MissingConfig("username token requested but no username configured".to_owned())
    })?;
    let password = cfg.token_password.clone().unwrap_or_default();
    let id = format!("UsernameToken-{}", Uuid::new_v4());
    debug!(nonce = cfg.token_nonce, created = cfg.token_created, "adding username token");
    header::append_to_security(doc, |indent| {
        let mut writer = XmlWriter::new(indent);
        writer.start_element("wsse:UsernameToken", &[("wsu:Id", &id)]);
        writer.text_element("wsse:Username", &[], &username);
        writer.text_element("wsse:Password", &[("Type", ns::PASSWORD_TEXT)], &password);
        if cfg.token_nonce {
            let mut nonce = [0u8; NONCE_LEN];
            rand::thread_rng().fill_bytes(&mut nonce);
            writer.text_element(
                "wsse:Nonce",
                &[("EncodingType", ns::BASE64_BINARY)],
                &BASE64.encode(nonce),
            );
        }
        if cfg.token_created {
            writer.text_element("wsu:Created", &[], &format_instant(Utc::now(), cfg.timestamp_millis));
        }
        writer.end_element("wsse:UsernameToken");
        Ok(writer.into_string())
    })
}
