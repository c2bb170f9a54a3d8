#![forbid(unsafe_code)]

//! Signature builder.
//!
//! The signature is produced in two passes over the serialized document:
//! first the Body is canonicalized and digested and a complete
//! `ds:Signature` with an empty SignatureValue is spliced into the Security
//! header, then the re-parsed SignedInfo is canonicalized, signed, and the
//! placeholder is filled in.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sigtuna_c14n::canonicalize_subtree;
use sigtuna_core::{ns, SigningError};
use sigtuna_crypto::sign::{sign_digest, signature_method};
use sigtuna_keystore::{x509, KeyMaterial};
use sigtuna_xml::{document, parse_doc, splice, SoapDocument, XmlWriter};
use tracing::debug;
use uuid::Uuid;

use crate::config::{KeyIdentifierType, SigningConfiguration};
use crate::header;

const SIGNATURE_VALUE_PLACEHOLDER: &str = "<ds:SignatureValue></ds:SignatureValue>";

pub(crate) fn apply(
    doc: SoapDocument,
    cfg: &SigningConfiguration,
    material: &KeyMaterial,
) -> Result<SoapDocument, SigningError> {
    let (doc, body_id) = ensure_body_id(doc)?;
    let text = doc.into_text();

    let body_digest = {
        let parsed = parse_doc(&text).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let body = document::body(&parsed).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let canonical = canonicalize_subtree(body, cfg.canonicalization)?;
        cfg.digest.compute(&canonical)
    };
    let sig_uri = signature_method(&material.key, cfg.digest)?;
    let sig_id = format!("SIG-{}", Uuid::new_v4());
    debug!(
        method = sig_uri,
        reference = %body_id,
        "signing message body"
    );

    let with_template = {
        let parsed = parse_doc(&text).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let security = header::find_security(&parsed)
            .ok_or_else(|| SigningError::XmlStructure("Security header not found".to_owned()))?;
        let indent = splice::line_indent(&text, security.range().start);
        let child_indent = format!("{indent}  ");
        let rendered = render_signature(
            cfg,
            material,
            &sig_id,
            &body_id,
            &BASE64.encode(&body_digest),
            sig_uri,
            &child_indent,
        )?;
        let mut out = splice::insert_last_child(&text, security, &rendered.signature)?;
        if let Some(token) = rendered.binary_token {
            let parsed = parse_doc(&out).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
            let security = header::find_security(&parsed).ok_or_else(|| {
                SigningError::XmlStructure("Security header not found".to_owned())
            })?;
            out = splice::insert_first_child(&out, security, &token)?;
        }
        out
    };

    // SignedInfo and the placeholder are both located through the spliced
    // signature's own Id; a pre-existing Signature in the inbound message
    // must not be touched
    let (signature_value, placeholder_at) = {
        let parsed =
            parse_doc(&with_template).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let signature = find_signature(&parsed, &sig_id)?;
        let signed_info = document::find_child(signature, ns::DSIG, ns::node::SIGNED_INFO)
            .ok_or_else(|| SigningError::XmlStructure("SignedInfo not found".to_owned()))?;
        let canonical = canonicalize_subtree(signed_info, cfg.canonicalization)?;
        let digest = cfg.digest.compute(&canonical);
        let range = signature.range();
        let placeholder_at = with_template[range.clone()]
            .find(SIGNATURE_VALUE_PLACEHOLDER)
            .map(|rel| range.start + rel)
            .ok_or_else(|| {
                SigningError::XmlStructure("SignatureValue placeholder not found".to_owned())
            })?;
        (sign_digest(&material.key, cfg.digest, &digest)?, placeholder_at)
    };

    let filled = format!(
        "<ds:SignatureValue>{}</ds:SignatureValue>",
        BASE64.encode(&signature_value)
    );
    let mut final_text = with_template;
    final_text.replace_range(
        placeholder_at..placeholder_at + SIGNATURE_VALUE_PLACEHOLDER.len(),
        &filled,
    );
    SoapDocument::parse(final_text).map_err(|e| SigningError::XmlStructure(e.to_string()))
}

/// The `ds:Signature` spliced by this invocation, found by its Id.
fn find_signature<'a>(
    doc: &'a roxmltree::Document<'a>,
    sig_id: &str,
) -> Result<roxmltree::Node<'a, 'a>, SigningError> {
    doc.descendants()
        .find(|n| {
            n.is_element()
                && n.tag_name().name() == ns::node::SIGNATURE
                && n.tag_name().namespace() == Some(ns::DSIG)
                && n.attribute(ns::attr::ID) == Some(sig_id)
        })
        .ok_or_else(|| SigningError::XmlStructure("spliced Signature not found".to_owned()))
}

/// Reuse the Body's `wsu:Id` or attach a fresh one, declaring the wsu
/// prefix on the Body when it is not already bound.
fn ensure_body_id(doc: SoapDocument) -> Result<(SoapDocument, String), SigningError> {
    let text = doc.into_text();
    let (updated, id) = {
        let parsed = parse_doc(&text).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        let body = document::body(&parsed).map_err(|e| SigningError::XmlStructure(e.to_string()))?;
        if let Some(existing) = body.attribute((ns::WSU, ns::attr::ID)) {
            (None, existing.to_owned())
        } else {
            let id = format!("id-{}", Uuid::new_v4());
            let attrs = match wsu_binding(body) {
                None => format!(" xmlns:wsu=\"{}\" wsu:Id=\"{id}\"", ns::WSU),
                Some(uri) if uri == ns::WSU => format!(" wsu:Id=\"{id}\""),
                Some(other) => {
                    return Err(SigningError::XmlStructure(format!(
                        "prefix wsu is already bound to {other}"
                    )));
                }
            };
            (Some(splice::add_attributes(&text, body, &attrs)?), id)
        }
    };
    let doc = match updated {
        Some(new_text) => SoapDocument::parse(new_text)
            .map_err(|e| SigningError::XmlStructure(e.to_string()))?,
        None => SoapDocument::parse(text).map_err(|e| SigningError::XmlStructure(e.to_string()))?,
    };
    Ok((doc, id))
}

fn wsu_binding(node: roxmltree::Node<'_, '_>) -> Option<String> {
    for element in node.ancestors().filter(|n| n.is_element()) {
        for decl in element.namespaces() {
            if decl.name() == Some("wsu") {
                return Some(decl.uri().to_owned());
            }
        }
    }
    None
}

struct RenderedSignature {
    signature: String,
    /// BinarySecurityToken block to prepend to the Security header.
    binary_token: Option<String>,
}

fn render_signature(
    cfg: &SigningConfiguration,
    material: &KeyMaterial,
    sig_id: &str,
    body_id: &str,
    digest_b64: &str,
    sig_uri: &str,
    indent: &str,
) -> Result<RenderedSignature, SigningError> {
    let ki_id = format!("KI-{}", Uuid::new_v4());
    let c14n_uri = cfg.canonicalization.uri();

    let mut w = XmlWriter::new(indent);
    w.start_element("ds:Signature", &[("xmlns:ds", ns::DSIG), ("Id", sig_id)]);
    w.start_element("ds:SignedInfo", &[]);
    w.empty_element("ds:CanonicalizationMethod", &[("Algorithm", c14n_uri)]);
    w.empty_element("ds:SignatureMethod", &[("Algorithm", sig_uri)]);
    w.start_element("ds:Reference", &[("URI", &format!("#{body_id}"))]);
    w.start_element("ds:Transforms", &[]);
    w.empty_element("ds:Transform", &[("Algorithm", c14n_uri)]);
    w.end_element("ds:Transforms");
    w.empty_element("ds:DigestMethod", &[("Algorithm", cfg.digest.uri())]);
    w.text_element("ds:DigestValue", &[], digest_b64);
    w.end_element("ds:Reference");
    w.end_element("ds:SignedInfo");
    w.text_element("ds:SignatureValue", &[], "");
    w.start_element("ds:KeyInfo", &[("Id", &ki_id)]);
    let binary_token = render_key_info(&mut w, cfg, material, indent)?;
    w.end_element("ds:KeyInfo");
    w.end_element("ds:Signature");

    Ok(RenderedSignature {
        signature: w.into_string(),
        binary_token,
    })
}

/// The leaf certificate, required by every certificate-based identifier.
fn leaf_cert<'a>(material: &'a KeyMaterial) -> Result<&'a [u8], SigningError> {
    material
        .chain
        .first()
        .map(Vec::as_slice)
        .ok_or_else(|| {
            SigningError::Certificate(
                "keystore entry carries no certificate chain".to_owned(),
            )
        })
}

/// Token value for a BinarySecurityToken: the leaf certificate, or the
/// whole chain as an X509PKIPathv1 when more than one certificate should
/// be included.
fn token_payload(
    cfg: &SigningConfiguration,
    material: &KeyMaterial,
) -> Result<(&'static str, Vec<u8>), SigningError> {
    let leaf = leaf_cert(material)?;
    if cfg.single_certificate || material.chain.len() == 1 {
        Ok((ns::X509_V3, leaf.to_vec()))
    } else {
        Ok((ns::X509_PKI_PATH_V1, x509::pki_path(&material.chain)))
    }
}

fn render_key_info(
    w: &mut XmlWriter,
    cfg: &SigningConfiguration,
    material: &KeyMaterial,
    indent: &str,
) -> Result<Option<String>, SigningError> {
    let str_id = format!("STR-{}", Uuid::new_v4());
    match cfg.key_identifier_type {
        KeyIdentifierType::BstDirectReference => {
            let bst_id = format!("X509-{}", Uuid::new_v4());
            let (value_type, payload) = token_payload(cfg, material)?;
            w.start_element("wsse:SecurityTokenReference", &[("wsu:Id", &str_id)]);
            w.empty_element(
                "wsse:Reference",
                &[("URI", &format!("#{bst_id}")), ("ValueType", value_type)],
            );
            w.end_element("wsse:SecurityTokenReference");

            let mut bw = XmlWriter::new(indent);
            bw.text_element(
                "wsse:BinarySecurityToken",
                &[
                    ("EncodingType", ns::BASE64_BINARY),
                    ("ValueType", value_type),
                    ("wsu:Id", &bst_id),
                ],
                &BASE64.encode(&payload),
            );
            Ok(Some(bw.into_string()))
        }
        KeyIdentifierType::IssuerSerial => {
            let leaf = leaf_cert(material)?;
            w.start_element("wsse:SecurityTokenReference", &[("wsu:Id", &str_id)]);
            w.start_element("ds:X509Data", &[]);
            w.start_element("ds:X509IssuerSerial", &[]);
            w.text_element("ds:X509IssuerName", &[], &x509::issuer_name(leaf)?);
            w.text_element("ds:X509SerialNumber", &[], &x509::serial_decimal(leaf)?);
            w.end_element("ds:X509IssuerSerial");
            w.end_element("ds:X509Data");
            w.end_element("wsse:SecurityTokenReference");
            Ok(None)
        }
        KeyIdentifierType::X509KeyIdentifier => {
            let leaf = leaf_cert(material)?;
            w.start_element("wsse:SecurityTokenReference", &[("wsu:Id", &str_id)]);
            w.text_element(
                "wsse:KeyIdentifier",
                &[
                    ("EncodingType", ns::BASE64_BINARY),
                    ("ValueType", ns::X509_V3),
                ],
                &BASE64.encode(leaf),
            );
            w.end_element("wsse:SecurityTokenReference");
            Ok(None)
        }
        KeyIdentifierType::SkiKeyIdentifier => {
            let leaf = leaf_cert(material)?;
            let ski = x509::subject_key_identifier(leaf)?.ok_or_else(|| {
                SigningError::Certificate(
                    "certificate has no SubjectKeyIdentifier extension".to_owned(),
                )
            })?;
            w.start_element("wsse:SecurityTokenReference", &[("wsu:Id", &str_id)]);
            w.text_element(
                "wsse:KeyIdentifier",
                &[
                    ("EncodingType", ns::BASE64_BINARY),
                    ("ValueType", ns::X509_SKI),
                ],
                &BASE64.encode(&ski),
            );
            w.end_element("wsse:SecurityTokenReference");
            Ok(None)
        }
        KeyIdentifierType::EmbeddedKeyName => {
            w.text_element("ds:KeyName", &[], &material.alias);
            Ok(None)
        }
        KeyIdentifierType::EmbedSecurityTokenRef => {
            let bst_id = format!("X509-{}", Uuid::new_v4());
            let (value_type, payload) = token_payload(cfg, material)?;
            w.start_element("wsse:SecurityTokenReference", &[("wsu:Id", &str_id)]);
            w.start_element("wsse:Embedded", &[]);
            w.text_element(
                "wsse:BinarySecurityToken",
                &[
                    ("EncodingType", ns::BASE64_BINARY),
                    ("ValueType", value_type),
                    ("wsu:Id", &bst_id),
                ],
                &BASE64.encode(&payload),
            );
            w.end_element("wsse:Embedded");
            w.end_element("wsse:SecurityTokenReference");
            Ok(None)
        }
    }
}
