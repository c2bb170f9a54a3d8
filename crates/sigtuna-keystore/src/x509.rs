#![forbid(unsafe_code)]

//! Certificate metadata used to build KeyInfo references.

use der::asn1::ObjectIdentifier;
use der::Decode;
use sigtuna_core::SigningError;
use x509_cert::Certificate;

const OID_SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

pub fn parse_certificate(der: &[u8]) -> Result<Certificate, SigningError> {
    Certificate::from_der(der)
        .map_err(|e| SigningError::Certificate(format!("failed to parse certificate: {e}")))
}

/// The issuer distinguished name as an RFC 4514 string.
pub fn issuer_name(der: &[u8]) -> Result<String, SigningError> {
    let cert = parse_certificate(der)?;
    Ok(cert.tbs_certificate.issuer.to_string())
}

/// The certificate serial number in decimal.
pub fn serial_decimal(der: &[u8]) -> Result<String, SigningError> {
    let cert = parse_certificate(der)?;
    Ok(decimal_string(cert.tbs_certificate.serial_number.as_bytes()))
}

/// The SubjectKeyIdentifier extension value, when present.
pub fn subject_key_identifier(der: &[u8]) -> Result<Option<Vec<u8>>, SigningError> {
    let cert = parse_certificate(der)?;
    let Some(extensions) = &cert.tbs_certificate.extensions else {
        return Ok(None);
    };
    for ext in extensions {
        if ext.extn_id == OID_SUBJECT_KEY_IDENTIFIER {
            // the extension value wraps an OCTET STRING
            let inner = der::asn1::OctetString::from_der(ext.extn_value.as_bytes()).map_err(
                |e| SigningError::Certificate(format!("malformed SubjectKeyIdentifier: {e}")),
            )?;
            return Ok(Some(inner.as_bytes().to_vec()));
        }
    }
    Ok(None)
}

/// X509PKIPathv1 encoding of a chain given leaf first: a DER SEQUENCE of
/// the certificates ordered root towards leaf.
pub fn pki_path(chain_leaf_first: &[Vec<u8>]) -> Vec<u8> {
    let content_len: usize = chain_leaf_first.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(content_len + 6);
    out.push(0x30);
    encode_der_length(&mut out, content_len);
    for cert in chain_leaf_first.iter().rev() {
        out.extend_from_slice(cert);
    }
    out
}

fn encode_der_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }
    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    out.push(0x80 | (bytes.len() - skip) as u8);
    out.extend_from_slice(&bytes[skip..]);
}

/// Unsigned big-endian magnitude rendered in base 10.
fn decimal_string(bytes: &[u8]) -> String {
    let mut n: Vec<u8> = bytes.to_vec();
    if n.iter().all(|&b| b == 0) {
        return "0".to_owned();
    }
    let mut digits: Vec<char> = Vec::new();
    while n.iter().any(|&b| b != 0) {
        let mut rem: u32 = 0;
        for byte in n.iter_mut() {
            let cur = (rem << 8) | u32::from(*byte);
            *byte = (cur / 10) as u8;
            rem = cur % 10;
        }
        digits.push(char::from(b'0' + rem as u8));
    }
    digits.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_conversion() {
        assert_eq!(decimal_string(&[]), "0");
        assert_eq!(decimal_string(&[0x00]), "0");
        assert_eq!(decimal_string(&[0x7B]), "123");
        assert_eq!(decimal_string(&[0x01, 0x00]), "256");
        assert_eq!(decimal_string(&[0x00, 0xFF]), "255");
        assert_eq!(decimal_string(&[0xDE, 0xAD, 0xBE, 0xEF]), "3735928559");
    }

    #[test]
    fn der_length_forms() {
        let mut short = Vec::new();
        encode_der_length(&mut short, 0x45);
        assert_eq!(short, vec![0x45]);

        let mut long1 = Vec::new();
        encode_der_length(&mut long1, 0x92);
        assert_eq!(long1, vec![0x81, 0x92]);

        let mut long2 = Vec::new();
        encode_der_length(&mut long2, 0x0234);
        assert_eq!(long2, vec![0x82, 0x02, 0x34]);
    }

    #[test]
    fn pki_path_orders_root_first() {
        let leaf = vec![0x01, 0x02];
        let root = vec![0x03];
        let path = pki_path(&[leaf.clone(), root.clone()]);
        assert_eq!(path, vec![0x30, 0x03, 0x03, 0x01, 0x02]);
    }

    #[test]
    fn garbage_der_is_a_certificate_error() {
        let err = issuer_name(b"not a certificate").unwrap_err();
        assert!(matches!(err, SigningError::Certificate(_)));
    }
}
