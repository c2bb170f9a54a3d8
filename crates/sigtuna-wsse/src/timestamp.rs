#![forbid(unsafe_code)]

//! Timestamp builder.

use chrono::{DateTime, Duration, Utc};
use sigtuna_core::SigningError;
use sigtuna_xml::{SoapDocument, XmlWriter};
use tracing::debug;
use uuid::Uuid;

use crate::config::SigningConfiguration;
use crate::header;

/// UTC instant in the wsu dateTime form, with or without milliseconds.
pub(crate) fn format_instant(instant: DateTime<Utc>, millis: bool) -> String {
    if millis {
        instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    } else {
        instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// Append a `wsu:Timestamp` to the Security header. Created and Expires
/// come from a single clock sample so their distance is exactly the TTL.
pub(crate) fn apply(
    doc: SoapDocument,
    cfg: &SigningConfiguration,
) -> Result<SoapDocument, SigningError> {
    let created = Utc::now();
    let expires = created + Duration::seconds(i64::from(cfg.timestamp_ttl));
    let id = format!("TS-{}", Uuid::new_v4());
    debug!(ttl = cfg.timestamp_ttl, millis = cfg.timestamp_millis, "adding timestamp");
    header::append_to_security(doc, |indent| {
        let mut writer = XmlWriter::new(indent);
        writer.start_element("wsu:Timestamp", &[("wsu:Id", &id)]);
        writer.text_element("wsu:Created", &[], &format_instant(created, cfg.timestamp_millis));
        writer.text_element("wsu:Expires", &[], &format_instant(expires, cfg.timestamp_millis));
        writer.end_element("wsu:Timestamp");
        Ok(writer.into_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn second_precision_format() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_instant(instant, false), "2026-01-02T03:04:05Z");
    }

    #[test]
    fn millisecond_precision_format() {
        let instant =
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(250);
        assert_eq!(format_instant(instant, true), "2026-01-02T03:04:05.250Z");
    }

    #[test]
    fn sub_second_part_is_truncated_without_millis() {
        let instant =
            Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(999);
        assert_eq!(format_instant(instant, false), "2026-01-02T03:04:05Z");
    }
}
