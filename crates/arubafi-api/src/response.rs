// Response normalization.
//
// Every backend answers in one of three shapes: plain JSON (Central and
// Mobility Master GETs), JSON wrapped in a `_global_result` envelope
// (Mobility Master writes and login), or XML (AirWave). `normalize` turns
// each into a `ResponseDocument` or a classified error.

use secrecy::SecretString;
use serde_json::Value;
use tracing::trace;

use crate::error::Error;
use crate::redact;
use crate::xml;

/// Wire shape of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum BodyFormat {
    Json,
    TokenEnvelope,
    Xml,
}

/// Contents of a Mobility Master `_global_result` object.
#[derive(Debug, Clone, Default)]
pub struct GlobalResult {
    /// `0` on success. Upstream sends it as a number or a numeric string.
    pub status: i64,
    pub status_str: Option<String>,
    /// Set when the change was staged but not yet applied.
    pub pending: bool,
    /// Session UID, present on login responses only.
    pub uid: Option<SecretString>,
    /// CSRF token, present on login responses of newer releases.
    pub csrf_token: Option<SecretString>,
}

impl GlobalResult {
    fn from_value(value: &Value) -> Option<Self> {
        let status = status_code(value.get("status")?)?;
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        Some(Self {
            status,
            status_str: text("status_str"),
            pending: value
                .get("_pending")
                .is_some_and(|p| p.as_bool().unwrap_or_else(|| status_code(p) == Some(1))),
            uid: text("UIDARUBA").map(SecretString::from),
            csrf_token: text("X-CSRF-Token").map(SecretString::from),
        })
    }
}

/// A normalized upstream response.
#[derive(Debug, Clone)]
pub struct ResponseDocument {
    pub format: BodyFormat,
    pub http_status: u16,
    /// The token envelope, lifted out of `data`, for enveloped bodies.
    pub envelope: Option<GlobalResult>,
    pub data: Value,
}

impl ResponseDocument {
    /// Look up a top-level key of the payload.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The root element of an XML document.
    pub fn xml_root(&self) -> Option<&Value> {
        match (self.format, &self.data) {
            (BodyFormat::Xml, Value::Object(map)) => map.values().next(),
            _ => None,
        }
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

/// Normalize a raw body into a [`ResponseDocument`].
///
/// The format comes from the content type when it names one, otherwise
/// from the first significant character of the body. An empty body is an
/// empty JSON document.
pub fn normalize(
    http_status: u16,
    body: &str,
    content_type: Option<&str>,
) -> Result<ResponseDocument, Error> {
    let trimmed = body.trim_start();
    if trimmed.is_empty() {
        return Ok(ResponseDocument {
            format: BodyFormat::Json,
            http_status,
            envelope: None,
            data: Value::Null,
        });
    }

    let format = detect_format(trimmed, content_type).ok_or_else(|| Error::MalformedResponse {
        message: format!(
            "unrecognized body format (content type {})",
            content_type.unwrap_or("unset")
        ),
        excerpt: redact::excerpt(body),
    })?;
    trace!(%format, bytes = body.len(), "normalizing response");

    match format {
        BodyFormat::Xml => {
            let data = xml::to_value(body).map_err(|message| Error::MalformedResponse {
                message: format!("invalid XML: {message}"),
                excerpt: redact::excerpt(body),
            })?;
            Ok(ResponseDocument {
                format,
                http_status,
                envelope: None,
                data,
            })
        }
        BodyFormat::Json | BodyFormat::TokenEnvelope => {
            let data: Value = serde_json::from_str(body).map_err(|e| Error::MalformedResponse {
                message: format!("invalid JSON: {e}"),
                excerpt: redact::excerpt(body),
            })?;
            if data.get("_global_result").is_some() {
                unwrap_envelope(http_status, data, body)
            } else {
                Ok(ResponseDocument {
                    format: BodyFormat::Json,
                    http_status,
                    envelope: None,
                    data,
                })
            }
        }
    }
}

fn detect_format(body: &str, content_type: Option<&str>) -> Option<BodyFormat> {
    let content_type = content_type.map(str::to_ascii_lowercase).unwrap_or_default();
    if content_type.contains("html") {
        return None;
    }
    if content_type.contains("xml") {
        return Some(BodyFormat::Xml);
    }
    if content_type.contains("json") {
        return Some(BodyFormat::Json);
    }
    match body.chars().next()? {
        '<' => Some(BodyFormat::Xml),
        '{' | '[' => Some(BodyFormat::Json),
        _ => None,
    }
}

fn unwrap_envelope(http_status: u16, mut data: Value, body: &str) -> Result<ResponseDocument, Error> {
    let global = data
        .as_object_mut()
        .and_then(|map| map.remove("_global_result"))
        .unwrap_or_default();
    let envelope = GlobalResult::from_value(&global).ok_or_else(|| Error::MalformedResponse {
        message: "`_global_result` has no usable status".into(),
        excerpt: redact::excerpt(body),
    })?;

    if envelope.status != 0 {
        return Err(Error::Upstream {
            endpoint: String::new(),
            status: envelope.status,
            message: envelope
                .status_str
                .clone()
                .unwrap_or_else(|| format!("request failed with status {}", envelope.status)),
        });
    }

    // Batched writes report per-operation results next to the envelope.
    if let Some(map) = data.as_object() {
        for (operation, payload) in map {
            let Some(result) = payload.get("_result") else {
                continue;
            };
            let status = result.get("status").and_then(status_code).unwrap_or(0);
            if status != 0 {
                let message = result
                    .get("status_str")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{operation} failed"), |s| format!("{operation}: {s}"));
                return Err(Error::Upstream {
                    endpoint: String::new(),
                    status,
                    message,
                });
            }
        }
    }

    Ok(ResponseDocument {
        format: BodyFormat::TokenEnvelope,
        http_status,
        envelope: Some(envelope),
        data,
    })
}

fn status_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn plain_json_passes_through() {
        let doc = normalize(200, r#"{"_data": {"ap_group": []}}"#, Some("application/json")).unwrap();
        assert_eq!(doc.format, BodyFormat::Json);
        assert_eq!(doc.data, json!({"_data": {"ap_group": []}}));
        assert!(doc.envelope.is_none());
    }

    #[test]
    fn envelope_success_is_unwrapped() {
        let body = r#"{"_global_result": {"status": "0", "status_str": "Success", "UIDARUBA": "uid-1"}}"#;
        let doc = normalize(200, body, None).unwrap();
        assert_eq!(doc.format, BodyFormat::TokenEnvelope);
        let envelope = doc.envelope.unwrap();
        assert_eq!(envelope.status, 0);
        assert_eq!(envelope.uid.unwrap().expose_secret(), "uid-1");
        assert_eq!(doc.data, json!({}));
    }

    #[test]
    fn envelope_failure_raises_upstream_error() {
        let body = r#"{"_global_result": {"status": 1, "status_str": "Invalid profile name"}}"#;
        match normalize(200, body, Some("application/json")) {
            Err(Error::Upstream { status, message, .. }) => {
                assert_eq!(status, 1);
                assert_eq!(message, "Invalid profile name");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn per_operation_failure_raises_upstream_error() {
        let body = r#"{
            "_global_result": {"status": 0, "status_str": "Success"},
            "ap_group": {"_result": {"status": 2, "status_str": "Profile in use"}}
        }"#;
        match normalize(200, body, None) {
            Err(Error::Upstream { status, message, .. }) => {
                assert_eq!(status, 2);
                assert_eq!(message, "ap_group: Profile in use");
            }
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[test]
    fn xml_is_detected_by_sniffing() {
        let doc = normalize(200, "<amp:amp_ap_list><ap id=\"1\"/></amp:amp_ap_list>", None).unwrap();
        assert_eq!(doc.format, BodyFormat::Xml);
        assert_eq!(doc.xml_root().unwrap(), &json!({"ap": [{"@id": "1"}]}));
    }

    #[test]
    fn malformed_body_excerpt_is_redacted() {
        let body = r#"{"UIDARUBA": "s3cr3t", "broken": "#;
        match normalize(200, body, Some("application/json")) {
            Err(Error::MalformedResponse { excerpt, .. }) => {
                assert!(!excerpt.contains("s3cr3t"));
                assert!(excerpt.contains("UIDARUBA"));
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn html_is_rejected() {
        let body = "<html><body>Please log in</body></html>";
        assert!(matches!(
            normalize(200, body, Some("text/html; charset=utf-8")),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(matches!(
            normalize(200, "OK", Some("text/plain")),
            Err(Error::MalformedResponse { .. })
        ));
    }

    #[test]
    fn plain_text_excerpt_hides_session_uid() {
        let body = "error at /v1/configuration/object/ap_group?UIDARUBA=abc&config_path=/md";
        match normalize(500, body, Some("text/plain")) {
            Err(Error::MalformedResponse { excerpt, .. }) => {
                assert!(!excerpt.contains("abc"), "excerpt leaked the UID: {excerpt}");
                assert!(excerpt.contains("config_path=/md"));
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn empty_body_is_null_json() {
        let doc = normalize(204, "", None).unwrap();
        assert_eq!(doc.data, Value::Null);
    }
}
