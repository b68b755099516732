//! Shared helpers for command handlers.

use std::path::Path;

use serde_json::Value;

use crate::error::CliError;

/// Configuration objects live under `configuration/object/`; a bare object
/// name is expanded, anything with a slash is taken as a full path.
pub fn object_endpoint(object: &str) -> String {
    let object = object.trim_matches('/');
    if object.contains('/') {
        object.to_owned()
    } else {
        format!("configuration/object/{object}")
    }
}

/// Parse an inline JSON payload.
pub fn parse_json(raw: &str, field: &str) -> Result<Value, CliError> {
    serde_json::from_str(raw).map_err(|e| CliError::Validation {
        field: field.into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    parse_json(&contents, "from-file")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn expands_bare_object_names() {
        assert_eq!(object_endpoint("ap_group"), "configuration/object/ap_group");
        assert_eq!(object_endpoint("/ssid_prof"), "configuration/object/ssid_prof");
        assert_eq!(object_endpoint("configuration/showcommand"), "configuration/showcommand");
    }

    #[test]
    fn reads_json_payload_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"profile-name": "corp"}}"#).unwrap();
        let value = read_json_file(file.path()).unwrap();
        assert_eq!(value["profile-name"], "corp");
    }

    #[test]
    fn rejects_bad_json() {
        let err = parse_json("{not json", "data").unwrap_err();
        assert!(matches!(err, CliError::Validation { ref field, .. } if field == "data"));
    }
}
