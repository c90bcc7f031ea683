//! Drive file metadata returned by the list-files proxy.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary of a Drive file, validated at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_drive_shape() {
        let raw = r#"{
            "id": "1abc",
            "name": "notes.txt",
            "mimeType": "text/plain",
            "modifiedTime": "2026-01-05T10:00:00.000Z"
        }"#;

        let file: FileSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(file.id, "1abc");
        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let raw = r#"{"id": "2def", "name": "folder"}"#;
        let file: FileSummary = serde_json::from_str(raw).unwrap();
        assert!(file.mime_type.is_none());
        assert!(file.modified_time.is_none());
    }
}
