//! Attachment catalog loading. The catalog is the authoritative
//! `alternateId -> Attachment` source consulted by persistence and by
//! remote decoding; it comes from an external file when configured,
//! else from the bundled resource.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use monomerdb_core::config::StoreConfig;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::{Attachment, SymbolKey};
use monomerdb_core::validate;

use crate::snapshot::AttachmentDb;

/// Bundled default catalog.
pub const BUNDLED_ATTACHMENTS: &str = include_str!("../resources/Attachments.json");

/// Load the attachment catalog for the given configuration.
pub fn load_catalog(config: &StoreConfig) -> Result<AttachmentDb, StoreError> {
    match &config.external_attachments_path {
        Some(path) => load_file(path),
        None => parse_catalog(BUNDLED_ATTACHMENTS),
    }
}

pub fn load_file(path: &Path) -> Result<AttachmentDb, StoreError> {
    let text = fs::read_to_string(path)?;
    parse_catalog(&text)
}

/// Parse a catalog document: an array of attachment records, decoded
/// field by field. Only fully defined attachments are kept.
pub fn parse_catalog(json: &str) -> Result<AttachmentDb, StoreError> {
    let body: Value = json.parse().map_err(|e| StoreError::Deserialization {
        message: format!("attachment catalog is not valid JSON: {e}"),
    })?;

    let mut catalog = AttachmentDb::new();
    let Some(records) = body.as_array() else {
        return Err(StoreError::Deserialization {
            message: "attachment catalog must be an array of attachments".to_string(),
        });
    };

    for record in records {
        let Some(fields) = record.as_object() else {
            continue;
        };
        let mut attachment = Attachment::default();
        for (name, value) in fields {
            match name.as_str() {
                "id" => attachment.id = value.as_i64(),
                "alternateId" => attachment.alternate_id = string(value),
                "label" => attachment.label = string(value),
                "capGroupName" => attachment.cap_group_name = string(value),
                "capGroupSMILES" => attachment.cap_group_smiles = string(value),
                _ => {}
            }
        }
        if attachment.alternate_id.is_empty() || !validate::attachment_is_valid(&attachment) {
            debug!(id = %attachment.alternate_id, "skipping incomplete catalog attachment");
            continue;
        }
        catalog.insert(SymbolKey::new(&attachment.alternate_id), attachment);
    }

    Ok(catalog)
}

fn string(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalog_parses_and_is_nonempty() {
        let catalog = parse_catalog(BUNDLED_ATTACHMENTS).unwrap();
        assert!(!catalog.is_empty());
        assert!(catalog.contains_key(&SymbolKey::new("R1-H")));
        assert!(catalog.contains_key(&SymbolKey::new("R2-OH")));
    }

    #[test]
    fn incomplete_entries_are_skipped() {
        let json = r#"[
            {"alternateId": "R1-H", "label": "R1", "capGroupName": "H",
             "capGroupSMILES": "[*][H] |$_R1$|"},
            {"alternateId": "R9-X", "label": "R9"}
        ]"#;
        let catalog = parse_catalog(json).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn non_array_catalog_is_rejected() {
        assert!(matches!(
            parse_catalog("{\"R1-H\": {}}"),
            Err(StoreError::Deserialization { .. })
        ));
    }
}
