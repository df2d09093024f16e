//! Compact serialized snapshot form, used for fast restart. The
//! canonical XML document remains the source of truth when this file
//! is absent or corrupt.

use std::fs;
use std::path::Path;

use monomerdb_core::errors::StoreError;

use crate::snapshot::{AttachmentDb, Snapshot};

/// Write the serialized form of a snapshot.
pub fn write(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let json = serde_json::to_string(snapshot).map_err(|e| StoreError::Deserialization {
        message: format!("snapshot could not be serialized: {e}"),
    })?;
    fs::write(path, json)?;
    Ok(())
}

/// Restore a snapshot from its serialized form.
///
/// Canonical structures are re-derived from the structure-index keys
/// (the keys, not the stored fields, are what the index was built
/// from), and the attachment catalog is rebuilt fresh from the
/// attachment source rather than trusting the serialized copy.
pub fn read(path: &Path, attachments: &AttachmentDb) -> Result<Snapshot, StoreError> {
    let text = fs::read_to_string(path)?;
    let mut snapshot: Snapshot =
        serde_json::from_str(&text).map_err(|e| StoreError::Deserialization {
            message: format!("{}: {e}", path.display()),
        })?;
    snapshot.reassign_structures_from_index();
    snapshot.set_attachment_db(attachments.clone());
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use monomerdb_core::types::{Attachment, Monomer, PolymerType, SymbolKey};

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (id, structure) in [("A", "CC"), ("G", "CN")] {
            let mut m = Monomer::new(PolymerType::Peptide, id);
            m.canonical_structure = structure.to_string();
            snapshot.insert(Arc::new(m));
        }
        snapshot
    }

    fn catalog() -> AttachmentDb {
        let mut catalog = AttachmentDb::new();
        catalog.insert(
            SymbolKey::new("R1-H"),
            Attachment {
                id: Some(1),
                alternate_id: "R1-H".to_string(),
                label: "R1".to_string(),
                cap_group_name: "H".to_string(),
                cap_group_smiles: "[*][H] |$_R1$|".to_string(),
            },
        );
        catalog
    }

    #[test]
    fn round_trip_preserves_both_monomer_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MonomerCache.json");
        let snapshot = sample_snapshot();

        write(&path, &snapshot).unwrap();
        let restored = read(&path, &catalog()).unwrap();

        assert_eq!(restored.monomer_count(), 2);
        assert_eq!(
            restored.structure_db()["CC"].alternate_id,
            snapshot.structure_db()["CC"].alternate_id
        );
        // The attachment catalog comes from the source, not the file.
        assert!(restored.attachment_db().contains_key(&SymbolKey::new("R1-H")));
    }

    #[test]
    fn corrupt_file_is_a_deserialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MonomerCache.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            read(&path, &catalog()),
            Err(StoreError::Deserialization { .. })
        ));
    }

    #[test]
    fn restore_reassigns_structures_from_index_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("MonomerCache.json");
        let snapshot = sample_snapshot();
        // Tamper: change the stored field in both indices without
        // touching the index key.
        let mut json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&snapshot).unwrap()).unwrap();
        json["by_structure"]["CC"]["canonical_structure"] = "drifted".into();
        json["by_type"]["PEPTIDE"]["A"]["canonical_structure"] = "drifted".into();
        fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        let restored = read(&path, &catalog()).unwrap();
        assert_eq!(restored.structure_db()["CC"].canonical_structure, "CC");
        // The repair reaches the type index, not just the index copy.
        let a = restored.lookup(PolymerType::Peptide, "A").unwrap();
        assert_eq!(a.canonical_structure, "CC");
        assert!(Arc::ptr_eq(a, &restored.structure_db()["CC"]));
    }
}
