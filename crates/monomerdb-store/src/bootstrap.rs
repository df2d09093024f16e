//! Ranked bootstrap chain: remote service, external override
//! document, local serialized cache, local canonical document,
//! bundled default resource. First validated candidate wins;
//! per-candidate failures are logged, never surfaced, except the
//! final candidate's.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use monomerdb_core::chemistry::Canonicalizer;
use monomerdb_core::config::StoreConfig;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::PolymerType;
use monomerdb_remote::MonomerClient;

use crate::snapshot::{AttachmentDb, MonomerDb, Snapshot};
use crate::{attachments, document, serialized};

/// Bundled default monomer document, the final fallback.
pub const BUNDLED_MONOMER_DB: &str = include_str!("../resources/MonomerDB.xml");

/// Run the source chain and return the first candidate that parses
/// and validates.
pub fn load(config: &StoreConfig, canonicalizer: &dyn Canonicalizer) -> Result<Snapshot, StoreError> {
    let catalog = attachments::load_catalog(config)?;

    // 1. Remote service, always fetched live when configured.
    if config.use_remote {
        match load_remote(config, &catalog) {
            Ok(snapshot) => {
                info!("monomer cache initialized from the remote service");
                return Ok(snapshot);
            }
            Err(err) => warn!(error = %err, "remote monomer source unusable, trying next source"),
        }
    }

    // 2. External override document; left on disk when unusable.
    if let Some(path) = &config.external_monomers_path {
        match load_document_file(path, &catalog, canonicalizer) {
            Ok(snapshot) => {
                info!(path = %path.display(), "monomer cache initialized from override document");
                return Ok(snapshot);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "override document unusable, skipped")
            }
        }
    }

    // 3. Local serialized cache; corrupt files are deleted.
    let serialized_path = config.serialized_cache_path();
    if serialized_path.exists() {
        match load_serialized(&serialized_path, &catalog, canonicalizer) {
            Ok(snapshot) => {
                info!(path = %serialized_path.display(), "monomer cache restored from serialized snapshot");
                return Ok(snapshot);
            }
            Err(err) => {
                warn!(path = %serialized_path.display(), error = %err, "serialized cache corrupt, deleting");
                let _ = fs::remove_file(&serialized_path);
            }
        }
    }

    // 4. Local canonical document; corrupt files are deleted.
    let document_path = config.document_path();
    if document_path.exists() {
        match load_document_file(&document_path, &catalog, canonicalizer) {
            Ok(snapshot) => {
                info!(path = %document_path.display(), "monomer cache initialized from local document");
                return Ok(snapshot);
            }
            Err(err) => {
                warn!(path = %document_path.display(), error = %err, "local document corrupt, deleting");
                let _ = fs::remove_file(&document_path);
            }
        }
    }

    // 5. Bundled default resource; failure here is fatal.
    match load_document_str(BUNDLED_MONOMER_DB, &catalog, canonicalizer) {
        Ok(snapshot) => {
            info!("monomer cache initialized from the bundled resource");
            Ok(snapshot)
        }
        Err(err) => Err(StoreError::ReferenceLoad {
            message: format!("bundled monomer resource failed to load: {err}"),
        }),
    }
}

fn load_remote(config: &StoreConfig, catalog: &AttachmentDb) -> Result<Snapshot, StoreError> {
    let base_url = config
        .remote_monomers_url
        .as_deref()
        .ok_or_else(|| StoreError::RemoteLoad {
            message: "remote source enabled but no monomer URL configured".to_string(),
        })?;

    let mut by_type = MonomerDb::new();
    for polymer_type in PolymerType::ALL {
        let monomers = MonomerClient::new(base_url, polymer_type).fetch(catalog)?;
        by_type.insert(polymer_type, monomers);
    }

    let mut snapshot = Snapshot::new();
    snapshot.set_monomer_db(by_type);
    snapshot.set_attachment_db(catalog.clone());
    snapshot.rebuild_structure_index();
    snapshot.retain_valid();
    Ok(snapshot)
}

fn load_document_file(
    path: &Path,
    catalog: &AttachmentDb,
    canonicalizer: &dyn Canonicalizer,
) -> Result<Snapshot, StoreError> {
    let snapshot = document::read_file(path)?;
    Ok(finalize_local(snapshot, catalog, canonicalizer))
}

fn load_document_str(
    xml: &str,
    catalog: &AttachmentDb,
    canonicalizer: &dyn Canonicalizer,
) -> Result<Snapshot, StoreError> {
    let snapshot = document::read_str(xml)?;
    Ok(finalize_local(snapshot, catalog, canonicalizer))
}

fn load_serialized(
    path: &Path,
    catalog: &AttachmentDb,
    canonicalizer: &dyn Canonicalizer,
) -> Result<Snapshot, StoreError> {
    let snapshot = serialized::read(path, catalog)?;
    Ok(finalize_local(snapshot, catalog, canonicalizer))
}

/// Post-assembly pass shared by every non-remote source: best-effort
/// structure canonicalization, structure index rebuilt from the
/// post-pass values, attachment catalog adopted from the source, then
/// validation.
fn finalize_local(
    mut snapshot: Snapshot,
    catalog: &AttachmentDb,
    canonicalizer: &dyn Canonicalizer,
) -> Snapshot {
    snapshot.canonicalize_structures(canonicalizer);
    snapshot.rebuild_structure_index();
    snapshot.set_attachment_db(catalog.clone());
    snapshot.retain_valid();
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use monomerdb_core::chemistry::PassthroughCanonicalizer;

    #[test]
    fn bundled_resource_yields_all_three_partitions() {
        let config = StoreConfig {
            cache_dir: std::env::temp_dir().join("monomerdb-never-created"),
            ..StoreConfig::default()
        };
        let snapshot = load(&config, &PassthroughCanonicalizer).unwrap();
        for polymer_type in PolymerType::ALL {
            let bucket = snapshot
                .monomer_db()
                .get(&polymer_type)
                .unwrap_or_else(|| panic!("missing {polymer_type} partition"));
            assert!(!bucket.is_empty(), "{polymer_type} partition is empty");
        }
        assert!(!snapshot.attachment_db().is_empty());
        assert!(!snapshot.structure_db().is_empty());
    }

    #[test]
    fn remote_without_url_falls_through_to_bundled() {
        let config = StoreConfig {
            use_remote: true,
            cache_dir: std::env::temp_dir().join("monomerdb-never-created"),
            ..StoreConfig::default()
        };
        let snapshot = load(&config, &PassthroughCanonicalizer).unwrap();
        assert!(!snapshot.is_empty());
    }
}
