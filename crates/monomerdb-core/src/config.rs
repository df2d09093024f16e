//! Store configuration, loadable from a TOML file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// File name of the serialized snapshot inside `cache_dir`.
pub const SERIALIZED_CACHE_FILE: &str = "MonomerCache.json";

/// File name of the canonical monomer document inside `cache_dir`.
pub const MONOMER_DB_FILE: &str = "MonomerDB.xml";

/// File name of the persisted template document inside `cache_dir`.
pub const TEMPLATE_DB_FILE: &str = "NucleotideTemplates.xml";

/// Options recognized by the monomer reference store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Fetch from the remote source on bootstrap.
    pub use_remote: bool,
    /// Re-bootstrap on every access when the remote source is enabled.
    pub auto_update: bool,
    /// Base URL of the per-polymer-type monomer collection endpoint.
    pub remote_monomers_url: Option<String>,
    /// URL of the editor categorization endpoint.
    pub remote_categorization_url: Option<String>,
    /// Local canonical-document override consulted before the cache
    /// files.
    pub external_monomers_path: Option<PathBuf>,
    /// External attachment catalog replacing the bundled one.
    pub external_attachments_path: Option<PathBuf>,
    /// External template document override.
    pub external_templates_path: Option<PathBuf>,
    /// Directory holding the persisted cache files.
    pub cache_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            use_remote: false,
            auto_update: false,
            remote_monomers_url: None,
            remote_categorization_url: None,
            external_monomers_path: None,
            external_attachments_path: None,
            external_templates_path: None,
            cache_dir: PathBuf::from(".monomerdb"),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a TOML file. Unset keys fall back to
    /// defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&text).map_err(|e| StoreError::Deserialization {
            message: format!("invalid config {}: {e}", path.as_ref().display()),
        })
    }

    pub fn serialized_cache_path(&self) -> PathBuf {
        self.cache_dir.join(SERIALIZED_CACHE_FILE)
    }

    pub fn document_path(&self) -> PathBuf {
        self.cache_dir.join(MONOMER_DB_FILE)
    }

    pub fn template_db_path(&self) -> PathBuf {
        self.cache_dir.join(TEMPLATE_DB_FILE)
    }
}
