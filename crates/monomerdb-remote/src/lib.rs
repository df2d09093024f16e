//! # monomerdb-remote
//!
//! Fetches monomer collections and editor categorization metadata
//! from the remote monomer service. Response bodies are decoded with
//! an explicit field-name table, tolerant of unknown and reordered
//! fields.

pub mod categorization;
pub mod loader;

pub use categorization::{decode_categorization, fetch_categorization};
pub use loader::{decode_monomer_collection, MonomerClient};
