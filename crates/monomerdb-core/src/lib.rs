//! # monomerdb-core
//!
//! Core building blocks for the monomer reference store:
//! domain types, error taxonomy, configuration, the embedded
//! structure-payload codec, the canonicalizer seam, and
//! field-level entity validation.

pub mod chemistry;
pub mod codec;
pub mod config;
pub mod errors;
pub mod observability;
pub mod types;
pub mod validate;

pub use chemistry::{Canonicalizer, PassthroughCanonicalizer};
pub use config::StoreConfig;
pub use errors::StoreError;
pub use types::{
    Attachment, CategorizedMonomer, Conflict, Monomer, PolymerType, SymbolKey,
};
