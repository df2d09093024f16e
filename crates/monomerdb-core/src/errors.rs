//! Error taxonomy for the monomer reference store.

use thiserror::Error;

use crate::types::Conflict;

/// Errors surfaced by the store, the bootstrap chain, and the remote
/// loader.
///
/// Per-candidate failures during bootstrap are caught and logged by
/// the chain itself; only the final candidate's failure escapes, as
/// `ReferenceLoad`. Merge conflicts are always surfaced and never
/// auto-resolved.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Malformed or incomplete entity. Recoverable by dropping the
    /// entity; non-fatal at the source-candidate level.
    #[error("monomer validation failed: {message}")]
    Validation { message: String },

    /// Transport failure or non-200 response from the remote source.
    #[error("remote monomer source failed: {message}")]
    RemoteLoad { message: String },

    /// A referenced attachment id is absent from the attachment
    /// catalog.
    #[error("attachment '{alternate_id}' not found in the attachment catalog")]
    AttachmentLookup { alternate_id: String },

    /// Merge found local pending monomers colliding with the remote
    /// set. The live snapshot is untouched; the caller must resolve
    /// the carried conflicts before retrying.
    #[error("merge aborted: {} conflicting monomer(s)", conflicts.len())]
    MergeConflict { conflicts: Vec<Conflict> },

    /// Every bootstrap candidate was exhausted.
    #[error("no monomer source could be loaded: {message}")]
    ReferenceLoad { message: String },

    /// A persisted snapshot could not be decoded.
    #[error("corrupt monomer snapshot: {message}")]
    Deserialization { message: String },

    /// A canonical monomer document could not be read or written.
    #[error("monomer document error: {message}")]
    Document { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
