//! Seam to the external chemistry engine.

use crate::errors::StoreError;

/// Canonicalizes a structure string. The store treats this as an
/// opaque, fallible normalization step; failures are best-effort and
/// leave the original value in place.
pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, structure: &str) -> Result<String, StoreError>;
}

/// Canonicalizer that returns its input unchanged. Used when no
/// chemistry engine is wired in.
pub struct PassthroughCanonicalizer;

impl Canonicalizer for PassthroughCanonicalizer {
    fn canonicalize(&self, structure: &str) -> Result<String, StoreError> {
        Ok(structure.to_string())
    }
}
