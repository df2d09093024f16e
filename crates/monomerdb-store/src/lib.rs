//! # monomerdb-store
//!
//! The monomer reference cache: a dual-indexed, snapshot-swapping
//! store bootstrapped from a ranked chain of sources, with
//! conflict-aware merging of session-local additions and two
//! persisted forms (serialized snapshot + canonical XML document).

pub mod attachments;
pub mod bootstrap;
pub mod conflict;
pub mod document;
pub mod serialized;
pub mod snapshot;
pub mod store;
pub mod templates;

pub use snapshot::Snapshot;
pub use store::MonomerStore;
pub use templates::TemplateStore;
