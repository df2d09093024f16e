//! One consistent state of the cache: three independent indices
//! bundled as an immutable unit. Snapshots are created whole by a
//! bootstrap source, by merge, or by restore, and swapped into the
//! store as a single reference.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use monomerdb_core::chemistry::Canonicalizer;
use monomerdb_core::types::{Attachment, Monomer, PolymerType, SymbolKey};
use monomerdb_core::validate;

pub type MonomerDb = BTreeMap<PolymerType, BTreeMap<SymbolKey, Arc<Monomer>>>;
pub type StructureDb = HashMap<String, Arc<Monomer>>;
pub type AttachmentDb = BTreeMap<SymbolKey, Attachment>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// polymerType -> alternateId (case-insensitive) -> monomer.
    /// No duplicate ids within a type; first write wins.
    by_type: MonomerDb,
    /// canonicalStructure -> monomer reverse index. At most one
    /// monomer per structure value; first write wins.
    by_structure: StructureDb,
    /// Authoritative attachment catalog, independent of any monomer.
    attachments: AttachmentDb,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn monomer_db(&self) -> &MonomerDb {
        &self.by_type
    }

    pub fn structure_db(&self) -> &StructureDb {
        &self.by_structure
    }

    pub fn attachment_db(&self) -> &AttachmentDb {
        &self.attachments
    }

    pub fn set_attachment_db(&mut self, attachments: AttachmentDb) {
        self.attachments = attachments;
    }

    pub fn set_monomer_db(&mut self, by_type: MonomerDb) {
        self.by_type = by_type;
    }

    pub fn lookup(&self, polymer_type: PolymerType, alternate_id: &str) -> Option<&Arc<Monomer>> {
        self.by_type
            .get(&polymer_type)?
            .get(&SymbolKey::new(alternate_id))
    }

    pub fn monomer_count(&self) -> usize {
        self.by_type.values().map(|bucket| bucket.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.values().all(|bucket| bucket.is_empty())
    }

    /// Insert a monomer into both indices.
    ///
    /// The first insert into a fresh polymer-type bucket stores an
    /// independent copy of the monomer, while inserts into an
    /// existing bucket (and the structure index) alias the caller's
    /// value. Downstream code may depend on either behavior, so the
    /// asymmetry is kept as-is.
    pub fn insert(&mut self, monomer: Arc<Monomer>) {
        match self.by_type.entry(monomer.polymer_type) {
            Entry::Vacant(slot) => {
                let mut bucket = BTreeMap::new();
                bucket.insert(
                    SymbolKey::new(&monomer.alternate_id),
                    Arc::new((*monomer).clone()),
                );
                slot.insert(bucket);
            }
            Entry::Occupied(mut slot) => {
                let bucket = slot.get_mut();
                let key = SymbolKey::new(&monomer.alternate_id);
                // Existing entry wins.
                if !bucket.contains_key(&key) {
                    bucket.insert(key, Arc::clone(&monomer));
                }
            }
        }

        if !monomer.canonical_structure.is_empty()
            && !self.by_structure.contains_key(&monomer.canonical_structure)
        {
            self.by_structure
                .insert(monomer.canonical_structure.clone(), monomer);
        }
    }

    /// All session-local, uncommitted monomers.
    pub fn pending_monomers(&self) -> Vec<Arc<Monomer>> {
        self.by_type
            .values()
            .flat_map(|bucket| bucket.values())
            .filter(|m| m.pending)
            .cloned()
            .collect()
    }

    /// A copy of this snapshot with every pending monomer removed
    /// from both monomer indices. Polymer-type buckets are kept even
    /// when emptied.
    pub fn without_pending(&self) -> Snapshot {
        let by_type = self
            .by_type
            .iter()
            .map(|(polymer_type, bucket)| {
                let kept = bucket
                    .iter()
                    .filter(|(_, m)| !m.pending)
                    .map(|(k, m)| (k.clone(), Arc::clone(m)))
                    .collect();
                (*polymer_type, kept)
            })
            .collect();
        let by_structure = self
            .by_structure
            .iter()
            .filter(|(_, m)| !m.pending)
            .map(|(k, m)| (k.clone(), Arc::clone(m)))
            .collect();
        Snapshot {
            by_type,
            by_structure,
            attachments: self.attachments.clone(),
        }
    }

    /// Filtered view of the monomer index per the `include_pending`
    /// query flag.
    pub fn monomer_db_view(&self, include_pending: bool) -> MonomerDb {
        if include_pending {
            self.by_type.clone()
        } else {
            self.without_pending().by_type
        }
    }

    /// Filtered view of the structure index per the `include_pending`
    /// query flag.
    pub fn structure_db_view(&self, include_pending: bool) -> StructureDb {
        if include_pending {
            self.by_structure.clone()
        } else {
            self.without_pending().by_structure
        }
    }

    /// Re-derive every monomer's canonical structure through the
    /// chemistry engine. Best-effort: a canonicalization failure
    /// keeps the original value. Runs before the structure index is
    /// built, while each monomer is still uniquely owned.
    pub fn canonicalize_structures(&mut self, canonicalizer: &dyn Canonicalizer) {
        for bucket in self.by_type.values_mut() {
            for monomer in bucket.values_mut() {
                let canonical = match canonicalizer.canonicalize(&monomer.canonical_structure) {
                    Ok(canonical) => canonical,
                    Err(_) => monomer.canonical_structure.clone(),
                };
                if canonical != monomer.canonical_structure {
                    Arc::make_mut(monomer).canonical_structure = canonical;
                }
            }
        }
    }

    /// Rebuild the reverse structure index from the monomer index.
    /// Empty structures are skipped; the first monomer seen for a
    /// structure value wins.
    pub fn rebuild_structure_index(&mut self) {
        self.by_structure.clear();
        for bucket in self.by_type.values() {
            for monomer in bucket.values() {
                if !monomer.canonical_structure.is_empty()
                    && !self.by_structure.contains_key(&monomer.canonical_structure)
                {
                    self.by_structure
                        .insert(monomer.canonical_structure.clone(), Arc::clone(monomer));
                }
            }
        }
    }

    /// Drop every monomer failing structural validation from its
    /// polymer-type bucket. Non-fatal; the structure index is left
    /// untouched.
    pub fn retain_valid(&mut self) {
        for (polymer_type, bucket) in self.by_type.iter_mut() {
            bucket.retain(|key, monomer| {
                let ok = validate::monomer_is_valid(monomer);
                if !ok {
                    warn!(%polymer_type, id = %key, "dropping invalid monomer");
                }
                ok
            });
        }
    }

    /// Defensive re-assignment after restoring a serialized snapshot:
    /// every monomer in the structure index takes its canonical
    /// structure from the index key, protecting against drift between
    /// the stored field and the key it was indexed under.
    ///
    /// Deserialization splits what was one shared instance into
    /// independent copies per index, so the repair is written through
    /// to the matching polymer-type entry as well, and the two indices
    /// are re-unified onto that entry.
    pub fn reassign_structures_from_index(&mut self) {
        for (structure, monomer) in self.by_structure.iter_mut() {
            if monomer.canonical_structure != *structure {
                Arc::make_mut(monomer).canonical_structure = structure.clone();
            }
            if let Some(entry) = self
                .by_type
                .get_mut(&monomer.polymer_type)
                .and_then(|bucket| bucket.get_mut(&SymbolKey::new(&monomer.alternate_id)))
            {
                if entry.canonical_structure != *structure {
                    Arc::make_mut(entry).canonical_structure = structure.clone();
                }
                *monomer = Arc::clone(entry);
            }
        }
    }
}
