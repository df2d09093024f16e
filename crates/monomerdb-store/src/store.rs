//! The monomer reference store: owns the live snapshot and the dirty
//! flag, mediates every read and mutation, and runs the bootstrap
//! lifecycle.
//!
//! One store instance owns its state outright. A single lock guards
//! the live snapshot reference; mutations build a replacement
//! snapshot and swap it in whole, so readers holding an `Arc` from an
//! earlier query keep a consistent (if stale) view and are never
//! exposed to a half-updated state. The same discipline makes lock
//! poisoning recoverable: the guarded reference is only ever replaced
//! whole, so a panicked holder cannot leave it half-updated. Sharing
//! one backing store between several instances is not supported.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use monomerdb_core::chemistry::{Canonicalizer, PassthroughCanonicalizer};
use monomerdb_core::config::StoreConfig;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::{Monomer, PolymerType};

use crate::snapshot::{AttachmentDb, MonomerDb, Snapshot, StructureDb};
use crate::{bootstrap, conflict, document, serialized};

pub struct MonomerStore {
    config: StoreConfig,
    canonicalizer: Arc<dyn Canonicalizer>,
    live: RwLock<Option<Arc<Snapshot>>>,
    dirty: AtomicBool,
}

impl MonomerStore {
    pub fn new(config: StoreConfig, canonicalizer: Arc<dyn Canonicalizer>) -> Self {
        Self {
            config,
            canonicalizer,
            live: RwLock::new(None),
            dirty: AtomicBool::new(false),
        }
    }

    /// Store without a chemistry engine: structures pass through
    /// canonicalization unchanged.
    pub fn with_defaults(config: StoreConfig) -> Self {
        Self::new(config, Arc::new(PassthroughCanonicalizer))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The live snapshot, bootstrapping on first access. When the
    /// remote source and auto-update are both enabled, every access
    /// re-runs the chain.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, StoreError> {
        if self.config.use_remote && self.config.auto_update {
            return self.refresh();
        }
        if let Some(snapshot) = self.live.read().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        self.loaded(&mut live)
    }

    /// Force a re-run of the bootstrap chain and adopt the result. A
    /// freshly bootstrapped snapshot has no pending monomers.
    pub fn refresh(&self) -> Result<Arc<Snapshot>, StoreError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(bootstrap::load(&self.config, self.canonicalizer.as_ref())?);
        *live = Some(Arc::clone(&snapshot));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(snapshot)
    }

    /// The monomer index, optionally excluding pending monomers.
    pub fn monomer_db(&self, include_pending: bool) -> Result<MonomerDb, StoreError> {
        Ok(self.snapshot()?.monomer_db_view(include_pending))
    }

    /// The reverse structure index, optionally excluding pending
    /// monomers.
    pub fn structure_db(&self, include_pending: bool) -> Result<StructureDb, StoreError> {
        Ok(self.snapshot()?.structure_db_view(include_pending))
    }

    /// The attachment catalog.
    pub fn attachment_db(&self) -> Result<AttachmentDb, StoreError> {
        Ok(self.snapshot()?.attachment_db().clone())
    }

    /// Add a session-local monomer. It is marked pending and inserted
    /// under the usual first-wins rules.
    pub fn add(&self, monomer: Monomer) -> Result<(), StoreError> {
        if monomer.alternate_id.is_empty() {
            return Err(StoreError::Validation {
                message: "monomer has no alternate id".to_string(),
            });
        }

        let mut pending = monomer;
        pending.pending = true;

        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let current = self.loaded(&mut live)?;
        let mut next = (*current).clone();
        next.insert(Arc::new(pending));
        *live = Some(Arc::new(next));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Merge an authoritative remote snapshot into the live one.
    ///
    /// All-or-nothing: when any pending monomer conflicts with the
    /// remote set the error carries the full conflict mapping and the
    /// live snapshot is left untouched. The caller resolves conflicts
    /// (discard or rename locals) and retries.
    pub fn merge(&self, remote: Snapshot) -> Result<(), StoreError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        let current = self.loaded(&mut live)?;

        let conflicts = conflict::find_conflicts(&current, &remote);
        if !conflicts.is_empty() {
            info!(count = conflicts.len(), "merge aborted on conflicts");
            return Err(StoreError::MergeConflict { conflicts });
        }

        let mut next = (*current).clone();
        for bucket in remote.monomer_db().values() {
            for monomer in bucket.values() {
                next.insert(Arc::clone(monomer));
            }
        }
        *live = Some(Arc::new(next));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Substitute the live snapshot wholesale, trusting the remote
    /// set completely. May lose local data; no conflict check.
    pub fn replace(&self, remote: Snapshot) -> Result<(), StoreError> {
        let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
        *live = Some(Arc::new(remote));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Persist the live snapshot, pending monomers excluded, in both
    /// forms (serialized + canonical document). The dirty flag is
    /// left as-is; the caller decides when to reset it.
    pub fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.snapshot()?;
        let trimmed = snapshot.without_pending();
        fs::create_dir_all(&self.config.cache_dir)?;
        serialized::write(&self.config.serialized_cache_path(), &trimmed)?;
        document::write_file(&self.config.document_path(), &trimmed)?;
        debug!(dir = %self.config.cache_dir.display(), "monomer cache persisted");
        Ok(())
    }

    /// Drop the live snapshot; the next access re-bootstraps.
    pub fn clear(&self) {
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn reset_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    /// Sorted list of the polymer types present in the live snapshot.
    pub fn polymer_types(&self) -> Result<Vec<PolymerType>, StoreError> {
        Ok(self.snapshot()?.monomer_db().keys().copied().collect())
    }

    /// Sorted list of the distinct monomer-type strings in use.
    pub fn monomer_types(&self) -> Result<Vec<String>, StoreError> {
        let snapshot = self.snapshot()?;
        let types: BTreeSet<String> = snapshot
            .monomer_db()
            .values()
            .flat_map(|bucket| bucket.values())
            .map(|m| m.monomer_type.clone())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(types.into_iter().collect())
    }

    /// Attachment ids grouped by their label, each group sorted.
    pub fn attachment_label_ids(&self) -> Result<BTreeMap<String, Vec<String>>, StoreError> {
        let snapshot = self.snapshot()?;
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for attachment in snapshot.attachment_db().values() {
            groups
                .entry(attachment.label.clone())
                .or_default()
                .push(attachment.alternate_id.clone());
        }
        for ids in groups.values_mut() {
            ids.sort();
        }
        Ok(groups)
    }

    fn loaded(&self, live: &mut Option<Arc<Snapshot>>) -> Result<Arc<Snapshot>, StoreError> {
        if let Some(snapshot) = live.as_ref() {
            return Ok(Arc::clone(snapshot));
        }
        let snapshot = Arc::new(bootstrap::load(&self.config, self.canonicalizer.as_ref())?);
        *live = Some(Arc::clone(&snapshot));
        self.dirty.store(true, Ordering::SeqCst);
        Ok(snapshot)
    }
}
