//! Conflict detection between the live snapshot's pending monomers
//! and an authoritative remote snapshot.

use std::sync::Arc;

use tracing::debug;

use monomerdb_core::types::Conflict;

use crate::snapshot::Snapshot;

/// For every pending monomer in `local`, find the remote monomer it
/// collides with:
///
/// - same type and id with a different structure is a conflict;
/// - same type and id with the same structure is a perfect match and
///   needs no action;
/// - an unknown id whose structure the remote already knows under a
///   different identity is a conflict;
/// - anything else is truly new.
pub fn find_conflicts(local: &Snapshot, remote: &Snapshot) -> Vec<Conflict> {
    let mut conflicts = Vec::new();

    for pending in local.pending_monomers() {
        match remote.lookup(pending.polymer_type, &pending.alternate_id) {
            Some(counterpart) => {
                if counterpart.canonical_structure == pending.canonical_structure {
                    debug!(id = %pending.alternate_id, "perfect match, no merge action");
                } else {
                    conflicts.push(Conflict {
                        local: Arc::clone(&pending),
                        remote: Arc::clone(counterpart),
                    });
                }
            }
            None => {
                if let Some(counterpart) = remote.structure_db().get(&pending.canonical_structure)
                {
                    // Same structure known under a different identity.
                    conflicts.push(Conflict {
                        local: Arc::clone(&pending),
                        remote: Arc::clone(counterpart),
                    });
                } else {
                    debug!(id = %pending.alternate_id, "really new monomer");
                }
            }
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use monomerdb_core::types::{Monomer, PolymerType};

    fn snapshot_with(monomers: Vec<Monomer>) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for m in monomers {
            snapshot.insert(Arc::new(m));
        }
        snapshot
    }

    fn monomer(id: &str, structure: &str, pending: bool) -> Monomer {
        let mut m = Monomer::new(PolymerType::Chem, id);
        m.canonical_structure = structure.to_string();
        m.pending = pending;
        m
    }

    #[test]
    fn same_id_different_structure_conflicts() {
        let local = snapshot_with(vec![monomer("Z", "C", true)]);
        let remote = snapshot_with(vec![monomer("Z", "D", false)]);

        let conflicts = find_conflicts(&local, &remote);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].local.alternate_id, "Z");
        assert_eq!(conflicts[0].remote.canonical_structure, "D");
    }

    #[test]
    fn perfect_match_is_not_a_conflict() {
        let local = snapshot_with(vec![monomer("Z", "C", true)]);
        let remote = snapshot_with(vec![monomer("z", "C", false)]);
        assert!(find_conflicts(&local, &remote).is_empty());
    }

    #[test]
    fn same_structure_under_different_identity_conflicts() {
        let local = snapshot_with(vec![monomer("LOCAL", "CCO", true)]);
        let remote = snapshot_with(vec![monomer("ETOH", "CCO", false)]);

        let conflicts = find_conflicts(&local, &remote);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].remote.alternate_id, "ETOH");
    }

    #[test]
    fn truly_new_monomer_passes() {
        let local = snapshot_with(vec![monomer("NEW", "CCCC", true)]);
        let remote = snapshot_with(vec![monomer("ETOH", "CCO", false)]);
        assert!(find_conflicts(&local, &remote).is_empty());
    }

    #[test]
    fn committed_monomers_are_never_checked() {
        let local = snapshot_with(vec![monomer("Z", "C", false)]);
        let remote = snapshot_with(vec![monomer("Z", "D", false)]);
        assert!(find_conflicts(&local, &remote).is_empty());
    }
}
