//! Field-level structural validation for monomers and attachments.

use std::collections::HashSet;

use crate::types::{Attachment, Monomer};

/// An attachment is fully defined only when its label, cap group
/// name, and cap group SMILES are all present.
pub fn attachment_is_valid(attachment: &Attachment) -> bool {
    !attachment.label.is_empty()
        && !attachment.cap_group_name.is_empty()
        && !attachment.cap_group_smiles.is_empty()
}

/// Structural completeness check applied to every monomer of a
/// bootstrap candidate. Failing monomers are dropped from their
/// polymer-type bucket, not fatal to the candidate.
pub fn monomer_is_valid(monomer: &Monomer) -> bool {
    if monomer.alternate_id.is_empty() {
        return false;
    }
    if !monomer.attachments.iter().all(attachment_is_valid) {
        return false;
    }
    // Attachment point labels must be distinct within one monomer.
    let mut labels = HashSet::new();
    monomer.attachments.iter().all(|a| labels.insert(&a.label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolymerType;

    fn full_attachment(id: &str, label: &str) -> Attachment {
        Attachment {
            id: None,
            alternate_id: id.to_string(),
            label: label.to_string(),
            cap_group_name: "H".to_string(),
            cap_group_smiles: "[*][H] |$_R1$|".to_string(),
        }
    }

    #[test]
    fn attachment_requires_all_three_fields() {
        let mut a = full_attachment("R1-H", "R1");
        assert!(attachment_is_valid(&a));
        a.cap_group_smiles.clear();
        assert!(!attachment_is_valid(&a));
    }

    #[test]
    fn monomer_requires_identity() {
        let m = Monomer::new(PolymerType::Chem, "");
        assert!(!monomer_is_valid(&m));
        let m = Monomer::new(PolymerType::Chem, "SMCC");
        assert!(monomer_is_valid(&m));
    }

    #[test]
    fn monomer_rejects_duplicate_attachment_labels() {
        let mut m = Monomer::new(PolymerType::Peptide, "A");
        m.attachments.push(full_attachment("R1-H", "R1"));
        m.attachments.push(full_attachment("R1-OH", "R1"));
        assert!(!monomer_is_valid(&m));
    }

    #[test]
    fn monomer_rejects_partial_attachments() {
        let mut m = Monomer::new(PolymerType::Peptide, "A");
        let mut partial = full_attachment("R2-OH", "R2");
        partial.cap_group_name.clear();
        m.attachments.push(partial);
        assert!(!monomer_is_valid(&m));
    }
}
