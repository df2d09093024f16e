//! Domain types for the monomer reference store.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

/// The coarse categories a monomer can belong to. Wire spellings are
/// the upper-case forms (`PEPTIDE`, `RNA`, `CHEM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolymerType {
    Peptide,
    Rna,
    Chem,
}

impl PolymerType {
    /// Every polymer type the store partitions monomers by.
    pub const ALL: [PolymerType; 3] = [PolymerType::Peptide, PolymerType::Rna, PolymerType::Chem];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolymerType::Peptide => "PEPTIDE",
            PolymerType::Rna => "RNA",
            PolymerType::Chem => "CHEM",
        }
    }
}

impl fmt::Display for PolymerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PolymerType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PEPTIDE" => Ok(PolymerType::Peptide),
            "RNA" => Ok(PolymerType::Rna),
            "CHEM" => Ok(PolymerType::Chem),
            other => Err(StoreError::Validation {
                message: format!("unknown polymer type '{other}'"),
            }),
        }
    }
}

/// Map key that preserves the original spelling of a monomer or
/// attachment id but compares, orders, and hashes case-insensitively
/// (ASCII). Mirrors the case-insensitive ordered maps the store keys
/// its indices by.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolKey(String);

impl SymbolKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SymbolKey {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl PartialEq for SymbolKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for SymbolKey {}

impl PartialOrd for SymbolKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl Hash for SymbolKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for b in self.0.bytes() {
            state.write_u8(b.to_ascii_lowercase());
        }
    }
}

/// A labeled connection site on a monomer, with the capping group used
/// when the site is unoccupied. Fully defined only when `label`,
/// `cap_group_name`, and `cap_group_smiles` are all non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Option<i64>,
    pub alternate_id: String,
    pub label: String,
    pub cap_group_name: String,
    pub cap_group_smiles: String,
}

impl Attachment {
    pub fn new(alternate_id: impl Into<String>) -> Self {
        Self {
            alternate_id: alternate_id.into(),
            ..Self::default()
        }
    }
}

/// A catalogued chemical building block usable in a macromolecule
/// notation. Identity is `alternate_id`, unique (case-insensitively)
/// within a polymer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monomer {
    /// Source-assigned numeric id, when the source provides one.
    pub id: Option<i64>,
    pub alternate_id: String,
    pub name: String,
    pub natural_analog: String,
    pub monomer_type: String,
    pub polymer_type: PolymerType,
    /// Normalized structure string, used as the dedup key of the
    /// reverse structure index.
    pub canonical_structure: String,
    /// Full structure payload, decoded from its transport encoding
    /// where possible.
    pub structure_body: String,
    pub attachments: Vec<Attachment>,
    /// Session-local addition not yet committed to the authoritative
    /// store.
    pub pending: bool,
    /// User-authored, non-catalog monomer.
    pub ad_hoc: bool,
}

impl Monomer {
    pub fn new(polymer_type: PolymerType, alternate_id: impl Into<String>) -> Self {
        Self {
            alternate_id: alternate_id.into(),
            polymer_type,
            ..Self::default()
        }
    }
}

impl Default for Monomer {
    fn default() -> Self {
        Self {
            id: None,
            alternate_id: String::new(),
            name: String::new(),
            natural_analog: String::new(),
            monomer_type: String::new(),
            polymer_type: PolymerType::Chem,
            canonical_structure: String::new(),
            structure_body: String::new(),
            attachments: Vec::new(),
            pending: false,
            ad_hoc: false,
        }
    }
}

/// One local pending monomer colliding with a remote monomer during
/// merge conflict detection.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub local: Arc<Monomer>,
    pub remote: Arc<Monomer>,
}

/// Editor categorization metadata for one monomer: display grouping,
/// shape, and colors. Consumed by presentation layers, not by the
/// store itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedMonomer {
    pub monomer_id: String,
    pub monomer_name: String,
    pub natural_analog: String,
    pub monomer_type: String,
    pub polymer_type: String,
    pub category: String,
    pub shape: String,
    pub font_color: String,
    pub background_color: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn polymer_type_round_trips_through_strings() {
        for pt in PolymerType::ALL {
            assert_eq!(pt.as_str().parse::<PolymerType>().unwrap(), pt);
        }
        assert_eq!("peptide".parse::<PolymerType>().unwrap(), PolymerType::Peptide);
        assert!("PROTEIN".parse::<PolymerType>().is_err());
    }

    #[test]
    fn symbol_key_is_case_insensitive() {
        assert_eq!(SymbolKey::new("dA"), SymbolKey::new("DA"));

        let mut map = BTreeMap::new();
        map.insert(SymbolKey::new("Abc"), 1);
        assert!(map.contains_key(&SymbolKey::new("aBC")));
        assert_eq!(map.keys().next().unwrap().as_str(), "Abc");
    }

    #[test]
    fn symbol_key_orders_ignoring_case() {
        let mut keys = vec![SymbolKey::new("b"), SymbolKey::new("A"), SymbolKey::new("C")];
        keys.sort();
        let spellings: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(spellings, ["A", "b", "C"]);
    }
}
