//! Remote monomer collection loader.
//!
//! One client per polymer type; the request target is the configured
//! base URL with the polymer type appended. Records are decoded field
//! by field so the service can add or reorder fields freely.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use monomerdb_core::codec;
use monomerdb_core::errors::StoreError;
use monomerdb_core::types::{Attachment, Monomer, PolymerType, SymbolKey};
use monomerdb_core::validate;

/// Blocking client for one polymer type's monomer collection.
pub struct MonomerClient {
    base_url: String,
    polymer_type: PolymerType,
    http: reqwest::blocking::Client,
}

impl MonomerClient {
    pub fn new(base_url: impl Into<String>, polymer_type: PolymerType) -> Self {
        Self {
            base_url: base_url.into(),
            polymer_type,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Fetch and decode the monomer collection for this client's
    /// polymer type. Any non-200 response is fatal. Decoded
    /// attachments are reconciled against `catalog` (see
    /// [`decode_monomer_collection`]).
    pub fn fetch(
        &self,
        catalog: &BTreeMap<SymbolKey, Attachment>,
    ) -> Result<BTreeMap<SymbolKey, Arc<Monomer>>, StoreError> {
        let url = format!("{}{}", self.base_url, self.polymer_type);
        debug!(%url, "fetching monomer collection");

        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| StoreError::RemoteLoad {
                message: format!("GET {url} failed: {e}"),
            })?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(StoreError::RemoteLoad {
                message: format!("GET {url} returned {}", response.status()),
            });
        }

        let body: Value = response.json().map_err(|e| StoreError::RemoteLoad {
            message: format!("GET {url} returned an unreadable body: {e}"),
        })?;

        let monomers = decode_monomer_collection(&body, self.polymer_type, catalog)?;
        debug!(count = monomers.len(), polymer_type = %self.polymer_type, "monomers loaded");
        Ok(monomers)
    }
}

/// Decode a monomer collection body. Unknown fields are ignored;
/// records that never receive an identity field are dropped rather
/// than inserted under an empty key.
pub fn decode_monomer_collection(
    body: &Value,
    polymer_type: PolymerType,
    catalog: &BTreeMap<SymbolKey, Attachment>,
) -> Result<BTreeMap<SymbolKey, Arc<Monomer>>, StoreError> {
    let mut monomers = BTreeMap::new();

    let records: &[Value] = match body {
        Value::Array(records) => records,
        Value::Object(_) => std::slice::from_ref(body),
        _ => &[],
    };

    for record in records {
        if let Some(monomer) = decode_monomer(record, polymer_type, catalog)? {
            monomers.insert(SymbolKey::new(&monomer.alternate_id), Arc::new(monomer));
        }
    }

    Ok(monomers)
}

fn decode_monomer(
    record: &Value,
    polymer_type: PolymerType,
    catalog: &BTreeMap<SymbolKey, Attachment>,
) -> Result<Option<Monomer>, StoreError> {
    let Some(fields) = record.as_object() else {
        return Ok(None);
    };

    let mut monomer = Monomer::new(polymer_type, "");
    for (name, value) in fields {
        match name.as_str() {
            "id" => monomer.id = integer(value),
            // "symbol" is the service's newer spelling of the identity
            // field.
            "alternateId" | "symbol" => monomer.alternate_id = text(value),
            "name" => monomer.name = text(value),
            "naturalAnalog" => monomer.natural_analog = text(value),
            // "smiles" aliases the canonical structure field.
            "canSMILES" | "smiles" => monomer.canonical_structure = text(value),
            "molfile" => {
                let payload = text(value);
                monomer.structure_body = match codec::decode(&payload) {
                    Ok(plain) => plain,
                    Err(_) => {
                        debug!("structure payload was not transport-encoded, keeping raw text");
                        payload
                    }
                };
            }
            "monomerType" => monomer.monomer_type = text(value),
            "polymerType" => {
                if let Ok(pt) = text(value).parse() {
                    monomer.polymer_type = pt;
                }
            }
            "attachmentList" | "rgroups" => {
                monomer.attachments = decode_attachment_list(value, catalog)?;
            }
            "newMonomer" => monomer.pending = boolean(value),
            "adHocMonomer" => monomer.ad_hoc = boolean(value),
            _ => {}
        }
    }

    // Degenerate record without an identity field.
    if monomer.alternate_id.is_empty() {
        return Ok(None);
    }
    Ok(Some(monomer))
}

/// Decode a nested attachment list. Only fully defined attachments
/// are kept, and each kept attachment takes its cap group SMILES from
/// the catalog entry for its id; a missing catalog entry is a fault.
fn decode_attachment_list(
    value: &Value,
    catalog: &BTreeMap<SymbolKey, Attachment>,
) -> Result<Vec<Attachment>, StoreError> {
    let mut attachments = Vec::new();
    let Some(records) = value.as_array() else {
        return Ok(attachments);
    };

    for record in records {
        let Some(fields) = record.as_object() else {
            continue;
        };

        let mut attachment = Attachment::default();
        for (name, value) in fields {
            match name.as_str() {
                "id" => attachment.id = integer(value),
                "alternateId" => attachment.alternate_id = text(value),
                "label" => attachment.label = text(value),
                "capGroupName" => attachment.cap_group_name = text(value),
                "capGroupSMILES" => attachment.cap_group_smiles = text(value),
                _ => {}
            }
        }

        if !validate::attachment_is_valid(&attachment) {
            continue;
        }
        let catalog_entry = catalog
            .get(&SymbolKey::new(&attachment.alternate_id))
            .ok_or_else(|| StoreError::AttachmentLookup {
                alternate_id: attachment.alternate_id.clone(),
            })?;
        attachment.cap_group_smiles = catalog_entry.cap_group_smiles.clone();
        attachments.push(attachment);
    }

    Ok(attachments)
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn boolean(value: &Value) -> bool {
    value
        .as_bool()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> BTreeMap<SymbolKey, Attachment> {
        let mut catalog = BTreeMap::new();
        for (id, label, smiles) in [
            ("R1-H", "R1", "[*][H] |$_R1$|"),
            ("R2-OH", "R2", "O[*] |$_R2$|"),
        ] {
            catalog.insert(
                SymbolKey::new(id),
                Attachment {
                    id: None,
                    alternate_id: id.to_string(),
                    label: label.to_string(),
                    cap_group_name: label.to_string(),
                    cap_group_smiles: smiles.to_string(),
                },
            );
        }
        catalog
    }

    #[test]
    fn decodes_records_with_alias_fields() {
        let body = json!([
            {"alternateId": "A", "smiles": "CC", "rgroups": []},
            {"alternateId": "B", "attachmentList": []}
        ]);
        let monomers =
            decode_monomer_collection(&body, PolymerType::Peptide, &catalog()).unwrap();
        assert_eq!(monomers.len(), 2);
        let a = &monomers[&SymbolKey::new("A")];
        assert_eq!(a.canonical_structure, "CC");
        assert!(a.attachments.is_empty());
        assert!(monomers[&SymbolKey::new("B")].attachments.is_empty());
    }

    #[test]
    fn symbol_populates_the_identity_field() {
        let body = json!([{"symbol": "dA", "canSMILES": "C1CC1"}]);
        let monomers = decode_monomer_collection(&body, PolymerType::Rna, &catalog()).unwrap();
        assert_eq!(monomers[&SymbolKey::new("dA")].alternate_id, "dA");
    }

    #[test]
    fn identityless_record_is_dropped() {
        let body = json!([
            {"name": "no identity here", "smiles": "CCO"},
            {"alternateId": "X"}
        ]);
        let monomers = decode_monomer_collection(&body, PolymerType::Chem, &catalog()).unwrap();
        assert_eq!(monomers.len(), 1);
        assert!(monomers.contains_key(&SymbolKey::new("X")));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = json!([{
            "alternateId": "A",
            "somethingNew": {"nested": true},
            "author": "catalog team"
        }]);
        let monomers = decode_monomer_collection(&body, PolymerType::Peptide, &catalog()).unwrap();
        assert_eq!(monomers.len(), 1);
    }

    #[test]
    fn molfile_payload_falls_back_to_raw_text() {
        let encoded = codec::encode("M  END");
        let body = json!([
            {"alternateId": "A", "molfile": encoded},
            {"alternateId": "B", "molfile": "not base64!"}
        ]);
        let monomers = decode_monomer_collection(&body, PolymerType::Chem, &catalog()).unwrap();
        assert_eq!(monomers[&SymbolKey::new("A")].structure_body, "M  END");
        assert_eq!(monomers[&SymbolKey::new("B")].structure_body, "not base64!");
    }

    #[test]
    fn attachment_smiles_comes_from_the_catalog() {
        let body = json!([{
            "alternateId": "A",
            "attachmentList": [{
                "alternateId": "R1-H",
                "label": "R1",
                "capGroupName": "H",
                "capGroupSMILES": "stale payload value"
            }]
        }]);
        let monomers = decode_monomer_collection(&body, PolymerType::Peptide, &catalog()).unwrap();
        let attachments = &monomers[&SymbolKey::new("A")].attachments;
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].cap_group_smiles, "[*][H] |$_R1$|");
    }

    #[test]
    fn missing_catalog_entry_is_a_fault() {
        let body = json!([{
            "alternateId": "A",
            "attachmentList": [{
                "alternateId": "R9-X",
                "label": "R9",
                "capGroupName": "X",
                "capGroupSMILES": "X[*]"
            }]
        }]);
        let err = decode_monomer_collection(&body, PolymerType::Peptide, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::AttachmentLookup { alternate_id } if alternate_id == "R9-X"
        ));
    }

    #[test]
    fn partially_defined_attachment_is_not_kept() {
        let body = json!([{
            "alternateId": "A",
            "attachmentList": [{"alternateId": "R1-H", "label": "R1"}]
        }]);
        let monomers = decode_monomer_collection(&body, PolymerType::Peptide, &catalog()).unwrap();
        assert!(monomers[&SymbolKey::new("A")].attachments.is_empty());
    }

    #[test]
    fn pending_and_ad_hoc_flags_decode_from_strings() {
        let body = json!([{
            "alternateId": "A",
            "newMonomer": "true",
            "adHocMonomer": true
        }]);
        let monomers = decode_monomer_collection(&body, PolymerType::Chem, &catalog()).unwrap();
        let a = &monomers[&SymbolKey::new("A")];
        assert!(a.pending);
        assert!(a.ad_hoc);
    }
}
