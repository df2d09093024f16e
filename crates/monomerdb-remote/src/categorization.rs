//! Editor categorization feed: display grouping, shape, and colors
//! keyed by an external monomer id. Consumed by presentation layers.

use serde_json::Value;
use tracing::debug;

use monomerdb_core::errors::StoreError;
use monomerdb_core::types::CategorizedMonomer;

/// Fetch and decode the categorization feed. Any non-200 response is
/// fatal.
pub fn fetch_categorization(url: &str) -> Result<Vec<CategorizedMonomer>, StoreError> {
    let response = reqwest::blocking::get(url).map_err(|e| StoreError::RemoteLoad {
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

    let entries = decode_categorization(&body);
    debug!(count = entries.len(), "categorization entries loaded");
    Ok(entries)
}

/// Decode categorization records with the same tolerant field table
/// used for monomers. Every object yields an entry; unknown fields
/// are ignored.
pub fn decode_categorization(body: &Value) -> Vec<CategorizedMonomer> {
    let Some(records) = body.as_array() else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for record in records {
        let Some(fields) = record.as_object() else {
            continue;
        };

        let mut entry = CategorizedMonomer::default();
        for (name, value) in fields {
            let text = value.as_str().unwrap_or_default().to_string();
            match name.as_str() {
                "monomerID" => entry.monomer_id = text,
                "monomerName" => entry.monomer_name = text,
                "naturalAnalogon" => entry.natural_analog = text,
                "monomerType" => entry.monomer_type = text,
                "polymerType" => entry.polymer_type = text,
                "category" => entry.category = text,
                "shape" => entry.shape = text,
                "fontColor" => entry.font_color = text,
                "backgroundColor" => entry.background_color = text,
                _ => {}
            }
        }
        entries.push(entry);
    }
    entries
}
