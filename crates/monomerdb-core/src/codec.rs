//! Transport codec for embedded structure payloads (base64 over
//! UTF-8 text). Callers treat decode failure as "already plain text".

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::errors::StoreError;

/// Encode a structure payload for embedding in a document or wire
/// record.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Decode an embedded structure payload.
pub fn decode(payload: &str) -> Result<String, StoreError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| StoreError::Deserialization {
            message: format!("structure payload is not base64: {e}"),
        })?;
    String::from_utf8(bytes).map_err(|e| StoreError::Deserialization {
        message: format!("structure payload is not UTF-8: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let molfile = "\n  Marvin  01010000002D\n\n  0  0  0  0  0  0  999 V2000\nM  END\n";
        assert_eq!(decode(&encode(molfile)).unwrap(), molfile);
    }

    #[test]
    fn plain_text_fails_decoding() {
        assert!(matches!(
            decode("not base64 at all!"),
            Err(StoreError::Deserialization { .. })
        ));
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let encoded = format!("  {}\n", encode("CCO"));
        assert_eq!(decode(&encoded).unwrap(), "CCO");
    }
}
