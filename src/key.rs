//! Stable identity of a structure, used to index cached views.

use crate::depiction::StructurePayload;
use serde::{Deserialize, Serialize};
use std::fmt;

const LINE_NOTATION_PREFIX: &str = "smiles:";
const STRUCTURED_PREFIX: &str = "molfile:";

/// Identity string for a structure.
///
/// Line notation is used verbatim. Connection tables are reduced to a 32-bit
/// rolling hash, so two different tables can collide onto one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoleculeKey(String);

impl MoleculeKey {
    /// `None` when the payload carries no structure at all.
    pub fn from_payload(payload: &StructurePayload) -> Option<Self> {
        if let Some(smiles) = payload.line_notation.as_deref().filter(|s| !s.is_empty()) {
            return Some(Self(format!("{LINE_NOTATION_PREFIX}{smiles}")));
        }
        let molfile = payload.structured.as_deref().filter(|s| !s.is_empty())?;
        Some(Self(format!("{STRUCTURED_PREFIX}{}", rolling_hash(molfile))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MoleculeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `h = h * 31 + unit` over UTF-16 code units with 32-bit wraparound.
pub fn rolling_hash(text: &str) -> i32 {
    text.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_notation_is_used_verbatim() {
        let payload = StructurePayload {
            structured: Some("ignored".into()),
            line_notation: Some("C[C@H](O)N".into()),
        };
        assert_eq!(
            MoleculeKey::from_payload(&payload).unwrap().as_str(),
            "smiles:C[C@H](O)N"
        );
    }

    #[test]
    fn structured_text_is_hashed() {
        let key = MoleculeKey::from_payload(&StructurePayload::from_structured("abc")).unwrap();
        assert_eq!(key.as_str(), "molfile:96354");
        assert_eq!(MoleculeKey::from_payload(&StructurePayload::default()), None);
    }

    #[test]
    fn hash_wraps_to_signed_32_bits() {
        let long = "z".repeat(64);
        let expected = long
            .bytes()
            .fold(0i64, |h, b| ((h * 31 + i64::from(b)) as i32).into());
        assert_eq!(i64::from(rolling_hash(&long)), expected);
        assert_eq!(rolling_hash(""), 0);
    }

    #[test]
    fn colliding_tables_share_a_key() {
        let a = MoleculeKey::from_payload(&StructurePayload::from_structured("Aa")).unwrap();
        let b = MoleculeKey::from_payload(&StructurePayload::from_structured("BB")).unwrap();
        assert_eq!(a, b);
    }
}
