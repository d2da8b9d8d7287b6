//! Subject name normalization for enrollment requests.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// Common name plus the DNS subject alternative names for one certificate.
///
/// After [`SubjectNames::normalize`] the common name is non-empty and appears
/// exactly once in `alt_names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectNames {
    pub common_name: String,
    pub alt_names: Vec<String>,
}

impl SubjectNames {
    /// Normalize caller input.
    ///
    /// Blank alt names are dropped and duplicates collapsed in first-seen
    /// order. An empty common name is replaced by the first alt name; a common
    /// name missing from the alt names is appended to them.
    pub fn normalize(common_name: &str, alt_names: &[String]) -> Result<Self> {
        let mut names: Vec<String> = Vec::with_capacity(alt_names.len() + 1);
        for name in alt_names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
            if !names.iter().any(|existing| existing == name) {
                names.push(name.to_string());
            }
        }

        let common_name = match common_name.trim() {
            "" => names
                .first()
                .cloned()
                .ok_or_else(|| Error::invalid_request("no domains specified on certificate"))?,
            cn => cn.to_string(),
        };

        if !names.contains(&common_name) {
            names.push(common_name.clone());
        }

        Ok(Self { common_name, alt_names: names })
    }
}

/// Split a comma separated `alt_names` argument into individual names.
pub fn parse_alt_names(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}
