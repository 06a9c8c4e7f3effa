use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Options for turning JSON/CBOR input into a document.
///
/// Every field has a default, so a partial JSON object is a valid config:
/// `{"column_spare_slots": 8}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocConfig {
    /// Store homogeneous numeric or boolean arrays as typed columns.
    pub columnize_arrays: bool,

    /// Extra null slots reserved behind the live elements of each new column.
    pub column_spare_slots: u64,

    /// Deepest container nesting accepted from input.
    pub max_depth: usize,
}

impl Default for DocConfig {
    fn default() -> Self {
        DocConfig {
            columnize_arrays: true,
            column_spare_slots: 0,
            max_depth: 128,
        }
    }
}

impl DocConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = DocConfig::from_json_str(r#"{"column_spare_slots": 8}"#).unwrap();
        assert_eq!(config.column_spare_slots, 8);
        assert!(config.columnize_arrays);
        assert_eq!(config.max_depth, 128);
    }

    #[test]
    fn test_bad_config_is_json_error() {
        assert!(DocConfig::from_json_str(r#"{"max_depth": "deep"}"#).is_err());
    }
}
