//! Semantic store documents and query results.

use serde::{Deserialize, Serialize};

/// A text document written into a semantic store collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: serde_json::Value) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// A ranked fragment returned by a semantic query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub similarity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_defaults_missing_metadata() {
        let frag: ScoredFragment =
            serde_json::from_str(r#"{"content":"c","similarity":0.5}"#).unwrap();
        assert!(frag.metadata.is_null());
        assert!((frag.similarity - 0.5).abs() < f64::EPSILON);
    }
}
