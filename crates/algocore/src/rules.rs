use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Multi-valued mapping from a source slot's base name to one or more
/// destination base names on the receiving node.
///
/// Outputs propagate without an entry (identity passthrough); parameters
/// propagate only when an entry names them. When a source name maps to
/// several destinations, the destination whose name contains the source
/// node's label wins, otherwise the first declared one is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropagationRules {
    rules: HashMap<String, Vec<String>>,
}

impl PropagationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a rule table from `(source, destination)` pairs.
    pub fn from_pairs<I, S, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut rules = Self::new();
        for (source, destination) in pairs {
            rules.insert(source, destination);
        }
        rules
    }

    /// Append one destination for `source`. Repeated inserts for the same
    /// source accumulate.
    pub fn insert(&mut self, source: impl Into<String>, destination: impl Into<String>) {
        self.rules.entry(source.into()).or_default().push(destination.into());
    }

    pub fn contains(&self, source: &str) -> bool {
        self.rules.contains_key(source)
    }

    pub fn destinations(&self, source: &str) -> &[String] {
        self.rules.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Pick the destination for `source` coming from a node labelled
    /// `source_label`. Returns `None` when no entry exists.
    pub fn resolve(&self, source: &str, source_label: &str) -> Option<&str> {
        let destinations = self.rules.get(source)?;
        if destinations.len() > 1 && !source_label.is_empty() {
            if let Some(by_label) = destinations.iter().find(|d| d.contains(source_label)) {
                return Some(by_label);
            }
        }
        destinations.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Decode a table from the factory parameter surface: an object mapping
    /// each source name to a destination string or an array of them.
    pub fn from_value(value: &Value) -> Option<Self> {
        let Value::Object(entries) = value else {
            return None;
        };
        let mut rules = Self::new();
        for (source, destination) in entries {
            match destination {
                Value::String(d) => rules.insert(source.clone(), d.clone()),
                Value::Array(items) => {
                    for item in items {
                        rules.insert(source.clone(), item.as_str()?.to_string());
                    }
                }
                _ => return None,
            }
        }
        Some(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_destination_containing_label() {
        let mut rules = PropagationRules::new();
        rules.insert("Numbers", "LeftArray");
        rules.insert("Numbers", "RightArray");
        assert_eq!(rules.resolve("Numbers", "Right"), Some("RightArray"));
        assert_eq!(rules.resolve("Numbers", "Left"), Some("LeftArray"));
    }

    #[test]
    fn resolve_falls_back_to_first_declared() {
        let mut rules = PropagationRules::new();
        rules.insert("Numbers", "LeftArray");
        rules.insert("Numbers", "RightArray");
        assert_eq!(rules.resolve("Numbers", "nothing-matches"), Some("LeftArray"));
        assert_eq!(rules.resolve("Numbers", ""), Some("LeftArray"));
    }

    #[test]
    fn resolve_without_entry_is_none() {
        let rules = PropagationRules::from_pairs([("A", "B")]);
        assert_eq!(rules.resolve("C", "x"), None);
    }

    #[test]
    fn decodes_from_value_object() {
        let mut entries = std::collections::HashMap::new();
        entries.insert("PickedElement".to_string(), Value::from("Array"));
        entries.insert(
            "Numbers".to_string(),
            Value::Array(vec![Value::from("A"), Value::from("B")]),
        );
        let rules = PropagationRules::from_value(&Value::Object(entries)).unwrap();
        assert_eq!(rules.resolve("PickedElement", ""), Some("Array"));
        assert_eq!(rules.destinations("Numbers").len(), 2);
    }

    #[test]
    fn rejects_non_object_encodings() {
        assert!(PropagationRules::from_value(&Value::from("Array")).is_none());
    }
}
