//! Configuration parameters handed to a policy's hooks.
//!
//! A policy sees one merged `ParameterSet` per attachment: the values fixed
//! when the policy was constructed, overwritten key-by-key by the values
//! supplied at the attachment site.

use std::collections::BTreeMap;

use serde_json::Value;

/// Immutable name → value configuration map.
///
/// Values are `serde_json::Value` so policies stay loosely typed at the
/// attachment site (`.with("db_name", "backend1")`) while lookups are still
/// explicit (`get_str`, `get_u64`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParameterSet {
    entries: BTreeMap<String, Value>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consuming insert, so sets read as a builder chain.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union of `self` and `overrides`; `overrides` wins on key collision.
    ///
    /// Absent keys are simply absent from the result, there is no error case.
    pub fn merge(&self, overrides: &ParameterSet) -> ParameterSet {
        let mut entries = self.entries.clone();
        for (key, value) in &overrides.entries {
            entries.insert(key.clone(), value.clone());
        }
        ParameterSet { entries }
    }
}

impl FromIterator<(String, Value)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        ParameterSet {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_prefers_override_values() {
        let construction = ParameterSet::new().with("a", 1).with("c", "keep");
        let attachment = ParameterSet::new().with("a", 2).with("b", 3);

        let merged = construction.merge(&attachment);

        assert_eq!(merged.get("a"), Some(&json!(2)));
        assert_eq!(merged.get("b"), Some(&json!(3)));
        assert_eq!(merged.get_str("c"), Some("keep"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn merge_does_not_mutate_inputs() {
        let construction = ParameterSet::new().with("a", 1);
        let attachment = ParameterSet::new().with("a", 2);

        let _ = construction.merge(&attachment);

        assert_eq!(construction.get("a"), Some(&json!(1)));
        assert_eq!(attachment.get("a"), Some(&json!(2)));
    }

    #[test]
    fn merge_with_empty_is_identity() {
        let params = ParameterSet::new().with("x", "y");

        assert_eq!(params.merge(&ParameterSet::new()), params);
        assert_eq!(ParameterSet::new().merge(&params), params);
    }

    #[test]
    fn typed_getters() {
        let params = ParameterSet::new()
            .with("name", "default")
            .with("count", 7)
            .with("enabled", true);

        assert_eq!(params.get_str("name"), Some("default"));
        assert_eq!(params.get_u64("count"), Some(7));
        assert_eq!(params.get_bool("enabled"), Some(true));
        assert_eq!(params.get_str("count"), None);
        assert!(!params.contains("missing"));
    }
}
