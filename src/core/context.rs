//! Pipeline context - the key-value bag threaded through step hooks

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Data shared between the steps of one pipeline run
///
/// Steps communicate exclusively through the context: one step writes a
/// value, a later step reads it. The context is persisted alongside the
/// step position, so everything in it must survive a JSON round-trip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value under a key
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a string value by key
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Remove a value, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Merge collected input into the context, overwriting existing keys
    pub fn merge<I>(&mut self, input: I)
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        self.values.extend(input);
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the context holds no entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = Context::new();
        ctx.set("choice", "B");

        assert_eq!(ctx.get_str("choice"), Some("B"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut ctx = Context::new();
        ctx.set("a", 1);
        ctx.merge(vec![("a".to_string(), json!(2)), ("b".to_string(), json!(3))]);

        assert_eq!(ctx.get("a"), Some(&json!(2)));
        assert_eq!(ctx.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_json_round_trip() {
        let mut ctx = Context::new();
        ctx.set("rows", json!([{"id": 1}, {"id": 2}]));
        ctx.set("label", "import");

        let encoded = serde_json::to_string(&ctx).unwrap();
        let decoded: Context = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ctx);
    }
}
