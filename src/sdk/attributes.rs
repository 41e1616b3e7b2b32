// SPDX-License-Identifier: MIT

//! Request-scoped attribute storage
//!
//! Public attributes are JSON values visible to policies and to condition
//! expressions (`context.attributes.<name>`). Internal attributes are typed
//! values private to the gateway core (cached flow sets, stage markers).

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;

/// Public, JSON-valued attributes of a request
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    fields: HashMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous value
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Get an attribute as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Get a nested value using dot notation (e.g. "user.tier").
    ///
    /// Attribute names may themselves contain dots (`client.tier.override`),
    /// so the longest matching key prefix wins before descending.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.fields.get(path) {
            return Some(v);
        }

        let parts: Vec<&str> = path.split('.').collect();
        for split in (1..parts.len()).rev() {
            let key = parts[..split].join(".");
            if let Some(root) = self.fields.get(&key) {
                let mut current = root;
                for part in &parts[split..] {
                    current = current.get(part)?;
                }
                return Some(current);
            }
        }
        None
    }

    /// Convert attributes to a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.fields.keys()
    }
}

/// Typed, internal attributes of a request
#[derive(Default)]
pub struct InternalAttributes {
    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl InternalAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Get a value; `None` when absent or stored under another type
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }
}

impl std::fmt::Debug for InternalAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_set_and_get() {
        let mut attrs = Attributes::new();
        attrs.set("plan", json!("gold"));
        assert_eq!(attrs.get_str("plan"), Some("gold"));
        assert!(attrs.get("missing").is_none());
    }

    #[test]
    fn test_overwrite_and_remove() {
        let mut attrs = Attributes::new();
        attrs.set("value", json!("first"));
        attrs.set("value", json!("second"));
        assert_eq!(attrs.get("value"), Some(&json!("second")));

        assert_eq!(attrs.remove("value"), Some(json!("second")));
        assert!(attrs.get("value").is_none());
    }

    #[test]
    fn test_get_path() {
        let mut attrs = Attributes::new();
        attrs.set("user", json!({"profile": {"tier": "gold"}}));

        assert_eq!(attrs.get_path("user.profile.tier"), Some(&json!("gold")));
        assert_eq!(
            attrs.get_path("user.profile"),
            Some(&json!({"tier": "gold"}))
        );
        assert_eq!(attrs.get_path("user.nonexistent"), None);
    }

    #[test]
    fn test_get_path_with_dotted_key() {
        let mut attrs = Attributes::new();
        attrs.set("gateway.attribute.plan", json!("silver"));
        attrs.set("gateway.attribute.app", json!({"id": "app-1"}));

        assert_eq!(
            attrs.get_path("gateway.attribute.plan"),
            Some(&json!("silver"))
        );
        assert_eq!(
            attrs.get_path("gateway.attribute.app.id"),
            Some(&json!("app-1"))
        );
    }

    #[test]
    fn test_to_json() {
        let mut attrs = Attributes::new();
        attrs.set("a", json!(1));
        attrs.set("b", json!("hello"));

        let json = attrs.to_json();
        assert_eq!(json["a"], 1);
        assert_eq!(json["b"], "hello");
    }

    #[test]
    fn test_internal_typed_access() {
        let mut internal = InternalAttributes::new();
        internal.set("flows", Arc::new(vec!["a".to_string()]));
        internal.set("matched", true);

        assert_eq!(internal.get::<bool>("matched"), Some(&true));
        assert_eq!(
            internal.get::<Arc<Vec<String>>>("flows").map(|v| v.len()),
            Some(1)
        );
        // Wrong type reads as absent
        assert!(internal.get::<String>("matched").is_none());
    }

    #[test]
    fn test_internal_remove() {
        let mut internal = InternalAttributes::new();
        internal.set("stage", "api".to_string());
        assert!(internal.contains("stage"));
        assert!(internal.remove("stage"));
        assert!(!internal.contains("stage"));
        assert!(!internal.remove("stage"));
    }
}
