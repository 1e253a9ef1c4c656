//! Scoped template mapping context.
//!
//! Values set inside a scope disappear when the scope is popped, so a value
//! bound for one template (for example the current element of a sequence)
//! can never leak into an unrelated template rendered later.

use indexmap::IndexMap;
use serde_json::Value;

/// Stack of string-keyed value scopes used for placeholder substitution
/// and condition evaluation. Lookups search the innermost scope first.
#[derive(Debug, Clone)]
pub struct TemplateMappings {
    scopes: Vec<IndexMap<String, Value>>,
}

impl Default for TemplateMappings {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateMappings {
    /// Creates mappings with a single, empty base scope.
    pub fn new() -> Self {
        Self { scopes: vec![IndexMap::new()] }
    }

    /// Creates mappings whose base scope holds `values`.
    pub fn from_values(values: IndexMap<String, Value>) -> Self {
        Self { scopes: vec![values] }
    }

    /// Sets `key` in the innermost scope.
    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(key.into(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scopes.iter().rev().find_map(|scope| scope.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    /// Drops the innermost scope. The base scope is never removed.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of open scopes, including the base scope.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Runs `f` inside a fresh scope that is popped afterwards, whether `f`
    /// succeeded or not.
    pub fn with_scope<T, F>(&mut self, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.push_scope();
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Flattens all scopes into one map; inner values shadow outer ones.
    pub fn flatten(&self) -> IndexMap<String, Value> {
        let mut values = IndexMap::new();
        for scope in &self.scopes {
            for (key, value) in scope {
                values.insert(key.clone(), value.clone());
            }
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inner_scope_shadows_and_is_dropped() {
        let mut mappings = TemplateMappings::new();
        mappings.set("name", "outer");

        mappings.with_scope(|inner| {
            inner.set("name", "inner");
            inner.set("element", json!(["a"]));
            assert_eq!(inner.get("name"), Some(&json!("inner")));
        });

        assert_eq!(mappings.get("name"), Some(&json!("outer")));
        assert!(!mappings.contains_key("element"));
        assert_eq!(mappings.depth(), 1);
    }

    #[test]
    fn test_base_scope_survives_pop() {
        let mut mappings = TemplateMappings::new();
        mappings.set("a", 1);
        mappings.pop_scope();
        assert_eq!(mappings.get("a"), Some(&json!(1)));
    }

    #[test]
    fn test_flatten() {
        let mut mappings = TemplateMappings::new();
        mappings.set("a", "1");
        mappings.push_scope();
        mappings.set("a", "2");
        mappings.set("b", "3");
        let flat = mappings.flatten();
        assert_eq!(flat.get("a"), Some(&json!("2")));
        assert_eq!(flat.len(), 2);
    }
}
