// Environment for variable bindings inside a source-defined call

use crate::runtime::values::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Scope chain for the evaluator. A call gets one environment whose parent holds the
/// callable's captures.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    parent: Option<Arc<Environment>>,
    bindings: HashMap<String, Value>,
}

impl Environment {
    /// Creates a new, empty root environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a root environment pre-populated with `bindings`.
    pub fn from_bindings(bindings: HashMap<String, Value>) -> Self {
        Environment {
            parent: None,
            bindings,
        }
    }

    /// Creates a new child environment that inherits from a parent.
    pub fn with_parent(parent: Arc<Environment>) -> Self {
        Environment {
            parent: Some(parent),
            bindings: HashMap::new(),
        }
    }

    /// Looks up a name by searching the current environment and then its parents.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.lookup(name)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
            || self.parent.as_ref().map_or(false, |p| p.contains(name))
    }

    /// Defines a new variable or updates an existing one in the current scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }

    /// Flattens the chain into one map; inner bindings shadow outer ones.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let mut flat = self
            .parent
            .as_ref()
            .map(|p| p.snapshot())
            .unwrap_or_default();
        flat.extend(
            self.bindings
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_shadows_parent() {
        let mut root = Environment::new();
        root.define("k", Value::Number(1.0));
        root.define("j", Value::Number(2.0));
        let mut child = Environment::with_parent(Arc::new(root));
        child.define("k", Value::Number(10.0));

        assert_eq!(child.lookup("k"), Some(Value::Number(10.0)));
        assert_eq!(child.lookup("j"), Some(Value::Number(2.0)));
        assert_eq!(child.lookup("missing"), None);

        let flat = child.snapshot();
        assert_eq!(flat.len(), 2);
        assert_eq!(flat["k"], Value::Number(10.0));
    }
}
