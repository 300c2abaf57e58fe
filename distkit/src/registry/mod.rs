//! Native callable registry.
//!
//! Built once from a fixed list of root namespaces into two indices, native identity to qualified
//! name and qualified name to native, and never mutated afterwards. The codec uses it to write a
//! native callable as its qualified name and to resolve that name back to the same `Arc`.

mod namespace;
mod qualified_name;

pub use namespace::{Getter, Member, Namespace, NamespaceBuilder};
pub use qualified_name::QualifiedName;

use crate::runtime::values::{NativeFunction, NativeRef};
use crate::stdlib::{self, console};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use qualified_name::{root_candidates, split_root};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

/// Member names never walked or resolved.
pub const SKIPPED_MEMBERS: &[&str] = &[
    "constructor",
    "prototype",
    "caller",
    "callee",
    "arguments",
    "__proto__",
];

lazy_static! {
    static ref SHARED: Arc<NativeRegistry> = Arc::new(NativeRegistry::builtin());
}

#[derive(Debug)]
pub struct NativeRegistry {
    by_identity: HashMap<usize, QualifiedName>,
    by_name: HashMap<QualifiedName, NativeRef>,
    modules: IndexMap<String, Arc<Namespace>>,
    globals: IndexMap<String, Arc<Namespace>>,
    console_shim: bool,
    // keeps every indexed native alive so its identity cannot be reused
    retained: Vec<NativeRef>,
}

impl NativeRegistry {
    /// Registry over the built-in modules and globals, console shim enabled.
    pub fn builtin() -> Self {
        Self::builtin_with_shim(true)
    }

    pub fn builtin_with_shim(console_shim: bool) -> Self {
        let mut builder = Self::builder().console_shim(console_shim);
        for module in stdlib::modules() {
            builder = builder.module(module);
        }
        for global in stdlib::globals() {
            builder = builder.global(global);
        }
        builder.build()
    }

    pub fn builder() -> NativeRegistryBuilder {
        NativeRegistryBuilder {
            modules: IndexMap::new(),
            globals: IndexMap::new(),
            console_shim: false,
        }
    }

    /// Process-wide built-in registry, built on first use.
    pub fn shared() -> Arc<NativeRegistry> {
        SHARED.clone()
    }

    /// Number of distinct natives indexed.
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    pub fn console_shim(&self) -> bool {
        self.console_shim
    }

    /// Qualified name `native` was registered under.
    pub fn identify(&self, native: &NativeRef) -> Option<QualifiedName> {
        if let Some(name) = self.by_identity.get(&NativeFunction::identity(native)) {
            return Some(name.clone());
        }
        if self.console_shim {
            return console::SHIM_METHODS
                .iter()
                .copied()
                .find(|method| {
                    console::active(method).map_or(false, |active| Arc::ptr_eq(&active, native))
                })
                .map(|method| QualifiedName::new("console", &[method]));
        }
        None
    }

    /// Resolves a qualified name to a native.
    ///
    /// Order: console shim names against the active console, a standard-library module root,
    /// the static name index, then a walk from the global built-ins.
    pub fn resolve(&self, name: &str) -> Option<NativeRef> {
        let (root, path) = split_root(name);

        if let Some(active) = self.shim_lookup(root, &path) {
            trace!(name, "resolved through console shim");
            return Some(active);
        }

        for candidate in root_candidates(root) {
            if let Some(module) = self.modules.get(&candidate) {
                trace!(name, module = candidate.as_str(), "resolving in module");
                if let Some(Member::Function(native)) = walk(module, &path) {
                    return Some(native);
                }
            }
        }

        if let Some(native) = self.by_name.get(&QualifiedName::from(name)) {
            trace!(name, "resolved from name index");
            return Some(native.clone());
        }

        let mut full = vec![root];
        full.extend(path.iter().copied());
        match self.lookup_global(&full) {
            Some(Member::Function(native)) => {
                trace!(name, "resolved from globals");
                Some(native)
            }
            _ => None,
        }
    }

    pub fn global(&self, name: &str) -> Option<&Arc<Namespace>> {
        self.globals.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&Arc<Namespace>> {
        self.modules.get(name)
    }

    /// Reads `path` starting from a global built-in. Getters are evaluated; a failing getter or
    /// a missing member yields `None`.
    pub fn lookup_global(&self, path: &[&str]) -> Option<Member> {
        let (root, rest) = path.split_first()?;
        if let Some(active) = self.shim_lookup(root, rest) {
            return Some(Member::Function(active));
        }
        let namespace = self.globals.get(*root)?;
        if rest.is_empty() {
            return Some(Member::Namespace(namespace.clone()));
        }
        walk(namespace, rest)
    }

    /// Every indexed name, in no particular order.
    pub fn qualified_names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.by_name.keys()
    }

    fn shim_lookup(&self, root: &str, path: &[&str]) -> Option<NativeRef> {
        if !self.console_shim || root != "console" {
            return None;
        }
        match path {
            [method] if console::SHIM_METHODS.contains(method) => console::active(method),
            _ => None,
        }
    }

    fn index(&mut self, name: QualifiedName, native: NativeRef) {
        let identity = NativeFunction::identity(&native);
        if !self.by_identity.contains_key(&identity) {
            self.by_identity.insert(identity, name.clone());
            self.retained.push(native.clone());
        }
        self.by_name.entry(name).or_insert(native);
    }
}

fn walk(namespace: &Arc<Namespace>, path: &[&str]) -> Option<Member> {
    let mut current = Member::Namespace(namespace.clone());
    for segment in path {
        if SKIPPED_MEMBERS.contains(segment) {
            return None;
        }
        let next = match &current {
            Member::Namespace(ns) => ns.get(segment)?.evaluate().ok()?,
            _ => return None,
        };
        current = next;
    }
    Some(current)
}

pub struct NativeRegistryBuilder {
    modules: IndexMap<String, Arc<Namespace>>,
    globals: IndexMap<String, Arc<Namespace>>,
    console_shim: bool,
}

impl NativeRegistryBuilder {
    /// Adds a standard-library module root, named after the namespace.
    pub fn module(mut self, namespace: Arc<Namespace>) -> Self {
        self.modules.insert(namespace.name().to_string(), namespace);
        self
    }

    /// Adds a global built-in root, named after the namespace.
    pub fn global(mut self, namespace: Arc<Namespace>) -> Self {
        self.globals.insert(namespace.name().to_string(), namespace);
        self
    }

    pub fn console_shim(mut self, enabled: bool) -> Self {
        self.console_shim = enabled;
        self
    }

    pub fn build(self) -> NativeRegistry {
        let mut registry = NativeRegistry {
            by_identity: HashMap::new(),
            by_name: HashMap::new(),
            modules: self.modules,
            globals: self.globals,
            console_shim: self.console_shim,
            retained: Vec::new(),
        };
        let roots: Vec<Arc<Namespace>> = registry
            .modules
            .values()
            .chain(registry.globals.values())
            .cloned()
            .collect();

        let mut visited = HashSet::new();
        for root in &roots {
            let mut path = Vec::new();
            collect(&mut registry, root.name(), root, &mut path, &mut visited);
        }
        debug!(
            natives = registry.by_identity.len(),
            names = registry.by_name.len(),
            roots = roots.len(),
            "native registry built"
        );
        registry
    }
}

fn collect(
    registry: &mut NativeRegistry,
    root: &str,
    namespace: &Arc<Namespace>,
    path: &mut Vec<String>,
    visited: &mut HashSet<usize>,
) {
    if !visited.insert(Namespace::identity(namespace)) {
        trace!(root, namespace = namespace.name(), "namespace already visited");
        return;
    }
    for (key, member) in namespace.members() {
        if SKIPPED_MEMBERS.contains(&key) {
            trace!(root, member = key, "skipping reserved member");
            continue;
        }
        let member = match member.evaluate() {
            Ok(member) => member,
            Err(err) => {
                trace!(root, member = key, error = %err, "skipping member whose getter failed");
                continue;
            }
        };
        path.push(key.to_string());
        match member {
            Member::Function(native) => {
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                registry.index(QualifiedName::new(root, &segments), native);
            }
            Member::Namespace(inner) => collect(registry, root, &inner, path, visited),
            Member::Getter(_) => {}
        }
        path.pop();
    }
}
