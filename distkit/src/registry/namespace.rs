// Static namespace tables the registry is built from

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::Heap;
use crate::runtime::values::{Arity, NativeFunction, NativeRef, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Member computed when it is read.
pub type Getter = Arc<dyn Fn() -> RuntimeResult<Member> + Send + Sync>;

#[derive(Clone)]
pub enum Member {
    Function(NativeRef),
    Namespace(Arc<Namespace>),
    Getter(Getter),
}

impl Member {
    /// Evaluates getters; other members are returned as they are.
    pub fn evaluate(&self) -> RuntimeResult<Member> {
        match self {
            Member::Getter(get) => match get()? {
                Member::Getter(_) => Err(RuntimeError::new("getter returned another getter")),
                member => Ok(member),
            },
            other => Ok(other.clone()),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Function(func) => write!(f, "Function({})", func.name),
            Member::Namespace(ns) => write!(f, "Namespace({})", ns.name),
            Member::Getter(_) => write!(f, "Getter"),
        }
    }
}

/// A named, ordered table of members.
#[derive(Debug)]
pub struct Namespace {
    name: String,
    members: IndexMap<String, Member>,
}

impl Namespace {
    pub fn builder(name: &str) -> NamespaceBuilder {
        NamespaceBuilder {
            name: name.to_string(),
            members: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, member: &str) -> Option<&Member> {
        self.members.get(member)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn identity(this: &Arc<Namespace>) -> usize {
        Arc::as_ptr(this) as usize
    }
}

pub struct NamespaceBuilder {
    name: String,
    members: IndexMap<String, Member>,
}

impl NamespaceBuilder {
    /// Adds a native function named after its member key.
    pub fn function<F>(self, name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(&mut Heap, Vec<Value>) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        let native = NativeFunction::new(name, arity, func);
        self.native(name, native)
    }

    pub fn native(mut self, name: &str, native: NativeRef) -> Self {
        self.members
            .insert(name.to_string(), Member::Function(native));
        self
    }

    pub fn namespace(mut self, name: &str, namespace: Arc<Namespace>) -> Self {
        self.members
            .insert(name.to_string(), Member::Namespace(namespace));
        self
    }

    pub fn getter<F>(mut self, name: &str, get: F) -> Self
    where
        F: Fn() -> RuntimeResult<Member> + Send + Sync + 'static,
    {
        self.members
            .insert(name.to_string(), Member::Getter(Arc::new(get)));
        self
    }

    pub fn build(self) -> Arc<Namespace> {
        Arc::new(Namespace {
            name: self.name,
            members: self.members,
        })
    }
}
