// Runtime value system for distkit
// Scalars are held inline; composites and source-defined callables live in the heap arena.

use crate::ast::FunctionDef;
use crate::parser::{self, ParseError};
use crate::runtime::error::RuntimeResult;
use crate::runtime::heap::{Handle, Heap};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub enum Value {
    Null,
    Undefined,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Host symbol; has no wire representation.
    Symbol(String),
    /// Arbitrary-precision integer; has no wire representation.
    BigInt(i128),
    Native(NativeRef),
    Ref(Handle),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Undefined => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !(*n == 0.0 || n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::BigInt(i) => *i != 0,
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Null | Value::Undefined)
    }

    /// Type name of an inline value. Heap values report `object`; use
    /// [`Heap::type_name`] for the precise name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::BigInt(_) => "bigint",
            Value::Native(_) => "function",
            Value::Ref(_) => "object",
        }
    }

    pub fn as_handle(&self) -> Option<Handle> {
        match self {
            Value::Ref(h) => Some(*h),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Strict equality: numbers by IEEE comparison, natives and heap values by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => Arc::ptr_eq(a, b),
            (Value::Ref(a), Value::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Undefined => write!(f, "Undefined"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Symbol(s) => write!(f, "Symbol({:?})", s),
            Value::BigInt(i) => write!(f, "BigInt({})", i),
            Value::Native(func) => write!(f, "Native({})", func.name),
            Value::Ref(h) => write!(f, "Ref({})", h),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NativeRef> for Value {
    fn from(f: NativeRef) -> Self {
        Value::Native(f)
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Value::Ref(h)
    }
}

/// Signature of a host-provided function.
pub type NativeFn = dyn Fn(&mut Heap, Vec<Value>) -> RuntimeResult<Value> + Send + Sync;

/// Shared handle to a native function; its identity is the `Arc` allocation.
pub type NativeRef = Arc<NativeFunction>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: Arity,
    pub func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: Arity, func: F) -> NativeRef
    where
        F: Fn(&mut Heap, Vec<Value>) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Arc::new(NativeFunction {
            name: name.to_string(),
            arity,
            func: Arc::new(func),
        })
    }

    /// Identity key used by the registry and reference tracker.
    pub fn identity(this: &NativeRef) -> usize {
        Arc::as_ptr(this) as *const () as usize
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    Fixed(usize),
    Variadic(usize), // Minimum number of arguments
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Fixed(n) => count == n,
            Arity::Variadic(min) => count >= min,
            Arity::Range(min, max) => count >= min && count <= max,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Variadic(min) => write!(f, "at least {}", min),
            Arity::Range(min, max) => write!(f, "between {} and {}", min, max),
        }
    }
}

/// A callable defined by source text.
///
/// `captures` stands for the bindings the callable closed over when it was created. They are
/// available when calling the original value but are never written to the wire: a decoded
/// function starts with no captures and resolves free identifiers against global built-ins.
#[derive(Debug, Clone)]
pub struct SourceFunction {
    source: String,
    definition: Arc<FunctionDef>,
    captures: HashMap<String, Value>,
}

impl SourceFunction {
    /// Parses `source` as a single function definition.
    pub fn parse(source: impl Into<String>) -> Result<Self, ParseError> {
        let source = source.into();
        let definition = parser::parse_function(&source)?;
        Ok(SourceFunction {
            source,
            definition: Arc::new(definition),
            captures: HashMap::new(),
        })
    }

    pub(crate) fn from_parts(
        source: String,
        definition: Arc<FunctionDef>,
        captures: HashMap<String, Value>,
    ) -> Self {
        SourceFunction {
            source,
            definition,
            captures,
        }
    }

    /// Adds a captured binding, as if the function had closed over `name`.
    pub fn with_capture(mut self, name: &str, value: Value) -> Self {
        self.captures.insert(name.to_string(), value);
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn name(&self) -> Option<&str> {
        self.definition.name.as_deref()
    }

    pub fn params(&self) -> &[String] {
        &self.definition.params
    }

    pub fn definition(&self) -> &Arc<FunctionDef> {
        &self.definition
    }

    pub fn captures(&self) -> &HashMap<String, Value> {
        &self.captures
    }
}
