//! Host value model and the evaluator for source-defined callables.
//!
//! Values live in a [`Heap`] and are addressed by handle; natives are shared `Arc`s. The
//! [`Evaluator`] runs decoded `function` values against the global built-ins of a registry.

pub mod environment;
pub mod error;
pub mod evaluator;
pub mod heap;
pub mod number;
pub mod values;

pub use environment::Environment;
pub use error::{RuntimeError, RuntimeResult};
pub use evaluator::Evaluator;
pub use heap::{ErrorObject, Handle, Heap, HeapObject};
pub use values::{Arity, NativeFunction, NativeRef, SourceFunction, Value};
