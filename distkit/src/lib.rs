// distkit library
// Self-describing value-graph codec: shared references, cycles and native callables survive a
// trip through JSON wire text.
pub mod ast;
pub mod codec;
pub mod config;
pub mod parser;
pub mod registry;
pub mod runtime;
pub mod stdlib;

pub use codec::{Codec, CodecError, CodecResult, Decoded, ErrorCategory, WireKind, WireNode};
pub use config::{CodecConfig, ConfigError};
pub use registry::{NativeRegistry, QualifiedName};
pub use runtime::{
    Arity, Evaluator, Handle, Heap, HeapObject, NativeFunction, NativeRef, RuntimeError,
    SourceFunction, Value,
};

/// Encodes `value` with the default codec.
pub fn encode(heap: &Heap, value: &Value) -> CodecResult<String> {
    Codec::new().encode(heap, value)
}

/// Decodes `text` into a fresh heap with the default codec.
pub fn decode(text: &str) -> CodecResult<Decoded> {
    Codec::new().decode(text)
}
