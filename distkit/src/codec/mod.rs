//! Encoding and decoding of value graphs to self-describing wire text.
//!
//! [`Codec`] ties a [`NativeRegistry`] to a [`CodecConfig`]. Encoding walks the graph once,
//! assigning ids on first encounter and emitting `reference` nodes for every later encounter.
//! Decoding is two phase so that shared substructure and cycles come back as aliasing handles.

pub mod classify;
mod decoder;
mod encoder;
pub mod error;
mod tracker;
pub mod wire;

pub use decoder::Decoded;
pub use error::{CodecError, CodecResult, ErrorCategory};
pub use tracker::{Identity, RefTracker};
pub use wire::{Payload, WireKind, WireNode};

use crate::config::CodecConfig;
use crate::registry::NativeRegistry;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::heap::Heap;
use crate::runtime::values::Value;
use decoder::Decoder;
use encoder::Encoder;
use std::sync::Arc;

#[derive(Clone)]
pub struct Codec {
    registry: Arc<NativeRegistry>,
    config: CodecConfig,
}

impl Codec {
    /// Default configuration over the process-wide registry.
    pub fn new() -> Self {
        Self::from_config(CodecConfig::default())
    }

    pub fn from_config(config: CodecConfig) -> Self {
        let registry = if config.console_shim {
            NativeRegistry::shared()
        } else {
            Arc::new(NativeRegistry::builtin_with_shim(false))
        };
        Codec { registry, config }
    }

    pub fn with_registry(registry: Arc<NativeRegistry>, config: CodecConfig) -> Self {
        Codec { registry, config }
    }

    pub fn registry(&self) -> &Arc<NativeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// An evaluator over this codec's registry, for calling decoded functions.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.registry.clone())
    }

    pub fn encode_tree(&self, heap: &Heap, value: &Value) -> CodecResult<WireNode> {
        Encoder::new(heap, &self.registry).encode(value)
    }

    pub fn encode(&self, heap: &Heap, value: &Value) -> CodecResult<String> {
        self.encode_tree(heap, value)?.to_text(self.config.pretty)
    }

    /// Decodes into a fresh heap.
    pub fn decode(&self, text: &str) -> CodecResult<Decoded> {
        let mut heap = Heap::new();
        let value = self.decode_into(text, &mut heap)?;
        Ok(Decoded { heap, value })
    }

    /// Decodes into an existing heap. On failure the heap is left as it was.
    pub fn decode_into(&self, text: &str, heap: &mut Heap) -> CodecResult<Value> {
        let tree = WireNode::parse(text)?;
        self.decode_tree(&tree, heap)
    }

    pub fn decode_tree(&self, tree: &WireNode, heap: &mut Heap) -> CodecResult<Value> {
        let mark = heap.len();
        let result =
            Decoder::new(heap, &self.registry, self.config.trusted_source).decode(tree);
        if result.is_err() {
            heap.truncate(mark);
        }
        result
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}
