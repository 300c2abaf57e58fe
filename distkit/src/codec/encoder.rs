use super::classify::classify;
use super::error::{CodecError, CodecResult};
use super::tracker::{Identity, RefTracker};
use super::wire::{Payload, WireKind, WireNode};
use crate::registry::NativeRegistry;
use crate::runtime::heap::{render_date, Handle, Heap, HeapObject};
use crate::runtime::number::render_number;
use crate::runtime::values::{NativeRef, Value};
use indexmap::IndexMap;
use tracing::{debug, warn};

/// One encode pass. Ids are only meaningful within the tree this pass produces.
pub(crate) struct Encoder<'a> {
    heap: &'a Heap,
    registry: &'a NativeRegistry,
    tracker: RefTracker,
}

impl<'a> Encoder<'a> {
    pub fn new(heap: &'a Heap, registry: &'a NativeRegistry) -> Self {
        Encoder {
            heap,
            registry,
            tracker: RefTracker::new(),
        }
    }

    pub fn encode(mut self, value: &Value) -> CodecResult<WireNode> {
        let tree = self.node(value)?;
        debug!(ids = self.tracker.assigned(), "encoded value graph");
        Ok(tree)
    }

    fn node(&mut self, value: &Value) -> CodecResult<WireNode> {
        let kind = classify(self.heap, value)?;
        let Some(identity) = Identity::of(value) else {
            return Ok(scalar(kind, value));
        };
        if let Some(id) = self.tracker.lookup(identity) {
            return Ok(WireNode::reference(id.to_string()));
        }
        let id = self.tracker.assign(identity).to_string();
        let node = match value {
            Value::Native(native) => WireNode::text(WireKind::Native, self.native_name(native)),
            Value::Ref(handle) => self.composite(kind, *handle)?,
            other => scalar(kind, other),
        };
        Ok(node.with_id(id))
    }

    fn native_name(&self, native: &NativeRef) -> String {
        if let Some(name) = self.registry.identify(native) {
            return name.to_string();
        }
        let name = if native.name.is_empty() {
            "anonymous"
        } else {
            native.name.as_str()
        };
        warn!(name, "native callable is not registered, encoding its declared name");
        name.to_string()
    }

    fn composite(&mut self, kind: WireKind, handle: Handle) -> CodecResult<WireNode> {
        let heap = self.heap;
        let object = heap.get(handle).ok_or(CodecError::InvalidHandle(handle))?;
        let node = match object {
            HeapObject::Array(slots) => {
                let mut members = IndexMap::with_capacity(slots.len());
                for (index, slot) in slots.iter().enumerate() {
                    if let Some(item) = slot {
                        members.insert(index.to_string(), self.node(item)?);
                    }
                }
                WireNode::members(kind, members)
            }
            HeapObject::Object(entries) => {
                let mut members = IndexMap::with_capacity(entries.len());
                for (key, item) in entries {
                    members.insert(key.clone(), self.node(item)?);
                }
                WireNode::members(kind, members)
            }
            HeapObject::Date(at) => WireNode::text(kind, render_date(at)),
            HeapObject::Error(error) => {
                let mut fields = IndexMap::with_capacity(3);
                fields.insert(
                    "name".to_string(),
                    WireNode::text(WireKind::String, error.name.clone()),
                );
                fields.insert(
                    "message".to_string(),
                    WireNode::text(WireKind::String, error.message.clone()),
                );
                fields.insert("cause".to_string(), self.node(&error.cause)?);
                WireNode {
                    kind,
                    value: Payload::Node(Box::new(WireNode::members(WireKind::Object, fields))),
                    id: None,
                }
            }
            HeapObject::Function(function) => WireNode::text(kind, function.source()),
            HeapObject::Bytes(_) => {
                return Err(CodecError::UnsupportedType {
                    type_name: object.type_name().to_string(),
                })
            }
        };
        Ok(node)
    }
}

fn scalar(kind: WireKind, value: &Value) -> WireNode {
    let text = match value {
        Value::Number(n) => render_number(*n),
        Value::String(s) => s.clone(),
        Value::Boolean(b) => b.to_string(),
        _ => String::new(),
    };
    WireNode::text(kind, text)
}
