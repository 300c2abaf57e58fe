//! Two-phase materialization of a [`WireNode`] tree.
//!
//! Phase 1 walks the tree depth first, allocating every container and registering its id before
//! its children are built. A `reference` node never resolves in place: the parent writes a
//! placeholder and records a [`Patch`]. Phase 2 applies the patches once every id is known, so
//! forward references, back edges and self references are all handled the same way.

use super::error::{CodecError, CodecResult};
use super::wire::{Payload, WireKind, WireNode};
use crate::registry::NativeRegistry;
use crate::runtime::heap::{parse_date, ErrorObject, Handle, Heap, HeapObject};
use crate::runtime::number::parse_number;
use crate::runtime::values::{SourceFunction, Value};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// One past the largest array index a wire array may use (2^32 - 1).
const ARRAY_INDEX_LIMIT: usize = u32::MAX as usize;

/// Longest run of holes a single array key may open past the current length.
const MAX_HOLE_RUN: usize = 1 << 20;

/// A decoded graph together with the heap that owns it.
#[derive(Debug)]
pub struct Decoded {
    pub heap: Heap,
    pub value: Value,
}

enum Materialized {
    Ready(Value),
    Pending(String),
}

#[derive(Debug)]
enum Slot {
    Index(usize),
    Member(String),
    Cause,
}

#[derive(Debug)]
struct Patch {
    target: Handle,
    slot: Slot,
    id: String,
}

pub(crate) struct Decoder<'a> {
    heap: &'a mut Heap,
    registry: &'a NativeRegistry,
    trusted_source: bool,
    ids: HashMap<String, Value>,
    patches: Vec<Patch>,
}

impl<'a> Decoder<'a> {
    pub fn new(heap: &'a mut Heap, registry: &'a NativeRegistry, trusted_source: bool) -> Self {
        Decoder {
            heap,
            registry,
            trusted_source,
            ids: HashMap::new(),
            patches: Vec::new(),
        }
    }

    pub fn decode(mut self, root: &WireNode) -> CodecResult<Value> {
        let start = self.heap.len();
        let root = self.materialize(root)?;
        let patched = self.patches.len();
        for patch in std::mem::take(&mut self.patches) {
            let value = self.target(&patch.id)?;
            self.apply(patch, value)?;
        }
        let value = match root {
            Materialized::Ready(value) => value,
            Materialized::Pending(id) => self.target(&id)?,
        };
        debug!(
            objects = self.heap.len() - start,
            ids = self.ids.len(),
            patched,
            "decoded value graph"
        );
        Ok(value)
    }

    fn target(&self, id: &str) -> CodecResult<Value> {
        self.ids
            .get(id)
            .cloned()
            .ok_or_else(|| CodecError::UnresolvedReference(id.to_string()))
    }

    fn register(&mut self, node: &WireNode, value: &Value) {
        if let Some(id) = &node.id {
            self.ids.insert(id.clone(), value.clone());
        }
    }

    fn materialize(&mut self, node: &WireNode) -> CodecResult<Materialized> {
        let value = match node.kind {
            WireKind::Reference => return Ok(Materialized::Pending(text(node)?.to_string())),
            WireKind::Null => Value::Null,
            WireKind::Undefined => Value::Undefined,
            WireKind::Number => {
                let raw = text(node)?;
                Value::Number(parse_number(raw).ok_or_else(|| {
                    CodecError::malformed(format!("`{}` is not a number", raw))
                })?)
            }
            WireKind::String => Value::String(text(node)?.to_string()),
            WireKind::Boolean => match text(node)? {
                "true" => Value::Boolean(true),
                "false" => Value::Boolean(false),
                other => {
                    return Err(CodecError::malformed(format!(
                        "`{}` is not a boolean",
                        other
                    )))
                }
            },
            WireKind::Date => {
                let raw = text(node)?;
                let at = parse_date(raw)
                    .ok_or_else(|| CodecError::malformed(format!("`{}` is not a date", raw)))?;
                let value = self.heap.date(at);
                self.register(node, &value);
                value
            }
            WireKind::Function => {
                if !self.trusted_source {
                    return Err(CodecError::SourceEvaluationDisabled);
                }
                let function = SourceFunction::parse(text(node)?).map_err(|err| {
                    CodecError::InvalidFunctionSource {
                        reason: err.to_string(),
                    }
                })?;
                let value = self.heap.function(function);
                self.register(node, &value);
                value
            }
            WireKind::Native => {
                let name = text(node)?;
                let native = self
                    .registry
                    .resolve(name)
                    .ok_or_else(|| CodecError::UnknownNativeReference(name.to_string()))?;
                let value = Value::Native(native);
                self.register(node, &value);
                value
            }
            WireKind::Array => self.array(node)?,
            WireKind::Object => self.object(node)?,
            WireKind::Error => self.error(node)?,
        };
        Ok(Materialized::Ready(value))
    }

    fn array(&mut self, node: &WireNode) -> CodecResult<Value> {
        let handle = self.heap.alloc(HeapObject::Array(Vec::new()));
        let value = Value::Ref(handle);
        self.register(node, &value);
        for (key, child) in members(node)? {
            let index = ordinal(key)?;
            let item = match self.materialize(child)? {
                Materialized::Ready(item) => item,
                Materialized::Pending(id) => {
                    self.patches.push(Patch {
                        target: handle,
                        slot: Slot::Index(index),
                        id,
                    });
                    Value::Undefined
                }
            };
            self.store(handle, Slot::Index(index), item)?;
        }
        Ok(value)
    }

    fn object(&mut self, node: &WireNode) -> CodecResult<Value> {
        let handle = self.heap.alloc(HeapObject::Object(IndexMap::new()));
        let value = Value::Ref(handle);
        self.register(node, &value);
        for (key, child) in members(node)? {
            let item = match self.materialize(child)? {
                Materialized::Ready(item) => item,
                Materialized::Pending(id) => {
                    self.patches.push(Patch {
                        target: handle,
                        slot: Slot::Member(key.clone()),
                        id,
                    });
                    Value::Undefined
                }
            };
            self.store(handle, Slot::Member(key.clone()), item)?;
        }
        Ok(value)
    }

    fn error(&mut self, node: &WireNode) -> CodecResult<Value> {
        let Payload::Node(inner) = &node.value else {
            return Err(CodecError::malformed("`error` node needs an object node as its value"));
        };
        if inner.id.is_some() {
            return Err(CodecError::malformed("the object inside an `error` cannot carry an id"));
        }
        let handle = self.heap.alloc(HeapObject::Error(ErrorObject::new("")));
        let value = Value::Ref(handle);
        self.register(node, &value);

        let fields = members(inner)?;
        let name = self.error_text(fields.get("name"), "name")?;
        let message = self.error_text(fields.get("message"), "message")?;
        if let Some(HeapObject::Error(error)) = self.heap.get_mut(handle) {
            if let Some(name) = name {
                error.name = name;
            }
            error.message = message.unwrap_or_default();
        }
        if let Some(cause) = fields.get("cause") {
            match self.materialize(cause)? {
                Materialized::Ready(cause) => self.store(handle, Slot::Cause, cause)?,
                Materialized::Pending(id) => self.patches.push(Patch {
                    target: handle,
                    slot: Slot::Cause,
                    id,
                }),
            }
        }
        Ok(value)
    }

    /// `name` and `message` are rendered to text; `undefined` or a missing field means absent.
    fn error_text(&mut self, field: Option<&WireNode>, label: &str) -> CodecResult<Option<String>> {
        let Some(field) = field else {
            return Ok(None);
        };
        match self.materialize(field)? {
            Materialized::Ready(Value::Undefined) => Ok(None),
            Materialized::Ready(Value::String(s)) => Ok(Some(s)),
            Materialized::Ready(other) => Ok(Some(self.heap.display(&other))),
            Materialized::Pending(_) => Err(CodecError::malformed(format!(
                "error {} cannot be a reference",
                label
            ))),
        }
    }

    fn apply(&mut self, patch: Patch, value: Value) -> CodecResult<()> {
        self.store(patch.target, patch.slot, value)
    }

    fn store(&mut self, target: Handle, slot: Slot, value: Value) -> CodecResult<()> {
        match (self.heap.get_mut(target), slot) {
            (Some(HeapObject::Array(slots)), Slot::Index(index)) => {
                if index >= slots.len() {
                    let length = index
                        .checked_add(1)
                        .filter(|length| length - slots.len() <= MAX_HOLE_RUN)
                        .ok_or_else(|| {
                            CodecError::malformed(format!(
                                "array index {} leaves more than {} holes",
                                index, MAX_HOLE_RUN
                            ))
                        })?;
                    slots.resize(length, None);
                }
                slots[index] = Some(value);
            }
            (Some(HeapObject::Object(entries)), Slot::Member(key)) => {
                entries.insert(key, value);
            }
            (Some(HeapObject::Error(error)), Slot::Cause) => error.cause = value,
            _ => return Err(CodecError::InvalidHandle(target)),
        }
        Ok(())
    }
}

fn text(node: &WireNode) -> CodecResult<&str> {
    node.as_text()
        .ok_or_else(|| CodecError::malformed(format!("`{}` node needs a string value", node.kind)))
}

fn members(node: &WireNode) -> CodecResult<&IndexMap<String, WireNode>> {
    match &node.value {
        Payload::Members(members) => Ok(members),
        _ => Err(CodecError::malformed(format!(
            "`{}` node needs an object of nodes as its value",
            node.kind
        ))),
    }
}

/// Array keys must be canonical decimal ordinals (`"0"`, `"17"`, never `"01"` or `"-1"`) below
/// 2^32 - 1.
fn ordinal(key: &str) -> CodecResult<usize> {
    match key.parse::<usize>() {
        Ok(index) if index < ARRAY_INDEX_LIMIT && index.to_string() == key => Ok(index),
        _ => Err(CodecError::malformed(format!(
            "array key `{}` is not an ordinal",
            key
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str, trusted: bool) -> CodecResult<(Heap, Value)> {
        let registry = NativeRegistry::builtin();
        let tree = WireNode::parse(text)?;
        let mut heap = Heap::new();
        let value = Decoder::new(&mut heap, &registry, trusted).decode(&tree)?;
        Ok((heap, value))
    }

    #[test]
    fn forward_reference_is_patched() {
        let text = r#"{"type":"array","id":"0","value":{
            "0":{"type":"reference","value":"1"},
            "1":{"type":"object","id":"1","value":{}}}}"#;
        let (heap, root) = decode(text, false).unwrap();
        let first = heap.property(&root, "0").unwrap();
        let second = heap.property(&root, "1").unwrap();
        assert_eq!(first.as_handle(), second.as_handle());
    }

    #[test]
    fn keys_may_arrive_out_of_order() {
        let text = r#"{"type":"array","value":{
            "2":{"type":"number","value":"3"},
            "0":{"type":"number","value":"1"}}}"#;
        let (heap, root) = decode(text, false).unwrap();
        let Some(HeapObject::Array(slots)) = root.as_handle().and_then(|h| heap.get(h)) else {
            panic!("expected array");
        };
        assert_eq!(
            slots,
            &vec![Some(Value::from(1)), None, Some(Value::from(3))]
        );
    }

    #[test]
    fn dangling_root_reference_is_unresolved() {
        assert_eq!(
            decode(r#"{"type":"reference","value":"0"}"#, false).unwrap_err(),
            CodecError::UnresolvedReference("0".to_string())
        );
    }

    #[test]
    fn rejects_bad_scalars_and_keys() {
        let cases = [
            r#"{"type":"number","value":"12px"}"#,
            r#"{"type":"boolean","value":"yes"}"#,
            r#"{"type":"date","value":"yesterday"}"#,
            r#"{"type":"array","value":{"01":{"type":"null","value":""}}}"#,
        ];
        for case in cases {
            assert!(
                matches!(decode(case, false), Err(CodecError::MalformedWireText(_))),
                "{} should be malformed",
                case
            );
        }
    }

    #[test]
    fn oversized_array_indices_are_malformed() {
        for key in ["18446744073709551615", "4294967295", "4294967296", "2000000"] {
            let text = format!(
                r#"{{"type":"array","value":{{"{}":{{"type":"null","value":""}}}}}}"#,
                key
            );
            assert!(
                matches!(decode(&text, false), Err(CodecError::MalformedWireText(_))),
                "index {} should be rejected",
                key
            );
        }
    }

    #[test]
    fn sparse_index_within_hole_run_decodes() {
        let text = r#"{"type":"array","value":{"0":{"type":"number","value":"1"},
            "1000":{"type":"number","value":"2"}}}"#;
        let (heap, root) = decode(text, false).unwrap();
        assert_eq!(heap.property(&root, "length").unwrap(), Value::from(1001));
        assert_eq!(heap.property(&root, "500").unwrap(), Value::Undefined);
        assert_eq!(heap.property(&root, "1000").unwrap(), Value::from(2));
    }

    #[test]
    fn error_fields_default_when_absent() {
        let text = r#"{"type":"error","value":{"type":"object","value":{
            "message":{"type":"string","value":"boom"}}}}"#;
        let (heap, root) = decode(text, false).unwrap();
        let Some(HeapObject::Error(error)) = root.as_handle().and_then(|h| heap.get(h)) else {
            panic!("expected error");
        };
        assert_eq!(error.name, "Error");
        assert_eq!(error.message, "boom");
        assert_eq!(error.cause, Value::Undefined);
    }

    #[test]
    fn functions_need_trusted_source() {
        let text = r#"{"type":"function","id":"0","value":"(a, b) => a + b"}"#;
        assert_eq!(
            decode(text, false).unwrap_err(),
            CodecError::SourceEvaluationDisabled
        );
        let (heap, value) = decode(text, true).unwrap();
        assert_eq!(heap.type_name(&value), "function");

        let broken = r#"{"type":"function","value":"(a, b => a +"}"#;
        assert!(matches!(
            decode(broken, true),
            Err(CodecError::InvalidFunctionSource { .. })
        ));
    }
}
