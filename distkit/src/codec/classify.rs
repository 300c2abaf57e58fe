use super::error::{CodecError, CodecResult};
use super::wire::WireKind;
use crate::runtime::heap::{Heap, HeapObject};
use crate::runtime::values::Value;

/// Wire kind for `value`, first match wins: scalars, callables, then array, date, error and
/// plain object.
pub fn classify(heap: &Heap, value: &Value) -> CodecResult<WireKind> {
    let kind = match value {
        Value::Null => WireKind::Null,
        Value::Undefined => WireKind::Undefined,
        Value::Number(_) => WireKind::Number,
        Value::String(_) => WireKind::String,
        Value::Boolean(_) => WireKind::Boolean,
        Value::Native(_) => WireKind::Native,
        Value::Symbol(_) | Value::BigInt(_) => return Err(unsupported(value.type_name())),
        Value::Ref(handle) => match heap.get(*handle) {
            Some(HeapObject::Function(_)) => WireKind::Function,
            Some(HeapObject::Array(_)) => WireKind::Array,
            Some(HeapObject::Date(_)) => WireKind::Date,
            Some(HeapObject::Error(_)) => WireKind::Error,
            Some(HeapObject::Object(_)) => WireKind::Object,
            Some(other @ HeapObject::Bytes(_)) => return Err(unsupported(other.type_name())),
            None => return Err(CodecError::InvalidHandle(*handle)),
        },
    };
    Ok(kind)
}

fn unsupported(type_name: &str) -> CodecError {
    CodecError::UnsupportedType {
        type_name: type_name.to_string(),
    }
}
