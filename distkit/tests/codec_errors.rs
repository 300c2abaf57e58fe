use distkit::{decode, encode, Codec, CodecError, ErrorCategory, Heap, Value};
use pretty_assertions::assert_eq;

#[test]
fn malformed_json_is_rejected() {
    let err = decode("{not valid json").unwrap_err();
    assert!(matches!(err, CodecError::MalformedWireText(_)));
    assert_eq!(err.category(), ErrorCategory::InvalidInput);
}

#[test]
fn unknown_kind_is_rejected() {
    let err = decode(r#"{"type":"regexp","value":"/a+/"}"#).unwrap_err();
    assert_eq!(err, CodecError::UnknownWireKind("regexp".to_string()));
}

#[test]
fn unresolved_reference_is_rejected() {
    let text = r#"{"type":"object","id":"0","value":{"next":{"type":"reference","value":"7"}}}"#;
    let err = decode(text).unwrap_err();
    assert_eq!(err, CodecError::UnresolvedReference("7".to_string()));
    assert_eq!(err.category(), ErrorCategory::BrokenGraph);
}

#[test]
fn duplicate_ids_are_rejected() {
    let text = r#"{"type":"array","id":"0","value":{
        "0":{"type":"array","id":"1","value":{}},
        "1":{"type":"object","id":"1","value":{}}}}"#;
    assert!(matches!(decode(text), Err(CodecError::MalformedWireText(_))));
}

#[test]
fn unknown_native_is_rejected() {
    let text = r#"{"type":"native","id":"0","value":"fs.readFileSync"}"#;
    assert_eq!(
        decode(text).unwrap_err(),
        CodecError::UnknownNativeReference("fs.readFileSync".to_string())
    );
}

#[test]
fn skipped_members_never_resolve() {
    let text = r#"{"type":"native","id":"0","value":"Math.constructor"}"#;
    assert!(matches!(
        decode(text),
        Err(CodecError::UnknownNativeReference(_))
    ));
}

#[test]
fn source_functions_are_refused_by_default() {
    let text = r#"{"type":"function","id":"0","value":"() => 42"}"#;
    assert_eq!(decode(text).unwrap_err(), CodecError::SourceEvaluationDisabled);
}

#[test]
fn unsupported_values_abort_the_whole_encode() {
    let mut heap = Heap::new();
    let bytes = heap.bytes(vec![1, 2, 3]);
    let root = heap.object(vec![
        ("ok", Value::from(1)),
        ("tag", Value::Symbol("id".to_string())),
    ]);
    let err = encode(&heap, &root).unwrap_err();
    assert_eq!(
        err,
        CodecError::UnsupportedType {
            type_name: "symbol".to_string()
        }
    );
    assert_eq!(err.category(), ErrorCategory::InvalidValue);

    let nested = heap.array(vec![Value::from("fine"), bytes]);
    assert_eq!(
        encode(&heap, &nested).unwrap_err(),
        CodecError::UnsupportedType {
            type_name: "Uint8Array".to_string()
        }
    );
    assert_eq!(
        encode(&heap, &Value::BigInt(12)).unwrap_err(),
        CodecError::UnsupportedType {
            type_name: "bigint".to_string()
        }
    );
}

#[test]
fn foreign_handle_is_invalid() {
    let mut other = Heap::new();
    let foreign = other.array(vec![Value::Null]);
    let empty = Heap::new();
    assert!(matches!(
        encode(&empty, &foreign),
        Err(CodecError::InvalidHandle(_))
    ));
}

#[test]
fn failed_decode_into_keeps_the_heap() {
    let codec = Codec::new();
    let mut heap = Heap::new();
    let before = heap.object(vec![("keep", Value::Boolean(true))]);
    let len = heap.len();

    let text = r#"{"type":"array","id":"0","value":{
        "0":{"type":"object","id":"1","value":{"a":{"type":"number","value":"1"}}},
        "1":{"type":"native","id":"2","value":"nope.missing"}}}"#;
    assert!(codec.decode_into(text, &mut heap).is_err());
    assert_eq!(heap.len(), len);
    assert_eq!(
        heap.property(&before, "keep").unwrap(),
        Value::Boolean(true)
    );

    let ok = codec
        .decode_into(r#"{"type":"array","id":"0","value":{}}"#, &mut heap)
        .unwrap();
    assert_eq!(heap.len(), len + 1);
    assert_eq!(heap.type_name(&ok), "Array");
}
