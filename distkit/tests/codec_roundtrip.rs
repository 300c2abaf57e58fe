use chrono::{TimeZone, Utc};
use distkit::{decode, encode, Heap, HeapObject, Value};
use pretty_assertions::assert_eq;

fn roundtrip(heap: &Heap, value: &Value) -> (Heap, Value) {
    let text = encode(heap, value).expect("encode");
    let decoded = decode(&text).expect("decode");
    (decoded.heap, decoded.value)
}

#[test]
fn scalars_survive() {
    let heap = Heap::new();
    let cases = vec![
        Value::Null,
        Value::Undefined,
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Number(0.0),
        Value::Number(3.14159),
        Value::Number(-273.15),
        Value::Number(9_007_199_254_740_991.0),
        Value::Number(1e21),
        Value::Number(1e-7),
        Value::Number(f64::INFINITY),
        Value::Number(f64::NEG_INFINITY),
        Value::from(""),
        Value::from("Hello, World!"),
        Value::from("line1\nline2\ttab\\backslash\"quote"),
        Value::from("你好世界 🎉🚀💻"),
        Value::from("   spaces   "),
    ];
    for value in cases {
        let (_, back) = roundtrip(&heap, &value);
        assert_eq!(back, value);
    }
}

#[test]
fn nan_and_negative_zero_keep_their_identity() {
    let heap = Heap::new();
    let (_, nan) = roundtrip(&heap, &Value::Number(f64::NAN));
    assert!(nan.as_number().unwrap().is_nan());

    let text = encode(&heap, &Value::Number(-0.0)).unwrap();
    assert_eq!(text, r#"{"type":"number","value":"-0"}"#);
    let (_, zero) = roundtrip(&heap, &Value::Number(-0.0));
    assert!(zero.as_number().unwrap().is_sign_negative());
}

#[test]
fn deeply_nested_object_is_structurally_equal() {
    let mut heap = Heap::new();
    let level4 = heap.object(vec![
        ("value", Value::from("deeply nested")),
        ("number", Value::from(42)),
    ]);
    let level3 = heap.object(vec![("level4", level4)]);
    let level2 = heap.object(vec![("level3", level3)]);
    let level1 = heap.object(vec![("level2", level2)]);
    let root = heap.object(vec![("level1", level1)]);

    let (back_heap, back) = roundtrip(&heap, &root);
    assert!(heap.deep_eq(&root, &back_heap, &back));

    let mut cursor = back;
    for key in ["level1", "level2", "level3", "level4", "value"] {
        cursor = back_heap.property(&cursor, key).unwrap();
    }
    assert_eq!(cursor, Value::from("deeply nested"));
}

#[test]
fn mixed_array_keeps_every_kind() {
    let mut heap = Heap::new();
    let inner_obj = heap.object(vec![("key", Value::from("value"))]);
    let inner_arr = heap.array(vec![Value::from(1), Value::from(2), Value::from(3)]);
    let date = heap.date(Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap());
    let root = heap.array(vec![
        Value::from("string"),
        Value::from(123),
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Null,
        Value::Undefined,
        inner_obj,
        inner_arr,
        date,
    ]);

    let (back_heap, back) = roundtrip(&heap, &root);
    assert!(heap.deep_eq(&root, &back_heap, &back));
    assert_eq!(back_heap.property(&back, "length").unwrap(), Value::from(9));
    assert_eq!(back_heap.property(&back, "5").unwrap(), Value::Undefined);

    let date = back_heap.property(&back, "8").unwrap();
    match date.as_handle().and_then(|h| back_heap.get(h)) {
        Some(HeapObject::Date(at)) => assert_eq!(at.timestamp_millis(), 1_768_435_200_000),
        other => panic!("expected a date, got {:?}", other),
    }
}

#[test]
fn object_member_order_is_preserved() {
    let mut heap = Heap::new();
    let root = heap.object(vec![
        ("zeta", Value::from(1)),
        ("alpha", Value::from(2)),
        ("mu", Value::from(3)),
    ]);
    let (back_heap, back) = roundtrip(&heap, &root);
    match back.as_handle().and_then(|h| back_heap.get(h)) {
        Some(HeapObject::Object(members)) => assert_eq!(
            members.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mu"]
        ),
        other => panic!("expected an object, got {:?}", other),
    }
}

#[test]
fn errors_keep_name_message_and_cause() {
    let mut heap = Heap::new();
    let cause = heap.error("Error", "disk full", Value::Undefined);
    let error = heap.error("TypeError", "write failed", cause);
    let (back_heap, back) = roundtrip(&heap, &error);

    assert_eq!(back_heap.property(&back, "name").unwrap(), Value::from("TypeError"));
    assert_eq!(
        back_heap.property(&back, "message").unwrap(),
        Value::from("write failed")
    );
    let back_cause = back_heap.property(&back, "cause").unwrap();
    assert_eq!(
        back_heap.property(&back_cause, "message").unwrap(),
        Value::from("disk full")
    );
    assert_eq!(
        back_heap.property(&back_cause, "cause").unwrap(),
        Value::Undefined
    );
}

#[test]
fn dates_keep_millisecond_precision() {
    let mut heap = Heap::new();
    let at = Utc.timestamp_millis_opt(1_767_225_600_123).unwrap();
    let date = heap.date(at);
    let text = encode(&heap, &date).unwrap();
    assert_eq!(
        text,
        r#"{"type":"date","value":"2026-01-01T00:00:00.123Z","id":"0"}"#
    );
    let (back_heap, back) = roundtrip(&heap, &date);
    assert!(heap.deep_eq(&date, &back_heap, &back));
}

#[test]
fn dates_outside_four_digit_years_roundtrip() {
    let mut heap = Heap::new();
    let far = heap.date(Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap());
    let bc = heap.date(Utc.with_ymd_and_hms(-1, 1, 1, 0, 0, 0).unwrap());
    let root = heap.array(vec![far, bc]);

    let text = encode(&heap, &root).unwrap();
    assert!(text.contains(r#""value":"+010000-01-01T00:00:00.000Z""#));
    assert!(text.contains(r#""value":"-000001-01-01T00:00:00.000Z""#));

    let decoded = decode(&text).unwrap();
    assert!(heap.deep_eq(&root, &decoded.heap, &decoded.value));
}

#[test]
fn sparse_arrays_come_back_with_holes() {
    let mut heap = Heap::new();
    let sparse = heap.sparse_array(vec![Some(Value::from("a")), None, Some(Value::from("c"))]);
    let (back_heap, back) = roundtrip(&heap, &sparse);
    match back.as_handle().and_then(|h| back_heap.get(h)) {
        Some(HeapObject::Array(slots)) => {
            assert_eq!(slots.len(), 3);
            assert!(slots[1].is_none());
        }
        other => panic!("expected an array, got {:?}", other),
    }
}
