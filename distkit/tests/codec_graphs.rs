// Shared references and cycles must come back as aliasing handles, not copies.

use distkit::{decode, encode, Heap, HeapObject, Value, WireKind, WireNode};
use distkit::codec::Payload;
use pretty_assertions::assert_eq;

fn roundtrip(heap: &Heap, value: &Value) -> (Heap, Value) {
    let text = encode(heap, value).expect("encode");
    let decoded = decode(&text).expect("decode");
    (decoded.heap, decoded.value)
}

#[test]
fn shared_child_is_decoded_once() {
    let mut heap = Heap::new();
    let shared = heap.object(vec![("n", Value::from(1))]);
    let root = heap.object(vec![("left", shared.clone()), ("right", shared)]);

    let (back_heap, back) = roundtrip(&heap, &root);
    let left = back_heap.property(&back, "left").unwrap();
    let right = back_heap.property(&back, "right").unwrap();
    assert!(left.as_handle().is_some());
    assert_eq!(left.as_handle(), right.as_handle());
    // root plus one shared child
    assert_eq!(back_heap.len(), 2);
}

#[test]
fn self_referencing_object() {
    let mut heap = Heap::new();
    let node = heap.object(vec![("name", Value::from("loop"))]);
    heap.set(&node, "me", node.clone()).unwrap();

    let text = encode(&heap, &node).unwrap();
    assert_eq!(
        text,
        r#"{"type":"object","value":{"name":{"type":"string","value":"loop"},"me":{"type":"reference","value":"0"}},"id":"0"}"#
    );

    let (back_heap, back) = roundtrip(&heap, &node);
    let me = back_heap.property(&back, "me").unwrap();
    assert_eq!(me.as_handle(), back.as_handle());
    assert!(heap.deep_eq(&node, &back_heap, &back));
}

#[test]
fn cycle_through_array_of_length_n() {
    for n in [1usize, 2, 5, 32] {
        let mut heap = Heap::new();
        let owner = heap.object(vec![("label", Value::from("owner"))]);
        let items: Vec<Value> = (0..n)
            .map(|i| heap.object(vec![("i", Value::from(i as f64)), ("owner", owner.clone())]))
            .collect();
        let list = heap.array(items);
        heap.set(&owner, "items", list).unwrap();

        let (back_heap, back) = roundtrip(&heap, &owner);
        let back_items = back_heap.property(&back, "items").unwrap();
        assert_eq!(
            back_heap.property(&back_items, "length").unwrap(),
            Value::from(n as f64)
        );
        for i in 0..n {
            let item = back_heap.property(&back_items, &i.to_string()).unwrap();
            let item_owner = back_heap.property(&item, "owner").unwrap();
            assert_eq!(item_owner.as_handle(), back.as_handle());
        }
    }
}

#[test]
fn error_whose_cause_is_itself() {
    let mut heap = Heap::new();
    let error = heap.error("Error", "recursive", Value::Undefined);
    heap.set(&error, "cause", error.clone()).unwrap();

    let (back_heap, back) = roundtrip(&heap, &error);
    let cause = back_heap.property(&back, "cause").unwrap();
    assert_eq!(cause.as_handle(), back.as_handle());
    assert_eq!(
        back_heap.property(&back, "message").unwrap(),
        Value::from("recursive")
    );
}

#[test]
fn root_array_containing_itself() {
    let mut heap = Heap::new();
    let root = heap.array(vec![Value::from(1)]);
    heap.set(&root, "1", root.clone()).unwrap();

    let (back_heap, back) = roundtrip(&heap, &root);
    match back.as_handle().and_then(|h| back_heap.get(h)) {
        Some(HeapObject::Array(slots)) => {
            assert_eq!(slots.len(), 2);
            assert_eq!(slots[1].as_ref().and_then(Value::as_handle), back.as_handle());
        }
        other => panic!("expected an array, got {:?}", other),
    }
}

#[test]
fn diamond_keeps_every_alias() {
    // a -> b, a -> c, b -> d, c -> d
    let mut heap = Heap::new();
    let d = heap.object(vec![("leaf", Value::Boolean(true))]);
    let b = heap.object(vec![("d", d.clone())]);
    let c = heap.object(vec![("d", d)]);
    let a = heap.array(vec![b, c]);

    let tree = distkit::Codec::new().encode_tree(&heap, &a).unwrap();
    let Payload::Members(items) = &tree.value else {
        panic!("expected members");
    };
    let Payload::Members(c_members) = &items["1"].value else {
        panic!("expected members");
    };
    assert_eq!(c_members["d"], WireNode::reference("2"));

    let (back_heap, back) = roundtrip(&heap, &a);
    let b = back_heap.property(&back, "0").unwrap();
    let c = back_heap.property(&back, "1").unwrap();
    assert_eq!(
        back_heap.property(&b, "d").unwrap().as_handle(),
        back_heap.property(&c, "d").unwrap().as_handle()
    );
}

#[test]
fn scalars_are_never_deduplicated() {
    let mut heap = Heap::new();
    let root = heap.array(vec![Value::from("same"), Value::from("same")]);
    let tree = distkit::Codec::new().encode_tree(&heap, &root).unwrap();
    let Payload::Members(items) = &tree.value else {
        panic!("expected members");
    };
    for item in items.values() {
        assert_eq!(item.kind, WireKind::String);
        assert_eq!(item.id, None);
    }
}

#[test]
fn ids_are_assigned_in_first_encounter_order() {
    let mut heap = Heap::new();
    let x = heap.array(Vec::<Value>::new());
    let y = heap.object(Vec::<(&str, Value)>::new());
    let root = heap.object(vec![("x", x.clone()), ("y", y.clone()), ("again", x)]);
    let tree = distkit::Codec::new().encode_tree(&heap, &root).unwrap();
    assert_eq!(tree.id.as_deref(), Some("0"));
    let Payload::Members(members) = &tree.value else {
        panic!("expected members");
    };
    assert_eq!(members["x"].id.as_deref(), Some("1"));
    assert_eq!(members["y"].id.as_deref(), Some("2"));
    assert_eq!(members["again"], WireNode::reference("1"));
}
