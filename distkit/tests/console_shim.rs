// Console substitution is process-global, so everything lives in one test.

use distkit::stdlib::console;
use distkit::{Arity, Codec, CodecConfig, Heap, NativeFunction, NativeRegistry, Value};
use std::sync::{Arc, Mutex};

#[test]
fn shim_follows_the_active_console() {
    let captured = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = captured.clone();
    let recorder = NativeFunction::new("log", Arity::Variadic(0), move |heap, args| {
        let line = distkit::stdlib::util::format_values(heap, &args);
        if let Ok(mut lines) = sink.lock() {
            lines.push(line);
        }
        Ok(Value::Undefined)
    });

    let registry = NativeRegistry::shared();
    let default_log = registry.resolve("console.log").unwrap();
    let replaced = console::substitute("log", recorder.clone()).unwrap();
    assert!(Arc::ptr_eq(&replaced, &default_log));

    // names resolve to the substitute, and the substitute encodes as the console name
    let resolved = registry.resolve("console.log").unwrap();
    assert!(Arc::ptr_eq(&resolved, &recorder));
    assert_eq!(
        registry.identify(&recorder).map(|name| name.to_string()),
        Some("console.log".to_string())
    );

    let codec = Codec::new();
    let text = codec
        .encode(&Heap::new(), &Value::Native(recorder.clone()))
        .unwrap();
    assert_eq!(text, r#"{"type":"native","value":"console.log","id":"0"}"#);
    let mut decoded = codec.decode(&text).unwrap();
    match &decoded.value {
        Value::Native(back) => assert!(Arc::ptr_eq(back, &recorder)),
        other => panic!("expected a native, got {:?}", other),
    }

    // a decoded function calling console.log reaches the substitute too
    let trusted = Codec::from_config(CodecConfig::default().with_trusted_source(true));
    let mut heap = Heap::new();
    let logger = heap.function(
        distkit::SourceFunction::parse("(n) => { console.log('count=%d', n); return n; }").unwrap(),
    );
    let text = trusted.encode(&heap, &logger).unwrap();
    decoded = trusted.decode(&text).unwrap();
    trusted
        .evaluator()
        .call(&mut decoded.heap, &decoded.value, vec![Value::from(3)])
        .unwrap();
    assert_eq!(*captured.lock().unwrap(), vec!["count=3".to_string()]);

    // without the shim the static tables are authoritative
    let shimless = NativeRegistry::builtin_with_shim(false);
    assert!(Arc::ptr_eq(&shimless.resolve("console.log").unwrap(), &default_log));
    assert_eq!(shimless.identify(&recorder), None);

    console::restore().unwrap();
    assert!(Arc::ptr_eq(
        &registry.resolve("console.log").unwrap(),
        &default_log
    ));
    assert!(console::substitute("table", recorder).is_err());
}
