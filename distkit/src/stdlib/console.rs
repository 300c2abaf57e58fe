// console global and the active-instance table behind the registry's console shim

use super::util::format_values;
use crate::registry::Namespace;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::Heap;
use crate::runtime::values::{Arity, NativeFunction, NativeRef, Value};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Methods re-resolved against the active console at lookup time.
pub const SHIM_METHODS: &[&str] = &["log", "info", "warn", "error", "debug"];

lazy_static! {
    static ref DEFAULTS: Vec<(&'static str, NativeRef)> = SHIM_METHODS
        .iter()
        .map(|method| (*method, default_method(*method)))
        .collect();
    static ref ACTIVE: RwLock<HashMap<String, NativeRef>> = RwLock::new(defaults());
}

fn defaults() -> HashMap<String, NativeRef> {
    DEFAULTS
        .iter()
        .map(|(method, native)| (method.to_string(), native.clone()))
        .collect()
}

fn default_method(method: &'static str) -> NativeRef {
    let to_stderr = matches!(method, "warn" | "error");
    NativeFunction::new(method, Arity::Variadic(0), move |heap, args| {
        write_line(heap, method, to_stderr, &args);
        Ok(Value::Undefined)
    })
}

fn write_line(heap: &Heap, method: &str, to_stderr: bool, args: &[Value]) {
    let line = format_values(heap, args);
    debug!(target: "distkit::console", method, "{}", line);
    if to_stderr {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}

/// The `console` namespace, holding the default instances.
pub fn namespace() -> Arc<Namespace> {
    DEFAULTS
        .iter()
        .fold(Namespace::builder("console"), |builder, (method, native)| {
            builder.native(method, native.clone())
        })
        .build()
}

/// Currently active instance of a console method.
pub fn active(method: &str) -> Option<NativeRef> {
    ACTIVE.read().ok()?.get(method).cloned()
}

/// Makes `native` the active instance of `method`, returning the one it replaces.
pub fn substitute(method: &str, native: NativeRef) -> RuntimeResult<NativeRef> {
    if !SHIM_METHODS.contains(&method) {
        return Err(RuntimeError::Generic(format!(
            "console.{} cannot be substituted",
            method
        )));
    }
    let mut table = ACTIVE
        .write()
        .map_err(|e| RuntimeError::Generic(format!("console table poisoned: {}", e)))?;
    let previous = table.insert(method.to_string(), native.clone());
    Ok(previous.unwrap_or(native))
}

/// Reinstates the default instance of every console method.
pub fn restore() -> RuntimeResult<()> {
    let mut table = ACTIVE
        .write()
        .map_err(|e| RuntimeError::Generic(format!("console table poisoned: {}", e)))?;
    *table = defaults();
    Ok(())
}
