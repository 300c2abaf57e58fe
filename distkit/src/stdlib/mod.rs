//! Built-in native namespaces.
//!
//! Standard-library modules (`path`, `path/posix`, `util`, `util/types`, `crypto`, `os`) and
//! global built-ins (`console`, `JSON`, `Math`, `Number`, `Object`, `Array`, `Date`, `String`).
//! The tables are built once per process so that every registry indexes the same native
//! identities.

pub mod console;
pub mod crypto;
pub mod globals;
pub mod json;
pub mod math;
pub mod os;
pub mod path;
pub mod util;

use crate::registry::Namespace;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::evaluator::to_number;
use crate::runtime::heap::Heap;
use crate::runtime::values::Value;
use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    static ref MODULES: Vec<Arc<Namespace>> = build_modules();
    static ref GLOBALS: Vec<Arc<Namespace>> = build_globals();
}

/// Standard-library module roots, in registration order.
pub fn modules() -> Vec<Arc<Namespace>> {
    MODULES.clone()
}

/// Global built-in roots, in registration order.
pub fn globals() -> Vec<Arc<Namespace>> {
    GLOBALS.clone()
}

fn build_modules() -> Vec<Arc<Namespace>> {
    let posix = path::posix_namespace();
    let types = util::types_namespace();
    vec![
        path::namespace(posix.clone()),
        posix,
        util::namespace(types.clone()),
        types,
        crypto::namespace(),
        os::namespace(),
    ]
}

fn build_globals() -> Vec<Arc<Namespace>> {
    vec![
        console::namespace(),
        json::namespace(),
        math::namespace(),
        globals::number_namespace(),
        globals::object_namespace(),
        globals::array_namespace(),
        globals::date_namespace(),
        globals::string_namespace(),
    ]
}

// --- Argument helpers shared by the natives ---

pub(crate) fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

pub(crate) fn number_arg(heap: &Heap, args: &[Value], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, |v| to_number(heap, v))
}

pub(crate) fn string_arg(args: &[Value], index: usize, operation: &str) -> RuntimeResult<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(RuntimeError::type_error("string", other.type_name(), operation)),
        None => Err(RuntimeError::type_error("string", "undefined", operation)),
    }
}
