// util and util/types modules

use super::{arg, number_arg};
use crate::registry::Namespace;
use crate::runtime::heap::{render_date, Handle, Heap, HeapObject};
use crate::runtime::number::render_number;
use crate::runtime::values::{Arity, Value};
use std::collections::HashSet;
use std::sync::Arc;

use super::json::to_json;

pub fn namespace(types: Arc<Namespace>) -> Arc<Namespace> {
    Namespace::builder("util")
        .function("format", Arity::Variadic(0), |heap, args| {
            Ok(Value::String(format_values(heap, &args)))
        })
        .function("inspect", Arity::Range(1, 2), |heap, args| {
            Ok(Value::String(inspect(heap, &arg(&args, 0))))
        })
        .function("isDeepStrictEqual", Arity::Fixed(2), |heap, args| {
            let heap: &Heap = heap;
            Ok(Value::Boolean(heap.deep_eq(&arg(&args, 0), heap, &arg(&args, 1))))
        })
        .namespace("types", types)
        .build()
}

pub fn types_namespace() -> Arc<Namespace> {
    Namespace::builder("util/types")
        .function("isDate", Arity::Fixed(1), |heap, args| {
            Ok(Value::Boolean(is_kind(heap, &arg(&args, 0), |o| {
                matches!(o, HeapObject::Date(_))
            })))
        })
        .function("isNativeError", Arity::Fixed(1), |heap, args| {
            Ok(Value::Boolean(is_kind(heap, &arg(&args, 0), |o| {
                matches!(o, HeapObject::Error(_))
            })))
        })
        .function("isUint8Array", Arity::Fixed(1), |heap, args| {
            Ok(Value::Boolean(is_kind(heap, &arg(&args, 0), |o| {
                matches!(o, HeapObject::Bytes(_))
            })))
        })
        .build()
}

fn is_kind(heap: &Heap, value: &Value, test: fn(&HeapObject) -> bool) -> bool {
    value
        .as_handle()
        .and_then(|h| heap.get(h))
        .map_or(false, test)
}

/// printf-style formatting: `%s %d %i %f %j %o %O %%` in a leading string, remaining arguments
/// appended separated by spaces.
pub fn format_values(heap: &Heap, args: &[Value]) -> String {
    let mut rest = args.iter();
    let mut pieces = Vec::new();
    if let Some(Value::String(template)) = args.first() {
        rest.next();
        pieces.push(apply_template(heap, template, &mut rest));
    }
    pieces.extend(rest.map(|value| match value {
        Value::String(s) => s.clone(),
        other => inspect(heap, other),
    }));
    pieces.join(" ")
}

fn apply_template<'a>(
    heap: &Heap,
    template: &str,
    values: &mut impl Iterator<Item = &'a Value>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        let directive = match chars.peek() {
            Some(d) if "sdifjoO%".contains(*d) => *d,
            _ => {
                out.push('%');
                continue;
            }
        };
        chars.next();
        if directive == '%' {
            out.push('%');
            continue;
        }
        match values.next() {
            Some(value) => out.push_str(&format_directive(heap, directive, value)),
            None => {
                out.push('%');
                out.push(directive);
            }
        }
    }
    out
}

fn format_directive(heap: &Heap, directive: char, value: &Value) -> String {
    let args = std::slice::from_ref(value);
    match directive {
        's' => match value {
            Value::String(s) => s.clone(),
            Value::Ref(_) => inspect(heap, value),
            other => heap.display(other),
        },
        'd' | 'i' => {
            let n = number_arg(heap, args, 0);
            render_number(if directive == 'i' { n.trunc() } else { n })
        }
        'f' => render_number(number_arg(heap, args, 0)),
        'j' => {
            let mut visiting = HashSet::new();
            match to_json(heap, value, &mut visiting) {
                Ok(Some(json)) => json.to_string(),
                Ok(None) => "undefined".to_string(),
                Err(_) => "[Circular]".to_string(),
            }
        }
        _ => inspect(heap, value),
    }
}

/// Human-readable rendering of any value, cycle-safe.
pub fn inspect(heap: &Heap, value: &Value) -> String {
    let mut visiting = HashSet::new();
    inspect_inner(heap, value, true, &mut visiting)
}

fn inspect_inner(heap: &Heap, value: &Value, top: bool, visiting: &mut HashSet<Handle>) -> String {
    match value {
        Value::String(s) if top => s.clone(),
        Value::String(s) => format!("'{}'", s.replace('\'', "\\'")),
        Value::BigInt(i) => format!("{}n", i),
        Value::Native(f) => format!("[Function: {}]", f.name),
        Value::Ref(h) => {
            let Some(object) = heap.get(*h) else {
                return format!("<dangling {}>", h);
            };
            if !visiting.insert(*h) {
                return "[Circular]".to_string();
            }
            let text = match object {
                HeapObject::Array(slots) => {
                    let items: Vec<String> = slots
                        .iter()
                        .map(|slot| match slot {
                            Some(v) => inspect_inner(heap, v, false, visiting),
                            None => "<empty>".to_string(),
                        })
                        .collect();
                    bracket("[", items, "]")
                }
                HeapObject::Object(members) => {
                    let items: Vec<String> = members
                        .iter()
                        .map(|(k, v)| format!("{}: {}", k, inspect_inner(heap, v, false, visiting)))
                        .collect();
                    bracket("{", items, "}")
                }
                HeapObject::Date(at) => render_date(at),
                HeapObject::Error(e) if e.message.is_empty() => format!("[{}]", e.name),
                HeapObject::Error(e) => format!("[{}: {}]", e.name, e.message),
                HeapObject::Function(f) => match f.name() {
                    Some(name) => format!("[Function: {}]", name),
                    None => "[Function (anonymous)]".to_string(),
                },
                HeapObject::Bytes(data) => format!(
                    "Uint8Array({}) {}",
                    data.len(),
                    bracket("[", data.iter().map(|b| b.to_string()).collect(), "]")
                ),
            };
            visiting.remove(h);
            text
        }
        other => heap.display(other),
    }
}

fn bracket(open: &str, items: Vec<String>, close: &str) -> String {
    if items.is_empty() {
        format!("{}{}", open, close)
    } else {
        format!("{} {} {}", open, items.join(", "), close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_substitutes_directives() {
        let heap = Heap::new();
        let text = format_values(
            &heap,
            &[
                Value::from("%s has %d items (%i%%)"),
                Value::from("cart"),
                Value::from(3),
                Value::from(42.9),
                Value::from("extra"),
            ],
        );
        assert_eq!(text, "cart has 3 items (42%) extra");
    }

    #[test]
    fn format_without_template_inspects_each_argument() {
        let mut heap = Heap::new();
        let obj = heap.object(vec![("a", Value::from(1)), ("b", Value::from("x"))]);
        let text = format_values(&heap, &[Value::from(1), obj, Value::Null]);
        assert_eq!(text, "1 { a: 1, b: 'x' } null");
    }

    #[test]
    fn inspect_marks_cycles() {
        let mut heap = Heap::new();
        let list = heap.array(vec![Value::from(1)]);
        heap.set(&list, "1", list.clone()).unwrap();
        assert_eq!(inspect(&heap, &list), "[ 1, [Circular] ]");
        assert_eq!(inspect(&heap, &Value::Number(-0.0)), "-0");
    }
}
