// JSON global: conversion between heap values and JSON text

use super::{arg, number_arg, string_arg};
use crate::registry::Namespace;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::{render_date, Handle, Heap, HeapObject};
use crate::runtime::values::{Arity, Value};
use serde::Serialize;
use serde_json::{Map, Number, Value as Json};
use std::collections::HashSet;
use std::sync::Arc;

pub fn namespace() -> Arc<Namespace> {
    Namespace::builder("JSON")
        .function("parse", Arity::Fixed(1), parse)
        .function("stringify", Arity::Range(1, 3), stringify)
        .build()
}

fn parse(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let text = string_arg(&args, 0, "JSON.parse")?;
    let json: Json =
        serde_json::from_str(&text).map_err(|e| RuntimeError::JsonError(e.to_string()))?;
    Ok(from_json(heap, &json))
}

fn stringify(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let value = arg(&args, 0);
    let mut visiting = HashSet::new();
    let json = match to_json(heap, &value, &mut visiting)? {
        Some(json) => json,
        None => return Ok(Value::Undefined),
    };
    let indent = match args.get(2) {
        Some(Value::String(s)) => s.chars().take(10).collect::<String>(),
        Some(Value::Number(_)) => " ".repeat(number_arg(heap, &args, 2).clamp(0.0, 10.0) as usize),
        _ => String::new(),
    };
    if indent.is_empty() {
        let text =
            serde_json::to_string(&json).map_err(|e| RuntimeError::JsonError(e.to_string()))?;
        return Ok(Value::String(text));
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)
        .map_err(|e| RuntimeError::JsonError(e.to_string()))?;
    Ok(Value::String(String::from_utf8_lossy(&out).into_owned()))
}

/// Allocates the JSON document into `heap`.
pub fn from_json(heap: &mut Heap, json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => {
            let values: Vec<Value> = items.iter().map(|item| from_json(heap, item)).collect();
            heap.array(values)
        }
        Json::Object(members) => {
            let entries: Vec<(String, Value)> = members
                .iter()
                .map(|(k, v)| (k.clone(), from_json(heap, v)))
                .collect();
            heap.object(entries)
        }
    }
}

/// Converts a heap value to JSON. `None` stands for a value JSON cannot hold (`undefined`,
/// callables, symbols): omitted from objects, `null` inside arrays.
pub fn to_json(
    heap: &Heap,
    value: &Value,
    visiting: &mut HashSet<Handle>,
) -> RuntimeResult<Option<Json>> {
    Ok(Some(match value {
        Value::Null => Json::Null,
        Value::Undefined | Value::Symbol(_) | Value::Native(_) => return Ok(None),
        Value::Boolean(b) => Json::Bool(*b),
        Value::Number(n) => json_number(*n),
        Value::String(s) => Json::String(s.clone()),
        Value::BigInt(_) => {
            return Err(RuntimeError::JsonError(
                "Do not know how to serialize a BigInt".to_string(),
            ))
        }
        Value::Ref(handle) => {
            let object = heap
                .get(*handle)
                .ok_or(RuntimeError::InvalidHandle(*handle))?;
            if let HeapObject::Function(_) = object {
                return Ok(None);
            }
            if !visiting.insert(*handle) {
                return Err(RuntimeError::JsonError(
                    "Converting circular structure to JSON".to_string(),
                ));
            }
            let json = match object {
                HeapObject::Array(slots) => {
                    let mut items = Vec::with_capacity(slots.len());
                    for slot in slots {
                        let item = match slot {
                            Some(v) => to_json(heap, v, visiting)?,
                            None => None,
                        };
                        items.push(item.unwrap_or(Json::Null));
                    }
                    Json::Array(items)
                }
                HeapObject::Object(members) => {
                    let mut map = Map::new();
                    for (key, v) in members {
                        if let Some(item) = to_json(heap, v, visiting)? {
                            map.insert(key.clone(), item);
                        }
                    }
                    Json::Object(map)
                }
                HeapObject::Date(at) => Json::String(render_date(at)),
                HeapObject::Error(_) => Json::Object(Map::new()),
                HeapObject::Bytes(data) => Json::Object(
                    data.iter()
                        .enumerate()
                        .map(|(i, b)| (i.to_string(), Json::from(*b)))
                        .collect(),
                ),
                HeapObject::Function(_) => Json::Null,
            };
            visiting.remove(handle);
            json
        }
    }))
}

fn json_number(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}
