// Number, Object, Array, Date and String globals

use super::{arg, number_arg};
use crate::registry::Namespace;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::{parse_date, Heap, HeapObject};
use crate::runtime::values::{Arity, Value};
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::Arc;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub fn number_namespace() -> Arc<Namespace> {
    Namespace::builder("Number")
        .function("isNaN", Arity::Fixed(1), |_, args| {
            Ok(Value::Boolean(matches!(arg(&args, 0), Value::Number(n) if n.is_nan())))
        })
        .function("isFinite", Arity::Fixed(1), |_, args| {
            Ok(Value::Boolean(
                matches!(arg(&args, 0), Value::Number(n) if n.is_finite()),
            ))
        })
        .function("isInteger", Arity::Fixed(1), |_, args| {
            Ok(Value::Boolean(
                matches!(arg(&args, 0), Value::Number(n) if n.is_finite() && n.trunc() == n),
            ))
        })
        .function("isSafeInteger", Arity::Fixed(1), |_, args| {
            Ok(Value::Boolean(matches!(
                arg(&args, 0),
                Value::Number(n) if n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
            )))
        })
        .function("parseFloat", Arity::Fixed(1), |heap, args| {
            Ok(Value::Number(parse_float(&heap.display(&arg(&args, 0)))))
        })
        .function("parseInt", Arity::Range(1, 2), |heap, args| {
            let text = heap.display(&arg(&args, 0));
            let radix = match args.get(1) {
                None | Some(Value::Undefined) => 0,
                Some(_) => number_arg(heap, &args, 1) as u32,
            };
            Ok(Value::Number(parse_int(&text, radix)))
        })
        .build()
}

pub fn object_namespace() -> Arc<Namespace> {
    Namespace::builder("Object")
        .function("keys", Arity::Fixed(1), |heap, args| {
            let entries = own_entries(heap, &arg(&args, 0), "Object.keys")?;
            let keys: Vec<Value> = entries.into_iter().map(|(k, _)| Value::String(k)).collect();
            Ok(heap.array(keys))
        })
        .function("values", Arity::Fixed(1), |heap, args| {
            let entries = own_entries(heap, &arg(&args, 0), "Object.values")?;
            let values: Vec<Value> = entries.into_iter().map(|(_, v)| v).collect();
            Ok(heap.array(values))
        })
        .function("entries", Arity::Fixed(1), |heap, args| {
            let entries = own_entries(heap, &arg(&args, 0), "Object.entries")?;
            let pairs: Vec<Value> = entries
                .into_iter()
                .map(|(k, v)| heap.array(vec![Value::String(k), v]))
                .collect();
            Ok(heap.array(pairs))
        })
        .build()
}

/// Own enumerable string-keyed members, in enumeration order.
fn own_entries(heap: &Heap, target: &Value, operation: &str) -> RuntimeResult<Vec<(String, Value)>> {
    match target {
        Value::Null | Value::Undefined => Err(RuntimeError::type_error(
            "object",
            target.type_name(),
            operation,
        )),
        Value::String(s) => Ok(s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
            .collect()),
        Value::Ref(h) => match heap.get(*h) {
            Some(HeapObject::Object(members)) => Ok(members
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Some(HeapObject::Array(slots)) => Ok(slots
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.clone().map(|v| (i.to_string(), v)))
                .collect()),
            Some(HeapObject::Bytes(data)) => Ok(data
                .iter()
                .enumerate()
                .map(|(i, b)| (i.to_string(), Value::Number(f64::from(*b))))
                .collect()),
            Some(_) => Ok(Vec::new()),
            None => Err(RuntimeError::InvalidHandle(*h)),
        },
        _ => Ok(Vec::new()),
    }
}

pub fn array_namespace() -> Arc<Namespace> {
    Namespace::builder("Array")
        .function("isArray", Arity::Fixed(1), |heap, args| {
            let is_array = arg(&args, 0)
                .as_handle()
                .and_then(|h| heap.get(h))
                .map_or(false, |o| matches!(o, HeapObject::Array(_)));
            Ok(Value::Boolean(is_array))
        })
        .function("of", Arity::Variadic(0), |heap, args| Ok(heap.array(args)))
        .build()
}

pub fn date_namespace() -> Arc<Namespace> {
    Namespace::builder("Date")
        .function("now", Arity::Fixed(0), |_, _| {
            Ok(Value::Number(Utc::now().timestamp_millis() as f64))
        })
        .function("parse", Arity::Fixed(1), |heap, args| {
            let text = heap.display(&arg(&args, 0));
            Ok(Value::Number(
                parse_date(text.trim()).map_or(f64::NAN, |at| at.timestamp_millis() as f64),
            ))
        })
        .function("UTC", Arity::Range(1, 7), |heap, args| {
            let fields: Vec<f64> = (0..7)
                .map(|i| match args.get(i) {
                    Some(_) => number_arg(heap, &args, i),
                    None => f64::from(u8::from(i == 2)),
                })
                .collect();
            Ok(Value::Number(utc_millis(&fields)))
        })
        .build()
}

/// `Date.UTC` field arithmetic: months overflow into years, the other fields into milliseconds.
fn utc_millis(fields: &[f64]) -> f64 {
    if fields.iter().any(|f| !f.is_finite()) {
        return f64::NAN;
    }
    let mut year = fields[0].trunc() as i64;
    if (0..=99).contains(&year) {
        year += 1900;
    }
    let months = year * 12 + fields[1].trunc() as i64;
    let (year, month) = (months.div_euclid(12), months.rem_euclid(12) as u32 + 1);
    let first = match i32::try_from(year)
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, month, 1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        Some(naive) => Utc.from_utc_datetime(&naive).timestamp_millis() as f64,
        None => return f64::NAN,
    };
    let day_ms = 86_400_000.0;
    first
        + (fields[2].trunc() - 1.0) * day_ms
        + fields[3].trunc() * 3_600_000.0
        + fields[4].trunc() * 60_000.0
        + fields[5].trunc() * 1_000.0
        + fields[6].trunc()
}

pub fn string_namespace() -> Arc<Namespace> {
    Namespace::builder("String")
        .function("fromCharCode", Arity::Variadic(0), |heap, args| {
            let units: Vec<u16> = (0..args.len())
                .map(|i| {
                    let n = number_arg(heap, &args, i);
                    if n.is_finite() {
                        n.trunc() as i64 as u16
                    } else {
                        0
                    }
                })
                .collect();
            Ok(Value::String(String::from_utf16_lossy(&units)))
        })
        .build()
}

/// Longest numeric prefix after leading whitespace, `NaN` when there is none.
pub fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let (sign, body) = match text.as_bytes().first() {
        Some(b'-') => (-1.0, &text[1..]),
        Some(b'+') => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    if body.starts_with("Infinity") {
        return sign * f64::INFINITY;
    }
    let bytes = body.as_bytes();
    let mut end = 0;
    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }
    body[..end]
        .parse::<f64>()
        .map(|n| sign * n)
        .unwrap_or(f64::NAN)
}

/// Integer prefix in `radix` (2 to 36; 0 means 10, or 16 with a `0x` prefix).
pub fn parse_int(text: &str, radix: u32) -> f64 {
    let text = text.trim_start();
    let (sign, mut body) = match text.as_bytes().first() {
        Some(b'-') => (-1.0, &text[1..]),
        Some(b'+') => (1.0, &text[1..]),
        _ => (1.0, text),
    };
    let mut radix = radix;
    let has_hex_prefix = body.starts_with("0x") || body.starts_with("0X");
    if (radix == 0 || radix == 16) && has_hex_prefix {
        body = &body[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let mut value = 0.0f64;
    let mut any = false;
    for c in body.chars() {
        match c.to_digit(radix) {
            Some(d) => {
                value = value * f64::from(radix) + f64::from(d);
                any = true;
            }
            None => break,
        }
    }
    if any {
        sign * value
    } else {
        f64::NAN
    }
}
