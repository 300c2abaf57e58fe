//! Arena storage for composite values.
//!
//! Every array, object, date, error and source-defined function lives in a [`Heap`] and is
//! addressed by a [`Handle`]. Graph edges are `Value::Ref(handle)`, so shared substructure is two
//! slots holding the same handle and a cycle is a slot holding an ancestor's handle. Nothing in
//! the heap owns anything else, which keeps cyclic graphs free of ownership cycles.

use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::number::render_number;
use crate::runtime::values::{SourceFunction, Value};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Index of an object in its [`Heap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32);

impl Handle {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ErrorObject {
    pub name: String,
    pub message: String,
    /// `Value::Undefined` when the error has no cause.
    pub cause: Value,
}

impl ErrorObject {
    pub fn new(message: &str) -> Self {
        ErrorObject {
            name: "Error".to_string(),
            message: message.to_string(),
            cause: Value::Undefined,
        }
    }
}

#[derive(Debug, Clone)]
pub enum HeapObject {
    /// `None` slots are holes.
    Array(Vec<Option<Value>>),
    Object(IndexMap<String, Value>),
    Date(DateTime<Utc>),
    Error(ErrorObject),
    Function(SourceFunction),
    /// Raw binary buffer.
    Bytes(Vec<u8>),
}

impl HeapObject {
    pub fn type_name(&self) -> &'static str {
        match self {
            HeapObject::Array(_) => "Array",
            HeapObject::Object(_) => "Object",
            HeapObject::Date(_) => "Date",
            HeapObject::Error(_) => "Error",
            HeapObject::Function(_) => "function",
            HeapObject::Bytes(_) => "Uint8Array",
        }
    }
}

/// Truncates to millisecond precision, the resolution dates carry on the wire.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(at.timestamp_millis())
        .single()
        .unwrap_or(at)
}

/// Canonical date text: RFC 3339, UTC, millisecond precision. Years outside `0..=9999` use the
/// expanded `±YYYYYY` form.
pub fn render_date(at: &DateTime<Utc>) -> String {
    let year = at.year();
    if (0..=9999).contains(&year) {
        return at.to_rfc3339_opts(SecondsFormat::Millis, true);
    }
    let sign = if year < 0 { '-' } else { '+' };
    format!(
        "{}{:06}{}",
        sign,
        year.unsigned_abs(),
        at.format("-%m-%dT%H:%M:%S%.3fZ")
    )
}

/// Reads `±YYYYYY-MM-DDTHH:MM:SS[.fff]<offset>`. `-000000` is rejected.
fn parse_expanded_year(text: &str) -> Option<DateTime<Utc>> {
    let sign = match text.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let digits = text.get(1..7)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = sign * digits.parse::<i32>().ok()?;
    if sign < 0 && year == 0 {
        return None;
    }
    // leap placeholder so 02-29 parses; with_year rejects it for common years
    let placeholder = DateTime::parse_from_rfc3339(&format!("2000{}", text.get(7..)?)).ok()?;
    placeholder
        .with_year(year)
        .map(|at| truncate_to_millis(at.with_timezone(&Utc)))
}

/// Parses RFC 3339 text or its expanded-year form, falling back to a bare `YYYY-MM-DD` (UTC
/// midnight) or a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` read as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(truncate_to_millis(at.with_timezone(&Utc)));
    }
    if let Some(at) = parse_expanded_year(text) {
        return Some(at);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| truncate_to_millis(Utc.from_utc_datetime(&naive)))
}

#[derive(Debug, Clone, Default)]
pub struct Heap {
    objects: Vec<HeapObject>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn alloc(&mut self, object: HeapObject) -> Handle {
        let handle = Handle::new(self.objects.len() as u32);
        self.objects.push(object);
        handle
    }

    pub fn get(&self, handle: Handle) -> Option<&HeapObject> {
        self.objects.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut HeapObject> {
        self.objects.get_mut(handle.index())
    }

    /// Drops every object allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.objects.truncate(len);
    }

    fn require(&self, handle: Handle) -> RuntimeResult<&HeapObject> {
        self.get(handle).ok_or(RuntimeError::InvalidHandle(handle))
    }

    pub fn array<I>(&mut self, items: I) -> Value
    where
        I: IntoIterator<Item = Value>,
    {
        let slots = items.into_iter().map(Some).collect();
        Value::Ref(self.alloc(HeapObject::Array(slots)))
    }

    pub fn sparse_array(&mut self, slots: Vec<Option<Value>>) -> Value {
        Value::Ref(self.alloc(HeapObject::Array(slots)))
    }

    pub fn object<I, K>(&mut self, entries: I) -> Value
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let members = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Value::Ref(self.alloc(HeapObject::Object(members)))
    }

    pub fn date(&mut self, at: DateTime<Utc>) -> Value {
        Value::Ref(self.alloc(HeapObject::Date(truncate_to_millis(at))))
    }

    pub fn error(&mut self, name: &str, message: &str, cause: Value) -> Value {
        Value::Ref(self.alloc(HeapObject::Error(ErrorObject {
            name: name.to_string(),
            message: message.to_string(),
            cause,
        })))
    }

    pub fn function(&mut self, function: SourceFunction) -> Value {
        Value::Ref(self.alloc(HeapObject::Function(function)))
    }

    pub fn bytes(&mut self, data: Vec<u8>) -> Value {
        Value::Ref(self.alloc(HeapObject::Bytes(data)))
    }

    /// Precise type name of `value`, looking through heap references.
    pub fn type_name(&self, value: &Value) -> &'static str {
        match value {
            Value::Ref(h) => self.get(*h).map(HeapObject::type_name).unwrap_or("dangling"),
            other => other.type_name(),
        }
    }

    /// Writes `value` under `key`: a member of an object, an index of an array, or the
    /// `name`/`message`/`cause` field of an error.
    pub fn set(&mut self, target: &Value, key: &str, value: Value) -> RuntimeResult<()> {
        let handle = target
            .as_handle()
            .ok_or_else(|| RuntimeError::type_error("object", target.type_name(), "set"))?;
        let object = self
            .get_mut(handle)
            .ok_or(RuntimeError::InvalidHandle(handle))?;
        match object {
            HeapObject::Object(members) => {
                members.insert(key.to_string(), value);
                Ok(())
            }
            HeapObject::Array(slots) => {
                let index = key
                    .parse::<usize>()
                    .map_err(|_| RuntimeError::type_error("array index", key, "set"))?;
                if slots.len() <= index {
                    let length = index
                        .checked_add(1)
                        .ok_or_else(|| RuntimeError::type_error("array index", key, "set"))?;
                    slots.resize(length, None);
                }
                slots[index] = Some(value);
                Ok(())
            }
            HeapObject::Error(error) => match (key, value) {
                ("cause", v) => {
                    error.cause = v;
                    Ok(())
                }
                ("name", Value::String(s)) => {
                    error.name = s;
                    Ok(())
                }
                ("message", Value::String(s)) => {
                    error.message = s;
                    Ok(())
                }
                (_, v) => Err(RuntimeError::type_error(
                    "name, message or cause",
                    v.type_name(),
                    "set on Error",
                )),
            },
            other => Err(RuntimeError::type_error(
                "Object, Array or Error",
                other.type_name(),
                "set",
            )),
        }
    }

    /// Reads `key` from `target`. Missing members are `Undefined`.
    pub fn property(&self, target: &Value, key: &str) -> RuntimeResult<Value> {
        match target {
            Value::Null | Value::Undefined => Err(RuntimeError::TypeError {
                expected: "object".to_string(),
                actual: target.type_name().to_string(),
                operation: format!("read property '{}'", key),
            }),
            Value::String(s) => Ok(match key {
                "length" => Value::Number(s.encode_utf16().count() as f64),
                _ => key
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| s.chars().nth(i))
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Undefined),
            }),
            Value::Native(f) => Ok(match key {
                "name" => Value::String(f.name.clone()),
                _ => Value::Undefined,
            }),
            Value::Ref(h) => Ok(match self.require(*h)? {
                HeapObject::Object(members) => members.get(key).cloned().unwrap_or(Value::Undefined),
                HeapObject::Array(slots) => match key {
                    "length" => Value::Number(slots.len() as f64),
                    _ => key
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| slots.get(i).cloned().flatten())
                        .unwrap_or(Value::Undefined),
                },
                HeapObject::Error(error) => match key {
                    "name" => Value::String(error.name.clone()),
                    "message" => Value::String(error.message.clone()),
                    "cause" => error.cause.clone(),
                    _ => Value::Undefined,
                },
                HeapObject::Function(function) => match key {
                    "name" => Value::String(function.name().unwrap_or_default().to_string()),
                    "length" => Value::Number(function.params().len() as f64),
                    _ => Value::Undefined,
                },
                HeapObject::Bytes(data) => match key {
                    "length" => Value::Number(data.len() as f64),
                    _ => key
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| data.get(i))
                        .map(|b| Value::Number(f64::from(*b)))
                        .unwrap_or(Value::Undefined),
                },
                HeapObject::Date(_) => Value::Undefined,
            }),
            _ => Ok(Value::Undefined),
        }
    }

    /// String coercion used by `+`, `console` and `util.format`.
    pub fn display(&self, value: &Value) -> String {
        let mut visiting = HashSet::new();
        self.display_inner(value, &mut visiting)
    }

    fn display_inner(&self, value: &Value, visiting: &mut HashSet<Handle>) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Undefined => "undefined".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => render_number(*n),
            Value::String(s) => s.clone(),
            Value::Symbol(s) => format!("Symbol({})", s),
            Value::BigInt(i) => i.to_string(),
            Value::Native(f) => format!("function {}() {{ [native code] }}", f.name),
            Value::Ref(h) => {
                if !visiting.insert(*h) {
                    return String::new();
                }
                let text = match self.get(*h) {
                    None => format!("<dangling {}>", h),
                    Some(HeapObject::Array(slots)) => slots
                        .iter()
                        .map(|slot| match slot {
                            Some(v) if !v.is_nullish() => self.display_inner(v, visiting),
                            _ => String::new(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                    Some(HeapObject::Object(_)) => "[object Object]".to_string(),
                    Some(HeapObject::Date(at)) => render_date(at),
                    Some(HeapObject::Error(e)) if e.message.is_empty() => e.name.clone(),
                    Some(HeapObject::Error(e)) => format!("{}: {}", e.name, e.message),
                    Some(HeapObject::Function(f)) => f.source().to_string(),
                    Some(HeapObject::Bytes(data)) => data
                        .iter()
                        .map(|b| b.to_string())
                        .collect::<Vec<_>>()
                        .join(","),
                };
                visiting.remove(h);
                text
            }
        }
    }

    /// Structural equality between `a` in this heap and `b` in `other`.
    ///
    /// Numbers compare with same-value semantics (`NaN` equals `NaN`, `0` and `-0` differ),
    /// natives by identity, functions by source text. Cycles are handled by assuming a pair
    /// of handles equal while it is being compared.
    pub fn deep_eq(&self, a: &Value, other: &Heap, b: &Value) -> bool {
        let mut assumed = HashSet::new();
        self.deep_eq_inner(a, other, b, &mut assumed)
    }

    fn deep_eq_inner(
        &self,
        a: &Value,
        other: &Heap,
        b: &Value,
        assumed: &mut HashSet<(Handle, Handle)>,
    ) -> bool {
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan())
            }
            (Value::Native(x), Value::Native(y)) => Arc::ptr_eq(x, y),
            (Value::Ref(x), Value::Ref(y)) => {
                if !assumed.insert((*x, *y)) {
                    return true;
                }
                match (self.get(*x), other.get(*y)) {
                    (Some(left), Some(right)) => self.objects_eq(left, other, right, assumed),
                    _ => false,
                }
            }
            _ => a == b,
        }
    }

    fn objects_eq(
        &self,
        left: &HeapObject,
        other: &Heap,
        right: &HeapObject,
        assumed: &mut HashSet<(Handle, Handle)>,
    ) -> bool {
        match (left, right) {
            (HeapObject::Array(xs), HeapObject::Array(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|pair| match pair {
                        (Some(x), Some(y)) => self.deep_eq_inner(x, other, y, assumed),
                        (None, None) => true,
                        _ => false,
                    })
            }
            (HeapObject::Object(xs), HeapObject::Object(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().all(|(k, x)| match ys.get(k) {
                        Some(y) => self.deep_eq_inner(x, other, y, assumed),
                        None => false,
                    })
            }
            (HeapObject::Date(x), HeapObject::Date(y)) => x == y,
            (HeapObject::Error(x), HeapObject::Error(y)) => {
                x.name == y.name
                    && x.message == y.message
                    && self.deep_eq_inner(&x.cause, other, &y.cause, assumed)
            }
            (HeapObject::Function(x), HeapObject::Function(y)) => x.source() == y.source(),
            (HeapObject::Bytes(x), HeapObject::Bytes(y)) => x == y,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_extends_arrays_with_holes() {
        let mut heap = Heap::new();
        let arr = heap.array(vec![Value::from(1)]);
        heap.set(&arr, "3", Value::from("x")).unwrap();
        assert_eq!(heap.property(&arr, "length").unwrap(), Value::Number(4.0));
        assert_eq!(heap.property(&arr, "2").unwrap(), Value::Undefined);
        assert_eq!(heap.property(&arr, "3").unwrap(), Value::from("x"));
    }

    #[test]
    fn property_on_null_is_a_type_error() {
        let heap = Heap::new();
        assert!(matches!(
            heap.property(&Value::Null, "x"),
            Err(RuntimeError::TypeError { .. })
        ));
    }

    #[test]
    fn deep_eq_handles_cycles_and_nan() {
        let mut left = Heap::new();
        let a = left.object([("n", Value::Number(f64::NAN))]);
        left.set(&a, "me", a.clone()).unwrap();

        let mut right = Heap::new();
        let _padding = right.array(Vec::new());
        let b = right.object([("n", Value::Number(f64::NAN))]);
        right.set(&b, "me", b.clone()).unwrap();

        assert!(left.deep_eq(&a, &right, &b));

        right.set(&b, "extra", Value::Null).unwrap();
        assert!(!left.deep_eq(&a, &right, &b));
    }

    #[test]
    fn deep_eq_distinguishes_holes_from_undefined() {
        let mut heap = Heap::new();
        let holes = heap.sparse_array(vec![None, Some(Value::from(1))]);
        let filled = heap.array(vec![Value::Undefined, Value::from(1)]);
        assert!(!heap.deep_eq(&holes, &heap, &filled));
    }

    #[test]
    fn dates_are_truncated_to_millis() {
        let mut heap = Heap::new();
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let date = heap.date(at);
        match heap.get(date.as_handle().unwrap()) {
            Some(HeapObject::Date(stored)) => {
                assert_eq!(render_date(stored), "2023-11-14T22:13:20.123Z")
            }
            other => panic!("expected date, got {:?}", other),
        }
    }

    #[test]
    fn expanded_years_render_with_six_digits() {
        let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(render_date(&far), "+010000-01-01T00:00:00.000Z");
        let bc = Utc.with_ymd_and_hms(-1, 6, 15, 12, 30, 0).unwrap();
        assert_eq!(render_date(&bc), "-000001-06-15T12:30:00.000Z");

        assert_eq!(parse_date("+010000-01-01T00:00:00.000Z"), Some(far));
        assert_eq!(parse_date("-000001-06-15T12:30:00.000Z"), Some(bc));
        assert_eq!(
            parse_date("+002024-02-29T00:00:00Z"),
            Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).single()
        );
        assert_eq!(parse_date("+002023-02-29T00:00:00Z"), None);
        assert_eq!(parse_date("-000000-01-01T00:00:00Z"), None);
    }

    #[test]
    fn display_joins_arrays_and_formats_errors() {
        let mut heap = Heap::new();
        let arr = heap.array(vec![Value::from(1), Value::Null, Value::from("b")]);
        assert_eq!(heap.display(&arr), "1,,b");
        let err = heap.error("TypeError", "bad", Value::Undefined);
        assert_eq!(heap.display(&err), "TypeError: bad");
    }
}
