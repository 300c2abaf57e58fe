// Math global

use super::number_arg;
use crate::registry::Namespace;
use crate::runtime::error::RuntimeResult;
use crate::runtime::heap::Heap;
use crate::runtime::values::{Arity, Value};
use std::sync::Arc;

fn unary(f: fn(f64) -> f64) -> impl Fn(&mut Heap, Vec<Value>) -> RuntimeResult<Value> {
    move |heap, args| Ok(Value::Number(f(number_arg(heap, &args, 0))))
}

fn binary(f: fn(f64, f64) -> f64) -> impl Fn(&mut Heap, Vec<Value>) -> RuntimeResult<Value> {
    move |heap, args| {
        Ok(Value::Number(f(
            number_arg(heap, &args, 0),
            number_arg(heap, &args, 1),
        )))
    }
}

pub fn namespace() -> Arc<Namespace> {
    Namespace::builder("Math")
        .function("abs", Arity::Fixed(1), unary(f64::abs))
        .function("ceil", Arity::Fixed(1), unary(f64::ceil))
        .function("floor", Arity::Fixed(1), unary(f64::floor))
        .function("round", Arity::Fixed(1), unary(round))
        .function("trunc", Arity::Fixed(1), unary(f64::trunc))
        .function("sign", Arity::Fixed(1), unary(sign))
        .function("sqrt", Arity::Fixed(1), unary(f64::sqrt))
        .function("cbrt", Arity::Fixed(1), unary(f64::cbrt))
        .function("pow", Arity::Fixed(2), binary(f64::powf))
        .function("exp", Arity::Fixed(1), unary(f64::exp))
        .function("log", Arity::Fixed(1), unary(f64::ln))
        .function("log2", Arity::Fixed(1), unary(f64::log2))
        .function("log10", Arity::Fixed(1), unary(f64::log10))
        .function("sin", Arity::Fixed(1), unary(f64::sin))
        .function("cos", Arity::Fixed(1), unary(f64::cos))
        .function("tan", Arity::Fixed(1), unary(f64::tan))
        .function("atan", Arity::Fixed(1), unary(f64::atan))
        .function("atan2", Arity::Fixed(2), binary(f64::atan2))
        .function("hypot", Arity::Variadic(0), hypot)
        .function("max", Arity::Variadic(0), max)
        .function("min", Arity::Variadic(0), min)
        .build()
}

/// Rounds half-way cases towards positive infinity.
fn round(x: f64) -> f64 {
    if !x.is_finite() || x == x.trunc() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn hypot(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let sum: f64 = (0..args.len())
        .map(|i| number_arg(heap, &args, i).powi(2))
        .sum();
    Ok(Value::Number(sum.sqrt()))
}

fn max(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    fold(heap, &args, f64::NEG_INFINITY, |acc, x| if x > acc { x } else { acc })
}

fn min(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    fold(heap, &args, f64::INFINITY, |acc, x| if x < acc { x } else { acc })
}

fn fold(heap: &Heap, args: &[Value], init: f64, pick: fn(f64, f64) -> f64) -> RuntimeResult<Value> {
    let mut acc = init;
    for i in 0..args.len() {
        let x = number_arg(heap, args, i);
        if x.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        acc = pick(acc, x);
    }
    Ok(Value::Number(acc))
}
