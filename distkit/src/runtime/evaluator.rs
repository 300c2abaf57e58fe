// Evaluator for source-defined callables

use crate::ast::{
    BinaryOp, Expression, FunctionBody, FunctionDef, Literal, LogicalOp, Statement, UnaryOp,
};
use crate::registry::{Member, NativeRegistry};
use crate::runtime::environment::Environment;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::{Heap, HeapObject};
use crate::runtime::number::{coerce_str, render_number};
use crate::runtime::values::{NativeRef, SourceFunction, Value};
use std::cmp::Ordering;
use std::sync::Arc;

const MAX_CALL_DEPTH: usize = 128;

enum Flow {
    Normal,
    Return(Value),
}

/// Calls native and source-defined callables. Free identifiers in source-defined bodies resolve
/// against the registry's global built-ins.
pub struct Evaluator {
    registry: Arc<NativeRegistry>,
    max_call_depth: usize,
}

impl Evaluator {
    pub fn new(registry: Arc<NativeRegistry>) -> Self {
        Evaluator {
            registry,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    pub fn registry(&self) -> &Arc<NativeRegistry> {
        &self.registry
    }

    /// Invokes `callee` with `args`. Source-defined callables allocate into `heap`.
    pub fn call(&self, heap: &mut Heap, callee: &Value, args: Vec<Value>) -> RuntimeResult<Value> {
        self.call_at_depth(heap, callee, args, 0)
    }

    fn call_at_depth(
        &self,
        heap: &mut Heap,
        callee: &Value,
        args: Vec<Value>,
        depth: usize,
    ) -> RuntimeResult<Value> {
        match callee {
            Value::Native(func) => call_native(heap, func, args),
            Value::Ref(handle) => {
                let function = match heap.get(*handle) {
                    Some(HeapObject::Function(f)) => f.clone(),
                    Some(other) => return Err(RuntimeError::NotCallable(other.type_name().to_string())),
                    None => return Err(RuntimeError::InvalidHandle(*handle)),
                };
                if depth >= self.max_call_depth {
                    return Err(RuntimeError::Generic(format!(
                        "maximum call depth of {} exceeded",
                        self.max_call_depth
                    )));
                }
                self.invoke(heap, callee, &function, args, depth + 1)
            }
            other => Err(RuntimeError::NotCallable(heap.display(other))),
        }
    }

    fn invoke(
        &self,
        heap: &mut Heap,
        callee: &Value,
        function: &SourceFunction,
        args: Vec<Value>,
        depth: usize,
    ) -> RuntimeResult<Value> {
        let closure = Environment::from_bindings(function.captures().clone());
        let mut env = Environment::with_parent(Arc::new(closure));
        let definition = function.definition();
        if let Some(name) = &definition.name {
            env.define(name, callee.clone());
        }
        let mut args = args.into_iter();
        for param in &definition.params {
            env.define(param, args.next().unwrap_or(Value::Undefined));
        }

        let mut frame = Frame {
            evaluator: self,
            heap,
            depth,
        };
        match &definition.body {
            FunctionBody::Expression(expr) => frame.eval(expr, &mut env),
            FunctionBody::Block(statements) => match frame.exec_block(statements, &mut env)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }
}

fn call_native(heap: &mut Heap, func: &NativeRef, args: Vec<Value>) -> RuntimeResult<Value> {
    if !func.arity.accepts(args.len()) {
        return Err(RuntimeError::ArityMismatch {
            function: func.name.clone(),
            expected: func.arity.to_string(),
            actual: args.len(),
        });
    }
    (func.func)(heap, args)
}

/// State of one source-defined call in progress.
struct Frame<'a> {
    evaluator: &'a Evaluator,
    heap: &'a mut Heap,
    depth: usize,
}

impl<'a> Frame<'a> {
    fn exec_block(&mut self, statements: &[Statement], env: &mut Environment) -> RuntimeResult<Flow> {
        for statement in statements {
            if let Flow::Return(value) = self.exec(statement, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, statement: &Statement, env: &mut Environment) -> RuntimeResult<Flow> {
        match statement {
            Statement::Declare(name, init) => {
                let value = match init {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                env.define(name, value);
                Ok(Flow::Normal)
            }
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                Ok(Flow::Return(value))
            }
            Statement::If(test, then, otherwise) => {
                if self.eval(test, env)?.is_truthy() {
                    self.exec_block(then, env)
                } else if let Some(otherwise) = otherwise {
                    self.exec_block(otherwise, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Statement::Expression(expr) => {
                self.eval(expr, env)?;
                Ok(Flow::Normal)
            }
            Statement::Empty => Ok(Flow::Normal),
        }
    }

    fn eval(&mut self, expr: &Expression, env: &mut Environment) -> RuntimeResult<Value> {
        match expr {
            Expression::Literal(lit) => Ok(eval_literal(lit)),
            Expression::Identifier(name) => self.eval_path(&[name.as_str()], env),
            Expression::Member(object, property) => match expr.static_path() {
                Some(path) if !env.contains(path[0]) => self.eval_path(&path, env),
                _ => {
                    let target = self.eval(object, env)?;
                    self.heap.property(&target, property)
                }
            },
            Expression::Index(object, key) => {
                let target = self.eval(object, env)?;
                let key = self.eval(key, env)?;
                let key = match &key {
                    Value::Number(n) => render_number(*n),
                    other => self.heap.display(other),
                };
                self.heap.property(&target, &key)
            }
            Expression::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.eval(item, env))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                Ok(self.heap.array(values))
            }
            Expression::Object(props) => {
                let mut entries = Vec::with_capacity(props.len());
                for (key, value) in props {
                    entries.push((key.clone(), self.eval(value, env)?));
                }
                Ok(self.heap.object(entries))
            }
            Expression::Function(definition, source) => Ok(self.make_closure(definition, source, env)),
            Expression::Call(callee, args) => {
                let callee = self.eval(callee, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, env))
                    .collect::<RuntimeResult<Vec<_>>>()?;
                self.evaluator
                    .call_at_depth(self.heap, &callee, args, self.depth)
            }
            Expression::Unary(op, operand) => {
                let value = self.eval(operand, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Negate => Value::Number(-self.to_number(&value)),
                    UnaryOp::Plus => Value::Number(self.to_number(&value)),
                    UnaryOp::TypeOf => Value::String(type_of(self.heap, &value).to_string()),
                })
            }
            Expression::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                Ok(self.binary(*op, &left, &right))
            }
            Expression::Logical(op, left, right) => {
                let left = self.eval(left, env)?;
                let short_circuit = match op {
                    LogicalOp::And => !left.is_truthy(),
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::Coalesce => !left.is_nullish(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expression::Conditional(test, then, otherwise) => {
                if self.eval(test, env)?.is_truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
        }
    }

    /// Resolves `a.b.c` where `a` is a local binding or a global built-in.
    fn eval_path(&mut self, path: &[&str], env: &Environment) -> RuntimeResult<Value> {
        let root = path[0];
        if let Some(value) = env.lookup(root) {
            return self.read_members(value, &path[1..]);
        }
        match root {
            "NaN" => return self.read_members(Value::Number(f64::NAN), &path[1..]),
            "Infinity" => return self.read_members(Value::Number(f64::INFINITY), &path[1..]),
            _ => {}
        }

        let registry = &self.evaluator.registry;
        if registry.global(root).is_none() {
            return Err(RuntimeError::UndefinedSymbol(root.to_string()));
        }
        for end in 2..=path.len() {
            match registry.lookup_global(&path[..end]) {
                Some(Member::Namespace(_)) => continue,
                Some(Member::Function(func)) => {
                    return self.read_members(Value::Native(func), &path[end..]);
                }
                // getters are evaluated by the lookup
                Some(Member::Getter(_)) | None => {
                    return self.read_members(Value::Undefined, &path[end..]);
                }
            }
        }
        Err(RuntimeError::type_error(
            "value",
            "namespace",
            &format!("use '{}' as a value", path.join(".")),
        ))
    }

    fn read_members(&mut self, mut value: Value, members: &[&str]) -> RuntimeResult<Value> {
        for member in members {
            value = self.heap.property(&value, member)?;
        }
        Ok(value)
    }

    fn make_closure(&mut self, definition: &FunctionDef, source: &str, env: &Environment) -> Value {
        let function = SourceFunction::from_parts(
            source.to_string(),
            Arc::new(definition.clone()),
            env.snapshot(),
        );
        self.heap.function(function)
    }

    fn to_number(&self, value: &Value) -> f64 {
        to_number(self.heap, value)
    }

    fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> Value {
        match op {
            BinaryOp::Add => {
                if is_string_like(left) || is_string_like(right) {
                    let mut text = self.heap.display(left);
                    text.push_str(&self.heap.display(right));
                    Value::String(text)
                } else {
                    Value::Number(self.to_number(left) + self.to_number(right))
                }
            }
            BinaryOp::Subtract => Value::Number(self.to_number(left) - self.to_number(right)),
            BinaryOp::Multiply => Value::Number(self.to_number(left) * self.to_number(right)),
            BinaryOp::Divide => Value::Number(self.to_number(left) / self.to_number(right)),
            BinaryOp::Remainder => Value::Number(self.to_number(left) % self.to_number(right)),
            BinaryOp::Less => Value::Boolean(self.compare(left, right) == Some(Ordering::Less)),
            BinaryOp::LessEqual => Value::Boolean(matches!(
                self.compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Greater => {
                Value::Boolean(self.compare(left, right) == Some(Ordering::Greater))
            }
            BinaryOp::GreaterEqual => Value::Boolean(matches!(
                self.compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::Equal => Value::Boolean(loose_eq(left, right)),
            BinaryOp::NotEqual => Value::Boolean(!loose_eq(left, right)),
            BinaryOp::StrictEqual => Value::Boolean(left == right),
            BinaryOp::StrictNotEqual => Value::Boolean(left != right),
        }
    }

    fn compare(&self, left: &Value, right: &Value) -> Option<Ordering> {
        match (left, right) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => self.to_number(left).partial_cmp(&self.to_number(right)),
        }
    }
}

fn eval_literal(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
        Literal::Undefined => Value::Undefined,
    }
}

fn is_string_like(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Ref(_) | Value::Native(_))
}

/// Strict equality, except that `null == undefined`.
fn loose_eq(left: &Value, right: &Value) -> bool {
    (left.is_nullish() && right.is_nullish()) || left == right
}

pub(crate) fn to_number(heap: &Heap, value: &Value) -> f64 {
    match value {
        Value::Number(n) => *n,
        Value::Boolean(b) => f64::from(u8::from(*b)),
        Value::Null => 0.0,
        Value::String(s) => coerce_str(s),
        Value::BigInt(i) => *i as f64,
        Value::Ref(h) => match heap.get(*h) {
            Some(HeapObject::Date(at)) => at.timestamp_millis() as f64,
            Some(HeapObject::Array(_)) => coerce_str(&heap.display(value)),
            _ => f64::NAN,
        },
        Value::Undefined | Value::Symbol(_) | Value::Native(_) => f64::NAN,
    }
}

/// `typeof` result for `value`.
pub(crate) fn type_of(heap: &Heap, value: &Value) -> &'static str {
    match value {
        Value::Null => "object",
        Value::Ref(h) => match heap.get(*h) {
            Some(HeapObject::Function(_)) => "function",
            _ => "object",
        },
        other => other.type_name(),
    }
}
