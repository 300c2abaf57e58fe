// path and path/posix modules (POSIX semantics)

use super::string_arg;
use crate::registry::Namespace;
use crate::runtime::error::RuntimeResult;
use crate::runtime::heap::Heap;
use crate::runtime::values::{Arity, NativeFunction, NativeRef, Value};
use std::sync::Arc;

fn natives() -> Vec<(&'static str, NativeRef)> {
    vec![
        ("join", NativeFunction::new("join", Arity::Variadic(0), join)),
        (
            "normalize",
            NativeFunction::new("normalize", Arity::Fixed(1), |_, args| {
                Ok(Value::String(normalize(&string_arg(&args, 0, "path.normalize")?)))
            }),
        ),
        (
            "basename",
            NativeFunction::new("basename", Arity::Range(1, 2), basename_native),
        ),
        (
            "dirname",
            NativeFunction::new("dirname", Arity::Fixed(1), |_, args| {
                Ok(Value::String(dirname(&string_arg(&args, 0, "path.dirname")?)))
            }),
        ),
        (
            "extname",
            NativeFunction::new("extname", Arity::Fixed(1), |_, args| {
                Ok(Value::String(extname(&string_arg(&args, 0, "path.extname")?)))
            }),
        ),
        (
            "isAbsolute",
            NativeFunction::new("isAbsolute", Arity::Fixed(1), |_, args| {
                Ok(Value::Boolean(
                    string_arg(&args, 0, "path.isAbsolute")?.starts_with('/'),
                ))
            }),
        ),
    ]
}

/// `path/posix`; `path` shares its functions.
pub fn posix_namespace() -> Arc<Namespace> {
    natives()
        .into_iter()
        .fold(Namespace::builder("path/posix"), |b, (name, native)| {
            b.native(name, native)
        })
        .build()
}

/// `path`, exposing the same functions as `posix` plus a `posix` member.
pub fn namespace(posix: Arc<Namespace>) -> Arc<Namespace> {
    let mut builder = Namespace::builder("path");
    for (name, member) in posix.members() {
        if let crate::registry::Member::Function(native) = member {
            builder = builder.native(name, native.clone());
        }
    }
    builder.namespace("posix", posix.clone()).build()
}

fn join(_heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let mut parts = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        let part = string_arg(&args, i, "path.join")?;
        if !part.is_empty() {
            parts.push(part);
        }
    }
    if parts.is_empty() {
        return Ok(Value::from("."));
    }
    Ok(Value::String(normalize(&parts.join("/"))))
}

fn basename_native(_heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let path = string_arg(&args, 0, "path.basename")?;
    let base = basename(&path);
    match args.get(1) {
        Some(Value::String(ext)) if base.len() > ext.len() && base.ends_with(ext.as_str()) => Ok(
            Value::String(base[..base.len() - ext.len()].to_string()),
        ),
        _ => Ok(Value::String(base.to_string())),
    }
}

/// Resolves `.` and `..` segments and collapses repeated separators.
pub fn normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().map_or(false, |s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let mut out = segments.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if out.is_empty() {
        return ".".to_string();
    }
    if trailing && out != "/" {
        out.push('/');
    }
    out
}

pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "";
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

pub fn dirname(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        None => ".".to_string(),
        Some(index) => {
            let dir = trimmed[..index].trim_end_matches('/');
            if dir.is_empty() {
                "/".to_string()
            } else {
                dir.to_string()
            }
        }
    }
}

pub fn extname(path: &str) -> String {
    let base = basename(path);
    match base.rfind('.') {
        Some(0) | None => String::new(),
        Some(index) => base[index..].to_string(),
    }
}
