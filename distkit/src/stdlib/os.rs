// os module: host facts

use crate::registry::Namespace;
use crate::runtime::values::{Arity, Value};
use std::env;
use std::sync::Arc;

pub fn namespace() -> Arc<Namespace> {
    Namespace::builder("os")
        .function("platform", Arity::Fixed(0), |_, _| Ok(Value::from(platform())))
        .function("arch", Arity::Fixed(0), |_, _| Ok(Value::from(arch())))
        .function("type", Arity::Fixed(0), |_, _| Ok(Value::from(os_type())))
        .function("endianness", Arity::Fixed(0), |_, _| {
            Ok(Value::from(if cfg!(target_endian = "little") { "LE" } else { "BE" }))
        })
        .function("tmpdir", Arity::Fixed(0), |_, _| Ok(Value::String(tmpdir())))
        .function("homedir", Arity::Fixed(0), |_, _| {
            let home = env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .unwrap_or_default();
            Ok(Value::String(home))
        })
        .build()
}

pub fn platform() -> &'static str {
    match env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

pub fn arch() -> &'static str {
    match env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "ia32",
        other => other,
    }
}

fn os_type() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

fn tmpdir() -> String {
    let dir = env::temp_dir().to_string_lossy().into_owned();
    match dir.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}
