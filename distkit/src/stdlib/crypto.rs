// crypto module: one-shot digests

use super::string_arg;
use crate::registry::Namespace;
use crate::runtime::error::{RuntimeError, RuntimeResult};
use crate::runtime::heap::{Heap, HeapObject};
use crate::runtime::values::{Arity, Value};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::sync::Arc;

pub fn namespace() -> Arc<Namespace> {
    Namespace::builder("crypto")
        .function("hash", Arity::Range(2, 3), hash)
        .build()
}

/// `hash(algorithm, data[, "hex"])`; `data` is a string (hashed as UTF-8) or a `Uint8Array`.
fn hash(heap: &mut Heap, args: Vec<Value>) -> RuntimeResult<Value> {
    let algorithm = string_arg(&args, 0, "crypto.hash")?;
    match args.get(2) {
        None | Some(Value::Undefined) => {}
        Some(Value::String(encoding)) if encoding == "hex" => {}
        Some(other) => {
            return Err(RuntimeError::Generic(format!(
                "unsupported output encoding {}",
                heap.display(other)
            )))
        }
    }
    let data = match args.get(1) {
        Some(Value::String(s)) => s.as_bytes().to_vec(),
        Some(Value::Ref(h)) => match heap.get(*h) {
            Some(HeapObject::Bytes(bytes)) => bytes.clone(),
            _ => return Err(RuntimeError::type_error("string or Uint8Array", "object", "crypto.hash")),
        },
        Some(other) => {
            return Err(RuntimeError::type_error(
                "string or Uint8Array",
                other.type_name(),
                "crypto.hash",
            ))
        }
        None => return Err(RuntimeError::type_error("string or Uint8Array", "undefined", "crypto.hash")),
    };
    Ok(Value::String(hex_digest(&algorithm, &data)?))
}

pub fn hex_digest(algorithm: &str, data: &[u8]) -> RuntimeResult<String> {
    let hex = match algorithm.to_ascii_lowercase().as_str() {
        "sha224" => format!("{:x}", Sha224::digest(data)),
        "sha256" => format!("{:x}", Sha256::digest(data)),
        "sha384" => format!("{:x}", Sha384::digest(data)),
        "sha512" => format!("{:x}", Sha512::digest(data)),
        _ => {
            return Err(RuntimeError::Generic(format!(
                "Digest method not supported: {}",
                algorithm
            )))
        }
    };
    Ok(hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_known_input() {
        assert_eq!(
            hex_digest("sha256", b"abc").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(hex_digest("md5", b"abc").is_err());
    }

    #[test]
    fn hashes_byte_buffers_like_strings() {
        let mut heap = Heap::new();
        let bytes = heap.bytes(b"abc".to_vec());
        let from_bytes = hash(&mut heap, vec![Value::from("sha512"), bytes]).unwrap();
        let from_text = hash(&mut heap, vec![Value::from("sha512"), Value::from("abc")]).unwrap();
        assert_eq!(from_bytes, from_text);
    }
}
