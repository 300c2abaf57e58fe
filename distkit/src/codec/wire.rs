//! The tagged-node tree that is the wire format.
//!
//! Every node is a JSON object `{"type": <kind>, "value": <payload>, "id"?: <string>}`. Parsing
//! goes through `serde_json::Value` and validates shape per kind, so the decoder only ever sees
//! well-formed trees.

use super::error::{CodecError, CodecResult};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WireKind {
    Null,
    Undefined,
    Number,
    String,
    Boolean,
    Function,
    Native,
    Array,
    Object,
    Date,
    Error,
    Reference,
}

impl WireKind {
    pub const ALL: [WireKind; 12] = [
        WireKind::Null,
        WireKind::Undefined,
        WireKind::Number,
        WireKind::String,
        WireKind::Boolean,
        WireKind::Function,
        WireKind::Native,
        WireKind::Array,
        WireKind::Object,
        WireKind::Date,
        WireKind::Error,
        WireKind::Reference,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WireKind::Null => "null",
            WireKind::Undefined => "undefined",
            WireKind::Number => "number",
            WireKind::String => "string",
            WireKind::Boolean => "boolean",
            WireKind::Function => "function",
            WireKind::Native => "native",
            WireKind::Array => "array",
            WireKind::Object => "object",
            WireKind::Date => "date",
            WireKind::Error => "error",
            WireKind::Reference => "reference",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == tag)
    }

    /// Kinds that carry identity and therefore an id.
    pub fn has_identity(&self) -> bool {
        matches!(
            self,
            WireKind::Function
                | WireKind::Native
                | WireKind::Array
                | WireKind::Object
                | WireKind::Date
                | WireKind::Error
        )
    }
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Scalar rendering, source text, qualified name, date text or reference target.
    Text(String),
    /// Array ordinals or object member names, in order.
    Members(IndexMap<String, WireNode>),
    /// The synthetic object node inside an `error`.
    Node(Box<WireNode>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireNode {
    #[serde(rename = "type")]
    pub kind: WireKind,
    pub value: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl WireNode {
    pub fn text(kind: WireKind, text: impl Into<String>) -> Self {
        WireNode {
            kind,
            value: Payload::Text(text.into()),
            id: None,
        }
    }

    pub fn reference(id: impl Into<String>) -> Self {
        Self::text(WireKind::Reference, id)
    }

    pub fn members(kind: WireKind, members: IndexMap<String, WireNode>) -> Self {
        WireNode {
            kind,
            value: Payload::Members(members),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn to_text(&self, pretty: bool) -> CodecResult<String> {
        let text = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(text)
    }

    /// Parses and validates wire text. Ids must be unique across the whole document.
    pub fn parse(text: &str) -> CodecResult<WireNode> {
        let json: Json = serde_json::from_str(text)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &Json) -> CodecResult<WireNode> {
        let mut ids = HashSet::new();
        read_node(json, "$", &mut ids)
    }
}

fn read_node(json: &Json, path: &str, ids: &mut HashSet<String>) -> CodecResult<WireNode> {
    let fields = json
        .as_object()
        .ok_or_else(|| CodecError::malformed(format!("{}: node must be a JSON object", path)))?;
    let tag = match fields.get("type") {
        Some(Json::String(tag)) => tag,
        Some(_) => {
            return Err(CodecError::malformed(format!(
                "{}: `type` must be a string",
                path
            )))
        }
        None => return Err(CodecError::malformed(format!("{}: missing `type`", path))),
    };
    let kind = WireKind::from_tag(tag).ok_or_else(|| CodecError::UnknownWireKind(tag.clone()))?;

    let id = match fields.get("id") {
        None | Some(Json::Null) => None,
        Some(raw) => Some(read_id(raw, path)?),
    };
    let id = match (kind, id) {
        (WireKind::Reference, Some(_)) => {
            return Err(CodecError::malformed(format!(
                "{}: reference nodes cannot carry an id",
                path
            )))
        }
        (kind, Some(id)) if kind.has_identity() => {
            if !ids.insert(id.clone()) {
                return Err(CodecError::malformed(format!("{}: duplicate id {}", path, id)));
            }
            Some(id)
        }
        // ids on scalars carry nothing
        _ => None,
    };

    let raw = fields.get("value");
    let value = match kind {
        WireKind::Null | WireKind::Undefined => match raw {
            None | Some(Json::String(_)) | Some(Json::Null) => Payload::Text(String::new()),
            Some(_) => return Err(wrong_payload(path, kind, "an empty string")),
        },
        WireKind::Array | WireKind::Object => match raw {
            Some(Json::Object(entries)) => {
                let mut members = IndexMap::with_capacity(entries.len());
                for (key, child) in entries {
                    let child_path = format!("{}.{}", path, key);
                    members.insert(key.clone(), read_node(child, &child_path, ids)?);
                }
                Payload::Members(members)
            }
            _ => return Err(wrong_payload(path, kind, "an object of nodes")),
        },
        WireKind::Error => match raw {
            Some(inner) if inner.is_object() => {
                let node = read_node(inner, &format!("{}.value", path), ids)?;
                if node.kind != WireKind::Object {
                    return Err(wrong_payload(path, kind, "an object node"));
                }
                Payload::Node(Box::new(node))
            }
            _ => return Err(wrong_payload(path, kind, "an object node")),
        },
        WireKind::Reference => match raw {
            Some(target) => Payload::Text(read_id(target, path)?),
            None => return Err(wrong_payload(path, kind, "a target id")),
        },
        _ => match raw {
            Some(Json::String(text)) => Payload::Text(text.clone()),
            _ => return Err(wrong_payload(path, kind, "a string")),
        },
    };

    Ok(WireNode { kind, value, id })
}

/// Ids are decimal strings on the wire; bare non-negative integers are accepted too.
fn read_id(raw: &Json, path: &str) -> CodecResult<String> {
    match raw {
        Json::String(id) => Ok(id.clone()),
        Json::Number(n) if n.is_u64() => Ok(n.to_string()),
        _ => Err(CodecError::malformed(format!(
            "{}: id must be a string or a non-negative integer",
            path
        ))),
    }
}

fn wrong_payload(path: &str, kind: WireKind, expected: &str) -> CodecError {
    CodecError::malformed(format!("{}: `{}` node needs {} as its value", path, kind, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn serializes_in_type_value_id_order() {
        let mut members = IndexMap::new();
        members.insert("x".to_string(), WireNode::text(WireKind::Number, "42"));
        let node = WireNode::members(WireKind::Object, members).with_id("0");
        assert_eq!(
            node.to_text(false).unwrap(),
            r#"{"type":"object","value":{"x":{"type":"number","value":"42"}},"id":"0"}"#
        );
    }

    #[test]
    fn parses_nested_error_node() {
        let text = r#"{"type":"error","id":"0","value":{"type":"object","value":{
            "name":{"type":"string","value":"Error"},
            "message":{"type":"string","value":"boom"},
            "cause":{"type":"reference","value":"0"}}}}"#;
        let node = WireNode::parse(text).unwrap();
        assert_eq!(node.kind, WireKind::Error);
        assert_eq!(node.id.as_deref(), Some("0"));
        let Payload::Node(inner) = &node.value else {
            panic!("expected nested node");
        };
        let Payload::Members(fields) = &inner.value else {
            panic!("expected members");
        };
        assert_eq!(fields["cause"], WireNode::reference("0"));
    }

    #[test]
    fn null_payload_may_be_omitted() {
        let node = WireNode::parse(r#"{"type":"undefined"}"#).unwrap();
        assert_eq!(node, WireNode::text(WireKind::Undefined, ""));
    }

    #[test]
    fn integer_ids_are_normalised_to_strings() {
        let node = WireNode::parse(r#"{"type":"array","value":{},"id":3}"#).unwrap();
        assert_eq!(node.id.as_deref(), Some("3"));
        let reference = WireNode::parse(r#"{"type":"reference","value":3}"#).unwrap();
        assert_eq!(reference.as_text(), Some("3"));
    }

    #[test]
    fn rejects_bad_shapes() {
        let cases = [
            "[1, 2]",
            r#"{"value":"1"}"#,
            r#"{"type":7,"value":"1"}"#,
            r#"{"type":"number","value":1}"#,
            r#"{"type":"array","value":"[]"}"#,
            r#"{"type":"error","value":{"type":"string","value":"x"}}"#,
            r#"{"type":"reference","value":"0","id":"1"}"#,
        ];
        for case in cases {
            let err = WireNode::parse(case).unwrap_err();
            assert!(
                matches!(err, CodecError::MalformedWireText(_)),
                "{} gave {:?}",
                case,
                err
            );
        }
    }

    #[test]
    fn rejects_unknown_kind_and_duplicate_ids() {
        assert_eq!(
            WireNode::parse(r#"{"type":"symbol","value":"x"}"#).unwrap_err(),
            CodecError::UnknownWireKind("symbol".to_string())
        );
        let duplicate = r#"{"type":"array","id":"0","value":{
            "0":{"type":"object","id":"0","value":{}}}}"#;
        assert!(matches!(
            WireNode::parse(duplicate),
            Err(CodecError::MalformedWireText(msg)) if msg.contains("duplicate id 0")
        ));
    }

    #[test]
    fn scalar_ids_are_ignored() {
        let node = WireNode::parse(r#"{"type":"number","value":"1","id":"0"}"#).unwrap();
        assert_eq!(node.id, None);
    }
}
