//! Generic field trees over the external dissector's JSON output.
//!
//! A dump is a JSON array with one object per packet. Field lookup searches
//! the whole subtree for a field name, so flat hand-written trees and the
//! dissector's nested layer structure resolve the same way. Document order is
//! preserved end to end; the decoder's positional conventions depend on it.

use serde_json::Value;

/// Field names the external dissector exposes (tshark's PacketBB dissector).
pub const FIELD_IPV6_SRC: &str = "ipv6.src";
pub const FIELD_IPV6_DST: &str = "ipv6.dst";
pub const FIELD_DATA: &str = "data.data";
pub const FIELD_PACKETBB: &str = "packetbb";
pub const FIELD_MSG_TYPE: &str = "packetbb.msg.type";
pub const FIELD_ADDR: &str = "packetbb.msg.addr.value6";
pub const FIELD_TLV: &str = "packetbb.tlv";
pub const FIELD_TLV_INDEX: &str = "packetbb.tlv.indexstart";
pub const FIELD_TLV_TYPE: &str = "packetbb.tlv.type";
pub const FIELD_TLV_VALUE: &str = "packetbb.tlv.value";

/// One packet's protocol fields as exposed by the external dissector.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTree(Value);

impl FieldTree {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// First occurrence of `key` holding a scalar, as text.
    pub fn scalar(&self, key: &str) -> Option<String> {
        find_first(&self.0, key).and_then(scalar_text)
    }

    /// Every scalar occurrence of `key`, in document order.
    pub fn scalars(&self, key: &str) -> Vec<String> {
        let mut hits = Vec::new();
        find_all(&self.0, key, &mut hits);
        hits.into_iter().filter_map(scalar_text).collect()
    }

    /// First occurrence of `key`, as a subtree.
    pub fn subtree(&self, key: &str) -> Option<FieldTree> {
        find_first(&self.0, key).cloned().map(FieldTree)
    }

    /// Every occurrence of `key`, in document order, as subtrees. A field
    /// stored as an array counts one occurrence per element.
    pub fn sequence(&self, key: &str) -> Vec<FieldTree> {
        let mut hits = Vec::new();
        find_all(&self.0, key, &mut hits);
        hits.into_iter().cloned().map(FieldTree).collect()
    }
}

/// Depth-first search for the first value stored under `key`.
fn find_first<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(fields) => {
            for (name, child) in fields {
                if name == key {
                    return Some(child);
                }
                if let Some(found) = find_first(child, key) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_first(item, key)),
        _ => None,
    }
}

/// Depth-first collection of every value stored under `key`, flattening
/// arrays so each element is one occurrence. Matched values are not searched
/// again.
fn find_all<'v>(value: &'v Value, key: &str, hits: &mut Vec<&'v Value>) {
    match value {
        Value::Object(fields) => {
            for (name, child) in fields {
                if name == key {
                    match child {
                        Value::Array(items) => hits.extend(items),
                        other => hits.push(other),
                    }
                } else {
                    find_all(child, key, hits);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                find_all(item, key, hits);
            }
        }
        _ => {}
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
