//! Typed Values
//!
//! Every key in the store binds to exactly one [`Value`] variant. The
//! variant is a property of the bound value, not the key: commands check
//! the variant first and report a type mismatch instead of reinterpreting
//! the payload. Only three capabilities are used polymorphically by the
//! keyspace (the kind tag, serialization, and deserialization); everything
//! else is reached after a `match` on the concrete variant.
//!
//! ## Disk encoding
//!
//! Each variant has a self-describing body used by the snapshot file:
//!
//! - String: the raw bytes.
//! - List / Set: `{decimal-len}:{bytes},` per element.
//! - Hash: `{field-len}:{field}:{value-len}:{value},` per entry.
//!
//! The single-byte kind tags on disk are `S` (string), `L` (list),
//! `E` (set), and `H` (hash). The set tag is `E` rather than `S` to keep
//! it distinct from the string tag.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};

/// The four value kinds a key can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    List,
    Set,
    Hash,
}

impl ValueKind {
    /// Single-byte tag used in the snapshot file.
    pub fn tag(self) -> u8 {
        match self {
            ValueKind::String => b'S',
            ValueKind::List => b'L',
            ValueKind::Set => b'E',
            ValueKind::Hash => b'H',
        }
    }

    /// Inverse of [`ValueKind::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'S' => Some(ValueKind::String),
            b'L' => Some(ValueKind::List),
            b'E' => Some(ValueKind::Set),
            b'H' => Some(ValueKind::Hash),
            _ => None,
        }
    }

    /// The name reported by the TYPE command.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::Hash => "hash",
        }
    }
}

/// A value bound to a key.
///
/// Lists use a `VecDeque` for cheap push/pop at both ends. Set and hash
/// iteration order is unspecified but stable across a single enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(Bytes),
    List(VecDeque<Bytes>),
    Set(HashSet<Bytes>),
    Hash(HashMap<Bytes, Bytes>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Hash(_) => ValueKind::Hash,
        }
    }

    /// True for an aggregate variant that holds no elements.
    ///
    /// A string is never "empty" in this sense: an empty string is a
    /// legitimate binding, while an empty aggregate must be unbound.
    pub fn is_empty_aggregate(&self) -> bool {
        match self {
            Value::String(_) => false,
            Value::List(items) => items.is_empty(),
            Value::Set(members) => members.is_empty(),
            Value::Hash(fields) => fields.is_empty(),
        }
    }

    /// Encodes the variant body for the snapshot file.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }

    /// Encodes the variant body into an existing buffer.
    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::String(data) => out.extend_from_slice(data),
            Value::List(items) => {
                for item in items {
                    write_element(out, item);
                }
            }
            Value::Set(members) => {
                for member in members {
                    write_element(out, member);
                }
            }
            Value::Hash(fields) => {
                for (field, value) in fields {
                    out.extend_from_slice(field.len().to_string().as_bytes());
                    out.push(b':');
                    out.extend_from_slice(field);
                    out.push(b':');
                    out.extend_from_slice(value.len().to_string().as_bytes());
                    out.push(b':');
                    out.extend_from_slice(value);
                    out.push(b',');
                }
            }
        }
    }

    /// Decodes a variant body written by [`Value::serialize`].
    ///
    /// Returns `None` on any malformation; the snapshot loader skips the
    /// line in that case.
    pub fn deserialize(kind: ValueKind, body: &[u8]) -> Option<Value> {
        match kind {
            ValueKind::String => Some(Value::String(Bytes::copy_from_slice(body))),
            ValueKind::List => {
                let mut items = VecDeque::new();
                let mut pos = 0;
                while pos < body.len() {
                    let (element, next) = read_element(body, pos)?;
                    items.push_back(element);
                    pos = next;
                }
                Some(Value::List(items))
            }
            ValueKind::Set => {
                let mut members = HashSet::new();
                let mut pos = 0;
                while pos < body.len() {
                    let (element, next) = read_element(body, pos)?;
                    members.insert(element);
                    pos = next;
                }
                Some(Value::Set(members))
            }
            ValueKind::Hash => {
                let mut fields = HashMap::new();
                let mut pos = 0;
                while pos < body.len() {
                    let (field, after_field) = read_length_prefixed(body, pos)?;
                    if body.get(after_field) != Some(&b':') {
                        return None;
                    }
                    let (value, after_value) = read_length_prefixed(body, after_field + 1)?;
                    if body.get(after_value) != Some(&b',') {
                        return None;
                    }
                    fields.insert(field, value);
                    pos = after_value + 1;
                }
                Some(Value::Hash(fields))
            }
        }
    }
}

fn write_element(out: &mut Vec<u8>, element: &Bytes) {
    out.extend_from_slice(element.len().to_string().as_bytes());
    out.push(b':');
    out.extend_from_slice(element);
    out.push(b',');
}

/// Reads one `{len}:{bytes},` element starting at `pos`.
fn read_element(body: &[u8], pos: usize) -> Option<(Bytes, usize)> {
    let (element, after) = read_length_prefixed(body, pos)?;
    if body.get(after) != Some(&b',') {
        return None;
    }
    Some((element, after + 1))
}

/// Reads `{len}:{bytes}` starting at `pos`; returns the bytes and the
/// offset just past them.
fn read_length_prefixed(body: &[u8], pos: usize) -> Option<(Bytes, usize)> {
    let colon = body[pos..].iter().position(|&b| b == b':')? + pos;
    let len: usize = std::str::from_utf8(&body[pos..colon]).ok()?.parse().ok()?;
    let start = colon + 1;
    let end = start.checked_add(len)?;
    if end > body.len() {
        return None;
    }
    Some((Bytes::copy_from_slice(&body[start..end]), end))
}

/// Normalizes a signed list index against a length.
///
/// Negative indices count from the tail (-1 is the last element).
/// Out-of-range indices resolve to `None`, which callers report as
/// absence rather than an error.
pub fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 || resolved >= len {
        None
    } else {
        Some(resolved as usize)
    }
}

/// Normalizes an inclusive signed range against a length.
///
/// Negative endpoints have the length added, then start is clamped to 0
/// and stop to `len - 1`. `None` means the range selects nothing.
pub fn resolve_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let len = len as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };
    if start < 0 {
        start = 0;
    }
    if stop >= len {
        stop = len - 1;
    }
    if start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Value {
        Value::List(items.iter().map(|s| Bytes::from(s.to_string())).collect())
    }

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in [
            ValueKind::String,
            ValueKind::List,
            ValueKind::Set,
            ValueKind::Hash,
        ] {
            assert_eq!(ValueKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ValueKind::from_tag(b'X'), None);
    }

    #[test]
    fn test_set_tag_is_distinct_from_string() {
        assert_eq!(ValueKind::Set.tag(), b'E');
        assert_eq!(ValueKind::String.tag(), b'S');
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(3, 0), Some(0));
        assert_eq!(resolve_index(3, 2), Some(2));
        assert_eq!(resolve_index(3, -1), Some(2));
        assert_eq!(resolve_index(3, -3), Some(0));
        assert_eq!(resolve_index(3, 3), None);
        assert_eq!(resolve_index(3, -4), None);
        assert_eq!(resolve_index(0, 0), None);
    }

    #[test]
    fn test_resolve_range_full() {
        // 0..-1 selects the whole list
        assert_eq!(resolve_range(3, 0, -1), Some((0, 2)));
    }

    #[test]
    fn test_resolve_range_clamps() {
        assert_eq!(resolve_range(3, -100, 100), Some((0, 2)));
        assert_eq!(resolve_range(3, 1, 100), Some((1, 2)));
    }

    #[test]
    fn test_resolve_range_inverted_is_empty() {
        assert_eq!(resolve_range(3, 2, 1), None);
        assert_eq!(resolve_range(3, 5, 10), None);
        assert_eq!(resolve_range(0, 0, -1), None);
    }

    #[test]
    fn test_string_body_is_raw() {
        let value = Value::String(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"hello");
        assert_eq!(
            Value::deserialize(ValueKind::String, b"hello"),
            Some(value)
        );
    }

    #[test]
    fn test_list_body_grammar() {
        let value = list(&["x", "yz"]);
        assert_eq!(value.serialize(), b"1:x,2:yz,");
        assert_eq!(Value::deserialize(ValueKind::List, b"1:x,2:yz,"), Some(value));
    }

    #[test]
    fn test_hash_body_grammar() {
        let mut fields = HashMap::new();
        fields.insert(Bytes::from("name"), Bytes::from("alice"));
        let value = Value::Hash(fields);
        let body = value.serialize();
        assert_eq!(body, b"4:name:5:alice,");
        assert_eq!(Value::deserialize(ValueKind::Hash, &body), Some(value));
    }

    #[test]
    fn test_set_body_round_trip() {
        let mut members = HashSet::new();
        members.insert(Bytes::from("a"));
        members.insert(Bytes::from("bb"));
        let value = Value::Set(members);
        let decoded = Value::deserialize(ValueKind::Set, &value.serialize()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_elements_may_contain_colons_and_commas() {
        let value = list(&["a:b,c"]);
        let body = value.serialize();
        assert_eq!(body, b"5:a:b,c,");
        assert_eq!(Value::deserialize(ValueKind::List, &body), Some(value));
    }

    #[test]
    fn test_malformed_bodies_are_rejected() {
        assert_eq!(Value::deserialize(ValueKind::List, b"notalen:x,"), None);
        assert_eq!(Value::deserialize(ValueKind::List, b"5:ab,"), None);
        assert_eq!(Value::deserialize(ValueKind::List, b"2:ab"), None);
        assert_eq!(Value::deserialize(ValueKind::Hash, b"1:f:2:vv"), None);
    }

    #[test]
    fn test_empty_aggregate_detection() {
        assert!(list(&[]).is_empty_aggregate());
        assert!(!list(&["x"]).is_empty_aggregate());
        assert!(Value::Set(HashSet::new()).is_empty_aggregate());
        assert!(Value::Hash(HashMap::new()).is_empty_aggregate());
        assert!(!Value::String(Bytes::new()).is_empty_aggregate());
    }
}
