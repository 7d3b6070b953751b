//! Record extraction from parsed YAML documents.
//!
//! - [`host`] - node documents, as a closed set of [`HostDialect`]s
//! - [`site`] - site documents, primary and BMC masks
//!
//! Absent keys mean "not present". A key whose value has the wrong shape is a
//! [`SchemaViolation`] and aborts extraction of that one document.

mod host;
mod site;

pub use host::{extract_host, HostDialect};
pub use site::extract_site;

use serde_yaml::Value;

use crate::error::SchemaViolation;
use crate::models::parse_addr;
use std::net::Ipv4Addr;

/// Join a key onto a dotted path for error messages.
fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Look up `key` in the mapping `parent`.
///
/// A null parent counts as absent. Numeric keys written without quotes are
/// matched against all-digit `key`s, so `0601:` and `"0601":` both resolve.
fn child<'a>(
    parent: &'a Value,
    path: &str,
    key: &str,
) -> Result<Option<&'a Value>, SchemaViolation> {
    let map = match parent {
        Value::Mapping(map) => map,
        Value::Null => return Ok(None),
        _ => {
            let path = if path.is_empty() { "<root>" } else { path };
            return Err(SchemaViolation::WrongType {
                path: path.to_string(),
                expected: "mapping",
            });
        }
    };

    if let Some(found) = map.get(key) {
        return Ok(Some(found));
    }
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(wanted) = key.parse::<u64>() {
            let found = map
                .iter()
                .find(|(k, _)| k.as_u64() == Some(wanted))
                .map(|(_, v)| v);
            return Ok(found);
        }
    }
    Ok(None)
}

/// Walk `keys` from `root` (found at `base`); stops at the first absent key.
fn descend<'a>(
    root: &'a Value,
    base: &str,
    keys: &[&str],
) -> Result<Option<(&'a Value, String)>, SchemaViolation> {
    let mut current = root;
    let mut path = base.to_string();
    for key in keys {
        match child(current, &path, key)? {
            Some(next) => {
                current = next;
                path = join(&path, key);
            }
            None => return Ok(None),
        }
    }
    Ok(Some((current, path)))
}

/// Values the fleet uses for "not configured".
fn is_unset(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Sequence(seq) => seq.is_empty(),
        Value::Mapping(map) => map.is_empty(),
        _ => false,
    }
}

/// A scalar address field; unset values are absent.
fn address_field(value: &Value, path: &str) -> Result<Option<Ipv4Addr>, SchemaViolation> {
    if is_unset(value) {
        return Ok(None);
    }
    let text = value.as_str().ok_or(SchemaViolation::WrongType {
        path: path.to_string(),
        expected: "string",
    })?;
    parse_addr(text)
        .map(Some)
        .map_err(|error| SchemaViolation::BadAddress {
            path: path.to_string(),
            error,
        })
}

/// `KEY=value` entries of a fragment field.
///
/// Both list form and mapping form (entries as keys) occur in the fleet.
fn fragment_entries<'a>(value: &'a Value, path: &str) -> Result<Vec<&'a str>, SchemaViolation> {
    let items: Vec<&Value> = match value {
        Value::Sequence(seq) => seq.iter().collect(),
        Value::Mapping(map) => map.keys().collect(),
        Value::String(_) => vec![value],
        _ => {
            return Err(SchemaViolation::WrongType {
                path: path.to_string(),
                expected: "list of KEY=value",
            })
        }
    };
    items
        .into_iter()
        .map(|item| {
            item.as_str().ok_or(SchemaViolation::WrongType {
                path: path.to_string(),
                expected: "KEY=value string",
            })
        })
        .collect()
}

/// The value half of a `KEY=value` entry.
fn fragment_value<'a>(entry: &'a str, path: &str) -> Result<&'a str, SchemaViolation> {
    entry
        .split_once('=')
        .map(|(_, v)| v.trim().trim_matches('"'))
        .ok_or(SchemaViolation::BadFragment {
            path: path.to_string(),
            entry: entry.to_string(),
        })
}
