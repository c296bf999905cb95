//! Key-name conversion between caller style and Docker's JSON style.
//!
//! Caller data uses lowercase-with-hyphens keys (`host-config`,
//! `port-bindings`); the wire uses CamelCase with a leading capital
//! (`HostConfig`, `PortBindings`). A small set of subtrees holds
//! user-defined keys that Docker itself treats opaquely, and those pass
//! through untouched in both directions: `Labels` (inner keys are
//! user-chosen label names) and `Containers` in a network inspection
//! (inner keys are container ids). Keys containing a `.` are
//! domain-qualified label names and are never rewritten.
//!
//! The rewrite is structural: it recurses into objects and arrays only;
//! strings, numbers, booleans, and nulls pass through.

use serde_json::{Map, Value};

/// Wire-side keys whose subtrees hold user-defined keys.
const OPAQUE_DOCKER_KEYS: &[&str] = &["Labels", "Containers"];

/// Caller-side spellings of the same subtrees.
const OPAQUE_CALLER_KEYS: &[&str] = &["labels", "containers"];

/// Rewrites caller-style keys to Docker's wire style.
#[must_use]
pub fn to_docker(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if OPAQUE_CALLER_KEYS.contains(&key.as_str()) {
                    out.insert(docker_key(key), inner.clone());
                } else {
                    out.insert(docker_key(key), to_docker(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_docker).collect()),
        other => other.clone(),
    }
}

/// Rewrites Docker's wire-style keys to caller style.
#[must_use]
pub fn from_docker(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                if OPAQUE_DOCKER_KEYS.contains(&key.as_str()) {
                    out.insert(caller_key(key), inner.clone());
                } else {
                    out.insert(caller_key(key), from_docker(inner));
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(from_docker).collect()),
        other => other.clone(),
    }
}

/// `host-config` → `HostConfig`. Dotted keys are preserved verbatim.
fn docker_key(key: &str) -> String {
    if key.contains('.') {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len());
    let mut upper_next = true;
    for ch in key.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `HostConfig` → `host-config`: a hyphen before each uppercase run,
/// everything lowercased. Dotted keys are preserved verbatim.
fn caller_key(key: &str) -> String {
    if key.contains('.') {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_upper = false;
    for ch in key.chars() {
        if ch.is_uppercase() {
            if !prev_upper && !out.is_empty() {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            prev_upper = true;
        } else {
            out.push(ch);
            prev_upper = false;
        }
    }
    out
}
