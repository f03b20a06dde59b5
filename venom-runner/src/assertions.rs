// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion of JSON payloads into venom assertions.
//!
//! Every leaf of the payload becomes one assertion on its path below a prefix such as
//! `result.bodyjson`. Arrays also get an assertion on their length.

use crate::errors::{AssertionConvertError, ConvertInputKind};
use itertools::Itertools;
use serde_json::Value;

/// The prefix used when none is given.
pub const DEFAULT_PREFIX: &str = "result.bodyjson";

/// A result variable that holds parsed JSON for some executors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssertionPrefix {
    /// The dotted path of the variable.
    pub path: &'static str,
    /// The executors that set it.
    pub executors: &'static str,
}

/// The result variables offered as prefixes, [`DEFAULT_PREFIX`] first.
pub const KNOWN_PREFIXES: &[AssertionPrefix] = &[
    AssertionPrefix {
        path: DEFAULT_PREFIX,
        executors: "HTTP, GRPC executors",
    },
    AssertionPrefix {
        path: "result.systemoutjson",
        executors: "Exec executor",
    },
    AssertionPrefix {
        path: "result.systemerrjson",
        executors: "Exec executor",
    },
    AssertionPrefix {
        path: "result.queries",
        executors: "SQL executor",
    },
    AssertionPrefix {
        path: "result.commands",
        executors: "Redis executor",
    },
    AssertionPrefix {
        path: "result.messagesjson",
        executors: "Kafka, AMQP, MQTT executors",
    },
    AssertionPrefix {
        path: "result.contentjson",
        executors: "ReadFile executor",
    },
];

/// Parses `input` as JSON and renders its assertions as a YAML list, one `- <assertion>` per
/// line.
///
/// `input_kind` only affects the error returned for invalid JSON.
pub fn convert_json(
    input: &str,
    input_kind: ConvertInputKind,
    prefix: &str,
) -> Result<String, AssertionConvertError> {
    let value: Value =
        serde_json::from_str(input).map_err(|err| AssertionConvertError::new(input_kind, err))?;
    Ok(json_to_assertions(&value, prefix)
        .iter()
        .format_with("\n", |assertion, f| f(&format_args!("- {assertion}")))
        .to_string())
}

/// Returns the assertions for every leaf of `value`, below the dotted path `prefix`.
///
/// * Arrays assert on `__len__`, then recurse into each element. An element's segment is its
///   parent's last segment followed by its index: `users.users0`.
/// * Objects recurse into each key, in document order. Keys are lowercased and `:` becomes `_`.
/// * `null` asserts `ShouldBeEmpty`, booleans `ShouldBeTrue` or `ShouldBeFalse`.
/// * Strings and numbers assert `ShouldEqual`. Strings are quoted verbatim, without escaping.
pub fn json_to_assertions(value: &Value, prefix: &str) -> Vec<String> {
    let mut path: Vec<String> = prefix.split('.').map(ToOwned::to_owned).collect();
    let mut assertions = Vec::new();
    collect(value, &mut path, &mut assertions);
    assertions
}

fn collect(value: &Value, path: &mut Vec<String>, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            out.push(format!("{}.__len__ ShouldEqual {}", path.join("."), items.len()));
            let parent = sanitize_segment(path.last().map_or("", String::as_str));
            for (index, item) in items.iter().enumerate() {
                path.push(format!("{parent}{index}"));
                collect(item, path, out);
                path.pop();
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                path.push(sanitize_segment(key));
                collect(item, path, out);
                path.pop();
            }
        }
        Value::Null => out.push(format!("{} ShouldBeEmpty", path.join("."))),
        Value::Bool(true) => out.push(format!("{} ShouldBeTrue", path.join("."))),
        Value::Bool(false) => out.push(format!("{} ShouldBeFalse", path.join("."))),
        Value::String(text) => out.push(format!("{} ShouldEqual \"{text}\"", path.join("."))),
        Value::Number(number) => {
            out.push(format!("{} ShouldEqual {}", path.join("."), format_number(number)));
        }
    }
}

fn sanitize_segment(segment: &str) -> String {
    segment.to_lowercase().replace(':', "_")
}

/// Formats a number the way venom's expression language reads it back: integers as-is,
/// other values in their shortest form, with an exponent beyond 1e21 or below 1e-6.
fn format_number(number: &serde_json::Number) -> String {
    if let Some(n) = number.as_i64() {
        return n.to_string();
    }
    if let Some(n) = number.as_u64() {
        return n.to_string();
    }
    let Some(n) = number.as_f64() else {
        return number.to_string();
    };

    if n == 0.0 {
        return "0".to_owned();
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return n.to_string();
    }
    let exponential = format!("{n:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}
