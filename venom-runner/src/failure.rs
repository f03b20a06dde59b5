// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of venom failure diagnostics.
//!
//! Venom reports assertion failures as prose with a location suffix, for example:
//!
//! ```text
//! Testcase "get users", step #0-0: Assertion "result.statuscode ShouldEqual 200" failed. expected: 200  got: 404 (users.venom.yml:12)
//! ```
//!
//! [`parse_failure_message`] extracts the expected and actual values when they're present, and
//! the line number from the suffix. Input that doesn't match either shape is still valid: it
//! simply carries less structure.

use crate::ansi::strip_ansi;
use regex::Regex;
use std::sync::LazyLock;

static EXPECTED_GOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"expected:\s+(?P<expected>.*?)\s+got:\s+(?P<actual>.*?)\s+\(.*:(?P<line>[0-9]+)\)$")
        .expect("expected/got regex is valid")
});

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+\(.*:(?P<line>[0-9]+)\)$").expect("location regex is valid"));

/// A failure diagnostic, parsed by [`parse_failure_message`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedFailure {
    /// The diagnostic with escape sequences removed and surrounding whitespace trimmed.
    pub raw: String,

    /// The expected value, if the diagnostic had an `expected: ... got: ...` shape.
    pub expected: Option<String>,

    /// The actual value, if the diagnostic had an `expected: ... got: ...` shape.
    pub actual: Option<String>,

    /// The 1-based line the diagnostic points to. It may be outside the file.
    pub line: Option<usize>,
}

impl ParsedFailure {
    /// Returns the `(expected, actual)` pair if both were extracted and are non-empty.
    pub fn diff(&self) -> Option<(&str, &str)> {
        match (self.expected.as_deref(), self.actual.as_deref()) {
            (Some(expected), Some(actual)) if !expected.is_empty() && !actual.is_empty() => {
                Some((expected, actual))
            }
            _ => None,
        }
    }

    /// Returns the line to attach a location to. Line 0 carries no location.
    pub fn location_line(&self) -> Option<usize> {
        self.line.filter(|&line| line > 0)
    }
}

/// Parses a single venom failure diagnostic. Never fails.
pub fn parse_failure_message(message: &str) -> ParsedFailure {
    let raw = strip_ansi(message).trim().to_owned();

    if let Some(captures) = EXPECTED_GOT_RE.captures(&raw) {
        let expected = captures["expected"].to_owned();
        let actual = captures["actual"].to_owned();
        let line = parse_line(&captures["line"]);
        return ParsedFailure {
            raw,
            expected: Some(expected),
            actual: Some(actual),
            line,
        };
    }

    if let Some(captures) = LOCATION_RE.captures(&raw) {
        let line = parse_line(&captures["line"]);
        return ParsedFailure {
            raw,
            line,
            ..Default::default()
        };
    }

    ParsedFailure {
        raw,
        ..Default::default()
    }
}

fn parse_line(digits: &str) -> Option<usize> {
    // The digits always match, but may not fit.
    digits.parse().ok()
}
