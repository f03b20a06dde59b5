// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Removal of terminal escape sequences from venom diagnostics.
//!
//! Venom runs with `IS_TTY=true` so that its diagnostics stay readable in a terminal, which
//! means failure messages are peppered with color codes. These must go before the messages are
//! parsed.

use regex::Regex;
use std::{borrow::Cow, sync::LazyLock};

// CSI and OSC sequences, introduced by ESC or the 8-bit CSI byte. OSC sequences are terminated
// by BEL; CSI sequences by a final byte.
static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x1b\x{9b}][\[\]()#;?]*",
        r"(?:",
        r"(?:(?:(?:;[-a-zA-Z0-9/#&.:=?%@~_]+)*|[a-zA-Z0-9]+(?:;[-a-zA-Z0-9/#&.:=?%@~_]*)*)?\x07)",
        r"|",
        r"(?:(?:[0-9]{1,4}(?:;[0-9]{0,4})*)?[0-9A-PR-TZcf-nq-uy=><~])",
        r")",
    ))
    .expect("ANSI escape regex is valid")
});

/// Removes all ANSI escape sequences from `text`.
///
/// Removing a sequence may splice its neighbors into a new sequence (for example
/// `"\x1b\x1b[0m[31m"`), so removal is repeated until nothing matches. This makes the function
/// idempotent.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    let mut stripped = match ANSI_RE.replace_all(text, "") {
        Cow::Borrowed(_) => return Cow::Borrowed(text),
        Cow::Owned(stripped) => stripped,
    };
    while let Cow::Owned(next) = ANSI_RE.replace_all(&stripped, "") {
        stripped = next;
    }
    Cow::Owned(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use test_strategy::proptest;

    #[test_case("\x1b[31mred\x1b[0m", "red" ; "sgr color")]
    #[test_case("\x1b[1;32mbold green\x1b[39;49m", "bold green" ; "sgr multiple params")]
    #[test_case("\u{9b}4mlink", "link" ; "8-bit csi")]
    #[test_case("\x1b]8;;https://example.com\x07click\x1b]8;;\x07", "click" ; "osc hyperlink")]
    #[test_case("\x1b[2K\x1b[1Gprogress", "progress" ; "cursor movement")]
    #[test_case("\x1b\x1b[0m[31mnested", "nested" ; "spliced sequence")]
    #[test_case("tab\tand\r\nnewline", "tab\tand\r\nnewline" ; "control characters are kept")]
    fn strips(input: &str, expected: &str) {
        assert_eq!(strip_ansi(input), expected);
    }

    #[test]
    fn borrowed_when_clean() {
        assert!(matches!(strip_ansi("plain text"), Cow::Borrowed(_)));
    }

    #[proptest]
    fn identity_without_escapes(#[strategy("[^\\x1b\\x{9b}]*")] text: String) {
        proptest::prop_assert_eq!(strip_ansi(&text), text.as_str());
    }

    #[proptest]
    fn idempotent(#[strategy("(\\x1b|\\x{9b}|\\[|\\]|;|[0-9]|m|\\x07|[a-z ]){0,40}")] text: String) {
        let once = strip_ansi(&text).into_owned();
        proptest::prop_assert_eq!(strip_ansi(&once), once.as_str());
    }
}
