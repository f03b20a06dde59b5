// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of diagnostic line numbers onto highlight ranges.

use std::fmt;
use tracing::warn;

/// A range within a text buffer. Lines and columns are 0-based; columns count characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceRange {
    /// The first line of the range.
    pub start_line: usize,
    /// The column the range starts at on `start_line`.
    pub start_column: usize,
    /// The last line of the range.
    pub end_line: usize,
    /// The column the range ends at on `end_line` (exclusive).
    pub end_column: usize,
}

impl SourceRange {
    /// The end column of the range returned for lines that don't exist.
    pub const SENTINEL_END_COLUMN: usize = 1000;

    /// The range returned for lines that don't exist: line 0, columns 0 to
    /// [`Self::SENTINEL_END_COLUMN`].
    ///
    /// Callers should treat this as "no precise highlight".
    pub const SENTINEL: Self = Self {
        start_line: 0,
        start_column: 0,
        end_line: 0,
        end_column: Self::SENTINEL_END_COLUMN,
    };

    /// Returns true if this is the [`Self::SENTINEL`] range.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }
}

impl fmt::Display for SourceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Rendered 1-based, the way editors and compilers print locations.
        write!(
            f,
            "{}:{}-{}:{}",
            self.start_line + 1,
            self.start_column + 1,
            self.end_line + 1,
            self.end_column + 1,
        )
    }
}

/// Computes the range to highlight for the 1-based line `one_based_line` of `raw_text`.
///
/// The range covers the line without its leading whitespace. If the line doesn't exist in
/// `raw_text`, a warning is logged and [`SourceRange::SENTINEL`] is returned.
pub fn map_line(raw_text: &str, one_based_line: usize) -> SourceRange {
    let line = one_based_line
        .checked_sub(1)
        .and_then(|index| raw_text.split('\n').nth(index).map(|line| (index, line)));

    let Some((index, line)) = line else {
        warn!("line {one_based_line} doesn't exist in file");
        return SourceRange::SENTINEL;
    };

    let line = line.strip_suffix('\r').unwrap_or(line);
    let start_column = line.chars().take_while(|c| c.is_whitespace()).count();
    let end_column = line.chars().count();

    SourceRange {
        start_line: index,
        start_column,
        end_line: index,
        end_column,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use test_case::test_case;

    const SUITE: &str = indoc! {"
        name: users
        testcases:
          - name: get users
            steps:
              - type: http
                assertions:
                  - result.statuscode ShouldEqual 200
    "};

    #[test_case(1, 0, 0, 11 ; "first line without indentation")]
    #[test_case(3, 2, 2, 19 ; "list item")]
    #[test_case(7, 6, 10, 45 ; "deeply indented assertion")]
    #[test_case(8, 7, 0, 0 ; "empty line after trailing newline")]
    fn maps_existing_lines(line: usize, index: usize, start_column: usize, end_column: usize) {
        assert_eq!(
            map_line(SUITE, line),
            SourceRange {
                start_line: index,
                start_column,
                end_line: index,
                end_column,
            }
        );
    }

    #[test_case(9 ; "past the end")]
    #[test_case(0 ; "line zero")]
    #[test_case(usize::MAX ; "huge")]
    fn missing_lines_map_to_sentinel(line: usize) {
        let range = map_line(SUITE, line);
        assert!(range.is_sentinel(), "{range:?} is the sentinel");
    }

    #[test]
    fn crlf_line_endings() {
        let text = "a: 1\r\n    b: 2\r\n";
        assert_eq!(
            map_line(text, 2),
            SourceRange {
                start_line: 1,
                start_column: 4,
                end_line: 1,
                end_column: 8,
            }
        );
    }

    #[test]
    fn whitespace_only_line() {
        let range = map_line("a\n   \nb", 2);
        assert_eq!((range.start_column, range.end_column), (3, 3));
    }

    #[test]
    fn columns_count_characters() {
        let range = map_line("\tnamé: ünïcode", 1);
        assert_eq!((range.start_column, range.end_column), (1, 14));
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(map_line("  x", 1).to_string(), "1:3-1:4");
    }
}
