// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for venom-runner.

use camino::{Utf8Component, Utf8Path};
use std::{fmt, time::Duration};
use url::Url;

/// Utilities for pluralizing various words based on count.
pub mod plural {
    /// Returns "file" if `count` is 1, otherwise "files".
    pub fn files_str(count: usize) -> &'static str {
        if count == 1 { "file" } else { "files" }
    }

    /// Returns "error" if `count` is 1, otherwise "errors".
    pub fn errors_str(count: usize) -> &'static str {
        if count == 1 { "error" } else { "errors" }
    }

    /// Returns "testcase" if `count` is 1, otherwise "testcases".
    pub fn testcases_str(count: usize) -> &'static str {
        if count == 1 { "testcase" } else { "testcases" }
    }
}

#[derive(Debug)]
pub(crate) struct FormattedDuration(pub(crate) Duration);

impl fmt::Display for FormattedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.0.as_secs_f64();
        if duration > 60.0 {
            write!(f, "{}m {:.2}s", duration as u32 / 60, duration % 60.0)
        } else {
            write!(f, "{duration:.2}s")
        }
    }
}

/// Returns the `file://` URI for `path`.
///
/// Relative paths can't be expressed as file URIs, so they are prefixed as-is.
pub(crate) fn file_uri(path: &Utf8Path) -> String {
    match Url::from_file_path(path.as_std_path()) {
        Ok(url) => url.into(),
        Err(()) => format!("file://{path}"),
    }
}

/// Returns true if `path` lies inside `dir`.
///
/// `path` made relative to `dir` must be non-empty, must not start with a parent-directory
/// traversal and must not be absolute (which happens on Windows across drives).
pub(crate) fn is_inside_dir(path: &Utf8Path, dir: &Utf8Path) -> bool {
    let Some(relative) = pathdiff::diff_utf8_paths(path, dir) else {
        return false;
    };
    if relative.as_str().is_empty() || relative.is_absolute() {
        return false;
    }
    !matches!(
        relative.components().next(),
        Some(Utf8Component::ParentDir | Utf8Component::Prefix(_) | Utf8Component::RootDir)
    )
}

/// Returns the number of path components `prefix` shares with `path`, if `path` starts with it.
pub(crate) fn prefix_depth(path: &Utf8Path, prefix: &Utf8Path) -> Option<usize> {
    path.starts_with(prefix).then(|| prefix.components().count())
}
