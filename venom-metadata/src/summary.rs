// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Root of the output of `venom-explorer list --message-format json`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestTreeSummary {
    /// The top-level nodes: one group per workspace folder, plus files outside any workspace.
    pub roots: Vec<TestNodeSummary>,
}

impl TestTreeSummary {
    /// Iterates over every file node in the tree, depth-first.
    pub fn files(&self) -> impl Iterator<Item = &TestNodeSummary> + '_ {
        let mut stack: Vec<&TestNodeSummary> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                match node.kind {
                    TestNodeKind::File => return Some(node),
                    TestNodeKind::Group => stack.extend(node.children.iter().rev()),
                }
            }
            None
        })
    }
}

/// A node in a [`TestTreeSummary`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestNodeSummary {
    /// The stable identifier of the node.
    pub id: String,

    /// The label shown for the node.
    pub label: String,

    /// Whether this node is a directory group or a test suite file.
    pub kind: TestNodeKind,

    /// The path of a file node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,

    /// The suite name declared by a file node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// The number of test cases declared by a file node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testcase_count: Option<usize>,

    /// Child nodes of a group.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TestNodeSummary>,
}

/// The kind of a [`TestNodeSummary`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TestNodeKind {
    /// A workspace folder or a nested directory.
    Group,
    /// A test suite file.
    File,
}

/// Root of the output of `venom-explorer run --message-format json`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// Per-file results, in execution order.
    pub files: Vec<FileRunSummary>,

    /// True if the run stopped before every selected file ran.
    pub cancelled: bool,

    /// True if the run was aborted because venom was unavailable.
    pub aborted: bool,
}

/// The result of running a single test suite file.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FileRunSummary {
    /// The path of the test suite file.
    pub path: Utf8PathBuf,

    /// The terminal state of the file.
    pub status: FileRunStatus,

    /// Elapsed wall-clock time in milliseconds.
    pub duration_ms: u64,

    /// Messages attached to the terminal state: failures first, then errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<TestMessageSummary>,

    /// Output produced while running the file, one block at a time: the working directory and
    /// command lines, then venom's stdout and stderr.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output: Vec<String>,
}

/// The terminal state of a [`FileRunSummary`].
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileRunStatus {
    /// No failures and no errors.
    Passed,
    /// One or more assertion failures.
    Failed,
    /// One or more execution errors, and no assertion failures.
    Errored,
}

/// A message attached to a [`FileRunSummary`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TestMessageSummary {
    /// The message, stripped of terminal escapes.
    pub message: String,

    /// The expected value of a diff message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    /// The actual value of a diff message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    /// The highlighted range within the test suite file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<RangeSummary>,
}

/// A 0-based range within a file.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct RangeSummary {
    /// Start line, 0-based.
    pub start_line: usize,
    /// Start column, 0-based.
    pub start_column: usize,
    /// End line, 0-based.
    pub end_line: usize,
    /// End column, 0-based.
    pub end_column: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str) -> TestNodeSummary {
        TestNodeSummary {
            id: id.to_owned(),
            label: id.to_owned(),
            kind: TestNodeKind::File,
            path: Some(id.into()),
            description: None,
            testcase_count: Some(1),
            children: vec![],
        }
    }

    fn group(id: &str, children: Vec<TestNodeSummary>) -> TestNodeSummary {
        TestNodeSummary {
            id: id.to_owned(),
            label: id.to_owned(),
            kind: TestNodeKind::Group,
            path: None,
            description: None,
            testcase_count: None,
            children,
        }
    }

    #[test]
    fn files_depth_first() {
        let summary = TestTreeSummary {
            roots: vec![
                group("ws", vec![group("ws/a", vec![file("a1"), file("a2")]), file("w1")]),
                file("loose"),
            ],
        };
        let ids: Vec<_> = summary.files().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, ["a1", "a2", "w1", "loose"]);
    }

    #[test]
    fn run_summary_kebab_case() {
        let summary = RunSummary {
            files: vec![FileRunSummary {
                path: "a.venom.yml".into(),
                status: FileRunStatus::Passed,
                duration_ms: 12,
                messages: vec![],
                output: vec!["Working directory: /ws".to_owned()],
            }],
            cancelled: false,
            aborted: false,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["files"][0]["duration-ms"], 12);
        assert_eq!(json["files"][0]["status"], "passed");
        assert_eq!(json["files"][0]["output"][0], "Working directory: /ws");
        assert!(json["files"][0].get("messages").is_none());
    }
}
