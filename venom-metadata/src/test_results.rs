// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// The name of the result file venom writes into `--output-dir` with `--format=json`.
pub const TEST_RESULTS_FILE_NAME: &str = "test_results.json";

/// Root of the `test_results.json` file written by `venom run --format=json`.
///
/// Venom may report on more test suites than were requested, so consumers are expected to
/// filter [`test_suites`](Self::test_suites) by [`TestSuiteResult::package`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct VenomTestResults {
    /// The test suites venom executed.
    #[serde(default)]
    pub test_suites: Vec<TestSuiteResult>,
}

impl VenomTestResults {
    /// Parses a `test_results.json` payload.
    pub fn parse(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }
}

/// A single test suite within [`VenomTestResults`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestSuiteResult {
    /// The name of the test suite, as declared in the suite file.
    #[serde(default)]
    pub name: String,

    /// The path of the test suite file, as venom saw it.
    pub package: String,

    /// The number of execution errors in this suite.
    #[serde(default)]
    pub errors: u64,

    /// The number of assertion failures in this suite.
    #[serde(default)]
    pub failures: u64,

    /// The test cases of this suite.
    #[serde(default)]
    pub testcases: Vec<TestCaseResult>,
}

/// A single test case within a [`TestSuiteResult`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestCaseResult {
    /// The name of the test case.
    #[serde(default)]
    pub name: String,

    /// The class name of the test case (venom sets this to the suite name).
    #[serde(default)]
    pub classname: String,

    /// Assertion failures, or `None` if venom wrote `null`.
    #[serde(default)]
    pub failures: Option<Vec<TestFailureEntry>>,

    /// Execution errors, or `None` if venom wrote `null`.
    #[serde(default)]
    pub errors: Option<Vec<TestFailureEntry>>,
}

/// A failure or error entry of a [`TestCaseResult`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TestFailureEntry {
    /// The human-oriented diagnostic produced by venom.
    #[serde(default)]
    pub value: String,

    /// The failure type, if any.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}
