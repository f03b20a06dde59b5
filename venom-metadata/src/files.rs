// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A venom test suite file, usually named `*.venom.yml`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TestSuiteFile {
    /// The declared name of the suite.
    #[serde(default)]
    pub name: Option<String>,

    /// The test cases declared by the suite.
    #[serde(default)]
    pub testcases: Vec<TestCaseDecl>,
}

/// A test case declared in a [`TestSuiteFile`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct TestCaseDecl {
    /// The declared name of the test case.
    #[serde(default)]
    pub name: Option<String>,
}

/// The `.venomrc` file at the root of a workspace.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkspaceConfigFile {
    /// The workspace-relative directory holding custom executors.
    #[serde(default)]
    pub lib_dir: Option<String>,
}

impl WorkspaceConfigFile {
    /// The name of the workspace configuration file.
    pub const FILE_NAME: &'static str = ".venomrc";

    /// The library directory used when `lib_dir` isn't set.
    pub const DEFAULT_LIB_DIR: &'static str = "lib";

    /// Returns the configured library directory, or [`Self::DEFAULT_LIB_DIR`].
    pub fn lib_dir(&self) -> &str {
        self.lib_dir.as_deref().unwrap_or(Self::DEFAULT_LIB_DIR)
    }
}

/// A custom executor descriptor, found under the library directory of a workspace.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CustomExecutorFile {
    /// The identifier steps use as their `type` to call this executor.
    pub executor: String,

    /// The declared inputs of the executor, in declaration order.
    #[serde(default)]
    pub input: IndexMap<String, serde_json::Value>,
}
