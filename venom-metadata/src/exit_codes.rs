// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `venom-explorer` failures.
///
/// `venom-explorer` runs may fail for a variety of reasons. This structure documents the exit
/// codes that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum VenomExplorerExitCode {}

impl VenomExplorerExitCode {
    /// No errors occurred and venom-explorer exited normally.
    pub const OK: i32 = 0;

    /// No test suite files were selected to run, but no other errors occurred.
    pub const NO_TESTS_RUN: i32 = 4;

    /// One or more test suite files failed or errored.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// The venom binary could not be found, or its version was rejected.
    pub const VENOM_UNAVAILABLE: i32 = 97;

    /// A user issue happened while setting up a venom-explorer invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// The input given to `venom-explorer convert` was not valid JSON.
    pub const INVALID_JSON_INPUT: i32 = 94;

    /// The run was cancelled by a signal before every selected file ran.
    pub const RUN_CANCELLED: i32 = 130;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
