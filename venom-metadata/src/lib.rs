// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the formats consumed and produced around
//! [venom](https://github.com/ovh/venom) test runs.
//!
//! This crate contains three families of types:
//!
//! * [`VenomTestResults`] and friends: the `test_results.json` file venom writes into its
//!   output directory when invoked with `--format=json`.
//! * [`TestSuiteFile`], [`WorkspaceConfigFile`] and [`CustomExecutorFile`]: the YAML files
//!   discovered inside a workspace. These types only describe the parts venom-explorer reads;
//!   every other field is ignored.
//! * [`TestTreeSummary`] and [`RunSummary`]: the machine-readable output of
//!   `venom-explorer list` and `venom-explorer run`.

mod exit_codes;
mod files;
mod summary;
mod test_results;

pub use exit_codes::*;
pub use files::*;
pub use summary::*;
pub use test_results::*;
