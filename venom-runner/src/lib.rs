// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for venom-explorer.
//!
//! The basic flow is:
//!
//! 1. A [`WorkspaceContext`](workspace::WorkspaceContext) is opened for each workspace folder.
//! 2. A [`TestTree`](tree::TestTree) mirrors the test suite files found in those folders, and
//!    is kept up to date through [`FsEvent`](workspace::FsEvent)s.
//! 3. A [`TestRunner`](runner::TestRunner) walks a subtree and runs each file through the
//!    [`VenomInvoker`](invoker::VenomInvoker), one at a time.
//! 4. Failure diagnostics are parsed with [`parse_failure_message`](failure::parse_failure_message)
//!    and mapped back onto the file with [`map_line`](source_range::map_line).
//!
//! Independently, a [`SchemaComposer`](schema::SchemaComposer) answers schema requests for the
//! files of each workspace.

pub mod ansi;
pub mod assertions;
pub mod config;
pub mod errors;
pub mod failure;
mod helpers;
pub mod invoker;
pub mod reporter;
pub mod runner;
pub mod schema;
pub mod signal;
pub mod source_range;
mod timer;
pub mod tree;
pub mod workspace;
