// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discover, run and inspect [venom](https://github.com/ovh/venom) test suites.
//!
//! This crate is the `venom-explorer` command-line front end. The logic lives in
//! [`venom_runner`].

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod notify;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{CapturedOutput, OutputContext, OutputWriter, StderrStyles};
