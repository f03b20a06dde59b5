// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers shared by the venom-explorer integration tests.

pub mod env;
pub mod explorer_cli;
pub mod workspace;
