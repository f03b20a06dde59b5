// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! This is a duplicate of venom-explorer's main.rs, so that integration tests exercise a binary
//! built from this package. See tests/integration/main.rs for more.

use clap::Parser;
use color_eyre::Result;
use venom_explorer::{OutputWriter, VenomExplorerApp};

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    let opts = VenomExplorerApp::parse();
    let output = opts.init_output();

    match opts.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}
