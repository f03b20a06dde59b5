// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A stand-in for venom, used by integration tests.
//!
//! `fake-venom version` prints `$FAKE_VENOM_VERSION` (default `v1.2.0`).
//!
//! `fake-venom run --format=json --output-dir=DIR [ARGS...] FILE` writes
//! `DIR/test_results.json` according to directives in FILE, one per line:
//!
//! ```text
//! # fake-venom: fail <diagnostic>
//! # fake-venom: error <diagnostic>
//! # fake-venom: no-results
//! ```
//!
//! A file without directives passes. Like venom, the exit code doesn't reflect the results.

use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use venom_metadata::{
    TEST_RESULTS_FILE_NAME, TestCaseResult, TestFailureEntry, TestSuiteResult, VenomTestResults,
};

const DIRECTIVE_PREFIX: &str = "# fake-venom:";

fn main() -> Result<()> {
    color_eyre::install()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("version") => {
            let version =
                std::env::var("FAKE_VENOM_VERSION").unwrap_or_else(|_| "v1.2.0".to_owned());
            println!("Version venom: {version}");
            Ok(())
        }
        Some("run") => run(&args[1..]),
        _ => bail!("unsupported arguments: {args:?}"),
    }
}

fn run(args: &[String]) -> Result<()> {
    let output_dir = args
        .iter()
        .find_map(|arg| arg.strip_prefix("--output-dir="))
        .map(Utf8PathBuf::from)
        .ok_or_else(|| color_eyre::eyre::eyre!("--output-dir is required"))?;
    let Some(file) = args.last().map(Utf8Path::new) else {
        bail!("no test suite file given");
    };

    let cwd = std::env::current_dir().wrap_err("current directory is invalid")?;
    println!("running {file} in {}", cwd.display());
    for arg in &args[..args.len() - 1] {
        if let Some(var) = arg.strip_prefix("--var=") {
            println!("with variable {var}");
        }
    }

    let contents =
        std::fs::read_to_string(file).wrap_err_with(|| format!("error reading {file}"))?;

    let mut failures = Vec::new();
    let mut errors = Vec::new();
    for line in contents.lines() {
        let Some(directive) = line.trim().strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };
        let directive = directive.trim();
        if directive == "no-results" {
            eprintln!("panic: fake-venom was told not to write results");
            std::process::exit(2);
        } else if let Some(message) = directive.strip_prefix("fail ") {
            failures.push(entry(message));
        } else if let Some(message) = directive.strip_prefix("error ") {
            errors.push(entry(message));
        } else {
            bail!("unknown directive `{directive}` in {file}");
        }
    }

    let name = file.file_stem().unwrap_or("suite").to_owned();
    let suite = TestSuiteResult {
        name: name.clone(),
        package: file.to_string(),
        errors: errors.len() as u64,
        failures: failures.len() as u64,
        testcases: vec![TestCaseResult {
            name: format!("{name} testcase"),
            classname: name,
            failures: (!failures.is_empty()).then_some(failures),
            errors: (!errors.is_empty()).then_some(errors),
        }],
    };
    let results = VenomTestResults {
        test_suites: vec![suite],
    };

    let results_path = output_dir.join(TEST_RESULTS_FILE_NAME);
    let json = serde_json::to_string_pretty(&results)?;
    std::fs::write(&results_path, json)
        .wrap_err_with(|| format!("error writing {results_path}"))?;

    if results.test_suites.iter().any(|s| s.failures > 0 || s.errors > 0) {
        std::process::exit(2);
    }
    Ok(())
}

fn entry(message: &str) -> TestFailureEntry {
    TestFailureEntry {
        value: message.to_owned(),
        kind: None,
    }
}
