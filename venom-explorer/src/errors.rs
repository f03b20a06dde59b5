// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;
use venom_metadata::VenomExplorerExitCode;
use venom_runner::errors::{
    AssertionConvertError, ConfigParseError, ConfigParseErrorKind, SchemaUriParseError,
    SignalHandlerSetupError,
};

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An expected failure of a venom-explorer command.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("current directory is invalid")]
    CurrentDirInvalid {
        #[source]
        err: std::io::Error,
    },
    #[error("workspace folder not found")]
    WorkspaceNotFound { path: Utf8PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreateError {
        #[source]
        err: std::io::Error,
    },
    #[error("error setting up signal handler")]
    SignalHandlerSetupError {
        #[from]
        err: SignalHandlerSetupError,
    },
    #[error("error reading input")]
    InputReadError {
        path: Option<Utf8PathBuf>,
        #[source]
        err: std::io::Error,
    },
    #[error("invalid JSON input")]
    AssertionConvertError {
        #[from]
        err: AssertionConvertError,
    },
    #[error("invalid schema URI")]
    SchemaUriParseError {
        #[from]
        err: SchemaUriParseError,
    },
    #[error("venom unavailable")]
    VenomUnavailable,
    #[error("no test suite files to run")]
    NoTestsRun,
    #[error("test run failed")]
    TestRunFailed,
    #[error("test run cancelled")]
    RunCancelled,
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("error writing file")]
    FileWriteError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirInvalid { .. }
            | Self::WorkspaceNotFound { .. }
            | Self::ConfigParseError { .. }
            | Self::TokioRuntimeCreateError { .. }
            | Self::SignalHandlerSetupError { .. }
            | Self::InputReadError { .. }
            | Self::SchemaUriParseError { .. } => VenomExplorerExitCode::SETUP_ERROR,
            Self::AssertionConvertError { .. } => VenomExplorerExitCode::INVALID_JSON_INPUT,
            Self::VenomUnavailable => VenomExplorerExitCode::VENOM_UNAVAILABLE,
            Self::NoTestsRun => VenomExplorerExitCode::NO_TESTS_RUN,
            Self::TestRunFailed => VenomExplorerExitCode::TEST_RUN_FAILED,
            Self::RunCancelled => VenomExplorerExitCode::RUN_CANCELLED,
            Self::WriteOutputError { .. } | Self::FileWriteError { .. } => {
                VenomExplorerExitCode::WRITE_OUTPUT_ERROR
            }
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirInvalid { err } => {
                error!("current directory is invalid");
                Some(err as &dyn Error)
            }
            Self::WorkspaceNotFound { path } => {
                error!("workspace folder `{}` not found", path.style(styles.bold));
                None
            }
            Self::ConfigParseError { err } => match err.kind() {
                ConfigParseErrorKind::InvalidPattern { pattern, err: glob_err } => {
                    error!(
                        "in config file `{}`, test suite pattern `{}` is invalid",
                        err.config_file().style(styles.bold),
                        pattern.style(styles.bold),
                    );
                    Some(glob_err as &dyn Error)
                }
                _ => {
                    error!(
                        "failed to parse config file `{}`",
                        err.config_file().style(styles.bold)
                    );
                    Some(err.kind() as &dyn Error)
                }
            },
            Self::TokioRuntimeCreateError { err } => {
                error!("error creating Tokio runtime");
                Some(err as &dyn Error)
            }
            Self::SignalHandlerSetupError { err } => {
                error!("error setting up signal handler");
                err.source()
            }
            Self::InputReadError { path, err } => {
                match path {
                    Some(path) => error!("error reading `{}`", path.style(styles.bold)),
                    None => error!("error reading standard input"),
                }
                Some(err as &dyn Error)
            }
            Self::AssertionConvertError { err } => {
                error!("{err}");
                err.source()
            }
            Self::SchemaUriParseError { err } => {
                error!("{err}");
                None
            }
            Self::VenomUnavailable => {
                // The notifier has already explained the problem.
                error!("venom is unavailable");
                None
            }
            Self::NoTestsRun => {
                error!("no test suite files to run");
                None
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
            Self::RunCancelled => {
                error!(
                    "{}",
                    "test run cancelled before every file ran".style(styles.warning_text)
                );
                None
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
            Self::FileWriteError { path, err } => {
                error!("error writing `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
