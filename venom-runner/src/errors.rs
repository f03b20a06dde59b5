// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by venom-runner.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{error, fmt};
use thiserror::Error;

/// Displays an error along with its chain of sources on a single line, separated by `: `.
pub struct DisplayErrorChain<E>(E);

impl<E: error::Error> DisplayErrorChain<E> {
    /// Creates a new `DisplayErrorChain`.
    pub fn new(error: E) -> Self {
        Self(error)
    }
}

impl<E: error::Error> fmt::Display for DisplayErrorChain<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = self.0.source();
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}

/// An error that occurred while parsing the venom-explorer config.
#[derive(Debug, Error)]
#[error("failed to parse venom-explorer config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of a [`ConfigParseError`].
#[derive(Debug, Error)]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The test suite pattern is not a valid glob.
    #[error("invalid test suite pattern `{pattern}`")]
    InvalidPattern {
        /// The pattern that failed to parse.
        pattern: String,

        /// The underlying error.
        #[source]
        err: globset::Error,
    },
}

/// An error that occurred while loading a file inside a workspace: `.venomrc`, a custom
/// executor descriptor, or a test suite file.
#[derive(Debug, Error)]
#[error("failed to load `{path}`")]
pub struct WorkspaceFileError {
    path: Utf8PathBuf,
    #[source]
    kind: WorkspaceFileErrorKind,
}

impl WorkspaceFileError {
    pub(crate) fn read(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self {
            path: path.into(),
            kind: WorkspaceFileErrorKind::Read(err),
        }
    }

    pub(crate) fn parse(path: impl Into<Utf8PathBuf>, err: serde_yaml::Error) -> Self {
        Self {
            path: path.into(),
            kind: WorkspaceFileErrorKind::Parse(err),
        }
    }

    /// Returns the path of the file that failed to load.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// The kind of a [`WorkspaceFileError`].
#[derive(Debug, Error)]
pub enum WorkspaceFileErrorKind {
    /// The file could not be read.
    #[error("error reading file")]
    Read(#[source] std::io::Error),

    /// The file is not valid YAML of the expected shape.
    #[error("error parsing YAML")]
    Parse(#[source] serde_yaml::Error),
}

/// An error that occurred while loading a base schema.
#[derive(Debug, Error)]
#[error("failed to load schema `{path}`")]
pub struct SchemaLoadError {
    path: Utf8PathBuf,
    #[source]
    err: std::io::Error,
}

impl SchemaLoadError {
    pub(crate) fn new(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self {
            path: path.into(),
            err,
        }
    }
}

/// An error that occurred while locating the venom binary.
#[derive(Debug, Error)]
pub enum BinaryLocateError {
    /// The binary name was not found in any directory of the search path.
    #[error("venom binary `{binary}` not found on PATH")]
    NotOnPath {
        /// The binary name that was looked up.
        binary: String,
    },

    /// The binary was given as a path, and nothing executable exists there.
    #[error("venom binary not found at `{path}`")]
    NotAFile {
        /// The configured path.
        path: Utf8PathBuf,
    },
}

/// An error that made the result of a venom invocation unobtainable.
///
/// These errors are reported as an execution error for the file that was being run. They are
/// distinct from assertion failures.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The temporary output directory could not be created.
    #[error("failed to create temporary output directory for venom")]
    TempDirCreate {
        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The venom process could not be spawned.
    #[error("failed to execute `{command}`")]
    Exec {
        /// The command line that was executed.
        command: String,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The result file could not be read. Venom likely crashed before writing it.
    #[error("failed to read venom results at `{path}`")]
    ResultsRead {
        /// The expected path of the result file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The result file is not valid.
    #[error("failed to parse venom results at `{path}`")]
    ResultsParse {
        /// The path of the result file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: serde_json::Error,
    },
}

/// Where the input of an assertion conversion came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvertInputKind {
    /// A selection within a document.
    Selection,
    /// A whole document.
    Document,
}

impl fmt::Display for ConvertInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selection => write!(f, "selection"),
            Self::Document => write!(f, "document"),
        }
    }
}

/// An error returned by [`convert_json`](crate::assertions::convert_json).
#[derive(Debug, Error)]
#[error("{input_kind} is not a valid JSON")]
pub struct AssertionConvertError {
    input_kind: ConvertInputKind,
    #[source]
    err: serde_json::Error,
}

impl AssertionConvertError {
    pub(crate) fn new(input_kind: ConvertInputKind, err: serde_json::Error) -> Self {
        Self { input_kind, err }
    }

    /// Returns where the invalid input came from.
    pub fn input_kind(&self) -> ConvertInputKind {
        self.input_kind
    }
}

/// An error returned while parsing a schema identity URI.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("`{uri}` is not a schema identity URI (expected `<scheme>://<path>[?<query>]`)")]
pub struct SchemaUriParseError {
    uri: String,
}

impl SchemaUriParseError {
    pub(crate) fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

/// An error that occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_is_joined() {
        let err = WorkspaceFileError::read(
            "/ws/.venomrc",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            DisplayErrorChain::new(&err).to_string(),
            "failed to load `/ws/.venomrc`: error reading file: permission denied"
        );
    }
}
