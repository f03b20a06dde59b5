// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Invocation of the venom binary.
//!
//! A [`VenomInvoker`] runs a single test suite file through `venom run`, then reads back the
//! `test_results.json` file venom writes and keeps only what belongs to that file.
//!
//! Environment problems (no binary, unsupported version) are reported through a [`Notifier`]
//! and make [`VenomInvoker::run`] return `Ok(None)`. Problems that make the result of a started
//! run unobtainable are returned as an [`InvokeError`].

use crate::{
    config::{VenomSettings, VersionCheck},
    errors::{BinaryLocateError, InvokeError},
    helpers::plural,
};
use camino::{Utf8Path, Utf8PathBuf};
use itertools::Itertools;
use std::{fmt, process::Stdio};
use tokio::process::Command;
use tracing::{debug, warn};
use venom_metadata::{TEST_RESULTS_FILE_NAME, TestSuiteResult, VenomTestResults};

/// Where to find instructions for installing venom.
pub const INSTALL_INSTRUCTIONS_URL: &str = "https://github.com/ovh/venom#installing";

/// The configuration key that holds the venom binary location.
pub const BINARY_SETTING: &str = "venom.binary";

/// The environment variable that makes venom produce terminal-style output.
const TTY_ENV: &str = "IS_TTY";

/// A located venom binary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenomBinary {
    path: Utf8PathBuf,
}

impl VenomBinary {
    /// Locates `binary`.
    ///
    /// A value with more than one path component is used as a path, relative to the current
    /// directory. Anything else is looked up in the directories of the `PATH` environment
    /// variable.
    pub fn locate(binary: &str) -> Result<Self, BinaryLocateError> {
        let cwd = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::try_from(dir).ok());
        Self::locate_from(binary, cwd.as_deref())
    }

    /// Locates `binary`, resolving relative paths against `cwd`.
    ///
    /// The stored path is absolute whenever `cwd` is known, so that venom can be spawned from
    /// any working directory.
    pub(crate) fn locate_from(
        binary: &str,
        cwd: Option<&Utf8Path>,
    ) -> Result<Self, BinaryLocateError> {
        let as_path = Utf8Path::new(binary);
        if as_path.is_absolute() || as_path.components().count() > 1 {
            let path = match cwd {
                Some(cwd) if as_path.is_relative() => cwd.join(as_path),
                _ => as_path.to_owned(),
            };
            return if is_executable(&path) {
                debug!("located venom binary at {path}");
                Ok(Self { path })
            } else {
                Err(BinaryLocateError::NotAFile { path })
            };
        }

        let search_path = std::env::var_os("PATH").unwrap_or_default();
        for dir in std::env::split_paths(&search_path) {
            // Non-UTF-8 directories can't hold a binary we could report on.
            let Ok(dir) = Utf8PathBuf::try_from(dir) else {
                continue;
            };
            for candidate in candidates(&dir, binary) {
                if is_executable(&candidate) {
                    debug!("located venom binary at {candidate}");
                    return Ok(Self { path: candidate });
                }
            }
        }

        Err(BinaryLocateError::NotOnPath {
            binary: binary.to_owned(),
        })
    }

    /// Returns the path to the binary.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Runs `venom version` and parses its output.
    ///
    /// The output is returned even if venom exits with a failure. Failing to spawn the process
    /// produces an output with no version.
    pub async fn version(&self) -> VersionOutput {
        let output = Command::new(self.path.as_std_path())
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                let version = VenomVersion::parse(&stdout);
                VersionOutput {
                    stdout,
                    stderr,
                    version,
                }
            }
            Err(err) => {
                warn!("failed to execute `{} version`: {err}", self.path);
                VersionOutput {
                    stdout: String::new(),
                    stderr: err.to_string(),
                    version: None,
                }
            }
        }
    }
}

impl fmt::Display for VenomBinary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

#[cfg(windows)]
fn candidates(dir: &Utf8Path, binary: &str) -> Vec<Utf8PathBuf> {
    let path = dir.join(binary);
    if path.extension().is_some() {
        vec![path]
    } else {
        vec![path.with_extension("exe"), path]
    }
}

#[cfg(not(windows))]
fn candidates(dir: &Utf8Path, binary: &str) -> Vec<Utf8PathBuf> {
    vec![dir.join(binary)]
}

#[cfg(unix)]
fn is_executable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Utf8Path) -> bool {
    path.is_file()
}

/// The output of `venom version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionOutput {
    /// Standard output of the process.
    pub stdout: String,

    /// Standard error of the process.
    pub stderr: String,

    /// The parsed version, if one could be found.
    pub version: Option<VenomVersion>,
}

impl VersionOutput {
    /// Returns true if a version was found and its major version is at least 1.
    pub fn is_supported(&self) -> bool {
        self.version.as_ref().is_some_and(VenomVersion::is_supported)
    }
}

/// A version reported by `venom version`, which prints e.g. `Version venom: v1.2.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenomVersion {
    raw: String,
    semver: Option<semver::Version>,
    major: Option<u64>,
}

impl VenomVersion {
    /// Parses the output of `venom version`. Returns `None` for empty output.
    pub fn parse(stdout: &str) -> Option<Self> {
        let line = stdout.trim().lines().next()?.trim();
        let raw = line.split_once(": ").map_or(line, |(_, version)| version).trim();
        if raw.is_empty() {
            return None;
        }

        let bare = raw.strip_prefix('v').unwrap_or(raw);
        let semver = semver::Version::parse(bare).ok();
        let major = match &semver {
            Some(version) => Some(version.major),
            None => {
                let digits: String = bare.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().ok()
            }
        };

        Some(Self {
            raw: raw.to_owned(),
            semver,
            major,
        })
    }

    /// Returns the version string as venom printed it, e.g. `v1.2.0`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns the version as a semver version, if it is one.
    pub fn semver(&self) -> Option<&semver::Version> {
        self.semver.as_ref()
    }

    /// Returns the major version, if one could be found.
    pub fn major(&self) -> Option<u64> {
        self.major
    }

    /// Venom versions before 1.0 have a different CLI and result format.
    pub fn is_supported(&self) -> bool {
        self.major.is_some_and(|major| major > 0)
    }
}

impl fmt::Display for VenomVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A way for the user to fix an environment problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemediationAction {
    /// Open the venom install instructions at [`INSTALL_INSTRUCTIONS_URL`].
    OpenInstallInstructions,

    /// Configure the location of the binary with the [`BINARY_SETTING`] key.
    ConfigureBinaryLocation,
}

impl RemediationAction {
    /// The actions offered when the binary can't be found.
    pub const BINARY_NOT_FOUND: &'static [Self] =
        &[Self::OpenInstallInstructions, Self::ConfigureBinaryLocation];

    /// A short label for the action.
    pub fn label(self) -> &'static str {
        match self {
            Self::OpenInstallInstructions => "Install Venom",
            Self::ConfigureBinaryLocation => "Set Venom binary location",
        }
    }

    /// What the action points to: a URL or a configuration key.
    pub fn target(self) -> &'static str {
        match self {
            Self::OpenInstallInstructions => INSTALL_INSTRUCTIONS_URL,
            Self::ConfigureBinaryLocation => BINARY_SETTING,
        }
    }
}

/// A message for the user about the venom environment.
#[derive(Clone, Copy, Debug)]
pub enum Notification<'a> {
    /// The venom binary could not be located.
    BinaryNotFound {
        /// Why the binary couldn't be located.
        error: &'a BinaryLocateError,

        /// What the user can do about it.
        actions: &'a [RemediationAction],
    },

    /// The venom binary reports a version before 1.0, or none at all.
    UnsupportedVersion {
        /// The binary that was checked.
        binary: &'a VenomBinary,

        /// The version it reported, if any.
        version: Option<&'a VenomVersion>,

        /// True if the run is aborted because of this.
        blocking: bool,
    },
}

/// Receives [`Notification`]s meant for the user.
pub trait Notifier {
    /// Shows `notification` to the user.
    fn notify(&self, notification: Notification<'_>);
}

/// The outcome of running a single test suite file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Standard output of venom.
    pub stdout: String,

    /// Standard error of venom.
    pub stderr: String,

    /// The command line that was executed.
    pub command: Option<String>,

    /// Assertion failure diagnostics for the invoked file.
    pub failures: Vec<String>,

    /// Execution errors for the invoked file.
    pub errors: Vec<String>,
}

impl RunResult {
    /// Builds a result for `file` out of venom's results, keeping only the suites that belong to
    /// `file`.
    pub fn from_test_results(
        file: &Utf8Path,
        results: &VenomTestResults,
        stdout: String,
        stderr: String,
        command: Option<String>,
    ) -> Self {
        let suites = || {
            results
                .test_suites
                .iter()
                .filter(|suite| suite_belongs_to(suite, file))
        };

        let failures = suites()
            .filter(|suite| suite.failures > 0)
            .flat_map(|suite| &suite.testcases)
            .filter_map(|testcase| testcase.failures.as_ref())
            .flatten()
            .map(|failure| failure.value.clone())
            .collect();

        let errors = suites()
            .filter(|suite| suite.errors > 0)
            .flat_map(|suite| {
                let errors: Vec<_> = suite
                    .testcases
                    .iter()
                    .filter_map(|testcase| testcase.errors.as_ref())
                    .flatten()
                    .map(|error| error.value.clone())
                    .collect();
                if errors.is_empty() {
                    // Venom counted errors without describing them.
                    let count = usize::try_from(suite.errors).unwrap_or(usize::MAX);
                    vec![format!(
                        "test suite `{}` reported {} {}",
                        suite.name,
                        suite.errors,
                        plural::errors_str(count),
                    )]
                } else {
                    errors
                }
            })
            .collect();

        Self {
            stdout,
            stderr,
            command,
            failures,
            errors,
        }
    }

    /// Returns true if there were no failures and no errors.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.errors.is_empty()
    }
}

// Venom may report on more suites than were requested.
fn suite_belongs_to(suite: &TestSuiteResult, file: &Utf8Path) -> bool {
    !suite.package.is_empty() && file.as_str().ends_with(&suite.package)
}

/// Runs test suite files through venom.
pub struct VenomInvoker<'a> {
    settings: VenomSettings,
    notifier: &'a dyn Notifier,
}

impl fmt::Debug for VenomInvoker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenomInvoker")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> VenomInvoker<'a> {
    /// Creates a new invoker. Environment problems are reported to `notifier`.
    pub fn new(settings: VenomSettings, notifier: &'a dyn Notifier) -> Self {
        Self { settings, notifier }
    }

    /// Returns the settings this invoker was created with.
    pub fn settings(&self) -> &VenomSettings {
        &self.settings
    }

    /// Locates the venom binary, notifying the user if it can't be found.
    pub fn locate(&self) -> Option<VenomBinary> {
        match VenomBinary::locate(&self.settings.binary) {
            Ok(binary) => Some(binary),
            Err(error) => {
                self.notifier.notify(Notification::BinaryNotFound {
                    error: &error,
                    actions: RemediationAction::BINARY_NOT_FOUND,
                });
                None
            }
        }
    }

    /// Locates the venom binary and queries its version.
    pub async fn version(&self) -> Option<(VenomBinary, VersionOutput)> {
        let binary = self.locate()?;
        let output = binary.version().await;
        Some((binary, output))
    }

    /// Checks the version of `binary`. Returns false if the run must be aborted.
    async fn check_version(&self, binary: &VenomBinary) -> bool {
        let output = binary.version().await;
        if output.is_supported() {
            return true;
        }

        let blocking = self.settings.version_check == VersionCheck::Deny;
        self.notifier.notify(Notification::UnsupportedVersion {
            binary,
            version: output.version.as_ref(),
            blocking,
        });
        !blocking
    }

    /// Runs the test suite at `file`, with `cwd` as the working directory.
    ///
    /// Returns `Ok(None)` if the environment doesn't allow running venom. The user has been
    /// notified in that case.
    pub async fn run(
        &self,
        file: &Utf8Path,
        cwd: &Utf8Path,
    ) -> Result<Option<RunResult>, InvokeError> {
        let Some(binary) = self.locate() else {
            return Ok(None);
        };
        if !self.check_version(&binary).await {
            return Ok(None);
        }

        let output_dir = camino_tempfile::Builder::new()
            .prefix(&format!("venom-{}", hex::encode(rand::random::<[u8; 10]>())))
            .rand_bytes(0)
            .tempdir()
            .map_err(|err| InvokeError::TempDirCreate { err })?;

        let mut args = vec![
            "run".to_owned(),
            "--format=json".to_owned(),
            format!("--output-dir={}", output_dir.path()),
        ];
        args.extend(self.settings.additional_run_args.iter().cloned());
        args.push(file.to_string());

        let command_line = format!(
            "{TTY_ENV}=true {} {}",
            binary.path(),
            args.iter().join(" ")
        );
        debug!("executing `{command_line}` in {cwd}");

        // A non-zero exit isn't a failure signal: the result file is authoritative.
        let output = Command::new(binary.path().as_std_path())
            .args(&args)
            .env(TTY_ENV, "true")
            .current_dir(cwd.as_std_path())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|err| InvokeError::Exec {
                command: command_line.clone(),
                err,
            })?;
        debug!("venom exited with {}", output.status);

        let results_path = output_dir.path().join(TEST_RESULTS_FILE_NAME);
        let contents = tokio::fs::read_to_string(&results_path).await;
        if let Err(err) = output_dir.close() {
            warn!("failed to remove temporary venom output directory: {err}");
        }
        let contents = contents.map_err(|err| InvokeError::ResultsRead {
            path: results_path.clone(),
            err,
        })?;
        let results = VenomTestResults::parse(&contents).map_err(|err| {
            InvokeError::ResultsParse {
                path: results_path,
                err,
            }
        })?;

        Ok(Some(RunResult::from_test_results(
            file,
            &results,
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
            Some(command_line),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use test_case::test_case;

    const TWO_SUITES: &str = indoc! {r#"
        {
          "test_suites": [
            {
              "name": "users",
              "package": "tests/users.venom.yml",
              "errors": 0,
              "failures": 1,
              "testcases": [
                {"name": "list", "classname": "users", "failures": null},
                {
                  "name": "get",
                  "classname": "users",
                  "failures": [{"value": "expected: 200 got: 404 (tests/users.venom.yml:12)"}]
                }
              ]
            },
            {
              "name": "orders",
              "package": "tests/orders.venom.yml",
              "errors": 0,
              "failures": 2,
              "testcases": [
                {
                  "name": "create",
                  "classname": "orders",
                  "failures": [{"value": "a"}, {"value": "b"}]
                }
              ]
            }
          ]
        }
    "#};

    fn result_for(file: &str, json: &str) -> RunResult {
        let results = VenomTestResults::parse(json).unwrap();
        RunResult::from_test_results(
            Utf8Path::new(file),
            &results,
            String::new(),
            String::new(),
            None,
        )
    }

    #[test]
    fn failures_are_scoped_to_the_invoked_file() {
        let result = result_for("/ws/tests/users.venom.yml", TWO_SUITES);
        assert_eq!(
            result.failures,
            vec!["expected: 200 got: 404 (tests/users.venom.yml:12)".to_owned()]
        );
        assert_eq!(result.errors, Vec::<String>::new());
        assert!(!result.is_success());
    }

    #[test]
    fn unrelated_file_has_no_failures() {
        let result = result_for("/ws/tests/other.venom.yml", TWO_SUITES);
        assert!(result.is_success());
    }

    #[test]
    fn failure_count_gates_collection() {
        let json = indoc! {r#"
            {"test_suites": [{
              "name": "s", "package": "s.venom.yml", "errors": 0, "failures": 0,
              "testcases": [{"name": "t", "classname": "s", "failures": [{"value": "stale"}]}]
            }]}
        "#};
        assert!(result_for("/ws/s.venom.yml", json).is_success());
    }

    #[test]
    fn errors_are_kept_apart_from_failures() {
        let json = indoc! {r#"
            {"test_suites": [{
              "name": "s", "package": "s.venom.yml", "errors": 1, "failures": 1,
              "testcases": [
                {"name": "t", "classname": "s", "failures": [{"value": "assertion"}]},
                {"name": "u", "classname": "s", "errors": [{"value": "connection refused"}]}
              ]
            }]}
        "#};
        let result = result_for("/ws/s.venom.yml", json);
        assert_eq!(result.failures, vec!["assertion".to_owned()]);
        assert_eq!(result.errors, vec!["connection refused".to_owned()]);
    }

    #[test]
    fn undescribed_errors_are_synthesized() {
        let json = indoc! {r#"
            {"test_suites": [{
              "name": "s", "package": "s.venom.yml", "errors": 2, "failures": 0,
              "testcases": [{"name": "t", "classname": "s"}]
            }]}
        "#};
        let result = result_for("/ws/s.venom.yml", json);
        assert_eq!(
            result.errors,
            vec!["test suite `s` reported 2 errors".to_owned()]
        );
        assert!(result.failures.is_empty());
    }

    #[test]
    fn empty_package_matches_nothing() {
        let json = indoc! {r#"
            {"test_suites": [{
              "name": "s", "package": "", "errors": 0, "failures": 1,
              "testcases": [{"name": "t", "classname": "s", "failures": [{"value": "x"}]}]
            }]}
        "#};
        assert!(result_for("/ws/s.venom.yml", json).is_success());
    }

    #[test_case("Version venom: v1.2.0\n", Some("v1.2.0"), Some(1), true ; "release")]
    #[test_case("Version venom: v0.28.0", Some("v0.28.0"), Some(0), false ; "pre 1.0")]
    #[test_case("Version venom: v1.0.0-rc.3", Some("v1.0.0-rc.3"), Some(1), true ; "prerelease")]
    #[test_case("Version venom: snapshot", Some("snapshot"), None, false ; "no digits")]
    #[test_case("v2.1\n", Some("v2.1"), Some(2), true ; "bare and not semver")]
    #[test_case("  \n", None, None, false ; "empty")]
    fn version_parsing(stdout: &str, raw: Option<&str>, major: Option<u64>, supported: bool) {
        let version = VenomVersion::parse(stdout);
        assert_eq!(version.as_ref().map(VenomVersion::raw), raw);
        assert_eq!(version.as_ref().and_then(VenomVersion::major), major);
        let output = VersionOutput {
            stdout: stdout.to_owned(),
            stderr: String::new(),
            version,
        };
        assert_eq!(output.is_supported(), supported);
    }

    #[test]
    fn remediation_actions() {
        let labels: Vec<_> = RemediationAction::BINARY_NOT_FOUND
            .iter()
            .map(|action| (action.label(), action.target()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Install Venom", INSTALL_INSTRUCTIONS_URL),
                ("Set Venom binary location", "venom.binary"),
            ]
        );
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: RefCell<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, notification: Notification<'_>) {
            let message = match notification {
                Notification::BinaryNotFound { error, actions } => {
                    format!("{error} ({} actions)", actions.len())
                }
                Notification::UnsupportedVersion { blocking, .. } => {
                    format!("unsupported (blocking: {blocking})")
                }
            };
            self.messages.borrow_mut().push(message);
        }
    }

    #[test]
    fn missing_binary_path_is_reported() {
        let err = VenomBinary::locate("/definitely/not/here/venom").unwrap_err();
        assert!(
            matches!(err, BinaryLocateError::NotAFile { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn relative_binary_path_is_made_absolute() {
        use std::os::unix::fs::PermissionsExt;

        let dir = camino_tempfile::tempdir().unwrap();
        let tools = dir.path().join("tools");
        std::fs::create_dir(&tools).unwrap();
        let script = tools.join("venom");
        std::fs::write(&script, "#!/bin/sh\necho \"Version venom: v1.2.0\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let binary = VenomBinary::locate_from("./tools/venom", Some(dir.path())).unwrap();
        assert!(binary.path().is_absolute(), "path: {}", binary.path());
        assert_eq!(binary.path(), dir.path().join("./tools/venom"));

        // The located path still works when spawned from another directory.
        let elsewhere = camino_tempfile::tempdir().unwrap();
        let output = Command::new(binary.path().as_std_path())
            .arg("version")
            .current_dir(elsewhere.path())
            .output()
            .await
            .unwrap();
        assert!(output.status.success());

        let err = VenomBinary::locate_from("./tools/venom", Some(elsewhere.path())).unwrap_err();
        match err {
            BinaryLocateError::NotAFile { path } => {
                assert_eq!(path, elsewhere.path().join("./tools/venom"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_without_binary_returns_none() {
        let notifier = RecordingNotifier::default();
        let settings = VenomSettings {
            binary: "/definitely/not/here/venom".to_owned(),
            ..Default::default()
        };
        let invoker = VenomInvoker::new(settings, &notifier);
        let result = invoker
            .run(Utf8Path::new("/ws/a.venom.yml"), Utf8Path::new("/ws"))
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(
            notifier.messages.into_inner(),
            vec!["venom binary not found at `/definitely/not/here/venom` (2 actions)".to_owned()]
        );
    }
}
