// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs the invoker against a shell script standing in for venom.

#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::{Utf8TempDir, tempdir};
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use std::{os::unix::fs::PermissionsExt, sync::Mutex};
use venom_runner::{
    config::{VenomSettings, VersionCheck},
    errors::InvokeError,
    invoker::{Notification, Notifier, VenomInvoker},
};

#[derive(Default)]
struct RecordingNotifier {
    notifications: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification<'_>) {
        let text = match notification {
            Notification::BinaryNotFound { error, .. } => error.to_string(),
            Notification::UnsupportedVersion { blocking, .. } => {
                format!("unsupported version (blocking: {blocking})")
            }
        };
        self.notifications.lock().unwrap().push(text);
    }
}

struct FakeVenom {
    dir: Utf8TempDir,
    binary: Utf8PathBuf,
}

impl FakeVenom {
    /// Writes a venom stand-in that reports `version` and copies `results` into the output
    /// directory, unless `results` is `None`.
    fn new(version: &str, results: Option<&str>) -> Self {
        let dir = tempdir().unwrap();
        let copy = match results {
            Some(results) => {
                let results_path = dir.path().join("results.json");
                std::fs::write(&results_path, results).unwrap();
                format!("cp '{results_path}' \"$out/test_results.json\"")
            }
            None => "echo 'panic: boom' >&2".to_owned(),
        };
        let script = formatdoc! {r#"
            #!/bin/sh
            if [ "$1" = version ]; then
                echo "Version venom: {version}"
                exit 0
            fi
            shift
            for arg in "$@"; do
                case "$arg" in
                    --output-dir=*) out="${{arg#--output-dir=}}" ;;
                esac
                file="$arg"
            done
            echo "running $file in $(pwd) (IS_TTY=$IS_TTY)"
            {copy}
            exit 2
        "#};

        let binary = dir.path().join("venom");
        std::fs::write(&binary, script).unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, binary }
    }

    fn settings(&self, version_check: VersionCheck) -> VenomSettings {
        VenomSettings {
            binary: self.binary.to_string(),
            additional_run_args: vec!["--var=env=ci".to_owned()],
            version_check,
        }
    }

    fn workspace(&self) -> &Utf8Path {
        self.dir.path()
    }
}

const RESULTS: &str = indoc! {r#"
    {
      "test_suites": [
        {
          "name": "users",
          "package": "tests/users.venom.yml",
          "errors": 0,
          "failures": 1,
          "testcases": [
            {
              "name": "get user",
              "classname": "users",
              "failures": [{"value": "expected: 200 got: 404 (users.venom.yml:3)"}]
            }
          ]
        },
        {
          "name": "orders",
          "package": "tests/orders.venom.yml",
          "errors": 0,
          "failures": 1,
          "testcases": [
            {"name": "x", "classname": "orders", "failures": [{"value": "not ours"}]}
          ]
        }
      ]
    }
"#};

#[tokio::test]
async fn run_collects_own_failures() {
    let venom = FakeVenom::new("v1.2.0", Some(RESULTS));
    let notifier = RecordingNotifier::default();
    let invoker = VenomInvoker::new(venom.settings(VersionCheck::Warn), &notifier);
    let file = venom.workspace().join("tests/users.venom.yml");

    let result = invoker
        .run(&file, venom.workspace())
        .await
        .unwrap()
        .expect("venom is available");

    assert_eq!(
        result.failures,
        vec!["expected: 200 got: 404 (users.venom.yml:3)".to_owned()]
    );
    assert!(result.errors.is_empty());
    assert_eq!(
        result.stdout.trim_end(),
        format!("running {file} in {} (IS_TTY=true)", venom.workspace())
    );

    let command = result.command.unwrap();
    assert!(command.starts_with("IS_TTY=true "), "command: {command}");
    assert!(command.contains(" run --format=json --output-dir="), "command: {command}");
    assert!(command.ends_with(&format!(" --var=env=ci {file}")), "command: {command}");
    assert!(notifier.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_results_file_is_an_error() {
    let venom = FakeVenom::new("v1.2.0", None);
    let notifier = RecordingNotifier::default();
    let invoker = VenomInvoker::new(venom.settings(VersionCheck::Warn), &notifier);
    let file = venom.workspace().join("tests/users.venom.yml");

    let err = invoker.run(&file, venom.workspace()).await.unwrap_err();
    match err {
        InvokeError::ResultsRead { path, .. } => {
            assert_eq!(path.file_name(), Some("test_results.json"));
            // The temporary directory is removed even though reading failed.
            assert!(!path.parent().unwrap().exists());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unsupported_version_warns_or_denies() {
    let venom = FakeVenom::new("v0.28.0", Some(RESULTS));
    let file = venom.workspace().join("tests/users.venom.yml");

    let notifier = RecordingNotifier::default();
    let invoker = VenomInvoker::new(venom.settings(VersionCheck::Warn), &notifier);
    let result = invoker.run(&file, venom.workspace()).await.unwrap();
    assert!(result.is_some(), "warn proceeds with the run");
    assert_eq!(
        *notifier.notifications.lock().unwrap(),
        vec!["unsupported version (blocking: false)".to_owned()]
    );

    let notifier = RecordingNotifier::default();
    let invoker = VenomInvoker::new(venom.settings(VersionCheck::Deny), &notifier);
    let result = invoker.run(&file, venom.workspace()).await.unwrap();
    assert_eq!(result, None);
    assert_eq!(
        *notifier.notifications.lock().unwrap(),
        vec!["unsupported version (blocking: true)".to_owned()]
    );
}

#[tokio::test]
async fn version_is_reported() {
    let venom = FakeVenom::new("v1.2.0", None);
    let notifier = RecordingNotifier::default();
    let invoker = VenomInvoker::new(venom.settings(VersionCheck::Warn), &notifier);

    let (binary, output) = invoker.version().await.unwrap();
    assert_eq!(binary.path(), venom.binary);
    let version = output.version.as_ref().unwrap();
    assert_eq!(version.raw(), "v1.2.0");
    assert_eq!(version.major(), Some(1));
    assert!(output.is_supported());
}
