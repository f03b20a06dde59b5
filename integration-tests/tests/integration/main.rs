// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! These tests run "venom-explorer-dup", a copy of the venom-explorer binary built from this
//! package, against temporary workspace folders. Venom itself is replaced by "fake-venom", which
//! decides the outcome of each test suite file from directives written into the file. See
//! test-helpers/fake-venom.rs.

use indoc::indoc;
use integration_tests::{
    explorer_cli::{VenomExplorerCli, VenomExplorerOutput},
    workspace::TempWorkspace,
};
use pretty_assertions::assert_eq;
use venom_metadata::{FileRunStatus, TestNodeKind, VenomExplorerExitCode};

const FAKE_VENOM: &str = env!("CARGO_BIN_EXE_fake-venom");

const USERS: &str = indoc! {"
    name: users
    testcases:
      - name: list users
        steps:
          - type: http
            method: GET
            url: http://localhost/users
      - name: get user
        steps:
          - type: http
            method: GET
            url: http://localhost/users/1
"};

const SMOKE: &str = indoc! {"
    name: smoke
    testcases:
      - name: ping
        steps:
          - script: echo ping
"};

fn cli(workspace: &TempWorkspace) -> VenomExplorerCli {
    let mut cli = VenomExplorerCli::new(env!("CARGO_BIN_EXE_venom-explorer-dup"));
    cli.current_dir(workspace.root())
        .env("VENOM_BINARY", FAKE_VENOM);
    cli
}

fn standard_workspace() -> TempWorkspace {
    let workspace = TempWorkspace::new().unwrap();
    workspace.write("tests/api/users.venom.yml", USERS).unwrap();
    workspace.write("tests/smoke.venom.yml", SMOKE).unwrap();
    workspace
        .write("lib/login.yml", "executor: login\ninput:\n  user: {}\n")
        .unwrap();
    workspace
        .write(".git/hooks/ignored.venom.yml", SMOKE)
        .unwrap();
    workspace
}

fn assert_exit_code(output: &VenomExplorerOutput, expected: i32) {
    assert_eq!(output.exit_code(), Some(expected), "{output}");
}

#[test]
fn test_list_human() {
    let workspace = standard_workspace();
    let output = cli(&workspace).arg("list").output();

    let root = workspace.root();
    let expected = format!(
        indoc! {"
            {}/ {}
              tests/
                api/
                  users.venom.yml users (2 testcases)
                smoke.venom.yml smoke (1 testcase)
            2 test suite files
        "},
        root.file_name().unwrap(),
        root,
    );
    assert_eq!(output.stdout_as_str(), expected);
}

#[test]
fn test_list_json() {
    let workspace = standard_workspace();
    workspace
        .write("tests/broken.venom.yml", "testcases: [unterminated\n")
        .unwrap();

    let output = cli(&workspace).args(["list", "--message-format", "json"]).output();
    let summary = output.decode_tree_json().unwrap();

    assert_eq!(summary.roots.len(), 1);
    assert_eq!(summary.roots[0].kind, TestNodeKind::Group);
    assert_eq!(summary.roots[0].id, workspace.root().as_str());

    let files: Vec<_> = summary
        .files()
        .map(|file| {
            (
                file.label.as_str(),
                file.description.as_deref(),
                file.testcase_count,
            )
        })
        .collect();
    assert_eq!(
        files,
        vec![
            ("users.venom.yml", Some("users"), Some(2)),
            ("broken.venom.yml", None, None),
            ("smoke.venom.yml", Some("smoke"), Some(1)),
        ]
    );

    let smoke = summary
        .files()
        .find(|file| file.label == "smoke.venom.yml")
        .unwrap();
    assert_eq!(
        smoke.path.as_deref(),
        Some(workspace.root().join("tests/smoke.venom.yml").as_path())
    );
    assert!(smoke.id.starts_with("file://"), "id: {}", smoke.id);
}

#[test]
fn test_list_multiple_workspaces() {
    let first = standard_workspace();
    let second = TempWorkspace::new().unwrap();
    second.write("other.venom.yml", SMOKE).unwrap();

    let output = cli(&first)
        .args(["--workspace", first.root().as_str()])
        .args(["--workspace", second.root().as_str()])
        .args(["list", "-T", "json"])
        .output();
    let summary = output.decode_tree_json().unwrap();

    // Workspace groups are ordered by path.
    let roots: Vec<_> = summary.roots.iter().map(|root| root.id.as_str()).collect();
    let mut expected = vec![first.root().as_str(), second.root().as_str()];
    expected.sort_unstable();
    assert_eq!(roots, expected);
    assert_eq!(summary.files().count(), 3);
}

#[test]
fn test_missing_workspace() {
    let workspace = TempWorkspace::new().unwrap();
    let missing = workspace.root().join("missing");
    let output = cli(&workspace)
        .args(["--workspace", missing.as_str(), "list"])
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::SETUP_ERROR);
    assert!(
        output.stderr_as_str().contains("not found"),
        "{}",
        output.stderr_as_str()
    );
}

#[test]
fn test_run_passing() {
    let workspace = standard_workspace();
    let output = cli(&workspace).arg("run").output();

    assert_exit_code(&output, VenomExplorerExitCode::OK);
    let stderr = output.stderr_as_str();
    assert!(stderr.contains("Starting 2 files"), "{stderr}");
    let pass_lines: Vec<_> = stderr
        .lines()
        .filter(|line| line.trim_start().starts_with("PASS "))
        .collect();
    assert_eq!(pass_lines.len(), 2, "{stderr}");
    // Files run in stack order: the most recently queued file first.
    assert!(pass_lines[0].ends_with("smoke.venom.yml"), "{stderr}");
    assert!(pass_lines[1].ends_with("users.venom.yml"), "{stderr}");
    assert!(
        stderr.contains("2 files run: 2 passed, 0 failed, 0 errored"),
        "{stderr}"
    );

    // Captured output precedes the status line of passing files too.
    let smoke_output = stderr.find("--- OUTPUT: smoke.venom.yml ---").expect("smoke output");
    let smoke_ran = stderr.find("running ").expect("fake-venom output");
    assert!(smoke_output < smoke_ran, "{stderr}");
    assert!(smoke_ran < stderr.find(pass_lines[0]).unwrap(), "{stderr}");
}

#[test]
fn test_run_failures_json() {
    let workspace = standard_workspace();
    workspace
        .write(
            "tests/api/users.venom.yml",
            &format!(
                "{USERS}# fake-venom: fail Assertion failed. expected: 200  got: 404 (users.venom.yml:3)\n"
            ),
        )
        .unwrap();
    workspace
        .write(
            "tests/smoke.venom.yml",
            &format!("{SMOKE}# fake-venom: error connection refused\n"),
        )
        .unwrap();
    workspace
        .write("tests/crash.venom.yml", &format!("{SMOKE}# fake-venom: no-results\n"))
        .unwrap();

    let output = cli(&workspace)
        .args(["run", "--message-format", "json"])
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::TEST_RUN_FAILED);

    let summary = output.decode_run_json().unwrap();
    assert!(!summary.cancelled);
    assert!(!summary.aborted);

    let statuses: Vec<_> = summary
        .files
        .iter()
        .map(|file| (file.path.file_name().unwrap(), file.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("smoke.venom.yml", FileRunStatus::Errored),
            ("crash.venom.yml", FileRunStatus::Errored),
            ("users.venom.yml", FileRunStatus::Failed),
        ]
    );

    let users = &summary.files[2];
    assert_eq!(
        users.output[0],
        format!("Working directory: {}", workspace.root())
    );
    assert!(
        users.output[1].starts_with("Executing command: IS_TTY=true "),
        "{:?}",
        users.output
    );
    assert_eq!(users.messages.len(), 1);
    let message = &users.messages[0];
    assert_eq!(message.expected.as_deref(), Some("200"));
    assert_eq!(message.actual.as_deref(), Some("404"));
    let location = message.location.expect("line 3 exists");
    assert_eq!(location.start_line, 2);

    let smoke = &summary.files[0];
    assert_eq!(smoke.messages.len(), 1);
    assert_eq!(smoke.messages[0].message, "connection refused");
    assert_eq!(smoke.messages[0].location, None);
}

#[test]
fn test_run_failure_human() {
    let workspace = TempWorkspace::new().unwrap();
    workspace
        .write(
            "users.venom.yml",
            &format!("{USERS}# fake-venom: fail expected: 200  got: 404 (users.venom.yml:7)\n"),
        )
        .unwrap();
    workspace
        .write(
            ".config/venom-explorer.toml",
            "[venom]\nadditional-run-args = [\"--var=env=ci\"]\n",
        )
        .unwrap();

    let output = cli(&workspace).arg("run").unchecked(true).output();
    assert_exit_code(&output, VenomExplorerExitCode::TEST_RUN_FAILED);

    let stderr = output.stderr_as_str();
    assert!(stderr.contains("FAIL ["), "{stderr}");
    assert!(stderr.contains("--- OUTPUT: users.venom.yml ---"), "{stderr}");
    assert!(
        stderr.contains(&format!("Working directory: {}", workspace.root())),
        "{stderr}"
    );
    assert!(stderr.contains("with variable env=ci"), "{stderr}");
    assert!(
        stderr.contains("--> expected: 200  got: 404 (users.venom.yml:7)"),
        "{stderr}"
    );
    assert!(stderr.contains("    at users.venom.yml:7:"), "{stderr}");
    assert!(stderr.contains("    expected: 200\n"), "{stderr}");
    assert!(stderr.contains("    actual:   404\n"), "{stderr}");
    assert!(
        stderr.contains("1 file run: 0 passed, 1 failed, 0 errored"),
        "{stderr}"
    );
}

#[test]
fn test_run_selection() {
    let workspace = standard_workspace();

    // A directory selects every file below it, and exclusions remove whole subtrees.
    let output = cli(&workspace)
        .args(["run", "tests", "--exclude", "tests/api", "-T", "json"])
        .output();
    let summary = output.decode_run_json().unwrap();
    let files: Vec<_> = summary
        .files
        .iter()
        .map(|file| file.path.file_name().unwrap())
        .collect();
    assert_eq!(files, vec!["smoke.venom.yml"]);

    // Selecting the same file twice runs it once.
    let output = cli(&workspace)
        .args([
            "run",
            "tests/smoke.venom.yml",
            "tests/smoke.venom.yml",
            "-T",
            "json",
        ])
        .output();
    assert_eq!(output.decode_run_json().unwrap().files.len(), 1);
}

#[test]
fn test_run_outside_workspace() {
    let workspace = standard_workspace();
    let outside = TempWorkspace::new().unwrap();
    let file = outside
        .write("loose.venom.yml", &format!("{SMOKE}# fake-venom: fail nope\n"))
        .unwrap();

    let output = cli(&workspace)
        .args(["run", file.as_str()])
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::TEST_RUN_FAILED);

    // Files outside every workspace folder run from their own directory.
    let stderr = output.stderr_as_str();
    assert!(
        stderr.contains(&format!("Working directory: {}", outside.root())),
        "{stderr}"
    );
}

#[test]
fn test_run_relative_binary() {
    let outer = TempWorkspace::new().unwrap();
    let tools = outer.root().join("tools");
    std::fs::create_dir_all(&tools).unwrap();
    std::fs::copy(FAKE_VENOM, tools.join("venom")).unwrap();
    let suite = outer.write("ws/smoke.venom.yml", SMOKE).unwrap();
    let workspace = outer.root().join("ws");

    // The binary is relative to the current directory, but venom runs in the workspace.
    let output = cli(&outer)
        .args(["--workspace", workspace.as_str()])
        .args(["run", "--venom-binary", "./tools/venom", "-T", "json"])
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::OK);

    let summary = output.decode_run_json().unwrap();
    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.files[0].path, suite);
    assert_eq!(summary.files[0].status, FileRunStatus::Passed);
    assert_eq!(
        summary.files[0].output[0],
        format!("Working directory: {workspace}")
    );
}

#[test]
fn test_run_no_files() {
    let workspace = TempWorkspace::new().unwrap();
    workspace.write("README.md", "nothing to see\n").unwrap();

    let output = cli(&workspace).arg("run").unchecked(true).output();
    assert_exit_code(&output, VenomExplorerExitCode::NO_TESTS_RUN);
}

#[test]
fn test_run_venom_missing() {
    let workspace = standard_workspace();
    let missing = workspace.root().join("bin/venom");

    let output = cli(&workspace)
        .args(["run", "--venom-binary", missing.as_str(), "-T", "json"])
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::VENOM_UNAVAILABLE);

    let summary = output.decode_run_json().unwrap();
    assert!(summary.aborted);
    assert!(summary.files.is_empty());
}

#[test]
fn test_run_version_check() {
    let workspace = standard_workspace();

    // Old versions are reported, but run by default.
    let output = cli(&workspace)
        .env("FAKE_VENOM_VERSION", "v0.28.0")
        .arg("run")
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::OK);
    let stderr = output.stderr_as_str();
    assert!(stderr.contains("warning:"), "{stderr}");
    assert!(stderr.contains("v0.28.0"), "{stderr}");

    workspace
        .write(
            ".config/venom-explorer.toml",
            "[venom]\nversion-check = \"deny\"\n",
        )
        .unwrap();
    let output = cli(&workspace)
        .env("FAKE_VENOM_VERSION", "v0.28.0")
        .arg("run")
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::VENOM_UNAVAILABLE);
}

#[test]
fn test_invalid_config() {
    let workspace = standard_workspace();
    workspace
        .write(
            ".config/venom-explorer.toml",
            "[discovery]\ntest-suite-pattern = \"[\"\n",
        )
        .unwrap();

    let output = cli(&workspace).arg("list").unchecked(true).output();
    assert_exit_code(&output, VenomExplorerExitCode::SETUP_ERROR);
    assert!(
        output.stderr_as_str().contains("test suite pattern"),
        "{}",
        output.stderr_as_str()
    );
}

#[test]
fn test_custom_pattern() {
    let workspace = standard_workspace();
    workspace.write("suites/orders.yml", SMOKE).unwrap();
    workspace
        .write(
            ".config/venom-explorer.toml",
            "[discovery]\ntest-suite-pattern = \"suites/*.yml\"\n",
        )
        .unwrap();

    let output = cli(&workspace).args(["list", "-T", "json"]).output();
    let summary = output.decode_tree_json().unwrap();
    let labels: Vec<_> = summary.files().map(|file| file.label.as_str()).collect();
    assert_eq!(labels, vec!["orders.yml"]);
}

#[test]
fn test_convert_stdin() {
    let workspace = TempWorkspace::new().unwrap();
    let output = cli(&workspace)
        .args(["convert", "--prefix", "result.systemoutjson"])
        .stdin(r#"{"Name": "ada", "tags": ["a", null], "ok": false}"#)
        .output();

    assert_eq!(
        output.stdout_as_str(),
        indoc! {r#"
            - result.systemoutjson.name ShouldEqual "ada"
            - result.systemoutjson.tags.__len__ ShouldEqual 2
            - result.systemoutjson.tags.tags0 ShouldEqual "a"
            - result.systemoutjson.tags.tags1 ShouldBeEmpty
            - result.systemoutjson.ok ShouldBeFalse
        "#}
    );
}

#[test]
fn test_convert_invalid_json() {
    let workspace = TempWorkspace::new().unwrap();
    let output = cli(&workspace)
        .arg("convert")
        .stdin("{\"unterminated\": ")
        .unchecked(true)
        .output();

    assert_exit_code(&output, VenomExplorerExitCode::INVALID_JSON_INPUT);
    assert_eq!(output.stdout_as_str(), "");
    assert!(
        output.stderr_as_str().contains("selection"),
        "{}",
        output.stderr_as_str()
    );
}

#[test]
fn test_schema_requests() {
    let workspace = standard_workspace();
    let suite = workspace.root().join("tests/smoke.venom.yml");

    let output = cli(&workspace)
        .args(["schema", "resolve", suite.as_str()])
        .output();
    let uri = output.stdout_as_str().trim_end().to_owned();
    assert!(
        uri.starts_with("VSCODE_VENOM_TEST_SUITE_SCHEMA://schema/venom.schema.json?workspace="),
        "uri: {uri}"
    );

    let output = cli(&workspace).args(["schema", "content", &uri]).output();
    let content: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let definitions = content["definitions"].as_object().unwrap();
    assert!(
        definitions.contains_key("custom_executor_login"),
        "definitions: {:?}",
        definitions.keys().collect::<Vec<_>>()
    );

    // Files that are neither suites nor executors get no schema.
    let readme = workspace.write("README.md", "docs\n").unwrap();
    let output = cli(&workspace)
        .args(["schema", "resolve", readme.as_str()])
        .output();
    assert_eq!(output.stdout_as_str(), "");

    let output = cli(&workspace)
        .args(["schema", "content", "not a uri"])
        .unchecked(true)
        .output();
    assert_exit_code(&output, VenomExplorerExitCode::SETUP_ERROR);
}

#[test]
fn test_version() {
    let workspace = TempWorkspace::new().unwrap();
    let output = cli(&workspace).arg("version").output();
    assert_eq!(
        output.stdout_as_str(),
        format!("venom v1.2.0 ({FAKE_VENOM})\n")
    );
}
