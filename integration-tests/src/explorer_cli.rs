// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::env::base_env;
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::Result;
use std::{
    borrow::Cow,
    ffi::OsString,
    fmt,
    process::{Command, ExitStatus, Stdio},
};
use venom_metadata::{RunSummary, TestTreeSummary};

/// A builder for a venom-explorer invocation.
#[derive(Clone, Debug)]
pub struct VenomExplorerCli {
    bin: Utf8PathBuf,
    args: Vec<String>,
    envs: Vec<(OsString, Option<OsString>)>,
    current_dir: Option<Utf8PathBuf>,
    stdin: Option<String>,
    unchecked: bool,
}

impl VenomExplorerCli {
    /// Creates an invocation of the binary at `bin`.
    ///
    /// Binary paths are only known to integration tests (through `CARGO_BIN_EXE_*`), so they're
    /// passed in.
    pub fn new(bin: impl Into<Utf8PathBuf>) -> Self {
        let envs = base_env()
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .collect();
        Self {
            bin: bin.into(),
            args: Vec::new(),
            envs,
            current_dir: None,
            stdin: None,
            unchecked: false,
        }
    }

    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(&mut self, arg: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(arg.into_iter().map(Into::into));
        self
    }

    pub fn env(&mut self, k: impl Into<OsString>, v: impl Into<OsString>) -> &mut Self {
        self.envs.push((k.into(), Some(v.into())));
        self
    }

    pub fn current_dir(&mut self, dir: impl AsRef<Utf8Path>) -> &mut Self {
        self.current_dir = Some(dir.as_ref().to_owned());
        self
    }

    pub fn stdin(&mut self, input: impl Into<String>) -> &mut Self {
        self.stdin = Some(input.into());
        self
    }

    /// Don't panic if the command exits with a non-zero code.
    pub fn unchecked(&mut self, unchecked: bool) -> &mut Self {
        self.unchecked = unchecked;
        self
    }

    pub fn output(&self) -> VenomExplorerOutput {
        let mut command = Command::new(&self.bin);
        command.args(&self.args);
        for (k, v) in &self.envs {
            match v {
                Some(v) => command.env(k, v),
                None => command.env_remove(k),
            };
        }
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().expect("failed to spawn");
        {
            use std::io::Write;
            let mut stdin = child.stdin.take().expect("stdin is piped");
            if let Some(input) = &self.stdin {
                stdin
                    .write_all(input.as_bytes())
                    .expect("failed to write stdin");
            }
        }
        let output = child.wait_with_output().expect("failed to execute");

        let ret = VenomExplorerOutput {
            command,
            exit_status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        if !self.unchecked && !output.status.success() {
            panic!("command failed:\n\n{ret}");
        }

        ret
    }
}

pub struct VenomExplorerOutput {
    pub command: Command,
    pub exit_status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl VenomExplorerOutput {
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_status.code()
    }

    pub fn stdout_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    pub fn decode_tree_json(&self) -> Result<TestTreeSummary> {
        Ok(serde_json::from_slice(&self.stdout)?)
    }

    pub fn decode_run_json(&self) -> Result<RunSummary> {
        Ok(serde_json::from_slice(&self.stdout)?)
    }
}

impl fmt::Display for VenomExplorerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "command: {:?}\nexit code: {:?}\n\
                   --- stdout ---\n{}\n\n--- stderr ---\n{}\n\n",
            self.command,
            self.exit_status.code(),
            String::from_utf8_lossy(&self.stdout),
            String::from_utf8_lossy(&self.stderr)
        )
    }
}

// Make Debug output the same as Display output, so `.unwrap()` and `.expect()` are nicer.
impl fmt::Debug for VenomExplorerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
