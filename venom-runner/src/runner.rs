// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running test suite files.
//!
//! A [`TestRunner`] takes a [`RunRequest`], expands it into the files to run, and runs them
//! through the [`VenomInvoker`] one at a time. Progress is reported as [`RunEvent`]s.
//!
//! Files are queued in tree order and taken from the back of the queue. Cancellation is
//! cooperative: it is checked before each file, and a file that has started runs to completion.

use crate::{
    errors::{DisplayErrorChain, SignalHandlerSetupError},
    failure::parse_failure_message,
    invoker::{RunResult, VenomInvoker},
    signal::SignalHandlerKind,
    source_range::{SourceRange, map_line},
    timer::Timer,
    tree::{TestFileRecord, TestTree},
    workspace::WorkspaceContext,
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tracing::{debug, warn};
use venom_metadata::{FileRunStatus, RangeSummary, TestMessageSummary};

/// A cooperative cancellation flag, shared between the runner and whoever may cancel it.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that isn't cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Which nodes of the tree to run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Node ids to run. Empty means the whole tree.
    pub include: Vec<String>,

    /// Node ids to skip, along with everything under them.
    pub exclude: Vec<String>,
}

impl RunRequest {
    /// A request to run every file in the tree.
    pub fn all() -> Self {
        Self::default()
    }
}

/// A message attached to a failed or errored file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestMessage {
    /// The message text, without escape sequences.
    pub message: String,

    /// The expected and actual values, when the failure carried both.
    pub diff: Option<(String, String)>,

    /// Where in the file the failure points to.
    pub location: Option<TestLocation>,
}

/// A range within a test suite file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestLocation {
    /// The file.
    pub path: Utf8PathBuf,
    /// The range within the file's cached text.
    pub range: SourceRange,
}

impl TestMessage {
    /// Builds a message from an assertion failure diagnostic, mapping its line onto the cached
    /// text of `file`.
    pub fn from_failure(file: &TestFileRecord, diagnostic: &str) -> Self {
        let parsed = parse_failure_message(diagnostic);
        let diff = parsed
            .diff()
            .map(|(expected, actual)| (expected.to_owned(), actual.to_owned()));
        let location = parsed.location_line().map(|line| {
            let range = map_line(file.raw_text(), line);
            if range.is_sentinel() {
                debug!("no precise location for line {line} in {}", file.path());
            }
            TestLocation {
                path: file.path().to_owned(),
                range,
            }
        });

        Self {
            message: parsed.raw,
            diff,
            location,
        }
    }

    /// Builds a message with no structure.
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diff: None,
            location: None,
        }
    }

    /// Returns a serializable summary of this message.
    pub fn summary(&self) -> TestMessageSummary {
        let (expected, actual) = match &self.diff {
            Some((expected, actual)) => (Some(expected.clone()), Some(actual.clone())),
            None => (None, None),
        };
        TestMessageSummary {
            message: self.message.clone(),
            expected,
            actual,
            location: self.location.as_ref().map(|location| RangeSummary {
                start_line: location.range.start_line,
                start_column: location.range.start_column,
                end_line: location.range.end_line,
                end_column: location.range.end_column,
            }),
        }
    }
}

/// The terminal state of a single file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    /// No failures and no errors.
    Passed,

    /// At least one assertion failed. Errors, if any, follow the failures.
    Failed(Vec<TestMessage>),

    /// Execution errors without assertion failures, or the result couldn't be obtained.
    Errored(Vec<TestMessage>),
}

impl TestOutcome {
    /// Derives the outcome of `file` from venom's result.
    pub fn from_run_result(file: &TestFileRecord, result: &RunResult) -> Self {
        if result.is_success() {
            return Self::Passed;
        }

        let errors = result.errors.iter().map(TestMessage::plain);
        if result.failures.is_empty() {
            return Self::Errored(errors.collect());
        }
        Self::Failed(
            result
                .failures
                .iter()
                .map(|failure| TestMessage::from_failure(file, failure))
                .chain(errors)
                .collect(),
        )
    }

    /// Returns the messages attached to this outcome.
    pub fn messages(&self) -> &[TestMessage] {
        match self {
            Self::Passed => &[],
            Self::Failed(messages) | Self::Errored(messages) => messages,
        }
    }

    /// Returns the status reported in summaries.
    pub fn status(&self) -> FileRunStatus {
        match self {
            Self::Passed => FileRunStatus::Passed,
            Self::Failed(_) => FileRunStatus::Failed,
            Self::Errored(_) => FileRunStatus::Errored,
        }
    }
}

/// Statistics for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// The number of files queued when the run started.
    pub initial_run_count: usize,
    /// The number of files that passed.
    pub passed: usize,
    /// The number of files with assertion failures.
    pub failed: usize,
    /// The number of files with execution errors.
    pub errored: usize,
    /// True if the run was cancelled before every file ran.
    pub cancelled: bool,
    /// True if the run was aborted because venom couldn't be used.
    pub aborted: bool,
}

impl RunStats {
    /// Returns the number of files that reached a terminal state.
    pub fn finished_count(&self) -> usize {
        self.passed + self.failed + self.errored
    }

    /// Returns true if every queued file ran and passed.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && !self.aborted
            && self.failed == 0
            && self.errored == 0
            && self.finished_count() == self.initial_run_count
    }
}

/// An event emitted during a run.
#[derive(Clone, Debug)]
pub enum RunEvent<'a> {
    /// The run started.
    RunStarted {
        /// The number of files queued.
        file_count: usize,
    },

    /// A file started running.
    FileStarted {
        /// The file.
        file: &'a TestFileRecord,
    },

    /// Output was produced for a file. Each event is one block: a header line or the captured
    /// stdout or stderr.
    FileOutput {
        /// The file.
        file: &'a TestFileRecord,
        /// The output.
        text: &'a str,
    },

    /// A file reached its terminal state.
    FileFinished {
        /// The file.
        file: &'a TestFileRecord,
        /// The terminal state.
        outcome: &'a TestOutcome,
        /// How long the file took.
        duration: Duration,
    },

    /// The run was aborted because venom can't be used. The user has already been notified.
    RunAborted {
        /// The file that was about to run.
        file: &'a TestFileRecord,
    },

    /// The run finished, was cancelled or was aborted.
    RunFinished {
        /// Statistics for the run.
        stats: RunStats,
    },
}

/// Runs test suite files from a [`TestTree`].
#[derive(Debug)]
pub struct TestRunner<'a> {
    tree: &'a TestTree,
    context: &'a WorkspaceContext,
    invoker: &'a VenomInvoker<'a>,
    signal_handler: SignalHandlerKind,
    cancel: CancelToken,
}

impl<'a> TestRunner<'a> {
    /// Creates a new runner.
    pub fn new(
        tree: &'a TestTree,
        context: &'a WorkspaceContext,
        invoker: &'a VenomInvoker<'a>,
        signal_handler: SignalHandlerKind,
    ) -> Self {
        Self {
            tree,
            context,
            invoker,
            signal_handler,
            cancel: CancelToken::new(),
        }
    }

    /// Returns the token that cancels this runner.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Expands `request` into the files to run, in queue order.
    ///
    /// Group nodes expand into the files under them. Unknown ids are skipped with a warning, and
    /// a file reachable from several included nodes is queued once.
    pub fn queue(&self, request: &RunRequest) -> Vec<&'a TestFileRecord> {
        let included: Vec<&TestFileRecord> = if request.include.is_empty() {
            self.tree.leaves()
        } else {
            request
                .include
                .iter()
                .filter_map(|id| {
                    let node = self.tree.find(id);
                    if node.is_none() {
                        warn!("`{id}` is not in the test tree, skipping");
                    }
                    node
                })
                .flat_map(|node| node.leaves())
                .collect()
        };

        let excluded: HashSet<&str> = request
            .exclude
            .iter()
            .filter_map(|id| self.tree.find(id))
            .flat_map(|node| node.leaves())
            .map(TestFileRecord::id)
            .collect();

        let mut seen = HashSet::new();
        included
            .into_iter()
            .filter(|file| !excluded.contains(file.id()) && seen.insert(file.id()))
            .collect()
    }

    /// Runs the files of `request`, reporting progress to `callback`.
    pub async fn execute<F>(
        &self,
        request: &RunRequest,
        mut callback: F,
    ) -> Result<RunStats, SignalHandlerSetupError>
    where
        F: FnMut(RunEvent<'_>),
    {
        let _signals = self.signal_handler.watch(&self.cancel)?;

        let mut queue = self.queue(request);
        let mut stats = RunStats {
            initial_run_count: queue.len(),
            ..Default::default()
        };
        callback(RunEvent::RunStarted {
            file_count: queue.len(),
        });

        while !queue.is_empty() {
            if self.cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            let Some(file) = queue.pop() else {
                break;
            };

            let Some((outcome, duration)) = self.run_file(file, &mut callback).await else {
                stats.aborted = true;
                callback(RunEvent::RunAborted { file });
                break;
            };
            match &outcome {
                TestOutcome::Passed => stats.passed += 1,
                TestOutcome::Failed(_) => stats.failed += 1,
                TestOutcome::Errored(_) => stats.errored += 1,
            }
            callback(RunEvent::FileFinished {
                file,
                outcome: &outcome,
                duration,
            });
        }

        callback(RunEvent::RunFinished { stats });
        Ok(stats)
    }

    /// Runs a single file. Returns `None` if the run must be aborted.
    async fn run_file<F>(
        &self,
        file: &'a TestFileRecord,
        callback: &mut F,
    ) -> Option<(TestOutcome, Duration)>
    where
        F: FnMut(RunEvent<'_>),
    {
        let timer = Timer::start();
        callback(RunEvent::FileStarted { file });

        let cwd = self.working_directory(file.path());
        let outcome = match self.invoker.run(file.path(), &cwd).await {
            Ok(None) => return None,
            Ok(Some(result)) => {
                let mut output = vec![format!("Working directory: {cwd}")];
                if let Some(command) = &result.command {
                    output.push(format!("Executing command: {command}"));
                }
                output.extend(
                    [&result.stdout, &result.stderr]
                        .into_iter()
                        .filter(|text| !text.is_empty())
                        .cloned(),
                );
                for text in &output {
                    callback(RunEvent::FileOutput { file, text });
                }
                TestOutcome::from_run_result(file, &result)
            }
            Err(err) => {
                let message = DisplayErrorChain::new(&err).to_string();
                callback(RunEvent::FileOutput {
                    file,
                    text: &message,
                });
                TestOutcome::Errored(vec![TestMessage::plain(message)])
            }
        };

        Some((outcome, timer.elapsed()))
    }

    // Venom runs from the workspace folder so that relative paths in suites resolve.
    fn working_directory(&self, path: &Utf8Path) -> Utf8PathBuf {
        match self.context.owning_workspace(path) {
            Some(workspace) => workspace.root().to_owned(),
            None => path
                .parent()
                .map_or_else(|| Utf8PathBuf::from("."), Utf8Path::to_owned),
        }
    }
}
