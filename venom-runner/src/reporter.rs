// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting of test trees and run events.
//!
//! The [`Reporter`] consumes [`RunEvent`]s. In the human format it writes each file's captured
//! output followed by its status line as the file finishes, then the messages of files that
//! didn't pass. In the JSON formats it aggregates a [`RunSummary`] and writes it once the run
//! finishes.

use crate::{
    helpers::{FormattedDuration, plural},
    runner::{RunEvent, RunStats, TestMessage, TestOutcome},
    timer::{Timer, whole_millis},
    tree::TestFileRecord,
};
use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::{OwoColorize, Style};
use std::{io, time::Duration};
use venom_metadata::{
    FileRunSummary, RunSummary, TestNodeKind, TestNodeSummary, TestTreeSummary,
};

/// The format used to report trees and runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// A single line of JSON.
    Json,
    /// Pretty-printed JSON.
    JsonPretty,
}

/// Styles used for human-readable output.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    /// Style for counts and numbers.
    pub count: Style,
    /// Style for passing files.
    pub pass: Style,
    /// Style for files with failures.
    pub fail: Style,
    /// Style for files with errors and aborted runs.
    pub error: Style,
    /// Style for cancelled runs and files that were not run.
    pub skip: Style,
    /// Style for group names in trees.
    pub group: Style,
    /// Style for secondary text: descriptions and locations.
    pub dim: Style,
}

impl Styles {
    /// Colorizes the styles for terminal output.
    pub fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().bold().green();
        self.fail = Style::new().bold().red();
        self.error = Style::new().bold().magenta();
        self.skip = Style::new().bold().yellow();
        self.group = Style::new().bold().blue();
        self.dim = Style::new().dimmed();
    }
}

/// Writes a test tree in the given format.
pub fn write_tree(
    summary: &TestTreeSummary,
    format: ReportFormat,
    styles: &Styles,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    match format {
        ReportFormat::Human => {
            for root in &summary.roots {
                write_tree_node(root, 0, styles, writer)?;
            }
            let count = summary.files().count();
            writeln!(
                writer,
                "{} test suite {}",
                count.style(styles.count),
                plural::files_str(count)
            )
        }
        ReportFormat::Json | ReportFormat::JsonPretty => {
            write_json(summary, format == ReportFormat::JsonPretty, writer)
        }
    }
}

fn write_tree_node(
    node: &TestNodeSummary,
    depth: usize,
    styles: &Styles,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match node.kind {
        TestNodeKind::Group => {
            write!(writer, "{indent}{}/", node.label.style(styles.group))?;
            if depth == 0 {
                write!(writer, " {}", node.id.style(styles.dim))?;
            }
            writeln!(writer)?;
        }
        TestNodeKind::File => {
            write!(writer, "{indent}{}", node.label)?;
            if let Some(description) = &node.description {
                write!(writer, " {}", description.style(styles.dim))?;
            }
            match node.testcase_count {
                Some(count) => write!(
                    writer,
                    " ({} {})",
                    count.style(styles.count),
                    plural::testcases_str(count)
                )?,
                None => write!(writer, " {}", "(invalid)".style(styles.error))?,
            }
            writeln!(writer)?;
        }
    }

    for child in &node.children {
        write_tree_node(child, depth + 1, styles, writer)?;
    }
    Ok(())
}

fn write_json(
    value: &impl serde::Serialize,
    pretty: bool,
    writer: &mut dyn io::Write,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    writeln!(writer)
}

/// Reports run events to a writer.
pub struct Reporter<W> {
    format: ReportFormat,
    styles: Styles,
    base_dir: Option<Utf8PathBuf>,
    writer: W,
    timer: Option<Timer>,
    output: Vec<String>,
    files: Vec<FileRunSummary>,
}

impl<W: io::Write> Reporter<W> {
    /// Creates a new reporter that writes to `writer`.
    pub fn new(format: ReportFormat, writer: W) -> Self {
        Self {
            format,
            styles: Styles::default(),
            base_dir: None,
            writer,
            timer: None,
            output: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Colorizes human-readable output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Displays file paths relative to `base_dir` in human-readable output.
    pub fn set_base_dir(&mut self, base_dir: impl Into<Utf8PathBuf>) {
        self.base_dir = Some(base_dir.into());
    }

    /// Reports a single event.
    pub fn report_event(&mut self, event: &RunEvent<'_>) -> io::Result<()> {
        match event {
            RunEvent::RunStarted { file_count } => {
                self.timer = Some(Timer::start());
                if self.format == ReportFormat::Human {
                    writeln!(
                        self.writer,
                        "{:>12} {} {}",
                        "Starting".style(self.styles.pass),
                        file_count.style(self.styles.count),
                        plural::files_str(*file_count),
                    )?;
                }
            }
            RunEvent::FileStarted { .. } => {
                self.output.clear();
            }
            RunEvent::FileOutput { text, .. } => {
                self.output.push((*text).to_owned());
            }
            RunEvent::FileFinished {
                file,
                outcome,
                duration,
            } => {
                self.files.push(FileRunSummary {
                    path: file.path().to_owned(),
                    status: outcome.status(),
                    duration_ms: whole_millis(*duration),
                    messages: outcome.messages().iter().map(TestMessage::summary).collect(),
                    output: std::mem::take(&mut self.output),
                });
                if self.format == ReportFormat::Human {
                    self.write_file_finished(file, outcome, *duration)?;
                    self.writer.flush()?;
                }
            }
            RunEvent::RunAborted { file } => {
                if self.format == ReportFormat::Human {
                    writeln!(
                        self.writer,
                        "{:>12} venom is unavailable, stopping before {}",
                        "ABORTED".style(self.styles.error),
                        self.display_path(file.path()),
                    )?;
                    self.writer.flush()?;
                }
            }
            RunEvent::RunFinished { stats } => {
                match self.format {
                    ReportFormat::Human => self.write_summary(stats)?,
                    ReportFormat::Json | ReportFormat::JsonPretty => {
                        let summary = RunSummary {
                            files: std::mem::take(&mut self.files),
                            cancelled: stats.cancelled,
                            aborted: stats.aborted,
                        };
                        write_json(
                            &summary,
                            self.format == ReportFormat::JsonPretty,
                            &mut self.writer,
                        )?;
                    }
                }
                self.writer.flush()?;
            }
        }
        Ok(())
    }

    /// Returns the summaries of the files that finished so far.
    pub fn finished_files(&self) -> &[FileRunSummary] {
        &self.files
    }

    fn write_file_finished(
        &mut self,
        file: &TestFileRecord,
        outcome: &TestOutcome,
        duration: Duration,
    ) -> io::Result<()> {
        let (label, style) = match outcome {
            TestOutcome::Passed => ("PASS", self.styles.pass),
            TestOutcome::Failed(_) => ("FAIL", self.styles.fail),
            TestOutcome::Errored(_) => ("ERROR", self.styles.error),
        };

        let output = self.files.last().map_or(&[][..], |summary| &summary.output[..]);
        if !output.is_empty() {
            writeln!(
                self.writer,
                "{}",
                format!("--- OUTPUT: {} ---", file.label()).style(self.styles.dim)
            )?;
            for block in output {
                writeln!(self.writer, "{}", block.trim_end())?;
            }
        }

        writeln!(
            self.writer,
            "{:>12} [{:>8.3}s] {}",
            label.style(style),
            duration.as_secs_f64(),
            self.display_path(file.path()),
        )?;

        if outcome.messages().is_empty() {
            return Ok(());
        }
        for message in outcome.messages() {
            self.write_message(message, style)?;
        }
        writeln!(self.writer)
    }

    fn write_message(&mut self, message: &TestMessage, style: Style) -> io::Result<()> {
        writeln!(self.writer, "\n{} {}", "-->".style(style), message.message)?;
        if let Some(location) = &message.location {
            let at = if location.range.is_sentinel() {
                format!("{} (line not found)", self.display_path(&location.path))
            } else {
                format!("{}:{}", self.display_path(&location.path), location.range)
            };
            writeln!(self.writer, "    {} {}", "at".style(self.styles.dim), at)?;
        }
        if let Some((expected, actual)) = &message.diff {
            writeln!(
                self.writer,
                "    {} {}",
                "expected:".style(self.styles.pass),
                expected
            )?;
            writeln!(
                self.writer,
                "    {}   {}",
                "actual:".style(self.styles.fail),
                actual
            )?;
        }
        Ok(())
    }

    fn write_summary(&mut self, stats: &RunStats) -> io::Result<()> {
        let elapsed = self.timer.map_or(Duration::ZERO, |timer| timer.elapsed());
        let summary_style = if stats.is_success() {
            self.styles.pass
        } else if stats.cancelled || stats.initial_run_count == 0 {
            self.styles.skip
        } else {
            self.styles.fail
        };

        write!(
            self.writer,
            "{:>12} [{:>8.3}s] {}",
            "Summary".style(summary_style),
            elapsed.as_secs_f64(),
            stats.finished_count().style(self.styles.count),
        )?;
        if stats.finished_count() != stats.initial_run_count {
            write!(
                self.writer,
                "/{}",
                stats.initial_run_count.style(self.styles.count)
            )?;
        }
        writeln!(
            self.writer,
            " {} run: {} {}, {} {}, {} {}",
            plural::files_str(stats.initial_run_count),
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
            stats.failed.style(self.styles.count),
            "failed".style(self.styles.fail),
            stats.errored.style(self.styles.count),
            "errored".style(self.styles.error),
        )?;

        if stats.cancelled {
            writeln!(
                self.writer,
                "{:>12} run cancelled after {}",
                "CANCELLED".style(self.styles.skip),
                FormattedDuration(elapsed),
            )?;
        }
        Ok(())
    }

    fn display_path(&self, path: &Utf8Path) -> String {
        self.base_dir
            .as_deref()
            .and_then(|base| pathdiff::diff_utf8_paths(path, base))
            .filter(|relative| !relative.starts_with(".."))
            .unwrap_or_else(|| path.to_owned())
            .into_string()
    }
}
