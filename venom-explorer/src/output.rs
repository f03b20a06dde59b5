// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal output: colors, logging, and the streams commands write to.

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use std::{
    fmt,
    io::{self, BufWriter, Write},
    sync::Once,
};
use tracing::{Event, Level, Subscriber, level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Events logged with this target are printed without a level heading.
pub(crate) const NO_HEADING_TARGET: &str = "venom_explorer::no_heading";

const LOG_ENV: &str = "VENOM_EXPLORER_LOG";

pub(crate) mod clap_styles {
    use clap::builder::{
        Styles,
        styling::{AnsiColor, Effects},
    };

    pub(crate) const fn style() -> Styles {
        let heading = AnsiColor::Green.on_default().effects(Effects::BOLD);
        let literal = AnsiColor::Cyan.on_default().effects(Effects::BOLD);
        Styles::styled()
            .header(heading)
            .usage(heading)
            .literal(literal)
            .placeholder(AnsiColor::Cyan.on_default())
            .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
            .valid(literal)
            .invalid(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    }
}

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Verbose output: log debug messages unless VENOM_EXPLORER_LOG is set
    #[arg(long, short, global = true, env = "VENOM_EXPLORER_VERBOSE")]
    pub(crate) verbose: bool,

    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        global = true,
        value_name = "WHEN",
        env = "VENOM_EXPLORER_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let context = OutputContext { color: self.color };
        init_logger(self.verbose, context.stderr_styles());
        context
    }
}

/// Output settings shared by every command.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns the styles for stderr, colorized if stderr supports it.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }
        styles
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

impl Color {
    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

/// Styles for everything written to stderr: log headings and the messages themselves.
#[derive(Clone, Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
    pub(crate) warning_text: Style,
    pub(crate) link: Style,
    error_heading: Style,
    warning_heading: Style,
    info_heading: Style,
    trace_heading: Style,
}

impl StderrStyles {
    fn colorize(&mut self) {
        self.bold = style().bold();
        self.warning_text = style().yellow();
        self.link = style().cyan().underline();
        self.error_heading = style().red().bold();
        self.warning_heading = style().yellow().bold();
        self.info_heading = style().bold();
        self.trace_heading = style().dimmed();
    }

    fn heading(&self, level: Level) -> (&'static str, Style) {
        match level {
            Level::ERROR => ("error", self.error_heading),
            Level::WARN => ("warning", self.warning_heading),
            Level::INFO => ("info", self.info_heading),
            Level::DEBUG => ("debug", self.info_heading),
            Level::TRACE => ("trace", self.trace_heading),
        }
    }
}

static INIT_LOGGER: Once = Once::new();

/// Installs the stderr logger. Only the first call has an effect.
fn init_logger(verbose: bool, styles: StderrStyles) {
    INIT_LOGGER.call_once(|| {
        let default = Targets::new().with_default(if verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        });
        let (targets, invalid) = match std::env::var(LOG_ENV) {
            Ok(value) if !value.is_empty() => match value.parse::<Targets>() {
                Ok(targets) => (targets, None),
                Err(err) => (default, Some(format!("{value:?} ({err})"))),
            },
            Ok(_) | Err(std::env::VarError::NotPresent) => (default, None),
            Err(std::env::VarError::NotUnicode(_)) => {
                (default, Some("value is not UTF-8".to_owned()))
            }
        };

        let layer = tracing_subscriber::fmt::layer()
            .event_format(HeadingFormatter { styles })
            .with_writer(io::stderr)
            .with_filter(targets);
        tracing_subscriber::registry().with(layer).init();

        if let Some(invalid) = invalid {
            warn!("ignoring {LOG_ENV}: {invalid}");
        }
    });
}

/// Prints each event as `<level>: <message>`, or just the message for [`NO_HEADING_TARGET`].
struct HeadingFormatter {
    styles: StderrStyles,
}

impl<S, N> FormatEvent<S, N> for HeadingFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        if metadata.target() != NO_HEADING_TARGET {
            let (heading, style) = self.styles.heading(*metadata.level());
            write!(writer, "{}: ", heading.style(style))?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Where commands write their output: the process's stdout and stderr, or in-memory buffers.
#[derive(Debug, Default)]
pub struct OutputWriter {
    captured: Option<CapturedOutput>,
}

/// Output collected by [`OutputWriter::captured`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    /// Everything written to stdout.
    pub stdout: Vec<u8>,
    /// Everything written to stderr, not including log messages.
    pub stderr: Vec<u8>,
}

impl OutputWriter {
    /// Returns a writer that collects output in memory instead of writing to the terminal.
    pub fn captured() -> Self {
        Self {
            captured: Some(CapturedOutput::default()),
        }
    }

    /// Returns the collected output, if this writer was created with [`Self::captured`].
    pub fn into_captured(self) -> Option<CapturedOutput> {
        self.captured
    }

    pub(crate) fn stdout(&mut self) -> Box<dyn Write + '_> {
        match &mut self.captured {
            Some(captured) => Box::new(&mut captured.stdout),
            None => Box::new(BufWriter::new(io::stdout())),
        }
    }

    pub(crate) fn stderr(&mut self) -> Box<dyn Write + '_> {
        match &mut self.captured {
            Some(captured) => Box::new(&mut captured.stderr),
            None => Box::new(BufWriter::new(io::stderr())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_streams_are_separate() {
        let mut writer = OutputWriter::captured();
        writeln!(writer.stdout(), "out").unwrap();
        write!(writer.stderr(), "err").unwrap();
        writeln!(writer.stdout(), "more").unwrap();

        let captured = writer.into_captured().unwrap();
        assert_eq!(captured.stdout, b"out\nmore\n");
        assert_eq!(captured.stderr, b"err");
        assert_eq!(OutputWriter::default().into_captured(), None);
    }

    #[test]
    fn headings() {
        let styles = StderrStyles::default();
        assert_eq!(styles.heading(Level::WARN).0, "warning");
        assert_eq!(styles.heading(Level::ERROR).0, "error");
    }
}
