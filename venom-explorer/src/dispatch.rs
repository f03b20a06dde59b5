// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    notify::StderrNotifier,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use std::io::{Read, Write};
use supports_color::Stream;
use tracing::{info, warn};
use venom_metadata::VenomExplorerExitCode;
use venom_runner::{
    assertions::{DEFAULT_PREFIX, KNOWN_PREFIXES, convert_json},
    config::{ExplorerConfig, VenomSettings},
    errors::ConvertInputKind,
    invoker::VenomInvoker,
    reporter::{ReportFormat, Reporter, Styles, write_tree},
    runner::{RunRequest, RunStats, TestRunner},
    schema::{BaseSchemas, SchemaComposer, SchemaKind},
    signal::SignalHandlerKind,
    tree::TestTree,
    workspace::WorkspaceContext,
};

/// Discover, run and inspect venom test suites.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct VenomExplorerApp {
    /// Workspace folder to open, may be repeated [default: current directory]
    #[arg(long = "workspace", short = 'w', global = true, value_name = "DIR")]
    workspaces: Vec<Utf8PathBuf>,

    #[clap(flatten)]
    config_opts: ConfigOpts,

    #[clap(flatten)]
    output: OutputOpts,

    #[clap(subcommand)]
    command: Command,
}

impl VenomExplorerApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::List { message_format } => {
                let base = BaseApp::new(output, &self.workspaces, &self.config_opts)?;
                base.exec_list(message_format.into(), output_writer)
            }
            Command::Run(run_opts) => {
                let base = BaseApp::new(output, &self.workspaces, &self.config_opts)?;
                base.exec_run(run_opts, output_writer)
            }
            Command::Convert(convert_opts) => convert_opts.exec(output_writer),
            Command::Schema { command } => {
                let base = BaseApp::new(output, &self.workspaces, &self.config_opts)?;
                base.exec_schema(command, output_writer)
            }
            Command::Version { venom_opts } => {
                let base = BaseApp::new(output, &self.workspaces, &self.config_opts)?;
                base.exec_version(venom_opts, output_writer)
            }
        }
    }
}

#[derive(Debug, Args)]
struct ConfigOpts {
    /// Config file [default: <first workspace>/.config/venom-explorer.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    fn make_config(&self, workspace_root: &Utf8Path) -> Result<ExplorerConfig> {
        Ok(ExplorerConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List test suite files in the workspace folders
    ///
    /// Files are grouped by workspace folder and directory. Use --message-format json to get
    /// machine-readable output.
    List {
        /// Output format
        #[arg(short = 'T', long, value_enum, default_value_t, value_name = "FMT")]
        message_format: MessageFormatOpts,
    },

    /// Run test suite files with venom
    ///
    /// Files run one at a time. The run stops early on Ctrl-C, once the current file finishes.
    Run(RunOpts),

    /// Convert a JSON payload into venom assertions
    ///
    /// Every leaf of the payload becomes one assertion, printed as a YAML list item.
    Convert(ConvertOpts),

    /// Answer schema requests for workspace files
    Schema {
        #[clap(subcommand)]
        command: SchemaCommand,
    },

    /// Print the version of the venom binary
    Version {
        #[clap(flatten)]
        venom_opts: VenomOpts,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    #[default]
    Human,
    Json,
    JsonPretty,
}

impl From<MessageFormatOpts> for ReportFormat {
    fn from(opts: MessageFormatOpts) -> Self {
        match opts {
            MessageFormatOpts::Human => Self::Human,
            MessageFormatOpts::Json => Self::Json,
            MessageFormatOpts::JsonPretty => Self::JsonPretty,
        }
    }
}

#[derive(Debug, Args)]
struct VenomOpts {
    /// The venom binary: a name looked up on PATH, or a path [default: from config]
    #[arg(long, env = "VENOM_BINARY", value_name = "BIN")]
    venom_binary: Option<String>,
}

impl VenomOpts {
    fn apply(&self, mut settings: VenomSettings) -> VenomSettings {
        if let Some(binary) = &self.venom_binary {
            settings.binary = binary.clone();
        }
        settings
    }
}

#[derive(Debug, Args)]
struct RunOpts {
    /// Files or directories to run [default: every test suite file]
    #[arg(value_name = "PATHS")]
    paths: Vec<Utf8PathBuf>,

    /// Files or directories to skip
    #[arg(long, value_name = "PATH")]
    exclude: Vec<Utf8PathBuf>,

    #[clap(flatten)]
    venom_opts: VenomOpts,

    /// Output format
    #[arg(short = 'T', long, value_enum, default_value_t, value_name = "FMT")]
    message_format: MessageFormatOpts,
}

#[derive(Debug, Args)]
struct ConvertOpts {
    /// JSON file to convert [default: read from standard input]
    #[arg(value_name = "FILE")]
    file: Option<Utf8PathBuf>,

    /// Path prefix of the assertions
    #[arg(long, short, default_value = DEFAULT_PREFIX)]
    prefix: String,

    /// Replace the contents of FILE with the assertions
    #[arg(long, requires = "file")]
    in_place: bool,

    /// List common prefixes and exit
    #[arg(long, exclusive = true)]
    list_prefixes: bool,
}

impl ConvertOpts {
    fn exec(self, output_writer: &mut OutputWriter) -> Result<i32> {
        let mut stdout = output_writer.stdout();

        if self.list_prefixes {
            let width = KNOWN_PREFIXES
                .iter()
                .map(|prefix| prefix.path.len())
                .max()
                .unwrap_or_default();
            for prefix in KNOWN_PREFIXES {
                writeln!(stdout, "{:width$}  {}", prefix.path, prefix.executors)
                    .map_err(ExpectedError::write_output)?;
            }
            stdout.flush().map_err(ExpectedError::write_output)?;
            return Ok(VenomExplorerExitCode::OK);
        }

        let (input, input_kind) = match &self.file {
            Some(path) => {
                let input = std::fs::read_to_string(path).map_err(|err| {
                    ExpectedError::InputReadError {
                        path: Some(path.clone()),
                        err,
                    }
                })?;
                (input, ConvertInputKind::Document)
            }
            None => {
                let mut input = String::new();
                std::io::stdin()
                    .read_to_string(&mut input)
                    .map_err(|err| ExpectedError::InputReadError { path: None, err })?;
                (input, ConvertInputKind::Selection)
            }
        };

        let assertions = convert_json(&input, input_kind, &self.prefix)?;

        match (&self.file, self.in_place) {
            (Some(path), true) => {
                std::fs::write(path, format!("{assertions}\n")).map_err(|err| {
                    ExpectedError::FileWriteError {
                        path: path.clone(),
                        err,
                    }
                })?;
                info!("wrote assertions to {path}");
            }
            _ => {
                writeln!(stdout, "{assertions}").map_err(ExpectedError::write_output)?;
                stdout.flush().map_err(ExpectedError::write_output)?;
            }
        }
        Ok(VenomExplorerExitCode::OK)
    }
}

#[derive(Debug, Subcommand)]
enum SchemaCommand {
    /// Print the identity URI of the schema that applies to a file, if any
    Resolve {
        /// The file to resolve a schema for
        resource: Utf8PathBuf,

        /// Only consider this kind of schema
        #[arg(long, value_enum)]
        kind: Option<SchemaKindOpt>,
    },

    /// Print the schema document for an identity URI
    Content {
        /// The identity URI, as printed by `schema resolve`
        uri: String,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SchemaKindOpt {
    TestSuite,
    CustomExecutor,
}

impl From<SchemaKindOpt> for SchemaKind {
    fn from(opt: SchemaKindOpt) -> Self {
        match opt {
            SchemaKindOpt::TestSuite => Self::TestSuite,
            SchemaKindOpt::CustomExecutor => Self::CustomExecutor,
        }
    }
}

/// State shared by commands that operate on workspace folders.
struct BaseApp {
    output: OutputContext,
    current_dir: Utf8PathBuf,
    context: WorkspaceContext,
    config: ExplorerConfig,
}

impl BaseApp {
    fn new(
        output: OutputContext,
        workspaces: &[Utf8PathBuf],
        config_opts: &ConfigOpts,
    ) -> Result<Self> {
        let current_dir = current_dir()?;
        let roots = if workspaces.is_empty() {
            vec![current_dir.clone()]
        } else {
            workspaces
                .iter()
                .map(|root| absolute(&current_dir, root))
                .collect()
        };

        let mut context = WorkspaceContext::new();
        for root in &roots {
            if !root.is_dir() {
                return Err(ExpectedError::WorkspaceNotFound { path: root.clone() });
            }
            context.open(root.clone());
        }

        // The first workspace folder is the primary one: tool configuration is read from it.
        let config = config_opts.make_config(&roots[0])?;

        Ok(Self {
            output,
            current_dir,
            context,
            config,
        })
    }

    fn discover(&self) -> TestTree {
        let mut tree = TestTree::new(self.config.test_suite_matcher().clone());
        let count = tree.discover(&self.context, false);
        info!(
            "found {count} test suite {} in {}",
            if count == 1 { "file" } else { "files" },
            self.context.roots().join(", "),
        );
        tree
    }

    fn exec_list(&self, format: ReportFormat, output_writer: &mut OutputWriter) -> Result<i32> {
        let tree = self.discover();

        let mut styles = Styles::default();
        if format == ReportFormat::Human && self.output.color.should_colorize(Stream::Stdout) {
            styles.colorize();
        }

        let mut stdout = output_writer.stdout();
        write_tree(&tree.summary(), format, &styles, &mut stdout)
            .and_then(|()| stdout.flush())
            .map_err(ExpectedError::write_output)?;
        Ok(VenomExplorerExitCode::OK)
    }

    fn exec_run(&self, opts: RunOpts, output_writer: &mut OutputWriter) -> Result<i32> {
        let mut tree = self.discover();
        let request = self.run_request(&mut tree, &opts);

        let settings = opts.venom_opts.apply(self.config.venom_settings());
        let notifier = StderrNotifier::new(self.output.stderr_styles());
        let invoker = VenomInvoker::new(settings, &notifier);
        let runner = TestRunner::new(&tree, &self.context, &invoker, SignalHandlerKind::Standard);

        let format = ReportFormat::from(opts.message_format);
        let stats = {
            // Human-readable progress goes to stderr, machine-readable summaries to stdout.
            let mut writer = match format {
                ReportFormat::Human => output_writer.stderr(),
                ReportFormat::Json | ReportFormat::JsonPretty => output_writer.stdout(),
            };
            let mut reporter = Reporter::new(format, &mut writer);
            if self.output.color.should_colorize(Stream::Stderr) {
                reporter.colorize();
            }
            reporter.set_base_dir(self.current_dir.clone());

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| ExpectedError::TokioRuntimeCreateError { err })?;

            let mut write_error = None;
            let stats = runtime.block_on(runner.execute(&request, |event| {
                if write_error.is_none()
                    && let Err(err) = reporter.report_event(&event)
                {
                    write_error = Some(err);
                }
            }))?;

            if let Some(err) = write_error {
                return Err(ExpectedError::write_output(err));
            }
            writer.flush().map_err(ExpectedError::write_output)?;
            stats
        };

        final_stats_to_result(stats)
    }

    /// Maps paths given on the command line to tree node ids.
    fn run_request(&self, tree: &mut TestTree, opts: &RunOpts) -> RunRequest {
        let mut to_id = |path: &Utf8Path| {
            let path = absolute(&self.current_dir, path);
            // Files outside every workspace folder aren't discovered, so add them explicitly.
            if path.is_file() && tree.find_by_path(&path).is_none() {
                tree.sync_document(&self.context, &path);
            }
            match tree.find_by_path(&path) {
                Some(node) => node.id().to_owned(),
                None => path.into_string(),
            }
        };

        let include = opts.paths.iter().map(|path| to_id(path)).collect();
        let exclude = opts.exclude.iter().map(|path| to_id(path)).collect();
        RunRequest { include, exclude }
    }

    fn exec_schema(&self, command: SchemaCommand, output_writer: &mut OutputWriter) -> Result<i32> {
        let schema_dir = self.config.schema_dir();
        let base = BaseSchemas::load(schema_dir.as_deref());
        let composer = SchemaComposer::new(&base, &self.context, self.config.test_suite_matcher());
        let mut stdout = output_writer.stdout();

        match command {
            SchemaCommand::Resolve { resource, kind } => {
                let resource = absolute(&self.current_dir, &resource);
                let uri = match kind {
                    Some(kind) => composer.resolve(kind.into(), &resource),
                    None => composer.resolve_any(&resource),
                };
                match uri {
                    Some(uri) => writeln!(stdout, "{uri}").map_err(ExpectedError::write_output)?,
                    None => info!("no schema applies to {resource}"),
                }
            }
            SchemaCommand::Content { uri } => match composer.content(&uri)? {
                Some(content) => {
                    writeln!(stdout, "{content}").map_err(ExpectedError::write_output)?;
                }
                None => warn!("`{uri}` is not a venom schema URI"),
            },
        }

        stdout.flush().map_err(ExpectedError::write_output)?;
        Ok(VenomExplorerExitCode::OK)
    }

    fn exec_version(&self, venom_opts: VenomOpts, output_writer: &mut OutputWriter) -> Result<i32> {
        let settings = venom_opts.apply(self.config.venom_settings());
        let notifier = StderrNotifier::new(self.output.stderr_styles());
        let invoker = VenomInvoker::new(settings, &notifier);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ExpectedError::TokioRuntimeCreateError { err })?;
        let Some((binary, output)) = runtime.block_on(invoker.version()) else {
            return Err(ExpectedError::VenomUnavailable);
        };

        let mut stdout = output_writer.stdout();
        match &output.version {
            Some(version) => writeln!(stdout, "venom {version} ({binary})"),
            None => writeln!(stdout, "venom (unknown version) ({binary})"),
        }
        .and_then(|()| stdout.flush())
        .map_err(ExpectedError::write_output)?;

        if !output.is_supported() {
            warn!("venom-explorer requires venom 1.0 or later");
        }
        Ok(VenomExplorerExitCode::OK)
    }
}

fn final_stats_to_result(stats: RunStats) -> Result<i32> {
    if stats.aborted {
        Err(ExpectedError::VenomUnavailable)
    } else if stats.cancelled {
        Err(ExpectedError::RunCancelled)
    } else if stats.initial_run_count == 0 {
        Err(ExpectedError::NoTestsRun)
    } else if stats.failed > 0 || stats.errored > 0 {
        Err(ExpectedError::TestRunFailed)
    } else {
        Ok(VenomExplorerExitCode::OK)
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let current_dir =
        std::env::current_dir().map_err(|err| ExpectedError::CurrentDirInvalid { err })?;
    Utf8PathBuf::try_from(current_dir).map_err(|err| ExpectedError::CurrentDirInvalid {
        err: err.into_io_error(),
    })
}

fn absolute(current_dir: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        current_dir.join(path)
    }
}
