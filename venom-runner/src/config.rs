// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for venom-explorer.
//!
//! Configuration is read from `.config/venom-explorer.toml` in the workspace root, layered on top
//! of the default config embedded in the binary. The per-workspace `.venomrc` file is venom's
//! own configuration and is handled by [`WorkspaceContext`](crate::workspace::WorkspaceContext).

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use globset::{GlobBuilder, GlobMatcher};
use serde::Deserialize;

/// Overall configuration for venom-explorer.
#[derive(Clone, Debug)]
pub struct ExplorerConfig {
    workspace_root: Utf8PathBuf,
    inner: ExplorerConfigImpl,
    test_suite_matcher: TestSuiteMatcher,
}

impl ExplorerConfig {
    /// The default location of the config within the workspace root.
    pub const CONFIG_PATH: &'static str = ".config/venom-explorer.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from the given file, or if not specified from
    /// `.config/venom-explorer.toml` in the workspace root.
    ///
    /// If no config file is specified and the workspace doesn't have one, uses the default
    /// config options.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        let test_suite_matcher = TestSuiteMatcher::new(&inner.discovery.test_suite_pattern)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            workspace_root,
            inner,
            test_suite_matcher,
        })
    }

    /// Returns the default config.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let inner = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        let test_suite_matcher = TestSuiteMatcher::new(&inner.discovery.test_suite_pattern)
            .expect("default test suite pattern is always valid");
        Self {
            workspace_root: workspace_root.into(),
            inner,
            test_suite_matcher,
        }
    }

    /// Returns the workspace root this config was read for.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the settings used to locate and invoke venom.
    pub fn venom_settings(&self) -> VenomSettings {
        VenomSettings {
            binary: self.inner.venom.binary.clone(),
            additional_run_args: self.inner.venom.additional_run_args.clone(),
            version_check: self.inner.venom.version_check,
        }
    }

    /// Returns the matcher for test suite files.
    pub fn test_suite_matcher(&self) -> &TestSuiteMatcher {
        &self.test_suite_matcher
    }

    /// Returns the absolute directory to load base schemas from, if one is configured.
    pub fn schema_dir(&self) -> Option<Utf8PathBuf> {
        self.inner
            .schema
            .dir
            .as_ref()
            .map(|dir| self.workspace_root.join(dir))
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<ExplorerConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|err| ConfigParseErrorKind::BuildError(Box::new(err)))?;

        serde_path_to_error::deserialize(config)
            .map_err(|err| ConfigParseErrorKind::DeserializeError(Box::new(err)))
    }
}

/// Settings used to locate and invoke venom.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VenomSettings {
    /// The venom binary: a name looked up on the search path, or a path.
    pub binary: String,

    /// Extra arguments passed to `venom run`, before the test suite file.
    pub additional_run_args: Vec<String>,

    /// What to do when venom reports an unsupported version.
    pub version_check: VersionCheck,
}

impl Default for VenomSettings {
    fn default() -> Self {
        Self {
            binary: "venom".to_owned(),
            additional_run_args: Vec::new(),
            version_check: VersionCheck::Warn,
        }
    }
}

/// What to do when venom reports an unsupported version.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VersionCheck {
    /// Report the problem to the user, then run anyway.
    #[default]
    Warn,

    /// Report the problem to the user and abort the run.
    Deny,
}

/// Matches test suite files by their path relative to a workspace folder.
#[derive(Clone, Debug)]
pub struct TestSuiteMatcher {
    pattern: String,
    matcher: GlobMatcher,
}

impl TestSuiteMatcher {
    fn new(pattern: &str) -> Result<Self, ConfigParseErrorKind> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|err| ConfigParseErrorKind::InvalidPattern {
                pattern: pattern.to_owned(),
                err,
            })?;
        Ok(Self {
            pattern: pattern.to_owned(),
            matcher: glob.compile_matcher(),
        })
    }

    /// Returns the glob pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns true if `relative_path` (relative to a workspace folder) is a test suite file.
    pub fn is_match(&self, relative_path: &Utf8Path) -> bool {
        self.matcher.is_match(relative_path.as_std_path())
    }
}

impl Default for TestSuiteMatcher {
    fn default() -> Self {
        Self::new("**/*.venom.yml").expect("default test suite pattern is valid")
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ExplorerConfigImpl {
    venom: VenomConfigImpl,
    discovery: DiscoveryConfigImpl,
    #[serde(default)]
    schema: SchemaConfigImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct VenomConfigImpl {
    binary: String,
    #[serde(default)]
    additional_run_args: Vec<String>,
    #[serde(default)]
    version_check: VersionCheck,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DiscoveryConfigImpl {
    test_suite_pattern: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SchemaConfigImpl {
    #[serde(default)]
    dir: Option<Utf8PathBuf>,
}
