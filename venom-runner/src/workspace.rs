// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-workspace state: venom's `.venomrc` configuration and the custom executors it implies.
//!
//! A [`WorkspaceContext`] holds the state of every open workspace folder. It is mutated only
//! through [`open`](WorkspaceContext::open), [`close`](WorkspaceContext::close) and
//! [`handle_event`](WorkspaceContext::handle_event), and read by the
//! [`SchemaComposer`](crate::schema::SchemaComposer) and the [`TestTree`](crate::tree::TestTree).

use crate::{
    config::TestSuiteMatcher,
    errors::{DisplayErrorChain, WorkspaceFileError},
    helpers::{is_inside_dir, prefix_depth},
};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::{collections::BTreeMap, io};
use tracing::{debug, info, warn};
use venom_metadata::{CustomExecutorFile, WorkspaceConfigFile};
use walkdir::WalkDir;

/// The extension of custom executor files within the library directory.
const CUSTOM_EXECUTOR_EXTENSION: &str = "yml";

/// The kind of a [`FsEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsEventKind {
    /// A file was created.
    Created,
    /// A file's contents changed.
    Changed,
    /// A file was deleted.
    Deleted,
}

/// A file-system change, as reported by a watcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsEvent {
    /// What happened.
    pub kind: FsEventKind,
    /// The absolute path of the affected file.
    pub path: Utf8PathBuf,
}

impl FsEvent {
    /// Creates a new event.
    pub fn new(kind: FsEventKind, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// A custom executor declared by a file in a workspace's library directory.
#[derive(Clone, Debug, PartialEq)]
pub struct CustomExecutorDefinition {
    /// The executor name, used as the step `type`.
    pub executor: String,

    /// The declared inputs. Only the keys matter for schema composition.
    pub input: IndexMap<String, serde_json::Value>,
}

impl From<CustomExecutorFile> for CustomExecutorDefinition {
    fn from(file: CustomExecutorFile) -> Self {
        Self {
            executor: file.executor,
            input: file.input,
        }
    }
}

/// The state of a single open workspace folder.
#[derive(Clone, Debug)]
pub struct WorkspaceState {
    root: Utf8PathBuf,
    config: WorkspaceConfigFile,
    custom_executors: BTreeMap<Utf8PathBuf, CustomExecutorDefinition>,
}

impl WorkspaceState {
    fn load(root: Utf8PathBuf) -> Self {
        let mut state = Self {
            root,
            config: WorkspaceConfigFile::default(),
            custom_executors: BTreeMap::new(),
        };
        state.reload_config();
        state
    }

    /// Returns the root of the workspace folder.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the parsed `.venomrc` file, or the defaults if there is none.
    pub fn config(&self) -> &WorkspaceConfigFile {
        &self.config
    }

    /// Returns the absolute path of the library directory.
    pub fn lib_dir(&self) -> Utf8PathBuf {
        self.root.join(self.config.lib_dir())
    }

    /// Returns the path of the `.venomrc` file.
    pub fn config_path(&self) -> Utf8PathBuf {
        self.root.join(WorkspaceConfigFile::FILE_NAME)
    }

    /// Returns the custom executors of this workspace, ordered by file path.
    pub fn custom_executors(&self) -> impl ExactSizeIterator<Item = &CustomExecutorDefinition> {
        self.custom_executors.values()
    }

    /// Returns true if `path` is a custom executor file of this workspace.
    pub fn is_custom_executor_file(&self, path: &Utf8Path) -> bool {
        path.extension() == Some(CUSTOM_EXECUTOR_EXTENSION) && is_inside_dir(path, &self.lib_dir())
    }

    fn reload_config(&mut self) {
        let config_path = self.config_path();
        self.config = match read_yaml::<WorkspaceConfigFile>(&config_path) {
            Ok(Some(config)) => {
                info!("loaded {config_path}");
                config
            }
            Ok(None) => WorkspaceConfigFile::default(),
            Err(err) => {
                warn!("{}, using defaults", DisplayErrorChain::new(err));
                WorkspaceConfigFile::default()
            }
        };
        self.discover_custom_executors();
    }

    fn discover_custom_executors(&mut self) {
        self.custom_executors.clear();
        let lib_dir = self.lib_dir();
        if !lib_dir.is_dir() {
            debug!("library directory {lib_dir} doesn't exist");
            return;
        }

        for entry in WalkDir::new(&lib_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("error walking {lib_dir}: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
                continue;
            };
            if path.extension() == Some(CUSTOM_EXECUTOR_EXTENSION) {
                self.load_custom_executor(path);
            }
        }
    }

    fn load_custom_executor(&mut self, path: Utf8PathBuf) {
        match read_yaml::<CustomExecutorFile>(&path) {
            Ok(Some(file)) => {
                info!("loaded custom executor `{}` from {path}", file.executor);
                self.custom_executors.insert(path, file.into());
            }
            Ok(None) => {
                self.custom_executors.remove(&path);
            }
            Err(err) => {
                warn!("{}, skipping custom executor", DisplayErrorChain::new(err));
                self.custom_executors.remove(&path);
            }
        }
    }

    fn handle_event(&mut self, event: &FsEvent) -> bool {
        if event.path == self.config_path() {
            debug!("{} {:?}, reloading", event.path, event.kind);
            self.reload_config();
            return true;
        }

        if !self.is_custom_executor_file(&event.path) {
            return false;
        }
        debug!("custom executor {} {:?}", event.path, event.kind);
        match event.kind {
            FsEventKind::Created | FsEventKind::Changed => {
                self.load_custom_executor(event.path.clone());
            }
            FsEventKind::Deleted => {
                self.custom_executors.remove(&event.path);
            }
        }
        true
    }
}

/// The state of all open workspace folders.
#[derive(Clone, Debug, Default)]
pub struct WorkspaceContext {
    workspaces: BTreeMap<Utf8PathBuf, WorkspaceState>,
}

impl WorkspaceContext {
    /// Creates a context with no open workspaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the workspace folder at `root`, loading its `.venomrc` and custom executors.
    ///
    /// Opening a workspace that is already open reloads it.
    pub fn open(&mut self, root: impl Into<Utf8PathBuf>) -> &WorkspaceState {
        let root = root.into();
        let state = WorkspaceState::load(root.clone());
        self.workspaces.insert(root.clone(), state);
        &self.workspaces[&root]
    }

    /// Closes the workspace folder at `root`, dropping its state. Returns false if it wasn't open.
    pub fn close(&mut self, root: &Utf8Path) -> bool {
        self.workspaces.remove(root).is_some()
    }

    /// Returns the state of the workspace folder rooted at `root`.
    pub fn get(&self, root: &Utf8Path) -> Option<&WorkspaceState> {
        self.workspaces.get(root)
    }

    /// Returns the roots of all open workspace folders.
    pub fn roots(&self) -> impl ExactSizeIterator<Item = &Utf8Path> {
        self.workspaces.keys().map(|root| root.as_path())
    }

    /// Returns the state of all open workspace folders.
    pub fn workspaces(&self) -> impl ExactSizeIterator<Item = &WorkspaceState> {
        self.workspaces.values()
    }

    /// Returns the innermost open workspace folder that contains `path`.
    pub fn owning_workspace(&self, path: &Utf8Path) -> Option<&WorkspaceState> {
        self.workspaces
            .values()
            .filter_map(|state| prefix_depth(path, &state.root).map(|depth| (depth, state)))
            .max_by_key(|(depth, _)| *depth)
            .map(|(_, state)| state)
    }

    /// Returns true if `path` is a test suite file according to `matcher`.
    ///
    /// Paths inside a workspace folder are matched relative to it, other paths by file name.
    pub fn is_test_suite(&self, matcher: &TestSuiteMatcher, path: &Utf8Path) -> bool {
        match self.owning_workspace(path) {
            Some(workspace) => path
                .strip_prefix(workspace.root())
                .is_ok_and(|relative| matcher.is_match(relative)),
            None => path
                .file_name()
                .is_some_and(|name| matcher.is_match(Utf8Path::new(name))),
        }
    }

    /// Applies a file-system change. Returns true if any workspace state changed.
    pub fn handle_event(&mut self, event: &FsEvent) -> bool {
        let Some(root) = self
            .owning_workspace(&event.path)
            .map(|state| state.root.clone())
        else {
            return false;
        };
        self.workspaces
            .get_mut(&root)
            .is_some_and(|state| state.handle_event(event))
    }
}

/// Reads and parses a YAML file. Returns `Ok(None)` if the file doesn't exist.
pub(crate) fn read_yaml<T: DeserializeOwned>(
    path: &Utf8Path,
) -> Result<Option<T>, WorkspaceFileError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(WorkspaceFileError::read(path, err)),
    };
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|err| WorkspaceFileError::parse(path, err))
}
