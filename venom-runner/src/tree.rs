// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The tree of discovered test suite files.
//!
//! The tree mirrors the directory structure of each workspace folder: the top-level groups are
//! the workspace folders, nested groups are directories, and leaves are test suite files. Files
//! outside every workspace folder sit directly under the root.
//!
//! Each file node caches the raw text of the file at discovery time. This snapshot is what
//! failure locations are mapped onto, so it can lag behind the file on disk until the next
//! refresh.

use crate::{
    config::TestSuiteMatcher,
    helpers::{file_uri, plural},
    workspace::{FsEvent, FsEventKind, WorkspaceContext},
};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use venom_metadata::{TestNodeKind, TestNodeSummary, TestSuiteFile, TestTreeSummary};
use walkdir::WalkDir;

/// A test suite file in the tree.
#[derive(Clone, Debug)]
pub struct TestFileRecord {
    id: String,
    path: Utf8PathBuf,
    label: String,
    raw_text: String,
    suite: Option<TestSuiteFile>,
}

impl TestFileRecord {
    /// Reads and parses the file at `path`.
    ///
    /// A file that can't be read is cached with empty text. A file that can't be parsed is
    /// cached without a suite. Both cases log a warning.
    pub fn load(path: &Utf8Path) -> Self {
        let (raw_text, suite) = match std::fs::read_to_string(path) {
            Ok(raw_text) => {
                let suite = match serde_yaml::from_str::<TestSuiteFile>(&raw_text) {
                    Ok(suite) => Some(suite),
                    Err(err) => {
                        warn!("failed to parse test suite {path}: {err}");
                        None
                    }
                };
                (raw_text, suite)
            }
            Err(err) => {
                warn!("failed to read file {path}: {err}");
                (String::new(), None)
            }
        };

        Self::new(path, raw_text, suite)
    }

    fn new(path: &Utf8Path, raw_text: String, suite: Option<TestSuiteFile>) -> Self {
        Self {
            id: file_uri(path),
            path: path.to_owned(),
            label: path.file_name().unwrap_or(path.as_str()).to_owned(),
            raw_text,
            suite,
        }
    }

    /// Returns the stable identity of this file: its `file://` URI.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the absolute path of the file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the display name of the file.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the text of the file, as of the last refresh.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Returns the parsed test suite, if the file could be parsed.
    pub fn suite(&self) -> Option<&TestSuiteFile> {
        self.suite.as_ref()
    }

    /// Returns the name the suite declares for itself.
    pub fn description(&self) -> Option<&str> {
        self.suite.as_ref()?.name.as_deref()
    }

    fn summary(&self) -> TestNodeSummary {
        TestNodeSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            kind: TestNodeKind::File,
            path: Some(self.path.clone()),
            description: self.description().map(str::to_owned),
            testcase_count: self.suite.as_ref().map(|suite| suite.testcases.len()),
            children: Vec::new(),
        }
    }
}

/// A directory in the tree: a workspace folder or one of its subdirectories.
#[derive(Clone, Debug, Default)]
pub struct TestGroup {
    id: String,
    label: String,
    groups: BTreeMap<String, TestGroup>,
    files: BTreeMap<String, TestFileRecord>,
}

impl TestGroup {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            ..Default::default()
        }
    }

    /// Returns the identity of this group: the absolute path of its directory. The root of the
    /// tree has an empty id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the display name of this group.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the child groups, ordered by id.
    pub fn groups(&self) -> impl ExactSizeIterator<Item = &TestGroup> {
        self.groups.values()
    }

    /// Returns the files directly in this group, ordered by id.
    pub fn files(&self) -> impl ExactSizeIterator<Item = &TestFileRecord> {
        self.files.values()
    }

    /// Returns true if this group has no children.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.files.is_empty()
    }

    /// Returns all files under this group: child groups first, then files, depth-first.
    pub fn leaves(&self) -> Vec<&TestFileRecord> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a TestFileRecord>) {
        for group in self.groups.values() {
            group.collect_leaves(leaves);
        }
        leaves.extend(self.files.values());
    }

    // Find-or-create: inserting the same id twice returns the existing group.
    fn group_entry(&mut self, id: &str, label: &str) -> &mut TestGroup {
        self.groups
            .entry(id.to_owned())
            .or_insert_with(|| TestGroup::new(id, label))
    }

    fn find(&self, id: &str) -> Option<TestNode<'_>> {
        if self.id == id {
            return Some(TestNode::Group(self));
        }
        if let Some(file) = self.files.get(id) {
            return Some(TestNode::File(file));
        }
        self.groups.values().find_map(|group| group.find(id))
    }

    fn remove_file(&mut self, id: &str) -> bool {
        if self.files.remove(id).is_some() {
            return true;
        }
        let Some((key, emptied)) = self
            .groups
            .iter_mut()
            .find_map(|(key, group)| group.remove_file(id).then(|| (key.clone(), group.is_empty())))
        else {
            return false;
        };
        if emptied {
            self.groups.remove(&key);
        }
        true
    }

    fn summary(&self) -> TestNodeSummary {
        TestNodeSummary {
            id: self.id.clone(),
            label: self.label.clone(),
            kind: TestNodeKind::Group,
            path: Some(Utf8PathBuf::from(&self.id)),
            description: None,
            testcase_count: None,
            children: self.children_summary(),
        }
    }

    fn children_summary(&self) -> Vec<TestNodeSummary> {
        self.groups
            .values()
            .map(TestGroup::summary)
            .chain(self.files.values().map(TestFileRecord::summary))
            .collect()
    }
}

/// A node in the tree.
#[derive(Clone, Copy, Debug)]
pub enum TestNode<'a> {
    /// A directory.
    Group(&'a TestGroup),
    /// A test suite file.
    File(&'a TestFileRecord),
}

impl<'a> TestNode<'a> {
    /// Returns the identity of this node.
    pub fn id(&self) -> &'a str {
        match self {
            Self::Group(group) => group.id(),
            Self::File(file) => file.id(),
        }
    }

    /// Returns the files to run for this node. A file is its own only leaf.
    pub fn leaves(&self) -> Vec<&'a TestFileRecord> {
        match self {
            Self::Group(group) => group.leaves(),
            Self::File(file) => vec![file],
        }
    }
}

/// The tree of discovered test suite files.
#[derive(Clone, Debug)]
pub struct TestTree {
    root: TestGroup,
    matcher: TestSuiteMatcher,
}

impl TestTree {
    /// Creates an empty tree. Files are recognized as test suites with `matcher`.
    pub fn new(matcher: TestSuiteMatcher) -> Self {
        Self {
            root: TestGroup::default(),
            matcher,
        }
    }

    /// Returns the root of the tree.
    pub fn root(&self) -> &TestGroup {
        &self.root
    }

    /// Returns the number of files in the tree.
    pub fn file_count(&self) -> usize {
        self.root.leaves().len()
    }

    /// Returns true if `path` is a test suite file.
    ///
    /// Paths inside a workspace folder are matched relative to it. Other paths are matched by
    /// file name.
    pub fn is_test_suite(&self, context: &WorkspaceContext, path: &Utf8Path) -> bool {
        context.is_test_suite(&self.matcher, path)
    }

    /// Returns the node for the file at `path`, loading it if needed.
    ///
    /// With `force_refresh`, an existing node is dropped and loaded again.
    pub fn get_or_create_file(
        &mut self,
        context: &WorkspaceContext,
        path: &Utf8Path,
        force_refresh: bool,
    ) -> &TestFileRecord {
        let id = file_uri(path);
        let parent = self.parent_group_mut(context, path);
        if force_refresh {
            parent.files.remove(&id);
        }
        parent
            .files
            .entry(id)
            .or_insert_with(|| TestFileRecord::load(path))
    }

    /// Discovers the test suite files of every open workspace folder.
    ///
    /// With `force_refresh`, files that are already in the tree are loaded again. Returns the
    /// number of files found.
    pub fn discover(&mut self, context: &WorkspaceContext, force_refresh: bool) -> usize {
        let mut found = 0;
        for workspace in context.workspaces() {
            let root = workspace.root();
            let walker = WalkDir::new(root)
                .sort_by_file_name()
                .into_iter()
                // Hidden directories (.git and the like) never hold suites.
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || !entry.file_type().is_dir()
                        || !entry.file_name().to_string_lossy().starts_with('.')
                });

            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!("error walking {root}: {err}");
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let Ok(path) = Utf8PathBuf::try_from(entry.into_path()) else {
                    continue;
                };
                if self.is_test_suite(context, &path) {
                    self.get_or_create_file(context, &path, force_refresh);
                    found += 1;
                }
            }
        }

        debug!("discovered {found} test suite {}", plural::files_str(found));
        found
    }

    /// Reloads every file of every open workspace folder.
    pub fn refresh_all(&mut self, context: &WorkspaceContext) -> usize {
        self.discover(context, true)
    }

    /// Removes the file at `path`, pruning groups left empty. Returns false if it wasn't in the
    /// tree.
    pub fn remove_file(&mut self, path: &Utf8Path) -> bool {
        self.root.remove_file(&file_uri(path))
    }

    /// Removes the group of a workspace folder that was closed.
    pub fn remove_workspace(&mut self, root: &Utf8Path) -> bool {
        self.root.groups.remove(root.as_str()).is_some()
    }

    /// Applies a file-system change. Returns true if the tree changed.
    pub fn handle_event(&mut self, context: &WorkspaceContext, event: &FsEvent) -> bool {
        if !self.is_test_suite(context, &event.path) {
            return false;
        }
        debug!("test suite {} {:?}", event.path, event.kind);
        match event.kind {
            FsEventKind::Created => {
                self.get_or_create_file(context, &event.path, false);
                true
            }
            FsEventKind::Changed => {
                self.get_or_create_file(context, &event.path, true);
                true
            }
            FsEventKind::Deleted => self.remove_file(&event.path),
        }
    }

    /// Called when a document is opened or edited: reloads its node if it is a test suite.
    pub fn sync_document(
        &mut self,
        context: &WorkspaceContext,
        path: &Utf8Path,
    ) -> Option<&TestFileRecord> {
        if !self.is_test_suite(context, path) {
            return None;
        }
        Some(self.get_or_create_file(context, path, true))
    }

    /// Looks up a node by id.
    pub fn find(&self, id: &str) -> Option<TestNode<'_>> {
        self.root.find(id)
    }

    /// Looks up the node for a file or directory path.
    pub fn find_by_path(&self, path: &Utf8Path) -> Option<TestNode<'_>> {
        let path = path.as_str().trim_end_matches(['/', '\\']);
        if path.is_empty() {
            return None;
        }
        let path = Utf8Path::new(path);
        self.find(&file_uri(path)).or_else(|| self.find(path.as_str()))
    }

    /// Returns all files in the tree, depth-first.
    pub fn leaves(&self) -> Vec<&TestFileRecord> {
        self.root.leaves()
    }

    /// Returns a serializable summary of the tree.
    pub fn summary(&self) -> TestTreeSummary {
        TestTreeSummary {
            roots: self.root.children_summary(),
        }
    }

    fn parent_group_mut(&mut self, context: &WorkspaceContext, path: &Utf8Path) -> &mut TestGroup {
        let Some(workspace) = context.owning_workspace(path) else {
            return &mut self.root;
        };
        let root = workspace.root();
        let Ok(relative) = path.strip_prefix(root) else {
            return &mut self.root;
        };

        let mut group_path = root.to_owned();
        let mut group = self
            .root
            .group_entry(root.as_str(), root.file_name().unwrap_or(root.as_str()));
        let dirs = relative.parent().map(Utf8Path::components).into_iter().flatten();
        for component in dirs {
            if let Utf8Component::Normal(dir) = component {
                group_path.push(dir);
                group = group.group_entry(group_path.as_str(), dir);
            }
        }
        group
    }
}
