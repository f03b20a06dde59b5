// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::Context;

/// A workspace folder in a temporary directory, populated file by file.
#[derive(Debug)]
pub struct TempWorkspace {
    _temp_dir: Utf8TempDir,
    root: Utf8PathBuf,
}

impl TempWorkspace {
    pub fn new() -> color_eyre::Result<Self> {
        let temp_dir = camino_tempfile::Builder::new()
            .prefix("venom-explorer-fixture-")
            .tempdir()?;
        // Resolve symlinks such as /var -> /private/var on macOS, so that paths printed by the
        // binary match the ones built here.
        let root = temp_dir
            .path()
            .canonicalize_utf8()
            .wrap_err("failed to canonicalize temp dir")?;
        Ok(Self {
            _temp_dir: temp_dir,
            root,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes `contents` to `rel_path`, creating parent directories as needed.
    pub fn write(&self, rel_path: &str, contents: &str) -> color_eyre::Result<Utf8PathBuf> {
        let path = self.root.join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("failed to create {parent}"))?;
        }
        std::fs::write(&path, contents).wrap_err_with(|| format!("failed to write {path}"))?;
        Ok(path)
    }
}
