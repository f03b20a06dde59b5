// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use owo_colors::OwoColorize;
use tracing::{error, info, warn};
use venom_runner::invoker::{Notification, Notifier};

/// Shows notifications about the venom environment on stderr, through the logger.
#[derive(Debug)]
pub(crate) struct StderrNotifier {
    styles: StderrStyles,
}

impl StderrNotifier {
    pub(crate) fn new(styles: StderrStyles) -> Self {
        Self { styles }
    }
}

impl Notifier for StderrNotifier {
    fn notify(&self, notification: Notification<'_>) {
        match notification {
            Notification::BinaryNotFound { error, actions } => {
                error!("{error}");
                for action in actions {
                    info!(
                        target: NO_HEADING_TARGET,
                        "  {}: {}",
                        action.label().style(self.styles.bold),
                        action.target().style(self.styles.link),
                    );
                }
            }
            Notification::UnsupportedVersion {
                binary,
                version,
                blocking,
            } => {
                let version = version.map_or_else(|| "unknown".to_owned(), ToString::to_string);
                let message = format!(
                    "venom at `{}` reports version {}, venom-explorer requires venom 1.0 or later",
                    binary.style(self.styles.bold),
                    version.style(self.styles.bold),
                );
                if blocking {
                    error!("{message}");
                } else {
                    warn!("{message} (running anyway, set venom.version-check = \"deny\" to abort)");
                }
            }
        }
    }
}
