// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning shutdown signals into run cancellation.
//!
//! A signal never interrupts a venom process that has already started. It only cancels the
//! run's [`CancelToken`], which the runner checks between files.

use crate::{errors::SignalHandlerSetupError, runner::CancelToken};
use std::fmt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The kind of signal handling to set up for a test run.
///
/// A `SignalHandlerKind` can be passed into [`TestRunner::new`](crate::runner::TestRunner::new).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SignalHandlerKind {
    /// Cancel on Ctrl-C, and on SIGTERM and SIGHUP on Unix.
    Standard,

    /// Ignore signals. Useful for tests.
    Noop,
}

impl SignalHandlerKind {
    /// Starts watching for shutdown signals on the current Tokio runtime. Each one cancels
    /// `token`.
    ///
    /// Watching stops when the returned guard is dropped.
    pub(crate) fn watch(
        self,
        token: &CancelToken,
    ) -> Result<ShutdownWatch, SignalHandlerSetupError> {
        let mut tasks = Vec::new();
        if self == Self::Standard {
            for (event, mut stream) in imp::shutdown_streams()? {
                let token = token.clone();
                tasks.push(tokio::spawn(async move {
                    // A closed stream can't deliver the signal anymore.
                    if stream.recv().await.is_some() {
                        warn!("received {event}, cancelling run after the current file");
                        token.cancel();
                    }
                }));
            }
        }
        debug!("watching {} shutdown signals", tasks.len());
        Ok(ShutdownWatch { tasks })
    }
}

/// Stops the signal watchers of a run when dropped.
#[derive(Debug)]
pub(crate) struct ShutdownWatch {
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for ShutdownWatch {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(unix)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::unix::{Signal, SignalKind, signal};

    pub(super) fn shutdown_streams() -> std::io::Result<Vec<(ShutdownEvent, Signal)>> {
        [
            (ShutdownEvent::Interrupt, SignalKind::interrupt()),
            (ShutdownEvent::Term, SignalKind::terminate()),
            (ShutdownEvent::Hangup, SignalKind::hangup()),
        ]
        .into_iter()
        .map(|(event, kind)| Ok((event, signal(kind)?)))
        .collect()
    }
}

#[cfg(windows)]
mod imp {
    use super::ShutdownEvent;
    use tokio::signal::windows::{CtrlC, ctrl_c};

    pub(super) fn shutdown_streams() -> std::io::Result<Vec<(ShutdownEvent, CtrlC)>> {
        Ok(vec![(ShutdownEvent::Interrupt, ctrl_c()?)])
    }
}

/// A signal that cancels the run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ShutdownEvent {
    Interrupt,
    #[cfg(unix)]
    Term,
    #[cfg(unix)]
    Hangup,
}

impl fmt::Display for ShutdownEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "interrupt"),
            #[cfg(unix)]
            Self::Term => write!(f, "SIGTERM"),
            #[cfg(unix)]
            Self::Hangup => write!(f, "SIGHUP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_watches_nothing() {
        let token = CancelToken::new();
        let watch = SignalHandlerKind::Noop.watch(&token).unwrap();
        assert!(watch.tasks.is_empty());
        drop(watch);
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_the_guard_stops_watchers() {
        let token = CancelToken::new();
        let watch = SignalHandlerKind::Standard.watch(&token).unwrap();
        assert!(!watch.tasks.is_empty());

        let handles: Vec<_> = watch.tasks.iter().map(JoinHandle::abort_handle).collect();
        drop(watch);
        for _ in 0..100 {
            if handles.iter().all(|handle| handle.is_finished()) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handles.iter().all(|handle| handle.is_finished()));
        assert!(!token.is_cancelled());
    }
}
