// Copyright (c) The venom-explorer Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Elapsed-time measurement for runs and for individual test suite files.

use std::time::{Duration, Instant};

/// Measures elapsed time on the monotonic clock.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timer {
    started: Instant,
}

impl Timer {
    pub(crate) fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Whole milliseconds in `duration`, as written to machine-readable summaries.
pub(crate) fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn elapsed_grows() {
        let timer = Timer::start();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert!(timer.elapsed() >= first + Duration::from_millis(20));
    }

    #[test_case(Duration::ZERO, 0 ; "zero")]
    #[test_case(Duration::from_micros(1999), 1 ; "truncates")]
    #[test_case(Duration::from_secs(3), 3000 ; "seconds")]
    #[test_case(Duration::MAX, u64::MAX ; "saturates")]
    fn millis(duration: Duration, expected: u64) {
        assert_eq!(whole_millis(duration), expected);
    }
}
