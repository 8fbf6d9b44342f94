//! Poll a condition until it holds or the time budget runs out.
//!
//! A poll moves through four states:
//!
//! ```text
//!             probe Ok(Some)
//! Evaluating ---------------> Succeeded
//!     |  ^    probe Err
//!     |  +--- sleep ---+----> Failed
//!     |                |
//!     +-- Ok(None) ----+----> TimedOut (budget spent)
//! ```
//!
//! Only an unsatisfied probe leads to another evaluation. A probe error is
//! terminal. With a zero timeout the probe runs exactly once.

use std::thread;
use std::time::{Duration, Instant};

use sqlgate_result::Error;

use crate::config::GatewayConfig;

/// Terminal state of a poll.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Succeeded { value: T, attempts: u32 },
    TimedOut { elapsed: Duration, attempts: u32 },
    Failed { error: Error, attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Succeeded { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Poller {
    timeout: Duration,
    interval: Duration,
}

impl Poller {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.poll_timeout, config.poll_interval)
    }

    /// Run `probe` until it yields `Some`, fails, or the timeout elapses.
    ///
    /// Sleeps never overshoot the deadline: the last pause is cut to the
    /// remaining budget and followed by one final evaluation.
    pub fn run<T, F>(&self, mut probe: F) -> PollOutcome<T>
    where
        F: FnMut() -> sqlgate_result::Result<Option<T>>,
    {
        let started = Instant::now();
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match probe() {
                Ok(Some(value)) => {
                    tracing::debug!("[POLL] satisfied after {attempts} attempt(s)");
                    return PollOutcome::Succeeded { value, attempts };
                }
                Err(error) => {
                    tracing::debug!("[POLL] attempt {attempts} failed: {error}");
                    return PollOutcome::Failed { error, attempts };
                }
                Ok(None) => {}
            }

            let elapsed = started.elapsed();
            if self.timeout.is_zero() || elapsed >= self.timeout {
                tracing::debug!(
                    "[POLL] timed out after {attempts} attempt(s), {} ms",
                    elapsed.as_millis()
                );
                return PollOutcome::TimedOut { elapsed, attempts };
            }
            let pause = self.interval.min(self.timeout - elapsed);
            tracing::trace!(
                "[POLL] attempt {attempts} unsatisfied, sleeping {} ms",
                pause.as_millis()
            );
            thread::sleep(pause);
        }
    }
}
