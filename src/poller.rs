//! Bounded polling engine
//!
//! [`poll_until`] drives a [`Probe`] on a fixed interval until it reports
//! [`Outcome::Done`], fails with [`Outcome::Fatal`], or the budget in the
//! [`PollPolicy`] runs out. The first probe runs immediately. Time is measured
//! with `tokio::time::Instant` so paused-clock tests see exact elapsed values.
//!
//! Invocations are bounded by `ceil(timeout / interval) + 1`. When the time
//! left is shorter than one interval no further probe fits, so the poller
//! sleeps out the remainder and reports a timeout. A timeout therefore always
//! arrives after at least `timeout` and at most `timeout + interval`, plus
//! whatever the probes themselves took.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, instrument, trace, warn};

use crate::classify::ClientError;
use crate::policy::{millis, PollPolicy};
use crate::Error;

/// Result of one probe invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Converged, stop with success
    Done,
    /// Not yet, probe again after the interval
    Retry {
        /// What the probe saw, for progress logs and timeout messages
        observed: String,
    },
    /// Can never converge, stop immediately
    Fatal(ClientError),
}

impl Outcome {
    /// Create a retry outcome
    pub fn retry(observed: impl Into<String>) -> Self {
        Self::Retry {
            observed: observed.into(),
        }
    }
}

/// One observation or mutation against the external system
///
/// Implemented for every `FnMut() -> impl Future<Output = Outcome>`, so most
/// callers pass a closure returning an async block.
pub trait Probe {
    /// Future returned by a single invocation
    type Future: Future<Output = Outcome>;

    /// Perform exactly one observation
    fn observe(&mut self) -> Self::Future;
}

impl<F, Fut> Probe for F
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Outcome>,
{
    type Future = Fut;

    fn observe(&mut self) -> Fut {
        self()
    }
}

/// Lifecycle of a single poll call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollState {
    /// No probe has run yet
    Initial,
    /// At least one probe ran and asked to retry
    Polling,
    /// A probe reported `Done`
    Succeeded,
    /// The budget ran out while probes kept asking to retry
    TimedOut,
    /// A probe reported `Fatal`
    Failed,
}

impl PollState {
    /// True for `Succeeded`, `TimedOut` and `Failed`
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Succeeded | PollState::TimedOut | PollState::Failed
        )
    }

    /// Transition after a probe returned `outcome`
    ///
    /// `next_probe_fits` is whether another interval fits in the remaining
    /// budget. Terminal states absorb every further outcome.
    pub fn advance(self, outcome: &Outcome, next_probe_fits: bool) -> Self {
        if self.is_terminal() {
            return self;
        }
        match outcome {
            Outcome::Done => PollState::Succeeded,
            Outcome::Fatal(_) => PollState::Failed,
            Outcome::Retry { .. } if next_probe_fits => PollState::Polling,
            Outcome::Retry { .. } => PollState::TimedOut,
        }
    }
}

/// Summary of a successful poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollReport {
    /// Number of probe invocations, including the final one
    pub attempts: u32,
    /// Number of `Retry` outcomes, each logged as "still waiting"
    pub waits: u32,
    /// Time from the first probe until convergence was observed
    pub elapsed: Duration,
}

/// Drive `probe` until it converges, fails, or the budget runs out
///
/// `target` names what is being observed and ends up in log lines and errors.
#[instrument(skip_all, fields(object = %target))]
pub async fn poll_until<P: Probe>(
    policy: &PollPolicy,
    target: &str,
    mut probe: P,
) -> Result<PollReport, Error> {
    let start = Instant::now();
    let mut state = PollState::Initial;
    let mut attempts = 0u32;
    let mut waits = 0u32;

    loop {
        attempts += 1;
        let outcome = probe.observe().await;
        let elapsed = start.elapsed();
        let remaining = policy.timeout().saturating_sub(elapsed);
        state = state.advance(&outcome, remaining >= policy.interval());
        trace!(attempt = attempts, ?outcome, ?state, "Probe returned");

        match outcome {
            Outcome::Done => {
                debug!(
                    attempts,
                    elapsed_ms = millis(elapsed),
                    "Converged"
                );
                return Ok(PollReport {
                    attempts,
                    waits,
                    elapsed,
                });
            }
            Outcome::Fatal(e) => {
                warn!(attempt = attempts, error = %e, "Probe failed, giving up");
                return Err(Error::fatal(target, e));
            }
            Outcome::Retry { observed } => {
                if state == PollState::TimedOut {
                    if !remaining.is_zero() {
                        tokio::time::sleep(remaining).await;
                    }
                    warn!(
                        attempts,
                        observed = %observed,
                        timeout_ms = millis(policy.timeout()),
                        "Timed out waiting for {}",
                        target
                    );
                    return Err(Error::timeout(
                        target,
                        policy.timeout(),
                        attempts,
                        Some(observed),
                    ));
                }

                waits += 1;
                info!(
                    attempt = attempts,
                    observed = %observed,
                    "Still waiting for {}",
                    target
                );
                tokio::time::sleep(policy.interval()).await;
            }
        }
    }
}
