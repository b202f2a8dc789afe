//! Poll timing configuration
//!
//! A [`PollPolicy`] is built once per assertion call. The presets match the
//! budgets the operator e2e suites use; `from_env` lets CI stretch them on
//! slow clusters without touching test code.

use std::time::Duration;

use tracing::warn;

use crate::Error;

/// Default interval between API polls
pub const DEFAULT_API_INTERVAL: Duration = Duration::from_secs(5);

/// Default budget for API polls (3 minutes)
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(180);

/// Interval between polls while cleaning up test resources
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Budget for cleanup polls
pub const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable overriding the poll interval, in milliseconds
pub const INTERVAL_ENV: &str = "KUBE_CONVERGE_INTERVAL_MS";

/// Environment variable overriding the poll budget, in seconds
pub const TIMEOUT_ENV: &str = "KUBE_CONVERGE_TIMEOUT_SECS";

/// How often to probe and for how long
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    timeout: Duration,
}

impl PollPolicy {
    /// Create a policy, rejecting a zero interval
    ///
    /// A timeout shorter than the interval is allowed but leaves room for a
    /// single probe only, which is almost always a mistake, so it is logged.
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, Error> {
        if interval.is_zero() {
            return Err(Error::invalid_policy("interval must be greater than zero"));
        }
        if timeout < interval {
            warn!(
                interval_ms = millis(interval),
                timeout_ms = millis(timeout),
                "Poll timeout is shorter than the interval, only one probe will run"
            );
        }
        Ok(Self { interval, timeout })
    }

    /// Policy for waiting on API objects to converge
    pub const fn api() -> Self {
        Self {
            interval: DEFAULT_API_INTERVAL,
            timeout: DEFAULT_API_TIMEOUT,
        }
    }

    /// Short policy for test cleanup
    pub const fn cleanup() -> Self {
        Self {
            interval: CLEANUP_INTERVAL,
            timeout: CLEANUP_TIMEOUT,
        }
    }

    /// API policy with overrides from [`INTERVAL_ENV`] and [`TIMEOUT_ENV`]
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let defaults = Self::api();
        let interval = match lookup(INTERVAL_ENV) {
            Some(raw) => Duration::from_millis(parse_u64(INTERVAL_ENV, &raw)?),
            None => defaults.interval,
        };
        let timeout = match lookup(TIMEOUT_ENV) {
            Some(raw) => Duration::from_secs(parse_u64(TIMEOUT_ENV, &raw)?),
            None => defaults.timeout,
        };
        Self::new(interval, timeout)
    }

    /// Same policy with a different interval
    pub fn with_interval(self, interval: Duration) -> Result<Self, Error> {
        Self::new(interval, self.timeout)
    }

    /// Same policy with a different budget
    pub fn with_timeout(self, timeout: Duration) -> Result<Self, Error> {
        Self::new(self.interval, timeout)
    }

    /// Time between probe invocations
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total budget measured from the first probe
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on probe invocations: `ceil(timeout / interval) + 1`
    pub fn max_attempts(&self) -> u32 {
        let interval = self.interval.as_nanos();
        let slots = self.timeout.as_nanos().div_ceil(interval);
        u32::try_from(slots + 1).unwrap_or(u32::MAX)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::api()
    }
}

/// Whole milliseconds for log fields, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, Error> {
    raw.trim()
        .parse()
        .map_err(|e| Error::invalid_policy(format!("{key}={raw:?}: {e}")))
}
