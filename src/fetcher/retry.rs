//! Retry policy for page requests
//!
//! Retry is modeled as an explicit decision function over (attempt number,
//! classified error) rather than being woven into the request loop, so the
//! policy is unit-testable without any network involvement. Backoff is
//! exponential with full jitter; rate-limit responses honor the source's
//! retry-after hint clamped to a maximum wait.

use crate::fetcher::FetchError;
use rand::Rng;
use std::time::Duration;

/// Default attempt ceiling per page request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default initial backoff.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Default backoff cap.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Default clamp for source-provided retry-after hints.
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Outcome of a retry decision for a failed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after sleeping for the given duration
    Retry(Duration),
    /// Do not retry; the error is fatal or the ceiling was reached
    GiveUp,
}

/// Bounded exponential backoff policy with jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed per page request (first try included)
    pub max_attempts: u32,
    /// Backoff before the second attempt
    pub base_backoff: Duration,
    /// Upper bound for computed backoff
    pub max_backoff: Duration,
    /// Upper bound applied to source retry-after hints
    pub max_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt ceiling and default timings.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed
    /// with `error`.
    pub fn decide(&self, attempt: u32, error: &FetchError) -> RetryDecision {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let delay = match error {
            FetchError::RateLimited {
                retry_after: Some(hint),
            } => {
                // Honor the hint but never wait longer than the clamp, and
                // never less than our own backoff for this attempt.
                let backoff = self.backoff_with_jitter(attempt);
                (*hint).max(backoff).min(self.max_retry_after)
            }
            _ => self.backoff_with_jitter(attempt),
        };

        RetryDecision::Retry(delay)
    }

    /// Exponential backoff capped at `max_backoff`, with full jitter in
    /// `[base_backoff, cap]`.
    fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let cap = self.backoff_upper_bound(attempt);
        let base = self.base_backoff.as_millis() as u64;
        let cap_ms = (cap.as_millis() as u64).max(base);
        let jittered = rand::thread_rng().gen_range(base..=cap_ms);
        Duration::from_millis(jittered)
    }

    /// Deterministic upper bound of the backoff for a given attempt.
    pub fn backoff_upper_bound(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(63);
        let multiplier = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
        let ms = (self.base_backoff.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(ms).min(self.max_backoff)
    }
}
