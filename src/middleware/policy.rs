//! Lifetime selection by response outcome.

use std::time::Duration;

use axum::http::StatusCode;

// == Lifetime Policy ==
/// Chooses how long a captured response is kept.
///
/// Statuses below 400 get the success lifetime; 400 and above get the
/// negative lifetime, normally much shorter so error responses go stale
/// quickly while still damping retry storms. A zero lifetime switches off
/// caching for that class of outcome instead of being handed to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimePolicy {
    success: Option<Duration>,
    negative: Option<Duration>,
}

impl LifetimePolicy {
    pub fn new(success: Duration, negative: Duration) -> Self {
        Self {
            success: non_zero(success),
            negative: non_zero(negative),
        }
    }

    /// Builds a policy from signed second counts; zero or less disables.
    pub fn from_secs(success: i64, negative: i64) -> Self {
        Self {
            success: positive_secs(success),
            negative: positive_secs(negative),
        }
    }

    /// Lifetime for a response with `status`, `None` when it must not be cached.
    pub fn lifetime_for(&self, status: StatusCode) -> Option<Duration> {
        if status.as_u16() < 400 {
            self.success
        } else {
            self.negative
        }
    }

    pub fn success(&self) -> Option<Duration> {
        self.success
    }

    pub fn negative(&self) -> Option<Duration> {
        self.negative
    }
}

fn non_zero(lifetime: Duration) -> Option<Duration> {
    (!lifetime.is_zero()).then_some(lifetime)
}

fn positive_secs(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
