//! Rate-limit gate driven by `Retry-After`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

/// Parses a `Retry-After` header value relative to `now`.
///
/// Accepts non-negative delta-seconds (`"120"`) or an HTTP-date
/// (`"Wed, 21 Oct 2015 07:28:00 GMT"`). Anything else, including a delay
/// too large to represent, yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .ok()
            .and_then(|seconds| i64::try_from(seconds).ok())
            .and_then(ChronoDuration::try_seconds)
            .and_then(|delay| now.checked_add_signed(delay));
    }

    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Holds the instant before which refresh cycles must not hit the network.
#[derive(Debug, Default)]
pub struct RetryGate {
    until: Mutex<Option<DateTime<Utc>>>,
}

impl RetryGate {
    /// Creates an open gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the deadline. `None` opens the gate.
    pub fn set(&self, until: Option<DateTime<Utc>>) {
        if let Some(deadline) = until {
            tracing::debug!("Retry gate set until {}", deadline.to_rfc3339());
        }
        *self.until.lock() = until;
    }

    /// Current deadline, if any.
    pub fn until(&self) -> Option<DateTime<Utc>> {
        *self.until.lock()
    }

    /// Whether the gate still blocks refreshes at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        matches!(*self.until.lock(), Some(deadline) if deadline > now)
    }

    /// Whether the gate blocks refreshes right now.
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Opens the gate.
    pub fn clear(&self) {
        *self.until.lock() = None;
    }
}
