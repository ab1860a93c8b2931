use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Delay applied the first time a host throttles us without a usable
/// `Retry-After` header
pub const DEFAULT_DELAY: Duration = Duration::from_secs(60);

/// Throttle record for one host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Delay that produced `next_check`; doubled on the next throttle
    pub delay: Duration,

    /// Earliest instant the host may be contacted again
    pub next_check: Instant,
}

/// A parsed `Retry-After` header value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// Seconds to wait
    Delay(Duration),
    /// HTTP-date of the next allowed attempt
    At(DateTime<Utc>),
}

impl RetryAfter {
    /// Parses a header value; malformed values yield `None`
    ///
    /// Delays too large to represent as a `Duration` count as malformed.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(seconds) = value.parse::<f64>() {
            return Duration::try_from_secs_f64(seconds).ok().map(Self::Delay);
        }

        parse_http_date(value).map(Self::At)
    }

    /// Returns the throttle record this directive produces at `now`, or
    /// `None` if the resulting instant cannot be represented
    fn to_limit(self, now: Instant, wall_now: DateTime<Utc>) -> Option<RateLimit> {
        let delay = match self {
            Self::Delay(delay) => delay,
            // An HTTP-date in the past means "now"
            Self::At(until) => (until - wall_now).to_std().unwrap_or(Duration::ZERO),
        };

        Some(RateLimit {
            delay,
            next_check: now.checked_add(delay)?,
        })
    }
}

/// Parses the IMF-fixdate, RFC 850 and asctime forms of an HTTP-date
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc2822(value) {
        return Some(at.with_timezone(&Utc));
    }

    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Computes the next throttle record for a host
///
/// # Algorithm
///
/// 1. A `Retry-After` delay in seconds is used as-is.
/// 2. A `Retry-After` HTTP-date becomes the next check; the delay is the
///    time left until then.
/// 3. Otherwise the first throttle waits `DEFAULT_DELAY` and every later one
///    doubles the previous delay. A doubling that first crosses `max_delay`
///    is clamped to it; once the previous delay has reached the ceiling the
///    host is given up on.
///
/// # Returns
///
/// * `Some(RateLimit)` - When the host may be retried
/// * `None` - The backoff exceeded the ceiling; no further retry
///
/// A `Retry-After` value whose delay or resulting instant cannot be
/// represented is treated as malformed and falls through to step 3.
pub fn compute_backoff(
    retry_after: Option<&str>,
    previous: Option<&RateLimit>,
    max_delay: Duration,
    now: Instant,
    wall_now: DateTime<Utc>,
) -> Option<RateLimit> {
    if let Some(limit) = retry_after
        .and_then(RetryAfter::parse)
        .and_then(|directive| directive.to_limit(now, wall_now))
    {
        return Some(limit);
    }

    let delay = match previous {
        None => DEFAULT_DELAY,
        Some(previous) => {
            let doubled = previous.delay.saturating_mul(2);
            if doubled > max_delay && previous.delay < max_delay {
                max_delay
            } else {
                doubled
            }
        }
    };

    if delay > max_delay {
        return None;
    }

    Some(RateLimit {
        delay,
        next_check: now.checked_add(delay)?,
    })
}

/// Per-host throttle table shared by all workers
///
/// Records are written only when a host answers 429 and cleared when the
/// host answers successfully. Workers consult `next_check` before dispatch.
#[derive(Debug)]
pub struct RateLimiter {
    limits: Mutex<HashMap<String, RateLimit>>,
    max_delay: Duration,
}

impl RateLimiter {
    /// Creates an empty table with the given backoff ceiling
    pub fn new(max_delay: Duration) -> Self {
        Self {
            limits: Mutex::new(HashMap::new()),
            max_delay,
        }
    }

    /// Records a throttle response from `netloc`
    ///
    /// # Arguments
    ///
    /// * `netloc` - The throttled host
    /// * `retry_after` - The raw `Retry-After` header, if any
    ///
    /// # Returns
    ///
    /// * `Some(Instant)` - When the link should be checked again
    /// * `None` - The host exceeded the backoff ceiling
    pub fn limit_rate(&self, netloc: &str, retry_after: Option<&str>) -> Option<Instant> {
        let mut limits = self.lock();
        let next = compute_backoff(
            retry_after,
            limits.get(netloc),
            self.max_delay,
            Instant::now(),
            Utc::now(),
        )?;

        tracing::debug!(
            "Rate limited by {}: waiting {:?}",
            netloc,
            next.delay
        );
        limits.insert(netloc.to_string(), next);
        Some(next.next_check)
    }

    /// Returns the next allowed check time for `netloc`, if throttled
    pub fn next_check(&self, netloc: &str) -> Option<Instant> {
        self.lock().get(netloc).map(|limit| limit.next_check)
    }

    /// Returns the full throttle record for `netloc`
    pub fn get(&self, netloc: &str) -> Option<RateLimit> {
        self.lock().get(netloc).copied()
    }

    /// Forgets any throttle on `netloc` after a successful response
    pub fn clear(&self, netloc: &str) {
        if self.lock().remove(netloc).is_some() {
            tracing::debug!("Rate limit on {} lifted", netloc);
        }
    }

    /// Returns the hosts currently throttled, sorted
    pub fn throttled_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.lock().keys().cloned().collect();
        hosts.sort();
        hosts
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateLimit>> {
        self.limits.lock().unwrap_or_else(|e| e.into_inner())
    }
}
