use std::time::Duration;

use reqwest::header::HeaderMap;

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota state reported alongside a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotaSignal {
    pub remaining: Option<u64>,
    pub reset_after: Option<Duration>,
}

impl QuotaSignal {
    /// Read the quota headers. Missing or unparseable values count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
        };

        let remaining = value(REMAINING_HEADER).and_then(|s| s.parse::<u64>().ok());
        let reset_after = value(RESET_HEADER)
            .and_then(|s| s.parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self {
            remaining,
            reset_after,
        }
    }
}

/// Blocks the calling thread. Swapped out in tests.
pub trait Pause {
    fn pause(&self, duration: Duration);
}

#[derive(Debug, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Waits out the quota window once the API says no calls remain.
pub struct RateLimitGovernor<P: Pause = ThreadSleep> {
    pause: P,
}

impl RateLimitGovernor<ThreadSleep> {
    pub fn new() -> Self {
        Self { pause: ThreadSleep }
    }
}

impl Default for RateLimitGovernor<ThreadSleep> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pause> RateLimitGovernor<P> {
    pub fn with_pause(pause: P) -> Self {
        Self { pause }
    }

    /// Returns how long the caller was held, if at all.
    pub fn observe(&self, signal: QuotaSignal) -> Option<Duration> {
        match (signal.remaining, signal.reset_after) {
            (Some(0), Some(wait)) => {
                tracing::info!("Rate limit exhausted, waiting {:?} for quota reset", wait);
                self.pause.pause(wait);
                Some(wait)
            }
            (Some(remaining), _) => {
                tracing::debug!(remaining, "API calls remaining in quota window");
                None
            }
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn pause_impl(&self) -> &P {
        &self.pause
    }
}
