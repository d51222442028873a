// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Bounded, jittered retries for provider API calls.
//!
//! Only transient failures are retried; every other provider error is returned on
//! the first attempt. The retry budget stays below the per-call provider timeout.

use crate::errors::ProviderError;
use rand::Rng;
use reqwest::StatusCode;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Delay schedule for one retried call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub first_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Total time after which no further retry is scheduled
    pub budget: Duration,
    /// Growth factor between consecutive delays
    pub factor: f64,
    /// Fraction of each delay applied as random spread in both directions
    pub jitter: f64,
}

impl BackoffPolicy {
    /// Schedule used by the PowerDNS and Cloudflare adapters.
    pub const PROVIDER: Self = Self {
        first_delay: Duration::from_millis(50),
        max_delay: Duration::from_secs(5),
        budget: Duration::from_secs(20),
        factor: 2.0,
        jitter: 0.1,
    };

    /// Begin a schedule whose budget starts now.
    #[must_use]
    pub fn start(self) -> Backoff {
        Backoff {
            deadline: Instant::now() + self.budget,
            upcoming: self.first_delay,
            policy: self,
        }
    }
}

/// A running delay schedule.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    upcoming: Duration,
    deadline: Instant,
}

impl Backoff {
    /// Base delay, before jitter, for the next [`Backoff::next_delay`].
    #[must_use]
    pub fn upcoming(&self) -> Duration {
        self.upcoming
    }

    /// Next delay to sleep, or `None` once the budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if Instant::now() >= self.deadline {
            return None;
        }
        let base = self.upcoming;
        self.upcoming = base.mul_f64(self.policy.factor).min(self.policy.max_delay);
        Some(spread(base, self.policy.jitter))
    }
}

fn spread(delay: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return delay;
    }
    let secs = delay.as_secs_f64();
    let offset = rand::rng().random_range(-jitter..=jitter);
    Duration::from_secs_f64((secs * (1.0 + offset)).max(0.0))
}

/// Whether a provider error may succeed if sent again.
///
/// Connection failures and HTTP 429, 500, 502, 503 and 504 qualify. Timeouts do not:
/// the caller's timeout already covers the retry budget.
#[must_use]
pub fn is_retryable_error(err: &ProviderError) -> bool {
    match err {
        ProviderError::Connection { .. } => true,
        ProviderError::Http { status, .. } => matches!(
            StatusCode::from_u16(*status),
            Ok(StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT)
        ),
        ProviderError::Timeout { .. }
        | ProviderError::InvalidResponse { .. }
        | ProviderError::ZoneNotFound { .. } => false,
    }
}

/// Run `call` until it succeeds, fails permanently, or the retry budget runs out.
///
/// # Errors
///
/// Returns the last provider error.
pub async fn retry_provider_call<T, F, Fut>(mut call: F, label: &str) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut backoff = BackoffPolicy::PROVIDER.start();
    let mut attempt = 1u32;

    loop {
        let err = match call().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(call = label, attempt, "Provider call recovered");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable_error(&err) {
            return Err(err);
        }
        let Some(delay) = backoff.next_delay() else {
            warn!(call = label, attempt, error = %err, "Retry budget spent");
            return Err(err);
        };

        warn!(call = label, attempt, ?delay, error = %err, "Transient provider error");
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
