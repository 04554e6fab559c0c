//! Bounded exponential-backoff retry around a [`Transport`].
//!
//! Network failures, `429`, and `5xx` responses are retried up to
//! [`RetryPolicy::max_retries`] times, waiting `retry_delay * 2^attempt`
//! between attempts. Every attempt, successful or not, is followed by the
//! fixed [`RetryPolicy::sleep_between_calls`] pause to stay under workspace
//! rate limits. Any other non-success status is terminal immediately.

use std::time::Duration;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Default pause after every call.
pub const DEFAULT_SLEEP_BETWEEN_CALLS: Duration = Duration::from_millis(200);

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base backoff delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Cap on the backoff exponent so the delay computation cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Tunable retry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (total attempts = `max_retries + 1`).
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub retry_delay: Duration,
    /// Pause applied after every attempt.
    pub sleep_between_calls: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            sleep_between_calls: DEFAULT_SLEEP_BETWEEN_CALLS,
        }
    }
}

impl RetryPolicy {
    /// A policy with no pauses, for tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::ZERO,
            sleep_between_calls: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.retry_delay.saturating_mul(factor)
    }

    /// Worst-case wall-clock time spent sleeping for one call.
    pub fn worst_case_delay(&self) -> Duration {
        let backoff = (0..self.max_retries)
            .map(|attempt| self.backoff_delay(attempt))
            .fold(Duration::ZERO, Duration::saturating_add);
        let pauses = self.sleep_between_calls.saturating_mul(self.max_retries + 1);
        backoff.saturating_add(pauses)
    }
}

/// Whether a status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

// ---------------------------------------------------------------------------
// RetryingClient
// ---------------------------------------------------------------------------

/// A transport wrapped with a [`RetryPolicy`].
pub struct RetryingClient<T> {
    transport: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryingClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Execute `request`, returning the first success response or the
    /// terminal failure of the last attempt.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let total_attempts = self.policy.max_retries + 1;
        let mut attempt = 0u32;

        loop {
            let result = self.transport.send(request).await;
            tokio::time::sleep(self.policy.sleep_between_calls).await;

            let failure = match result {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => TransportError::Status {
                    status: response.status,
                    body: response.body,
                    attempts: attempt + 1,
                },
                Err(e) => e.with_attempts(attempt + 1),
            };

            let retryable = match &failure {
                TransportError::Network { .. } => true,
                TransportError::Status { status, .. } => is_retryable_status(*status),
                TransportError::Decode(_) => false,
            };

            if !retryable {
                return Err(failure);
            }
            if attempt + 1 >= total_attempts {
                tracing::error!(
                    method = %request.method,
                    path = %request.path,
                    attempts = total_attempts,
                    error = %failure,
                    "API call failed after all retries",
                );
                return Err(failure);
            }

            let delay = self.policy.backoff_delay(attempt);
            tracing::warn!(
                method = %request.method,
                path = %request.path,
                attempt = attempt + 1,
                max_attempts = total_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure,
                "API call failed, retrying",
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
