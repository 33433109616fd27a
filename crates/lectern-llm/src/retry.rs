use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::LlmError;

/// How a backend reacts to throttling (429) and temporary overload (503).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry number `attempt + 1`. A server-supplied `Retry-After`
    /// wins over the doubling schedule; both are capped at `max_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let scheduled = retry_after.unwrap_or_else(|| {
            let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
            self.base_delay.saturating_mul(factor)
        });
        scheduled.min(self.max_delay)
    }

    /// Run `send` until it yields a response that is not 429/503, or retries run out.
    ///
    /// A 503 still present after the last retry is handed back to the caller,
    /// which reports it as a status error.
    ///
    /// # Errors
    ///
    /// [`LlmError::RateLimited`] when every attempt was throttled, or
    /// [`LlmError::Http`] on transport failure.
    pub(crate) async fn send<F, Fut>(
        &self,
        provider: &str,
        mut send: F,
    ) -> Result<reqwest::Response, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            let response = send().await?;
            let status = response.status();
            if !is_retryable(status) {
                return Ok(response);
            }
            if attempt == self.max_retries {
                return if status == StatusCode::TOO_MANY_REQUESTS {
                    Err(LlmError::RateLimited)
                } else {
                    Ok(response)
                };
            }

            let wait = self.delay(attempt, retry_after(&response));
            attempt += 1;
            tracing::warn!(
                provider,
                status = status.as_u16(),
                attempt,
                max = self.max_retries,
                "backend busy, retrying in {}ms",
                wait.as_millis()
            );
            tokio::time::sleep(wait).await;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    let secs = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;
    Some(Duration::from_secs(secs))
}
