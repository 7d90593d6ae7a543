use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::types::{ApiError, ApiStatus};

/// Retry schedule for reads: 3 retries with exponential backoff from 1s, plus jitter.
const RETRY_BASE_DELAY_SECS: u64 = 1;
const MAX_RETRIES: usize = 3;
const RETRY_JITTER_DIVISOR: u128 = 4; // + up to 25% jitter

/// Same classification the caller sees on the final error.
fn should_retry_status(http_status: u16) -> bool {
    ApiStatus::from_http_status(http_status).is_retryable()
}

/// Send failures worth another attempt.
fn should_retry_send(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body()
}

/// Delay before retry number `attempt + 1`: doubling from the base, plus jitter.
fn backoff(attempt: usize) -> (Duration, Duration) {
    let doubled = 1u64.checked_shl(attempt as u32).unwrap_or(u64::MAX);
    let base = Duration::from_secs(RETRY_BASE_DELAY_SECS.saturating_mul(doubled));

    let spread_ms = (base.as_millis() / RETRY_JITTER_DIVISOR).min(u128::from(u64::MAX)) as u64;
    let jitter = match spread_ms {
        0 => Duration::ZERO,
        ms => Duration::from_millis(rand::thread_rng().gen_range(0..=ms)),
    };
    (base, base.saturating_add(jitter))
}

/// Send an idempotent request, retrying transient failures.
///
/// Writes must go through [`send_once`]: a retried write that already
/// landed would create a second object or move a ref twice.
pub(super) async fn send_with_retry(
    mut make_request: impl FnMut() -> reqwest::RequestBuilder,
) -> Result<reqwest::Response, ApiError> {
    let max_attempts = MAX_RETRIES + 1;
    let mut attempt = 0;

    loop {
        match make_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }

                if !should_retry_status(status.as_u16()) || attempt >= MAX_RETRIES {
                    return Ok(response);
                }

                let (base_delay, delay) = backoff(attempt);
                debug!(
                    "HTTP request failed with status {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    status,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                let _ = response.bytes().await;
                sleep(delay).await;
            }
            Err(err) => {
                if !should_retry_send(&err) || attempt >= MAX_RETRIES {
                    return Err(ApiError::transport(&err, attempt + 1));
                }

                let (base_delay, delay) = backoff(attempt);
                debug!(
                    "HTTP request error: {}; retrying in {:?} (base {:?}, attempt {}/{})",
                    err,
                    delay,
                    base_delay,
                    attempt + 1,
                    max_attempts
                );
                sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

/// Send a request exactly once.
pub(super) async fn send_once(
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ApiError> {
    request
        .send()
        .await
        .map_err(|err| ApiError::transport(&err, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_with_bounded_jitter() {
        for (attempt, secs) in [(0, 1), (1, 2), (2, 4)] {
            let (base, delay) = backoff(attempt);
            assert_eq!(base, Duration::from_secs(secs));
            assert!(delay >= base);
            assert!(delay <= base + base / 4);
        }
        assert_eq!(backoff(200).0, Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_retry_follows_api_status() {
        for retried in [408, 429, 500, 502, 503, 504] {
            assert!(should_retry_status(retried), "{retried}");
        }
        for final_status in [400, 401, 403, 404, 409, 422] {
            assert!(!should_retry_status(final_status), "{final_status}");
        }
    }
}
