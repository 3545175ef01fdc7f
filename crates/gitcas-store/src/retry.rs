//! Backoff for source downloads. Only transport errors are retried; a
//! response of any status goes straight back to the caller.

use std::future::Future;
use std::time::Duration;

/// Retries after the first attempt.
pub(crate) const MAX_RETRIES: u32 = 3;

const FIRST_BACKOFF: Duration = Duration::from_millis(200);

/// Pause before retry number `attempt` (0-based): 200ms, 400ms, 800ms.
fn backoff(attempt: u32) -> Duration {
    FIRST_BACKOFF * 2u32.pow(attempt)
}

/// Send a request built by `send`, retrying transport failures.
///
/// `send` runs at most `MAX_RETRIES + 1` times. Any response, whatever its
/// status, ends the loop.
pub(crate) async fn retry_send<F, Fut>(send: F) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        match send().await {
            Err(e) if attempt < MAX_RETRIES => {
                let pause = backoff(attempt);
                attempt += 1;
                tracing::warn!(attempt, ?pause, "source download failed, retrying: {e}");
                tokio::time::sleep(pause).await;
            }
            result => return result,
        }
    }
}
