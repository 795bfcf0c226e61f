use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Run `op` up to `attempts` times with a linear backoff of `base_delay * attempt`
/// between tries. The closure receives the 1-based attempt number.
pub async fn retry_linear<F, Fut, T, E>(
    mut op: F,
    attempts: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts => {
                tracing::debug!(attempt, attempts, error = %e, "Retrying after failure");
                sleep(base_delay.saturating_mul(attempt)).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
