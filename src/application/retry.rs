use crate::config::RetryPolicy;
use std::fmt::Display;
use std::future::Future;
use tokio::time::sleep;
use tracing::warn;

/// Run `operation` up to `policy.attempts` times, sleeping with doubling delay
/// between failures. Returns the last error once the budget is spent.
pub async fn retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => {
                warn!(attempt = attempt + 1, stage = label, error = %err, "retries exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt = attempt + 1,
                    wait = ?delay,
                    stage = label,
                    error = %err,
                    "retrying operation"
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
