use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff for remote calls.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub max_retries: u32,
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    /// Runs `op` until it succeeds, fails with an error `is_transient`
    /// rejects, or the retry budget is spent.
    pub async fn run<T, E, F, Fut>(
        &self,
        what: &str,
        is_transient: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut delay = self.initial;
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && is_transient(&e) => {
                    attempt += 1;
                    warn!(call = what, attempt, delay_ms = delay.as_millis() as u64, error = %e, "retrying remote call");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.max);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
