//! Jittered-backoff retry (§4.1, §7 `provider_transient`): the Provider
//! Client never retries internally, so the engine owns this policy.

use std::time::Duration;

use provider::{ProviderError, Result};

/// Retries `call` up to `max_retries` times while the failure is
/// [`ProviderError::is_transient`], doubling `base_backoff` per attempt with
/// up to 25% jitter. Returns the first success or the last failure.
pub async fn with_retry<F, Fut, T>(max_retries: u32, base_backoff: Duration, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_retries => {
                attempt += 1;
                let backoff = base_backoff.saturating_mul(1 << (attempt - 1));
                let jitter_ms = (rand::random::<f64>() * backoff.as_millis() as f64 * 0.25) as u64;
                tokio::time::sleep(backoff + Duration::from_millis(jitter_ms)).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// A fixed single-retry used for the chairman's Stage 3 call (§4.6: "retry
/// once with a short backoff"), distinct from the engine-wide `max_retries`.
pub async fn with_single_retry<F, Fut, T>(base_backoff: Duration, call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    with_retry(1, base_backoff, call).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let result = with_retry(2, Duration::from_millis(1), || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Transient("boom".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_permanent_failures() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = with_retry(2, Duration::from_millis(1), || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Permanent("nope".into())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
