//! Bounded retry with rate-limit cooldown.
//!
//! The shop throttles aggressive navigation; when it does, the blocking
//! state shows up either in an action's error message or as a banner in
//! the page text. Failures that look rate-limited wait out the long
//! cooldown before the next attempt; everything else retries after the
//! short delay.

use crate::{Error, Result};
use eoka::Page;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Phrases that mark page content as a rate-limit banner. Stricter than
/// [`looks_rate_limited`] because ordinary shop copy may contain either
/// single word.
const BANNER_PHRASES: &[&str] = &["rate limit", "too many requests", "429"];

/// Immutable retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least 1.
    pub max_attempts: u32,
    /// Delay between ordinary attempts.
    pub delay: Duration,
    /// Cooldown after a rate-limit signal.
    pub rate_limit_cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
            rate_limit_cooldown: Duration::from_secs(30),
        }
    }
}

/// Whether a failure message carries a rate-limit signal.
pub fn looks_rate_limited(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("rate") || lower.contains("limit") || lower.contains("429")
}

/// Run `op` under `policy`. The final failure is wrapped in
/// [`Error::ActionExhausted`] once every attempt is spent; an op that
/// always fails is invoked exactly `max_attempts` times.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{}: attempt {}/{} failed: {}", label, attempt, attempts, e);
                let pause = if looks_rate_limited(&e.to_string()) {
                    debug!("{}: rate-limit signal, cooling down", label);
                    policy.rate_limit_cooldown
                } else {
                    policy.delay
                };
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
        }
    }
    op().await.map_err(|e| Error::ActionExhausted {
        label: label.to_string(),
        attempts,
        source: Box::new(e),
    })
}

/// Check the live page for a rate-limit banner; when present, wait out
/// the cooldown and reload to clear the blocking state. Returns whether
/// a recovery happened.
pub async fn recover_if_rate_limited(page: &Page, policy: &RetryPolicy) -> Result<bool> {
    let text = page.text().await?.to_lowercase();
    if !BANNER_PHRASES.iter().any(|p| text.contains(p)) {
        return Ok(false);
    }
    warn!(
        "rate-limit banner on page, cooling down {}s before reload",
        policy.rate_limit_cooldown.as_secs()
    );
    tokio::time::sleep(policy.rate_limit_cooldown).await;
    page.reload().await?;
    let _ = page.wait_for_network_idle(500, 10_000).await;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_always_failing_op_runs_exactly_n_times() {
        let calls = Cell::new(0u32);
        let result: Result<()> = with_retry(&instant_policy(4), "doomed", || {
            calls.set(calls.get() + 1);
            async { Err(Error::AssertionFailed("nope".into())) }
        })
        .await;

        assert_eq!(calls.get(), 4);
        match result {
            Err(Error::ActionExhausted {
                label, attempts, ..
            }) => {
                assert_eq!(label, "doomed");
                assert_eq!(attempts, 4);
            }
            other => panic!("expected ActionExhausted, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_succeeds_midway_stops_retrying() {
        let calls = Cell::new(0u32);
        let result = with_retry(&instant_policy(5), "flaky", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(Error::AssertionFailed("not yet".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let calls = Cell::new(0u32);
        let result: Result<()> = with_retry(&instant_policy(1), "once", || {
            calls.set(calls.get() + 1);
            async { Err(Error::AssertionFailed("nope".into())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(looks_rate_limited("Rate limit exceeded"));
        assert!(looks_rate_limited("request LIMIT reached"));
        assert!(looks_rate_limited("server returned 429"));
        assert!(!looks_rate_limited("element not found: #cart"));
        assert!(!looks_rate_limited("navigation timeout"));
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_millis(500));
        assert_eq!(policy.rate_limit_cooldown, Duration::from_secs(30));
    }
}
