//! Bounded, fixed-delay retry.
//!
//! Every external call in a run goes through a `RetryPolicy`: a fixed number
//! of attempts with a fixed pause between them. Exhaustion is reported as
//! `None`; the caller decides what that means for the run.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Attempt budget and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    #[serde(with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// One attempt, no retry.
    pub fn single() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Run `op` until it succeeds or the budget is spent.
    ///
    /// `op` receives the 1-based attempt number. `on_failure` sees every
    /// failed attempt before the pause.
    pub async fn run<T, E, F, Fut, L>(&self, mut op: F, mut on_failure: L) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        L: FnMut(u32, &E),
    {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => return Some(value),
                Err(err) => {
                    on_failure(attempt, &err);
                    if attempt < attempts {
                        log::info!("Retrying in {:?}...", self.delay);
                        tokio::time::sleep(self.delay).await;
                    }
                }
            }
        }
        log::warn!("Max retries reached ({} attempts)", attempts);
        None
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
