//! Bounded retry loop with an injectable pause.
//!
//! The loop never sleeps by itself: every wait goes through a [`Pause`]
//! implementation, so tests can swap the tokio timer for a zero-delay
//! stand-in and still observe how many waits were requested.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

/// Something that can wait for a given duration
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration);
}

/// Real wall-clock pause backed by the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

#[async_trait]
impl Pause for NoPause {
    async fn pause(&self, _duration: Duration) {}
}

/// Returns immediately but remembers every requested duration
#[derive(Debug, Default)]
pub struct RecordingPause {
    requested: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<Duration> {
        self.requested
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Sum of all requested pauses
    pub fn total(&self) -> Duration {
        self.requested().iter().sum()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(duration);
        }
    }
}

/// Attempt budget and the wait between consecutive attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Last attempt of a retry loop
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub last: T,
    pub attempts: u32,
}

/// Run `attempt` until `is_success` accepts its result or the budget runs out.
///
/// `attempt` receives the 1-based attempt number. `on_retry` is called with
/// the failed result right before each pause, i.e. never after the final
/// attempt. Exactly `policy.max_attempts` attempts are made against a target
/// that never succeeds, with `max_attempts - 1` pauses in between.
pub async fn run_with_retry<T, F, Fut, S, R>(
    policy: RetryPolicy,
    pause: &dyn Pause,
    mut attempt: F,
    is_success: S,
    mut on_retry: R,
) -> Retried<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = T>,
    S: Fn(&T) -> bool,
    R: FnMut(u32, &T),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut current = 1;

    loop {
        let result = attempt(current).await;
        if is_success(&result) || current >= max_attempts {
            return Retried {
                last: result,
                attempts: current,
            };
        }

        on_retry(current, &result);
        pause.pause(policy.delay).await;
        current += 1;
    }
}
