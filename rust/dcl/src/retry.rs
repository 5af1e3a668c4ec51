//! Backoff policies and the generic retry loop.

use std::{
    fmt::Debug,
    future::Future,
    time::{Duration, Instant},
};

use rand::Rng;
use tracing::{debug, warn};

use crate::utils::error_full_message;

/// Produces a fresh [`Backoff`] for each retried action.
pub trait RetryProvider: Debug + Send + Sync {
    fn new_backoff(&self) -> Box<dyn Backoff + Send>;
}

pub trait Backoff {
    /// Delay before the next attempt, or [`None`] if the action should give up.
    fn next_delay(&mut self) -> Option<Duration>;
}

/// Randomized exponential backoff, bounded by a total elapsed time.
#[derive(Clone, Debug)]
pub struct ExponentialBackoffProvider {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Fraction of each interval by which the delay is randomly moved up or down
    pub randomization_factor: f64,
    pub max_elapsed_time: Duration,
}

impl Default for ExponentialBackoffProvider {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            randomization_factor: 0.5,
            max_elapsed_time: Duration::from_secs(2 * 60),
        }
    }
}

impl RetryProvider for ExponentialBackoffProvider {
    fn new_backoff(&self) -> Box<dyn Backoff + Send> {
        Box::new(ExponentialBackoff {
            policy: self.clone(),
            current_interval: self.initial_interval,
            started: Instant::now(),
        })
    }
}

struct ExponentialBackoff {
    policy: ExponentialBackoffProvider,
    current_interval: Duration,
    started: Instant,
}

impl Backoff for ExponentialBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.policy.max_elapsed_time {
            return None;
        }
        let interval = self.current_interval.as_secs_f64();
        let delta = interval * self.policy.randomization_factor;
        let delay = if delta > 0.0 {
            rand::thread_rng().gen_range(interval - delta..=interval + delta)
        } else {
            interval
        };
        self.current_interval = self
            .current_interval
            .mul_f64(self.policy.multiplier)
            .min(self.policy.max_interval);
        Some(Duration::from_secs_f64(delay))
    }
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetryProvider;

impl RetryProvider for NoRetryProvider {
    fn new_backoff(&self) -> Box<dyn Backoff + Send> {
        Box::new(NoRetry)
    }
}

struct NoRetry;

impl Backoff for NoRetry {
    fn next_delay(&mut self) -> Option<Duration> {
        None
    }
}

/// Retries without waiting, up to a fixed number of attempts.
#[derive(Clone, Copy, Debug)]
pub struct ImmediateRetryProvider {
    pub max_retries: usize,
}

impl RetryProvider for ImmediateRetryProvider {
    fn new_backoff(&self) -> Box<dyn Backoff + Send> {
        Box::new(ImmediateRetry {
            remaining: self.max_retries,
        })
    }
}

struct ImmediateRetry {
    remaining: usize,
}

impl Backoff for ImmediateRetry {
    fn next_delay(&mut self) -> Option<Duration> {
        self.remaining = self.remaining.checked_sub(1)?;
        Some(Duration::ZERO)
    }
}

/// Outcome of a single attempt of a retried action.
#[derive(Debug)]
pub enum Attempt<T, E> {
    Done(T),
    /// The action failed in a way that may resolve itself
    Retry(E),
    Fail(E),
}

/// Runs `action` until it is done or fails permanently, sleeping between attempts as decided by
/// `provider`. The last retryable error is returned once the backoff gives up.
pub async fn retry<T, E, F, Fut>(provider: &dyn RetryProvider, mut action: F) -> Result<T, E>
where
    E: std::error::Error,
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut backoff = provider.new_backoff();
    loop {
        match action().await {
            Attempt::Done(value) => return Ok(value),
            Attempt::Fail(err) => return Err(err),
            Attempt::Retry(err) => match backoff.next_delay() {
                Some(delay) => {
                    debug!(?delay, error = %error_full_message(&err), "Retrying");
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(error = %error_full_message(&err), "Giving up after retries");
                    return Err(err);
                }
            },
        }
    }
}
