//! Deadline-bounded retry with growing delays
//!
//! A [`Retry`] calls a predicate until it reports success or the time budget
//! runs out. The first attempt is free: when it succeeds neither the clock
//! nor the sleeper is touched. After the first failure the driver records a
//! deadline, then alternates sleeping and calling the predicate. Elapsed time
//! is re-read from the [`Clock`] after every attempt, so slow predicates eat
//! into the budget. The last sleep is shortened to end at the deadline and is
//! followed by one final attempt.
//!
//! Running out of time is not an error; the last unsuccessful outcome is
//! returned. Errors from [`Retry::try_call`] predicates propagate at once.

use crate::config::RetryConfiguration;
use crate::errors::ConfigError;

use async_trait::async_trait;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A predicate result that knows whether it counts as success.
pub trait Outcome {
    fn is_success(&self) -> bool;
}

impl Outcome for bool {
    fn is_success(&self) -> bool {
        *self
    }
}

impl<T> Outcome for Option<T> {
    fn is_success(&self) -> bool {
        self.is_some()
    }
}

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Blocking sleep.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Non-blocking sleep for async callers.
#[async_trait]
pub trait AsyncSleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Clock`] backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// [`Sleeper`] that parks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// [`AsyncSleeper`] backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl AsyncSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What the driver does after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Sleep, then attempt again.
    Wait(Duration),
    /// Sleep until the deadline, attempt once more and stop.
    Last(Duration),
    /// No time left.
    Expired,
}

/// Delay bookkeeping for one retry run.
struct Backoff<'a> {
    config: &'a RetryConfiguration,
    deadline: Duration,
    delay: Duration,
}

impl<'a> Backoff<'a> {
    fn start(config: &'a RetryConfiguration, now: Duration) -> Self {
        Self {
            config,
            deadline: now.saturating_add(config.timeout),
            delay: config.start,
        }
    }

    fn next(&mut self, now: Duration) -> Step {
        let remaining = self.deadline.saturating_sub(now);
        if remaining.is_zero() {
            return Step::Expired;
        }

        self.delay = self.config.grow(self.delay);
        if self.delay >= remaining {
            Step::Last(remaining)
        } else {
            Step::Wait(self.delay)
        }
    }
}

/// Retry driver built from a validated [`RetryConfiguration`].
///
/// # Examples
///
/// ```
/// use resource_pool::RetryConfiguration;
/// use std::time::Duration;
///
/// let retry = RetryConfiguration::new(Duration::from_secs(1), Duration::from_millis(1))
///     .build()
///     .unwrap();
///
/// let mut attempts = 0;
/// let ready = retry.call(|| {
///     attempts += 1;
///     attempts == 3
/// });
///
/// assert!(ready);
/// assert_eq!(attempts, 3);
/// ```
#[derive(Clone)]
pub struct Retry {
    config: RetryConfiguration,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    async_sleeper: Arc<dyn AsyncSleeper>,
}

impl fmt::Debug for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("config", &self.config)
            .field("clock", &"<clock>")
            .field("sleeper", &"<sleeper>")
            .finish()
    }
}

impl Retry {
    /// Validate `config` and build a driver using real time.
    pub fn new(config: RetryConfiguration) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(SystemClock::default()),
            sleeper: Arc::new(ThreadSleeper),
            async_sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replace the time source.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Replace the blocking sleep.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Replace the async sleep.
    pub fn with_async_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: AsyncSleeper + 'static,
    {
        self.async_sleeper = Arc::new(sleeper);
        self
    }

    pub fn config(&self) -> &RetryConfiguration {
        &self.config
    }

    /// Call `predicate` until it succeeds or time runs out, returning the
    /// last outcome.
    pub fn call<O, F>(&self, mut predicate: F) -> O
    where
        O: Outcome,
        F: FnMut() -> O,
    {
        match self.try_call(|| Ok::<O, Infallible>(predicate())) {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Like [`call`](Retry::call) for fallible predicates. An `Err` stops the
    /// retry and is returned as is.
    pub fn try_call<O, E, F>(&self, mut predicate: F) -> Result<O, E>
    where
        O: Outcome,
        F: FnMut() -> Result<O, E>,
    {
        let outcome = predicate()?;
        if outcome.is_success() {
            return Ok(outcome);
        }

        let mut backoff = Backoff::start(&self.config, self.clock.now());
        self.sleep(self.config.start);

        loop {
            let outcome = predicate()?;
            if outcome.is_success() {
                return Ok(outcome);
            }

            match backoff.next(self.clock.now()) {
                Step::Wait(delay) => self.sleep(delay),
                Step::Last(remaining) => {
                    self.sleep(remaining);
                    return predicate();
                }
                Step::Expired => {
                    tracing::debug!(timeout = ?self.config.timeout, "retry expired");
                    return Ok(outcome);
                }
            }
        }
    }

    /// Async form of [`call`](Retry::call).
    pub async fn call_async<O, F, Fut>(&self, mut predicate: F) -> O
    where
        O: Outcome,
        F: FnMut() -> Fut,
        Fut: Future<Output = O>,
    {
        let result = self
            .try_call_async(|| {
                let attempt = predicate();
                async move { Ok::<O, Infallible>(attempt.await) }
            })
            .await;
        match result {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Async form of [`try_call`](Retry::try_call).
    pub async fn try_call_async<O, E, F, Fut>(&self, mut predicate: F) -> Result<O, E>
    where
        O: Outcome,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let outcome = predicate().await?;
        if outcome.is_success() {
            return Ok(outcome);
        }

        let mut backoff = Backoff::start(&self.config, self.clock.now());
        self.sleep_async(self.config.start).await;

        loop {
            let outcome = predicate().await?;
            if outcome.is_success() {
                return Ok(outcome);
            }

            match backoff.next(self.clock.now()) {
                Step::Wait(delay) => self.sleep_async(delay).await,
                Step::Last(remaining) => {
                    self.sleep_async(remaining).await;
                    return predicate().await;
                }
                Step::Expired => {
                    tracing::debug!(timeout = ?self.config.timeout, "retry expired");
                    return Ok(outcome);
                }
            }
        }
    }

    fn sleep(&self, delay: Duration) {
        tracing::trace!(?delay, "retry backing off");
        self.sleeper.sleep(delay);
    }

    async fn sleep_async(&self, delay: Duration) {
        tracing::trace!(?delay, "retry backing off");
        self.async_sleeper.sleep(delay).await;
    }
}
