//! Retry configuration options

use crate::errors::ConfigError;
use crate::retry::Retry;
use std::time::Duration;

/// Configuration for retry timing
///
/// The delay starts at `start`, grows by `delay * slope + step` after every
/// failed attempt and never exceeds `end`. The whole retry never sleeps past
/// `timeout`.
///
/// # Examples
///
/// ```
/// use resource_pool::RetryConfiguration;
/// use std::time::Duration;
///
/// let config = RetryConfiguration::new(Duration::from_secs(10), Duration::from_millis(500))
///     .with_end(Duration::from_millis(2500))
///     .with_slope(2.0);
///
/// assert_eq!(config.end(), Duration::from_millis(2500));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfiguration {
    /// Total time budget, measured from the first failed attempt
    pub timeout: Duration,

    /// Delay before the second attempt
    pub start: Duration,

    /// Upper bound for the delay; `None` means no growth past `start`
    pub end: Option<Duration>,

    /// Multiplicative growth per attempt
    pub slope: f64,

    /// Additive growth per attempt
    pub step: Duration,
}

impl Default for RetryConfiguration {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            start: Duration::from_millis(10),
            end: None,
            slope: 1.0,
            step: Duration::ZERO,
        }
    }
}

impl RetryConfiguration {
    /// Create a configuration with a timeout and a constant delay
    pub fn new(timeout: Duration, start: Duration) -> Self {
        Self {
            timeout,
            start,
            ..Self::default()
        }
    }

    /// Set the total time budget
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the initial delay
    pub fn with_start(mut self, start: Duration) -> Self {
        self.start = start;
        self
    }

    /// Set the maximum delay
    pub fn with_end(mut self, end: Duration) -> Self {
        self.end = Some(end);
        self
    }

    /// Set the multiplicative growth factor
    pub fn with_slope(mut self, slope: f64) -> Self {
        self.slope = slope;
        self
    }

    /// Set the additive growth per attempt
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// The effective maximum delay
    pub fn end(&self) -> Duration {
        self.end.unwrap_or(self.start)
    }

    /// Check every timing rule
    ///
    /// # Examples
    ///
    /// ```
    /// use resource_pool::{ConfigError, RetryConfiguration};
    /// use std::time::Duration;
    ///
    /// let config = RetryConfiguration::new(Duration::from_secs(1), Duration::from_secs(2));
    /// assert!(matches!(config.validate(), Err(ConfigError::EndExceedsTimeout { .. })));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let end = self.end();
        if end < self.start {
            return Err(ConfigError::EndBeforeStart {
                start: self.start,
                end,
            });
        }
        if end > self.timeout {
            return Err(ConfigError::EndExceedsTimeout {
                end,
                timeout: self.timeout,
            });
        }

        if !self.slope.is_finite() || self.slope < 1.0 {
            return Err(ConfigError::InvalidSlope(self.slope));
        }

        Ok(())
    }

    /// Validate and build a retry driver with the system clock
    pub fn build(self) -> Result<Retry, ConfigError> {
        Retry::new(self)
    }

    /// The delay that follows `delay`
    pub(crate) fn grow(&self, delay: Duration) -> Duration {
        let scaled = if self.slope == 1.0 {
            delay
        } else {
            Duration::try_from_secs_f64(delay.as_secs_f64() * self.slope).unwrap_or(Duration::MAX)
        };
        scaled.saturating_add(self.step).min(self.end())
    }
}
