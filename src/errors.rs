//! Error types for pools, retry configuration and sessions

use std::convert::Infallible;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by pool construction and acquisition.
///
/// `E` is the factory's own error type. Pools built from infallible
/// factories use the default, [`Infallible`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError<E = Infallible> {
    #[error("Pool capacity must be greater than zero")]
    ZeroCapacity,

    #[error("Pool is exhausted - every item is on loan")]
    Exhausted,

    #[error("Factory failed to create an item: {0}")]
    Factory(#[source] E),
}

impl<E> PoolError<E> {
    /// Whether this error is the transient "nothing available right now" case.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted)
    }
}

pub type PoolResult<T, E = Infallible> = Result<T, PoolError<E>>;

/// A retry configuration rule that was violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("timeout must be greater than zero")]
    ZeroTimeout,

    #[error("end delay {end:?} is shorter than start delay {start:?}")]
    EndBeforeStart { start: Duration, end: Duration },

    #[error("end delay {end:?} exceeds timeout {timeout:?}")]
    EndExceedsTimeout { end: Duration, timeout: Duration },

    #[error("slope must be a finite number >= 1.0, got {0}")]
    InvalidSlope(f64),
}

/// Errors raised by a [`Session`](crate::Session).
#[derive(Error, Debug)]
pub enum SessionError<PE, CE> {
    #[error("Failed to acquire a connection: {0}")]
    Pool(#[source] PoolError<PE>),

    #[error("Connection error: {0}")]
    Connection(#[source] CE),
}
