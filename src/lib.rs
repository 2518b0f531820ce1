//! # resource_pool
//!
//! Fixed-capacity resource pools and a deadline-bounded retry driver.
//!
//! ## Features
//!
//! - Eager pools filled up front, cycling items FIFO
//! - Lazy pools creating items on demand, reusing returned items LIFO
//! - Scoped acquisition that returns items exactly once (RAII)
//! - Exponential/linear backoff retry under a total time budget, sync and async
//! - Mutex-guarded shared pools for multi-threaded use
//! - Sessions holding a lazily acquired connection with commit/rollback
//! - Pool metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use resource_pool::{EagerPool, Pool};
//!
//! let mut pool = EagerPool::from_fn(|| vec![0u8; 1024], 3).unwrap();
//! {
//!     let mut buffer = pool.pooled().unwrap();
//!     buffer[0] = 1;
//!     // Buffer automatically returned when `buffer` goes out of scope
//! }
//! assert_eq!(pool.count(), 3);
//! ```

mod config;
mod errors;
mod metrics;
mod pool;
mod retry;
mod session;
mod shared;

pub use config::RetryConfiguration;
pub use errors::{ConfigError, PoolError, PoolResult, SessionError};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{EagerPool, LazyPool, Pool, Pooled};
pub use retry::{
    AsyncSleeper, Clock, Outcome, Retry, Sleeper, SystemClock, ThreadSleeper, TokioSleeper,
};
pub use session::{Connection, Session, SessionResult};
pub use shared::{SharedPool, SharedPooled};
