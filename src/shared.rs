//! Mutex-guarded pool for use across threads

use crate::errors::{PoolError, PoolResult};
use crate::metrics::PoolMetrics;
use crate::pool::Pool;
use crate::retry::Retry;

use parking_lot::Mutex;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// A [`Pool`] behind a lock, usable through `&self` from many threads.
///
/// The lock is held only while an item is taken out or put back, never
/// while a caller works with an item.
///
/// # Examples
///
/// ```
/// use resource_pool::{EagerPool, SharedPool};
/// use std::sync::Arc;
///
/// let pool = Arc::new(SharedPool::new(EagerPool::from_fn(|| 0u32, 4).unwrap()));
///
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let pool = Arc::clone(&pool);
///         std::thread::spawn(move || {
///             let mut counter = pool.pooled().unwrap();
///             *counter += 1;
///         })
///     })
///     .collect();
///
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(pool.count(), 4);
/// ```
pub struct SharedPool<P> {
    inner: Mutex<P>,
}

impl<P: Pool> SharedPool<P> {
    pub fn new(pool: P) -> Self {
        Self {
            inner: Mutex::new(pool),
        }
    }

    pub fn acquire(&self) -> PoolResult<P::Item, P::Error> {
        self.inner.lock().acquire()
    }

    pub fn get_back(&self, item: P::Item) {
        self.inner.lock().get_back(item);
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count()
    }

    pub fn metrics(&self) -> PoolMetrics {
        self.inner.lock().metrics()
    }

    /// Acquire an item that goes back to the pool when the guard drops.
    pub fn pooled(&self) -> PoolResult<SharedPooled<'_, P>, P::Error> {
        let item = self.acquire()?;
        Ok(SharedPooled {
            pool: self,
            item: Some(item),
        })
    }

    /// Keep trying to acquire while the pool is exhausted, within the
    /// budget of `retry`. Factory errors end the wait immediately.
    ///
    /// # Examples
    ///
    /// ```
    /// use resource_pool::{EagerPool, PoolError, RetryConfiguration, SharedPool};
    /// use std::time::Duration;
    ///
    /// let pool = SharedPool::new(EagerPool::from_fn(|| 1, 1).unwrap());
    /// let retry = RetryConfiguration::new(Duration::from_millis(20), Duration::from_millis(5))
    ///     .build()
    ///     .unwrap();
    ///
    /// let held = pool.acquire_within(&retry).unwrap();
    /// assert!(matches!(pool.acquire_within(&retry), Err(PoolError::Exhausted)));
    /// pool.get_back(held);
    /// ```
    pub fn acquire_within(&self, retry: &Retry) -> PoolResult<P::Item, P::Error> {
        let found = retry.try_call(|| match self.acquire() {
            Ok(item) => Ok(Some(item)),
            Err(PoolError::Exhausted) => Ok(None),
            Err(err) => Err(err),
        })?;
        found.ok_or(PoolError::Exhausted)
    }

    /// [`pooled`](SharedPool::pooled) with the waiting of
    /// [`acquire_within`](SharedPool::acquire_within).
    pub fn pooled_within(&self, retry: &Retry) -> PoolResult<SharedPooled<'_, P>, P::Error> {
        let item = self.acquire_within(retry)?;
        Ok(SharedPooled {
            pool: self,
            item: Some(item),
        })
    }

    pub fn into_inner(self) -> P {
        self.inner.into_inner()
    }
}

impl<P: Pool> fmt::Debug for SharedPool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = self.inner.lock();
        f.debug_struct("SharedPool")
            .field("size", &pool.size())
            .field("count", &pool.count())
            .finish()
    }
}

/// An item on loan from a [`SharedPool`], returned exactly once.
pub struct SharedPooled<'a, P: Pool> {
    pool: &'a SharedPool<P>,
    item: Option<P::Item>,
}

impl<P: Pool> SharedPooled<'_, P> {
    /// Return the item now. A second call does nothing.
    pub fn exit(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.get_back(item);
        }
    }

    pub fn is_held(&self) -> bool {
        self.item.is_some()
    }

    /// Detach the item; the caller must hand it back.
    pub fn take(mut self) -> Option<P::Item> {
        self.item.take()
    }
}

impl<P: Pool> Deref for SharedPooled<'_, P> {
    type Target = P::Item;

    fn deref(&self) -> &Self::Target {
        self.item.as_ref().expect("item already returned to the pool")
    }
}

impl<P: Pool> DerefMut for SharedPooled<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.item.as_mut().expect("item already returned to the pool")
    }
}

impl<P: Pool> Drop for SharedPooled<'_, P> {
    fn drop(&mut self) {
        self.exit();
    }
}
