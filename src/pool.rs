//! Core pool implementations

use crate::errors::{PoolError, PoolResult};
use crate::metrics::{MetricsTracker, PoolMetrics};

use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Common contract of the fixed-capacity pools.
///
/// Pools are not synchronized: every mutating call takes `&mut self`. Wrap a
/// pool in [`SharedPool`](crate::SharedPool) to use it from several threads.
///
/// Items handed out by [`acquire`](Pool::acquire) must be handed back
/// exactly once through [`get_back`](Pool::get_back). The pool does not
/// check where a returned item came from.
pub trait Pool {
    /// The pooled item type. The pool never inspects it.
    type Item;

    /// Error produced by the item factory.
    type Error;

    /// Take an item out of the pool without blocking.
    fn acquire(&mut self) -> PoolResult<Self::Item, Self::Error>;

    /// Hand an item back to the pool.
    fn get_back(&mut self, item: Self::Item);

    /// Maximum number of items the pool ever tracks.
    fn size(&self) -> usize;

    /// Number of units `acquire` can still hand out.
    fn count(&self) -> usize;

    /// Snapshot of the pool counters.
    fn metrics(&self) -> PoolMetrics;

    /// Acquire an item inside a scope that returns it on exit.
    fn pooled(&mut self) -> PoolResult<Pooled<'_, Self>, Self::Error>
    where
        Self: Sized,
    {
        Pooled::enter(self)
    }
}

/// Pool filled up front, cycling items in FIFO order.
///
/// # Examples
///
/// ```
/// use resource_pool::{EagerPool, Pool};
///
/// let mut pool = EagerPool::from_fn(|| String::from("conn"), 2).unwrap();
/// assert_eq!(pool.count(), 2);
///
/// let conn = pool.acquire().unwrap();
/// assert_eq!(pool.count(), 1);
///
/// pool.get_back(conn);
/// assert_eq!(pool.count(), 2);
/// ```
pub struct EagerPool<T, E = Infallible> {
    items: VecDeque<T>,
    capacity: usize,
    metrics: MetricsTracker,
    _error: PhantomData<fn() -> E>,
}

impl<T, E> EagerPool<T, E> {
    /// Create a pool by calling `factory` exactly `capacity` times.
    ///
    /// The first factory error aborts construction; items created before it
    /// are dropped.
    pub fn new<F>(mut factory: F, capacity: usize) -> PoolResult<Self, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        let mut items = VecDeque::with_capacity(capacity);
        let mut metrics = MetricsTracker::new();

        for _ in 0..capacity {
            match factory() {
                Ok(item) => {
                    items.push_back(item);
                    metrics.record_created();
                }
                Err(err) => {
                    tracing::warn!(
                        created = items.len(),
                        capacity,
                        "eager pool fill aborted by factory error"
                    );
                    return Err(PoolError::Factory(err));
                }
            }
        }

        tracing::debug!(capacity, "eager pool filled");

        Ok(Self {
            items,
            capacity,
            metrics,
            _error: PhantomData,
        })
    }
}

impl<T> EagerPool<T> {
    /// Create a pool from an infallible factory.
    pub fn from_fn<F>(mut factory: F, capacity: usize) -> PoolResult<Self>
    where
        F: FnMut() -> T,
    {
        Self::new(move || Ok(factory()), capacity)
    }

    /// Create a pool holding the given items; capacity is their number.
    pub fn from_items(items: Vec<T>) -> PoolResult<Self> {
        if items.is_empty() {
            return Err(PoolError::ZeroCapacity);
        }

        Ok(Self {
            capacity: items.len(),
            items: items.into(),
            metrics: MetricsTracker::new(),
            _error: PhantomData,
        })
    }
}

impl<T, E> Pool for EagerPool<T, E> {
    type Item = T;
    type Error = E;

    fn acquire(&mut self) -> PoolResult<T, E> {
        match self.items.pop_front() {
            Some(item) => {
                self.metrics.record_acquired();
                Ok(item)
            }
            None => {
                self.metrics.record_exhausted();
                Err(PoolError::Exhausted)
            }
        }
    }

    fn get_back(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            tracing::warn!(
                capacity = self.capacity,
                "item returned to a full eager pool was dropped"
            );
            return;
        }
        self.items.push_back(item);
        self.metrics.record_returned();
    }

    fn size(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn metrics(&self) -> PoolMetrics {
        self.metrics.snapshot(self.items.len(), self.capacity)
    }
}

impl<T, E> fmt::Debug for EagerPool<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EagerPool")
            .field("capacity", &self.capacity)
            .field("count", &self.items.len())
            .finish()
    }
}

/// Pool that creates items on demand and reuses returned items LIFO.
///
/// The factory receives the creation index of the item it builds: 0 for the
/// first item, then 1, 2 and so on up to `capacity - 1`.
///
/// # Examples
///
/// ```
/// use resource_pool::{LazyPool, Pool};
///
/// let mut pool = LazyPool::from_fn(|hint| hint * 10, 3).unwrap();
/// assert_eq!(pool.created(), 0);
///
/// let first = pool.acquire().unwrap();
/// assert_eq!(first, 0);
///
/// pool.get_back(first);
/// assert_eq!(pool.acquire().unwrap(), 0);
/// assert_eq!(pool.created(), 1);
/// ```
pub struct LazyPool<T, F, E = Infallible> {
    factory: F,
    cached: Vec<T>,
    created: usize,
    capacity: usize,
    metrics: MetricsTracker,
    _error: PhantomData<fn() -> E>,
}

impl<T, F, E> LazyPool<T, F, E>
where
    F: FnMut(usize) -> Result<T, E>,
{
    /// Reserve `capacity` slots. The factory is not called here.
    pub fn new(factory: F, capacity: usize) -> PoolResult<Self, E> {
        if capacity == 0 {
            return Err(PoolError::ZeroCapacity);
        }

        Ok(Self {
            factory,
            cached: Vec::with_capacity(capacity),
            created: 0,
            capacity,
            metrics: MetricsTracker::new(),
            _error: PhantomData,
        })
    }

    /// Number of items the factory has built so far.
    pub fn created(&self) -> usize {
        self.created
    }

    fn on_loan(&self) -> usize {
        self.created - self.cached.len()
    }
}

impl<T> LazyPool<T, fn(usize) -> Result<T, Infallible>> {
    /// Create a lazy pool from an infallible factory.
    #[allow(clippy::type_complexity)]
    pub fn from_fn<G>(
        mut factory: G,
        capacity: usize,
    ) -> PoolResult<LazyPool<T, impl FnMut(usize) -> Result<T, Infallible>>>
    where
        G: FnMut(usize) -> T,
    {
        LazyPool::new(move |hint| Ok(factory(hint)), capacity)
    }
}

impl<T, F, E> Pool for LazyPool<T, F, E>
where
    F: FnMut(usize) -> Result<T, E>,
{
    type Item = T;
    type Error = E;

    fn acquire(&mut self) -> PoolResult<T, E> {
        if let Some(item) = self.cached.pop() {
            self.metrics.record_acquired();
            return Ok(item);
        }

        if self.created >= self.capacity {
            self.metrics.record_exhausted();
            return Err(PoolError::Exhausted);
        }

        let hint = self.created;
        match (self.factory)(hint) {
            Ok(item) => {
                self.created += 1;
                self.metrics.record_created();
                self.metrics.record_acquired();
                tracing::debug!(hint, capacity = self.capacity, "lazy pool created item");
                Ok(item)
            }
            Err(err) => {
                // The slot stays unmaterialised so a later acquire can retry it.
                self.metrics.record_factory_failure();
                tracing::warn!(hint, "lazy pool factory failed");
                Err(PoolError::Factory(err))
            }
        }
    }

    fn get_back(&mut self, item: T) {
        if self.on_loan() == 0 {
            tracing::warn!(
                capacity = self.capacity,
                "item returned to a lazy pool with nothing on loan was dropped"
            );
            return;
        }
        self.cached.push(item);
        self.metrics.record_returned();
    }

    fn size(&self) -> usize {
        self.capacity
    }

    fn count(&self) -> usize {
        self.capacity - self.on_loan()
    }

    fn metrics(&self) -> PoolMetrics {
        self.metrics.snapshot(self.count(), self.capacity)
    }
}

impl<T, F, E> fmt::Debug for LazyPool<T, F, E>
where
    F: FnMut(usize) -> Result<T, E>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPool")
            .field("capacity", &self.capacity)
            .field("created", &self.created)
            .field("cached", &self.cached.len())
            .field("count", &self.count())
            .finish()
    }
}

/// An item acquired for the duration of a scope.
///
/// The item goes back to the pool exactly once: on [`exit`](Pooled::exit)
/// or when the guard is dropped, including during unwinding.
///
/// # Examples
///
/// ```
/// use resource_pool::{EagerPool, Pool};
///
/// let mut pool = EagerPool::from_fn(|| 1, 10).unwrap();
/// {
///     let item = pool.pooled().unwrap();
///     assert_eq!(*item, 1);
///     assert_eq!(item.pool().count(), 9);
/// }
/// assert_eq!(pool.count(), 10);
/// ```
pub struct Pooled<'a, P: Pool> {
    pool: &'a mut P,
    item: Option<P::Item>,
}

impl<'a, P: Pool> Pooled<'a, P> {
    /// Acquire an item from `pool` and hold it.
    pub fn enter(pool: &'a mut P) -> PoolResult<Self, P::Error> {
        let item = pool.acquire()?;
        Ok(Self {
            pool,
            item: Some(item),
        })
    }

    /// Return the held item to the pool. A second call does nothing.
    pub fn exit(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.get_back(item);
        }
    }

    /// Whether the item is still held by this scope.
    pub fn is_held(&self) -> bool {
        self.item.is_some()
    }

    /// The held item, if the scope has not exited yet.
    pub fn get(&self) -> Option<&P::Item> {
        self.item.as_ref()
    }

    /// Mutable access to the held item.
    pub fn get_mut(&mut self) -> Option<&mut P::Item> {
        self.item.as_mut()
    }

    /// Read access to the pool the item came from.
    pub fn pool(&self) -> &P {
        &*self.pool
    }

    /// Detach the item from the scope. The caller now owns the obligation
    /// to hand it back.
    pub fn take(mut self) -> Option<P::Item> {
        self.item.take()
    }
}

impl<P: Pool> Deref for Pooled<'_, P> {
    type Target = P::Item;

    fn deref(&self) -> &Self::Target {
        self.item.as_ref().expect("item already returned to the pool")
    }
}

impl<P: Pool> DerefMut for Pooled<'_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.item.as_mut().expect("item already returned to the pool")
    }
}

impl<P: Pool> Drop for Pooled<'_, P> {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_eager_init() {
        let pool = EagerPool::from_fn(|| 1, 10).unwrap();
        assert_eq!(pool.size(), 10);
        assert_eq!(pool.count(), 10);
    }

    #[test]
    fn test_eager_acquire_and_get_back() {
        let mut pool = EagerPool::from_fn(|| 1, 10).unwrap();

        let item = pool.acquire().unwrap();
        assert_eq!(item, 1);
        assert_eq!(pool.size(), 10);
        assert_eq!(pool.count(), 9);

        pool.get_back(item);
        assert_eq!(pool.count(), 10);
    }

    #[test]
    fn test_eager_fifo_order() {
        let mut source = vec![3, 2, 1];
        let mut pool = EagerPool::from_fn(|| source.pop().unwrap(), 3).unwrap();

        let first = pool.acquire().unwrap();
        assert_eq!(first, 1);
        pool.get_back(first);
        assert_eq!(pool.acquire().unwrap(), 2);
        assert_eq!(pool.acquire().unwrap(), 3);
        assert_eq!(pool.acquire().unwrap(), 1);
    }

    #[test]
    fn test_eager_exhausted() {
        let mut pool = EagerPool::from_items(vec!["a"]).unwrap();
        let item = pool.acquire().unwrap();

        assert_eq!(pool.acquire(), Err(PoolError::Exhausted));
        assert_eq!(pool.metrics().exhausted_events, 1);

        pool.get_back(item);
        assert_eq!(pool.acquire(), Ok("a"));
    }

    #[test]
    fn test_eager_factory_error_aborts() {
        let mut calls = 0;
        let result = EagerPool::new(
            || {
                calls += 1;
                if calls == 3 { Err("boom") } else { Ok(calls) }
            },
            5,
        );

        assert!(matches!(result, Err(PoolError::Factory("boom"))));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_capacity() {
        assert!(matches!(EagerPool::from_fn(|| 1, 0), Err(PoolError::ZeroCapacity)));
        assert!(matches!(LazyPool::from_fn(|_| 1, 0), Err(PoolError::ZeroCapacity)));
    }

    #[test]
    fn test_eager_overfull_get_back_is_dropped() {
        let mut pool = EagerPool::from_fn(|| 1, 2).unwrap();
        pool.get_back(7);
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_lazy_does_not_call_factory_on_construction() {
        let calls = Cell::new(0);
        let pool = LazyPool::from_fn(
            |hint| {
                calls.set(calls.get() + 1);
                hint
            },
            4,
        )
        .unwrap();

        assert_eq!(calls.get(), 0);
        assert_eq!(pool.size(), 4);
        assert_eq!(pool.count(), 4);
    }

    #[test]
    fn test_lazy_hints_and_lifo_reuse() {
        let mut pool = LazyPool::from_fn(|hint| hint, 3).unwrap();

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(pool.count(), 1);

        pool.get_back(a);
        pool.get_back(b);
        assert_eq!(pool.count(), 3);

        // Most recently returned first.
        assert_eq!(pool.acquire().unwrap(), 1);
        assert_eq!(pool.acquire().unwrap(), 0);
        assert_eq!(pool.acquire().unwrap(), 2);
        assert_eq!(pool.created(), 3);
        assert_eq!(pool.count(), 0);
        assert!(pool.acquire().unwrap_err().is_exhausted());
    }

    #[test]
    fn test_lazy_factory_error_restores_slot() {
        let mut fail = true;
        let mut pool = LazyPool::new(
            |hint| {
                if hint == 1 && fail {
                    fail = false;
                    Err(format!("cannot build {hint}"))
                } else {
                    Ok(hint)
                }
            },
            2,
        )
        .unwrap();

        let first = pool.acquire().unwrap();
        assert_eq!(pool.count(), 1);

        let err = pool.acquire().unwrap_err();
        assert_eq!(err, PoolError::Factory("cannot build 1".to_string()));
        assert_eq!(pool.count(), 1);
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.metrics().factory_failures, 1);

        assert_eq!(pool.acquire().unwrap(), 1);
        pool.get_back(first);
        assert_eq!(pool.count(), 1);
    }

    #[test]
    fn test_pooled_scope() {
        let mut pool = EagerPool::from_fn(|| 1, 10).unwrap();
        let mut pooled = Pooled::enter(&mut pool).unwrap();

        assert_eq!(*pooled, 1);
        assert_eq!(pooled.pool().count(), 9);

        pooled.exit();
        assert!(!pooled.is_held());
        assert_eq!(pooled.pool().count(), 10);

        pooled.exit();
        drop(pooled);
        assert_eq!(pool.count(), 10);
        assert_eq!(pool.metrics().total_returned, 1);
    }

    #[test]
    fn test_pooled_returns_on_panic() {
        let mut pool = LazyPool::from_fn(|hint| hint, 2).unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _item = pool.pooled().unwrap();
            panic!("scope failed");
        }));

        assert!(result.is_err());
        assert_eq!(pool.count(), 2);
    }

    #[test]
    fn test_pooled_take_detaches() {
        let mut pool = EagerPool::from_fn(|| 5, 1).unwrap();
        let item = pool.pooled().unwrap().take();

        assert_eq!(item, Some(5));
        assert_eq!(pool.count(), 0);
    }
}
