use std::sync::Arc;
use std::time::Duration;

use resource_pool::{EagerPool, LazyPool, Pool, PoolError, Pooled, RetryConfiguration, SharedPool};

#[derive(Debug, PartialEq)]
struct Connection {
    id: usize,
    queries: usize,
}

#[test]
fn eager_pool_cycles_in_creation_order() {
    let mut next = 0;
    let mut pool = EagerPool::from_fn(
        || {
            next += 1;
            next
        },
        3,
    )
    .unwrap();

    let mut seen = Vec::new();
    for _ in 0..6 {
        let item = pool.acquire().unwrap();
        seen.push(item);
        pool.get_back(item);
    }

    assert_eq!(seen, vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn count_stays_within_capacity() {
    let mut pool = LazyPool::from_fn(|id| Connection { id, queries: 0 }, 4).unwrap();
    let mut held = Vec::new();

    for round in 0..40 {
        if round % 3 == 2 || held.len() == pool.size() {
            if let Some(item) = held.pop() {
                pool.get_back(item);
            }
        } else {
            held.push(pool.acquire().unwrap());
        }
        assert!(pool.count() <= pool.size());
        assert_eq!(pool.count(), pool.size() - held.len());
    }
}

#[test]
fn state_survives_recycling() {
    let mut pool = LazyPool::from_fn(|id| Connection { id, queries: 0 }, 2).unwrap();

    {
        let mut conn = pool.pooled().unwrap();
        conn.queries += 5;
    }

    let conn = pool.acquire().unwrap();
    assert_eq!(conn, Connection { id: 0, queries: 5 });
}

#[test]
fn scoped_acquisition_restores_count_exactly_once() {
    let mut pool = EagerPool::from_fn(|| 1, 3).unwrap();
    let mut scope = Pooled::enter(&mut pool).unwrap();
    assert_eq!(scope.pool().count(), 2);

    scope.exit();
    scope.exit();
    assert_eq!(scope.get(), None);
    drop(scope);

    assert_eq!(pool.count(), 3);
}

#[test]
fn lazy_factory_failure_keeps_slot() {
    let mut attempts = 0;
    let mut pool = LazyPool::new(
        |hint| {
            attempts += 1;
            if attempts == 1 { Err("warming up") } else { Ok(hint) }
        },
        1,
    )
    .unwrap();

    assert_eq!(pool.acquire(), Err(PoolError::Factory("warming up")));
    assert_eq!(pool.count(), 1);
    assert_eq!(pool.acquire(), Ok(0));
    assert_eq!(pool.count(), 0);
}

#[test]
fn shared_pool_waits_for_release() {
    let pool = Arc::new(SharedPool::new(EagerPool::from_fn(|| "token", 1).unwrap()));
    let retry = RetryConfiguration::new(Duration::from_secs(2), Duration::from_millis(2))
        .with_end(Duration::from_millis(20))
        .with_slope(2.0)
        .build()
        .unwrap();

    let held = pool.acquire().unwrap();
    let releaser = {
        let pool = Arc::clone(&pool);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            pool.get_back(held);
        })
    };

    let token = pool.acquire_within(&retry).unwrap();
    assert_eq!(token, "token");
    releaser.join().unwrap();

    pool.get_back(token);
    let metrics = pool.metrics();
    assert!(metrics.exhausted_events >= 1);
    assert_eq!(metrics.total_acquired, 2);
}
