//! Async retry against a shared pool

use resource_pool::{EagerPool, RetryConfiguration, SharedPool};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    println!("=== resource_pool - Async Examples ===\n");

    let pool = Arc::new(SharedPool::new(EagerPool::from_fn(|| "session-token", 1).unwrap()));
    let retry = RetryConfiguration::new(Duration::from_secs(1), Duration::from_millis(5))
        .with_end(Duration::from_millis(50))
        .with_slope(2.0)
        .build()
        .unwrap();

    let held = pool.acquire().unwrap();
    println!("1. Token held elsewhere, count = {}", pool.count());

    let releaser = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            pool.get_back(held);
        })
    };

    let token = retry
        .call_async(|| {
            let item = pool.acquire().ok();
            async move { item }
        })
        .await;
    println!("2. Acquired after waiting: {:?}", token);

    releaser.await.unwrap();
    if let Some(token) = token {
        pool.get_back(token);
    }

    let metrics = pool.metrics();
    println!("3. Exhausted events while waiting: {}", metrics.exhausted_events);
    println!("   Available: {}", pool.count());
}
