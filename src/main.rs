// resource_pool demo
// This is just a binary wrapper - the actual library is in lib.rs

use resource_pool::{EagerPool, LazyPool, MetricsExporter, Pool, RetryConfiguration, SharedPool};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== resource_pool ===");
    println!();

    println!("Eager pool (FIFO):");
    let mut names = vec!["third", "second", "first"];
    let mut eager = EagerPool::from_fn(|| names.pop().unwrap_or("spare"), 3)?;
    {
        let item = eager.pooled()?;
        println!("  Got item: {}", *item);
        println!("  Available while held: {}", item.pool().count());
    }
    println!("  Available after return: {}", eager.count());
    println!();

    println!("Lazy pool (LIFO):");
    let mut lazy = LazyPool::from_fn(|hint| format!("conn-{hint}"), 2)?;
    let first = lazy.acquire()?;
    println!("  Created: {} (created so far: {})", first, lazy.created());
    lazy.get_back(first);
    println!("  Reused: {}", *lazy.pooled()?);
    println!();

    println!("Retry on an exhausted shared pool:");
    let shared = SharedPool::new(EagerPool::from_fn(|| 42, 1)?);
    let retry = RetryConfiguration::new(Duration::from_millis(50), Duration::from_millis(5))
        .with_end(Duration::from_millis(20))
        .with_slope(2.0)
        .build()?;
    let held = shared.acquire()?;
    match shared.acquire_within(&retry) {
        Ok(_) => println!("  Unexpectedly acquired"),
        Err(err) => println!("  Gave up: {err}"),
    }
    shared.get_back(held);
    println!();

    print!("{}", MetricsExporter::export_prometheus(&shared.metrics(), "demo", None));
    Ok(())
}
