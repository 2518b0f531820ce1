//! Basic usage examples for the pools

use resource_pool::{EagerPool, LazyPool, Pool, PoolError};

fn main() {
    println!("=== resource_pool - Basic Examples ===\n");

    // Example 1: Eager pool cycling FIFO
    eager_pool();

    // Example 2: Lazy pool reusing LIFO
    lazy_pool();

    // Example 3: Scoped acquisition
    scoped();
}

fn eager_pool() {
    println!("1. Eager Pool:");
    let mut next = 0;
    let mut pool = EagerPool::from_fn(
        || {
            next += 1;
            format!("buffer-{next}")
        },
        3,
    )
    .unwrap();

    let first = pool.acquire().unwrap();
    println!("   Got: {}", first);
    pool.get_back(first);
    println!("   Next in line: {}", pool.acquire().unwrap());
    println!("   Available: {}/{}\n", pool.count(), pool.size());
}

fn lazy_pool() {
    println!("2. Lazy Pool:");
    let mut pool = LazyPool::from_fn(|hint| format!("conn-{hint}"), 2).unwrap();
    println!("   Created before first acquire: {}", pool.created());

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    match pool.acquire() {
        Err(PoolError::Exhausted) => println!("   Third acquire: exhausted"),
        other => println!("   Third acquire: {:?}", other),
    }

    pool.get_back(a);
    pool.get_back(b);
    println!("   Reused most recent: {}\n", pool.acquire().unwrap());
}

fn scoped() {
    println!("3. Scoped Acquisition:");
    let mut pool = EagerPool::from_fn(|| vec![0u8; 16], 2).unwrap();

    {
        let mut buffer = pool.pooled().unwrap();
        buffer[0] = 42;
        println!("   Available while held: {}", buffer.pool().count());
        // Buffer automatically returned when dropped
    }

    println!("   Available after scope: {}", pool.count());
}
