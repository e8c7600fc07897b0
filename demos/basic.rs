//! Example demonstrating the #[memoize] attribute.
//!
//! Run with `RUST_LOG=memora_core=debug` to see hits, misses and stores.

use memora::{memoize, InMemoryEngine, VolatileEngine};
use std::thread;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[memoize(engine = InMemoryEngine::new(5))]
fn expensive_computation(n: u32) -> u32 {
    println!("Computing for n = {}", n);
    // Simulate expensive work
    thread::sleep(Duration::from_millis(100));
    n * n
}

#[memoize(engine = VolatileEngine::new(), expiry = 1)]
fn current_price(symbol: &str) -> f64 {
    println!("Fetching price for {}", symbol);
    thread::sleep(Duration::from_millis(50));
    if symbol == "ACME" {
        12.5
    } else {
        1.0
    }
}

#[memoize(engine = InMemoryEngine::new(10))]
fn parse_port(raw: &str) -> Result<u16, String> {
    println!("Parsing {:?}", raw);
    raw.parse().map_err(|e| format!("{}: {}", raw, e))
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memora_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Memoize Example ===\n");

    println!("First set of calls (cache misses):");
    expensive_computation(5);
    expensive_computation(10);

    println!("\nRepeated calls (cache hits):");
    expensive_computation(5);
    expensive_computation(10);

    println!("\n--- Expiry ---");
    println!("ACME: {}", current_price("ACME"));
    println!("ACME: {} (cached)", current_price("ACME"));
    thread::sleep(Duration::from_millis(1100));
    println!("ACME: {} (expired, fetched again)", current_price("ACME"));

    println!("\n--- Result caching ---");
    println!("{:?}", parse_port("8080"));
    println!("{:?} (cached)", parse_port("8080"));
    println!("{:?}", parse_port("eighty"));
    println!("{:?} (errors are not cached)", parse_port("eighty"));

    #[cfg(feature = "stats")]
    {
        for name in ["expensive_computation", "current_price", "parse_port"] {
            if let Some(stats) = memora::stats_registry::get(name) {
                println!("\n📊 {}:", name);
                println!("  Hits:     {}", stats.hits());
                println!("  Misses:   {}", stats.misses());
                println!("  Hit rate: {:.2}%", stats.hit_rate() * 100.0);
                println!("  Engine failures: {}", stats.engine_failures());
            }
        }
    }
}
