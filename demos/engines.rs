//! Example comparing engines behind the same decorator.
//!
//! The engine can also be picked from the environment:
//! `MEMORA_ENGINE=disk MEMORA_DISK_PATH=/tmp/memora cargo run --example engines`

use memora::{
    Args, CacheEngine, CacheError, DiskEngine, EngineConfig, EvictionPolicy, Expiry,
    InMemoryEngine, Memoize, Result,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stand-in for a networked cache: prints every expiry it receives.
#[derive(Default)]
struct LoggingRemote {
    data: Mutex<HashMap<String, String>>,
}

impl CacheEngine<String> for LoggingRemote {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String, expiry: Expiry) -> Result<()> {
        println!("  remote SET {} (expiry: {:?})", key, expiry);
        self.data.lock().insert(key.to_string(), value);
        Ok(())
    }
}

fn slow_upper(text: &str) -> String {
    std::thread::sleep(Duration::from_millis(50));
    text.to_uppercase()
}

fn run(label: &str, memo: &Memoize<String>) -> Result<()> {
    println!("\n--- {} ---", label);
    for text in ["hello", "world", "hello"] {
        let args = Args::new().arg(text);
        let value = memo.get_or_compute("upper", &args, || slow_upper(text))?;
        println!("  upper({:?}) = {:?}", text, value);
    }
    #[cfg(feature = "stats")]
    println!(
        "  hits: {}, misses: {}",
        memo.stats().hits(),
        memo.stats().misses()
    );
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memora_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Engine Comparison ===");

    let lru = Memoize::new(
        InMemoryEngine::new(100)
            .with_policy(EvictionPolicy::LRU)
            .with_ttl(Duration::from_secs(60)),
    );
    run("InMemoryEngine (LRU, ttl 60s)", &lru)?;

    let disk_dir = std::env::temp_dir().join("memora-demo");
    let disk = Memoize::new(DiskEngine::open(&disk_dir)?).with_expiry(Some(Duration::from_secs(300)));
    run(&format!("DiskEngine ({})", disk_dir.display()), &disk)?;

    let remote = Memoize::new(LoggingRemote::default()).with_expiry(Some(Duration::from_secs(10)));
    run("User backend", &remote)?;

    let configured = Memoize::from_shared(EngineConfig::from_env()?.build()?);
    run("EngineConfig::from_env()", &configured)?;

    println!("\n--- Rejected expiry ---");
    let strict = InMemoryEngine::new(10);
    match strict.set("k", "v".to_string(), Some(Duration::from_secs(10))) {
        Err(err @ CacheError::UnsupportedExpiry { .. }) => println!("  {}", err),
        other => println!("  unexpected: {:?}", other),
    }

    Ok(())
}
