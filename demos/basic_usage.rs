//! Basic usage example of the cache registry.

use cache_registry::{error::Result, Cache};
use serde_json::json;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Cache Registry - Basic Example ===\n");

    // 1. Build the cache and create two instances
    println!("1. Creating cache instances...");
    let cache = Cache::new();

    let dir = std::env::temp_dir().join("cache-registry-demo");
    let file_options = json!({
        "path": dir.to_string_lossy(),
        "default_expiration": 600,
        "autopurge_expired": true
    });
    let memory_options = json!({ "default_expiration": 60 });

    cache.create("file", file_options.as_object().expect("object"), Some("disk"))?;
    cache.create("memory", memory_options.as_object().expect("object"), Some("sessions"))?;
    println!("   ✓ Namespaces: {:?}", cache.registry().namespaces());
    println!("   ✓ Default instance: {}\n", cache.instance(None)?.driver_name());

    // 2. Direct access on a named instance
    println!("2. Writing to the disk instance:");
    let disk = cache.instance(Some("disk"))?;
    disk.set("report:2024", json!({ "rows": 1200 }), Some(3600))?;
    println!("   ✓ report:2024 = {}\n", disk.get("report:2024", None)?);

    // 3. Generic calls - namespace first, or straight to the default
    println!("3. Generic calls:");
    cache.call(&[json!("sessions"), json!("set"), json!("sid:42"), json!("alice")])?;
    let user = cache.call(&[json!("get"), json!("sid:42")])?;
    println!("   ✓ sid:42 -> {} (via default instance)", user);

    let missing = cache.call(&[json!("get"), json!("sid:99"), json!("anonymous")])?;
    println!("   ✓ sid:99 -> {} (caller default)\n", missing);

    // 4. Hashing helper for key building
    println!("4. Hashing:");
    println!("   ✓ sha1(user@example.com) = {}\n", cache.hash("user@example.com", "sha1")?);

    // 5. Teardown
    println!("5. Shutting down:");
    cache.shutdown()?;
    println!("   ✓ All instances torn down");

    let _ = std::fs::remove_dir_all(dir);

    println!("\n=== Example Complete ===\n");

    Ok(())
}
