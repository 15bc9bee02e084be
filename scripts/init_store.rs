// Installation utility that creates the device status table.
// Usage: cargo run --bin init_store -- <optional-database-url>
// Without an argument the configured store URL is used.

use arduino_serial::config::ConfigLoader;
use arduino_serial::SqlStatusStore;
use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut store = ConfigLoader::load()?.into_config().store;
    if let Some(url) = env::args().nth(1) {
        store.url = url;
    }
    SqlStatusStore::ensure_schema(&store).await?;
    println!("Table {} ready at {}", store.table, store.url);
    Ok(())
}
