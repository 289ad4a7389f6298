//! Database initialization command

use lyceum_core::{error::Result, LyceumConfig};
use tracing::debug;

use super::helpers::open_storage;

/// Create the database (if missing) and apply migrations
pub async fn handle(config: &LyceumConfig) -> Result<()> {
    debug!("Initializing database...");

    // Parent directories are created by the storage layer
    let storage = open_storage(config, true).await?;
    storage.check_database_health().await?;

    println!("Database initialized: {}", config.db_path());
    Ok(())
}
