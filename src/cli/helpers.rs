//! Shared helper functions for CLI commands

use lyceum_core::{
    api::EventBroadcaster, error::Result, services::Lms, storage::libsql::LibsqlStorage,
    LyceumConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Load configuration, letting `--db-path` override the configured database
pub fn load_config(config_path: Option<&Path>, db_path: Option<String>) -> Result<LyceumConfig> {
    let mut config = LyceumConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    Ok(config)
}

/// Open the configured database; it must already exist unless `create` is set
pub async fn open_storage(config: &LyceumConfig, create: bool) -> Result<Arc<LibsqlStorage>> {
    let db_path = config.db_path();
    debug!("Opening database at {}", db_path);
    Ok(Arc::new(LibsqlStorage::from_path(&db_path, create).await?))
}

/// Storage plus the service layer on top of it
pub async fn open_lms(config: &LyceumConfig) -> Result<Arc<Lms>> {
    let storage = open_storage(config, false).await?;
    let events = EventBroadcaster::new(config.server.event_capacity);
    Ok(Arc::new(Lms::new(storage, events, config)?))
}

/// Shorten an id for table output
pub fn short_id(id: &impl std::fmt::Display) -> String {
    id.to_string().chars().take(8).collect()
}
