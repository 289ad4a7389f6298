//! Configuration inspection command

use clap::Subcommand;
use lyceum_core::{error::Result, LyceumConfig};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML (secrets redacted)
    Show,

    /// Print the effective database path
    DbPath,
}

/// Handle configuration command
pub async fn handle(action: ConfigAction, config: &LyceumConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigAction::DbPath => {
            println!("{}", config.db_path());
        }
    }
    Ok(())
}
