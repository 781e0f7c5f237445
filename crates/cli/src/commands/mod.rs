//! Command implementations.

pub mod build;
pub mod offline;
pub mod worker;

use anyhow::Result;
use snipshelf_client::registration::{Registration, RegistrationPolicy};
use snipshelf_core::AppConfig;

pub fn register(config: &AppConfig) -> Result<()> {
    match RegistrationPolicy::from_config(config).decide(&config.origin)? {
        Registration::Register { script_url, scope } => {
            println!("register {script_url} (scope {scope})");
        }
        Registration::Skip { environment } => {
            println!("skip: worker disabled in {environment} (set SNIPSHELF_ENABLE_WORKER=true to opt in)");
        }
    }
    Ok(())
}
