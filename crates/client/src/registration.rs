//! Whether and where the worker is registered.

use crate::fetch::{Url, UrlError, parse_origin, resolve};
use snipshelf_core::{AppConfig, Environment};

/// Root-relative URL the worker script is registered at.
pub const WORKER_URL: &str = "/sw.js";

/// Outcome of the registration check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Register { script_url: Url, scope: Url },
    Skip { environment: Environment },
}

/// Registers in production-like environments, or anywhere when explicitly
/// enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    pub environment: Environment,
    pub enable_worker: bool,
}

impl RegistrationPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { environment: config.environment, enable_worker: config.enable_worker }
    }

    pub fn should_register(&self) -> bool {
        self.environment.is_production_like() || self.enable_worker
    }

    /// Decide for a deployment at `origin`.
    pub fn decide(&self, origin: &str) -> Result<Registration, UrlError> {
        if !self.should_register() {
            tracing::debug!(environment = %self.environment, "skipping worker registration");
            return Ok(Registration::Skip { environment: self.environment });
        }

        let scope = parse_origin(origin)?;
        let script_url = resolve(&scope, WORKER_URL)?;
        tracing::info!("registering worker {} for scope {}", script_url, scope);
        Ok(Registration::Register { script_url, scope })
    }
}
