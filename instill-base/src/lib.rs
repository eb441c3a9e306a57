//! # instill-base
//!
//! Configuration and logging for applications built on the instill resolver.
//!
//! ## Core Components
//!
//! - **Configuration System**: JSON configuration sections, loading and deep merging
//! - **Tracing Integration**: `tracing` subscriber setup with a reloadable level filter
//! - **Configured Resolver**: building an `InstantiationService` from configuration
//!
//! ## Configuration Example
//!
//! ```rust
//! use instill::ServiceCollection;
//! use instill_base::{CONFIG, Config, instantiation_service};
//!
//! let config = Config::parse(r#"{ "instantiation": { "strict": true } }"#).unwrap();
//! let service = instantiation_service(&config, ServiceCollection::new()).unwrap();
//! assert!(service.options().strict);
//!
//! let config = service
//!     .invoke_function(|accessor| accessor.get(&CONFIG))
//!     .unwrap();
//! assert_eq!(config.len(), 1);
//! ```

mod config;
mod tracing;

pub use config::*;
pub use tracing::*;

use std::sync::Arc;

use instill::{
    DEFAULT_CYCLE_LIMIT, InstantiationOptions, InstantiationService, ServiceCollection, StdError,
};
use serde::{Deserialize, Serialize};

/// Resolver settings, read from the `instantiation` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstantiationConfig {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default = "default_cycle_limit")]
    pub cycle_limit: usize,
}

impl Default for InstantiationConfig {
    fn default() -> Self {
        Self {
            strict: false,
            trace: false,
            cycle_limit: default_cycle_limit(),
        }
    }
}

impl ConfigSection for InstantiationConfig {
    fn key() -> &'static str {
        "instantiation"
    }
}

impl From<InstantiationConfig> for InstantiationOptions {
    fn from(value: InstantiationConfig) -> Self {
        Self {
            strict: value.strict,
            trace: value.trace,
            cycle_limit: value.cycle_limit,
        }
    }
}

fn default_cycle_limit() -> usize {
    DEFAULT_CYCLE_LIMIT
}

/// Builds a root resolver configured from `config`.
///
/// The configuration itself is registered under [`CONFIG`] unless `services`
/// already provides it.
pub fn instantiation_service(
    config: &Config,
    services: ServiceCollection,
) -> Result<InstantiationService, StdError> {
    let options: InstantiationConfig = config.section()?;
    if !services.has(CONFIG.id()) {
        services.set_instance(&CONFIG, Arc::new(config.clone()));
    }
    Ok(InstantiationService::with_options(services, options.into()))
}
