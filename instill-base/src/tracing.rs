use std::str::FromStr as _;

use instill::StdError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{Registry, reload};

use crate::ConfigSection;

/// Installed global `tracing` subscriber.
///
/// Keeps the handle needed to change the level filter afterwards.
pub struct Tracing {
    default_level: tracing::Level,
    directives: Vec<Directive>,
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Tracing {
    /// Installs the global subscriber described by `config`.
    ///
    /// Fails if the directives cannot be parsed or a global subscriber is
    /// already installed.
    pub fn init(config: &TracingConfig) -> Result<Self, StdError> {
        let directives = config.parse_directives()?;
        let (env_filter, reload_handle) =
            reload::Layer::new(new_env_filter(&directives, config.level));
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::Layer::default())
            .try_init()?;
        Ok(Self {
            default_level: config.level,
            directives,
            reload_handle,
        })
    }

    /// Replaces the level filter; `None` restores the configured level.
    pub fn set_level(&self, level: Option<tracing::Level>) -> Result<(), StdError> {
        let level = level.unwrap_or(self.default_level);
        self.reload_handle
            .reload(new_env_filter(&self.directives, level))?;
        tracing::debug!(%level, "Tracing level changed");
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    #[serde(
        serialize_with = "serialize_level",
        deserialize_with = "deserialize_level",
        default = "default_level"
    )]
    pub level: tracing::Level,
    #[serde(default)]
    pub directives: Vec<String>,
}

impl TracingConfig {
    /// Builds the filter this configuration describes.
    pub fn env_filter(&self) -> Result<EnvFilter, StdError> {
        Ok(new_env_filter(&self.parse_directives()?, self.level))
    }

    fn parse_directives(&self) -> Result<Vec<Directive>, StdError> {
        let mut directives = Vec::new();
        for directive in &self.directives {
            directives.push(directive.parse().map_err(Box::new)?);
        }
        Ok(directives)
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directives: Default::default(),
        }
    }
}

impl ConfigSection for TracingConfig {
    fn key() -> &'static str {
        "tracing"
    }
}

fn new_env_filter(directives: &[Directive], level: tracing::Level) -> EnvFilter {
    let mut filter = EnvFilter::default();
    for directive in directives {
        filter = filter.add_directive(directive.clone());
    }
    filter.add_directive(level.into())
}

fn serialize_level<S>(v: &tracing::Level, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(v.as_str())
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<tracing::Level, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    String::deserialize(deserializer)
        .and_then(|v| tracing::Level::from_str(&v).map_err(|v| Error::custom(format!("{v}"))))
}

fn default_level() -> tracing::Level {
    tracing::Level::INFO
}
