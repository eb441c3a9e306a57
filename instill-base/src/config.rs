use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use instill::{ServiceIdentifier, StdError};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Identifier under which [`instantiation_service`](crate::instantiation_service)
/// registers the configuration it was built from.
pub static CONFIG: ServiceIdentifier<Arc<Config>> = ServiceIdentifier::new("config");

/// Application configuration, made of named JSON sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub(crate) sections: BTreeMap<String, serde_json::Value>,
}

/// A typed configuration section stored under a fixed key.
pub trait ConfigSection: DeserializeOwned {
    fn key() -> &'static str;
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserializes the section `name`; a missing section reads as `null`.
    pub fn get<T>(&self, name: impl AsRef<str>) -> Result<T, StdError>
    where
        T: DeserializeOwned,
    {
        Ok(serde_json::from_value(
            self.sections
                .get(name.as_ref())
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        )?)
    }

    /// Reads a typed section, falling back to its default when absent.
    pub fn section<T>(&self) -> Result<T, StdError>
    where
        T: ConfigSection + Default,
    {
        Ok(self.get::<Option<T>>(T::key())?.unwrap_or_default())
    }

    pub fn set<T>(&mut self, name: impl Into<String>, value: T) -> Result<(), StdError>
    where
        T: Serialize,
    {
        self.sections
            .insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Builder form of [`set`](Self::set).
    ///
    /// A value that cannot be represented as JSON is stored as `null`.
    pub fn with<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.sections.insert(name.into(), value);
        self
    }

    /// Deep-merges `other` into this configuration.
    ///
    /// Objects are merged key by key, arrays are concatenated and any other
    /// value is replaced.
    pub fn merge_from(&mut self, other: Self) -> Result<(), StdError> {
        for (key, value) in other.sections {
            let entry = self.sections.entry(key);
            merge_json_from(entry.or_insert(serde_json::Value::Null), value)?;
        }
        Ok(())
    }

    pub fn parse<T>(text: T) -> Result<Self, StdError>
    where
        T: AsRef<str>,
    {
        Ok(serde_json::from_str(text.as_ref())?)
    }

    pub fn parse_file(path: impl AsRef<Path>) -> Result<Self, StdError> {
        let path = path.as_ref();
        tracing::debug!(path = ?path, "Reading config file");
        let text = std::fs::read_to_string(path)?;
        Self::parse(text)
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

fn merge_json_from(lhs: &mut serde_json::Value, rhs: serde_json::Value) -> Result<(), StdError> {
    match lhs {
        serde_json::Value::Object(l) => match rhs {
            serde_json::Value::Object(r) => {
                for (key, value) in r {
                    let entry = l.entry(key);
                    merge_json_from(entry.or_insert(serde_json::Value::Null), value)?;
                }
            }
            _ => *lhs = rhs,
        },
        serde_json::Value::Array(l) => match rhs {
            serde_json::Value::Array(r) => l.extend(r),
            _ => *lhs = rhs,
        },
        _ => *lhs = rhs,
    }
    Ok(())
}
