//! Secret resolution with in-process caching.
//!
//! Provider API keys are looked up by name through a `SecretStore`
//! capability so the rest of the pipeline never touches the environment
//! directly. Resolved values are cached for the life of the process.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Capability for resolving named secrets (API keys).
pub trait SecretStore: Send + Sync {
    /// Resolve a secret by name.
    fn get(&self, name: &str) -> Result<String, ConfigError>;
}

/// Secret store backed by process environment variables, with a cache.
#[derive(Default)]
pub struct EnvSecrets {
    cache: Mutex<HashMap<String, String>>,
}

impl EnvSecrets {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for EnvSecrets {
    fn get(&self, name: &str) -> Result<String, ConfigError> {
        let mut cache = self.cache.lock().expect("secrets cache poisoned");
        if let Some(value) = cache.get(name) {
            return Ok(value.clone());
        }
        let value = std::env::var(name).map_err(|_| ConfigError::SecretNotFound {
            name: name.to_string(),
        })?;
        cache.insert(name.to_string(), value.clone());
        Ok(value)
    }
}

/// Fixed-map secret store for tests and embedding.
pub struct StaticSecrets {
    values: HashMap<String, String>,
}

impl StaticSecrets {
    /// Build from `(name, value)` pairs.
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretStore for StaticSecrets {
    fn get(&self, name: &str) -> Result<String, ConfigError> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::SecretNotFound {
                name: name.to_string(),
            })
    }
}
