use crate::{Error, Result};
use rdkafka::error::KafkaError;
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Validated transport engine configuration.
///
/// Options keep the order they were first given in. Every option was checked
/// against librdkafka's configuration table when the value was built, so
/// creating a client from it can only fail for runtime reasons.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    entries: Vec<(String, String)>,
}

impl EngineConfig {
    /// Builds a configuration from parallel name and value sequences.
    ///
    /// Stops at the first option the engine does not accept; nothing is
    /// returned for a partially valid input.
    pub fn build<N, V>(names: &[N], values: &[V]) -> Result<Self>
    where
        N: AsRef<str>,
        V: AsRef<str>,
    {
        if names.len() != values.len() {
            return Err(Error::ConfigMismatch {
                names: names.len(),
                values: values.len(),
            });
        }

        Self::from_pairs(
            names
                .iter()
                .zip(values)
                .map(|(name, value)| (name.as_ref(), value.as_ref())),
        )
    }

    pub fn from_pairs<I, N, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (name, value) in pairs {
            config.set(name.as_ref(), value.as_ref())?;
        }
        debug!(options = config.len(), "Engine configuration built");
        Ok(config)
    }

    /// Validates and stores a single option. A repeated name keeps its
    /// original position and takes the new value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        validate_option(name, value)?;

        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((name.to_string(), value.to_string())),
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_client_config(&self) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        for (name, value) in self.iter() {
            client_config.set(name, value);
        }
        client_config
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(name, value)| {
                if is_secret(name) {
                    (name, "<redacted>")
                } else {
                    (name, value)
                }
            }))
            .finish()
    }
}

fn is_secret(name: &str) -> bool {
    name.contains("password") || name.contains("secret")
}

// librdkafka checks each option independently in rd_kafka_conf_set, so a
// single-entry native config is enough to surface the engine's verdict.
fn validate_option(name: &str, value: &str) -> Result<()> {
    let mut probe = ClientConfig::new();
    probe.set(name, value);

    match probe.create_native_config() {
        Ok(_) => Ok(()),
        Err(KafkaError::ClientConfig(_, reason, _, _)) => Err(Error::ConfigRejected {
            name: name.to_string(),
            reason,
        }),
        Err(e) => Err(Error::ConfigRejected {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Parses a `name=value` command-line override.
pub fn parse_option_override(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(Error::InvalidArgument(format!(
            "expected name=value, got '{}'",
            raw
        ))),
    }
}

/// Settings for the `kafka-batch` command-line tool.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    /// Raw librdkafka options, passed through untouched.
    #[serde(default)]
    pub client: BTreeMap<String, String>,
    #[serde(default)]
    pub consume: ConsumeSettings,
    #[serde(default)]
    pub produce: ProduceSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsumeSettings {
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProduceSettings {
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
}

impl Default for ConsumeSettings {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ProduceSettings {
    fn default() -> Self {
        Self {
            flush_timeout_ms: default_flush_timeout_ms(),
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file (if present) layered under
    /// `KAFKA_BATCH_<SECTION>__<KEY>` environment variables, e.g.
    /// `KAFKA_BATCH_CONSUME__MAX_RECORDS=50`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(path.as_ref(), None)
    }

    fn load(path: &Path, env: Option<config::Map<String, String>>) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("KAFKA_BATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// File options first, then command-line overrides, validated in that
    /// order.
    pub fn engine_config(&self, overrides: &[(String, String)]) -> Result<EngineConfig> {
        EngineConfig::from_pairs(
            self.client
                .iter()
                .chain(overrides.iter().map(|(n, v)| (n, v))),
        )
    }
}

fn default_max_records() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_flush_timeout_ms() -> u64 {
    0
}
