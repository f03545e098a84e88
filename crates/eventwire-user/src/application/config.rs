//! Outbox configuration loaded from environment variables.

use eventwire_core::error::ConfigError;
use serde::Deserialize;

const SOURCE_KEY: &str = "EVENTWIRE_SOURCE";
const ENVIRONMENT_KEY: &str = "EVENTWIRE_ENVIRONMENT";
const TOPIC_KEY: &str = "EVENTWIRE_TOPIC";

/// Where staged User events are published and how they are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutboxConfig {
    /// Producing service, written to every envelope's `source`.
    pub source: String,
    /// Deployment environment prefixed to the default topic.
    pub environment: String,
    /// Explicit topic; when unset the topic is derived from `environment`.
    pub topic: Option<String>,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            source: "user".to_owned(),
            environment: "dev".to_owned(),
            topic: None,
        }
    }
}

impl OutboxConfig {
    /// Reads `EVENTWIRE_SOURCE`, `EVENTWIRE_ENVIRONMENT` and `EVENTWIRE_TOPIC`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a blank value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], reading through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to a blank value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            source: non_blank(&lookup, SOURCE_KEY)?.unwrap_or(defaults.source),
            environment: non_blank(&lookup, ENVIRONMENT_KEY)?.unwrap_or(defaults.environment),
            topic: non_blank(&lookup, TOPIC_KEY)?,
        })
    }

    /// The topic User events are published to.
    #[must_use]
    pub fn topic(&self) -> String {
        self.topic
            .clone()
            .unwrap_or_else(|| format!("{}.user.domain-event.user.v1", self.environment))
    }
}

fn non_blank(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Err(ConfigError {
            key,
            reason: "must not be blank".to_owned(),
        }),
        Some(raw) => Ok(Some(raw.trim().to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = OutboxConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, OutboxConfig::default());
        assert_eq!(config.source, "user");
        assert_eq!(config.topic(), "dev.user.domain-event.user.v1");
    }

    #[test]
    fn test_environment_drives_the_default_topic() {
        let config =
            OutboxConfig::from_lookup(lookup_from(&[("EVENTWIRE_ENVIRONMENT", "prod")])).unwrap();

        assert_eq!(config.topic(), "prod.user.domain-event.user.v1");
    }

    #[test]
    fn test_topic_override_wins() {
        let config = OutboxConfig::from_lookup(lookup_from(&[
            ("EVENTWIRE_ENVIRONMENT", "prod"),
            ("EVENTWIRE_TOPIC", "custom.users"),
            ("EVENTWIRE_SOURCE", "user-service"),
        ]))
        .unwrap();

        assert_eq!(config.topic(), "custom.users");
        assert_eq!(config.source, "user-service");
    }

    #[test]
    fn test_blank_value_is_rejected() {
        let err = OutboxConfig::from_lookup(lookup_from(&[("EVENTWIRE_SOURCE", "  ")]))
            .unwrap_err();

        assert_eq!(err.key, "EVENTWIRE_SOURCE");
    }

    #[test]
    fn test_deserialize_fills_missing_fields_with_defaults() {
        let config: OutboxConfig = serde_json::from_str(r#"{"environment":"stage"}"#).unwrap();

        assert_eq!(config.source, "user");
        assert_eq!(config.topic(), "stage.user.domain-event.user.v1");
    }
}
