//! Codec size limits.

use eventwire_core::error::ConfigError;
use serde::Deserialize;

const MAX_FIELD_BYTES_KEY: &str = "EVENTWIRE_MAX_FIELD_BYTES";
const MAX_PAYLOAD_BYTES_KEY: &str = "EVENTWIRE_MAX_PAYLOAD_BYTES";
const MAX_DEPTH_KEY: &str = "EVENTWIRE_MAX_DEPTH";

/// Upper bounds applied while encoding and decoding.
///
/// Declared lengths are checked against these before any allocation, so a
/// corrupt length prefix cannot make the decoder reserve gigabytes.
///
/// Byte limits must be non-zero. A `max_depth` of zero allows flat records
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLimits")]
pub struct CodecLimits {
    /// Largest single string or bytes field, envelope fields included.
    pub max_field_bytes: usize,
    /// Largest payload.
    pub max_payload_bytes: usize,
    /// Deepest record nesting.
    pub max_depth: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_field_bytes: 64 * 1024,
            max_payload_bytes: 1024 * 1024,
            max_depth: 8,
        }
    }
}

/// Unchecked JSON form of [`CodecLimits`].
#[derive(Deserialize)]
#[serde(default)]
struct RawLimits {
    max_field_bytes: usize,
    max_payload_bytes: usize,
    max_depth: usize,
}

impl Default for RawLimits {
    fn default() -> Self {
        let defaults = CodecLimits::default();
        Self {
            max_field_bytes: defaults.max_field_bytes,
            max_payload_bytes: defaults.max_payload_bytes,
            max_depth: defaults.max_depth,
        }
    }
}

impl TryFrom<RawLimits> for CodecLimits {
    type Error = ConfigError;

    fn try_from(raw: RawLimits) -> Result<Self, Self::Error> {
        Self {
            max_field_bytes: raw.max_field_bytes,
            max_payload_bytes: raw.max_payload_bytes,
            max_depth: raw.max_depth,
        }
        .validated(["max_field_bytes", "max_payload_bytes"])
    }
}

impl CodecLimits {
    /// Reads limits from the process environment, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but not an integer, or a
    /// byte limit is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads limits through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a value is set but not an integer, or a byte
    /// limit is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Self {
            max_field_bytes: parse_limit(&lookup, MAX_FIELD_BYTES_KEY, defaults.max_field_bytes)?,
            max_payload_bytes: parse_limit(
                &lookup,
                MAX_PAYLOAD_BYTES_KEY,
                defaults.max_payload_bytes,
            )?,
            max_depth: parse_limit(&lookup, MAX_DEPTH_KEY, defaults.max_depth)?,
        }
        .validated([MAX_FIELD_BYTES_KEY, MAX_PAYLOAD_BYTES_KEY])
    }

    /// Rejects zero byte limits, reporting them under `keys`
    /// (field limit first, payload limit second).
    fn validated(self, keys: [&'static str; 2]) -> Result<Self, ConfigError> {
        let [field_key, payload_key] = keys;
        for (key, value) in [
            (field_key, self.max_field_bytes),
            (payload_key, self.max_payload_bytes),
        ] {
            if value == 0 {
                return Err(ConfigError {
                    key,
                    reason: "must be greater than zero".to_owned(),
                });
            }
        }
        Ok(self)
    }
}

fn parse_limit(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: usize,
) -> Result<usize, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    raw.trim().parse::<usize>().map_err(|e| ConfigError {
        key,
        reason: format!("must be a non-negative integer: {e}"),
    })
}
