use serde::{Deserialize, Serialize};

use crate::error::{SerdeError, SerdeResult};

/// Default upper bound on encoded message size (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// Separator style used when writing the JSON format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonStyle {
    /// `", "` between items and `": "` after keys.
    #[default]
    Spaced,
    /// No whitespace at all.
    Compact,
}

/// Configuration for the envelope codec.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest native message, in bytes, that will be encoded or decoded.
    pub max_message_size: usize,
    /// Separator style for JSON output. Decoding accepts either style.
    pub json_style: JsonStyle,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            json_style: JsonStyle::Spaced,
        }
    }
}

impl CodecConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> SerdeResult<Self> {
        toml::from_str(s).map_err(|e| SerdeError::Config(e.to_string()))
    }

    /// Same configuration with compact JSON output.
    pub fn compact() -> Self {
        Self {
            json_style: JsonStyle::Compact,
            ..Default::default()
        }
    }
}
