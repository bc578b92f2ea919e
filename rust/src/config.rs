//! Key policy loader. A policy overrides the trivial key and the maximum key
//! length; anything not set in the file keeps the stock values.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::integrity::SHA3_512_HEX_LEN;

/// Key returned for absent or falsy records.
pub const TRIVIAL_PARTITION_KEY: &str = "0";
/// Keys longer than this (in UTF-16 code units) are replaced by their digest.
pub const MAX_PARTITION_KEY_LENGTH: usize = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("policy file unreadable: {0}")]
    Io(String),
    #[error("policy parse failed: {0}")]
    Parse(String),
    #[error("maxKeyLength {0} is shorter than a {}-character digest", SHA3_512_HEX_LEN)]
    MaxLengthTooShort(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyPolicy {
    #[serde(rename = "trivialKey")]
    pub trivial_key: String,
    /// Must leave room for a full SHA3-512 hex digest.
    #[serde(rename = "maxKeyLength")]
    pub max_key_length: usize,
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self {
            trivial_key: TRIVIAL_PARTITION_KEY.to_string(),
            max_key_length: MAX_PARTITION_KEY_LENGTH,
        }
    }
}

impl KeyPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_key_length < SHA3_512_HEX_LEN {
            return Err(ConfigError::MaxLengthTooShort(self.max_key_length));
        }
        Ok(())
    }
}

/// Loads and validates a JSON key policy file.
pub fn load_policy(path: impl AsRef<Path>) -> Result<KeyPolicy, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let policy: KeyPolicy =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;
    policy.validate()?;
    log::debug!(
        "loaded key policy from {}: trivial key {:?}, max length {}",
        path.as_ref().display(),
        policy.trivial_key,
        policy.max_key_length
    );
    Ok(policy)
}
