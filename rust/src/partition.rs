//! Deterministic partition key derivation.
//!
//! A record is reduced to a routing key in three steps:
//!
//! 1. pick a candidate: the trivial key for absent or falsy records, the
//!    record's truthy `partitionKey` member, or the SHA3-512 digest of the
//!    record's JSON text;
//! 2. stringify non-string candidates as JSON text;
//! 3. replace candidates longer than the policy maximum with their digest.
//!
//! A `partitionKey` of `0`, `false`, `""` or `null` counts as missing, so such
//! records are hashed whole.

use log::{debug, trace};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::{ConfigError, KeyPolicy};
use crate::crypto::integrity::sha3_512_hex;
use crate::json::{is_truthy, to_ecma_json, utf16_len};

/// Record member that carries a caller-chosen key.
pub const PARTITION_KEY_FIELD: &str = "partitionKey";

#[derive(Debug, Error)]
pub enum PartitionKeyError {
    #[error("record serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),
    #[error("record is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Derives partition keys under a validated [`KeyPolicy`].
#[derive(Debug, Clone, Default)]
pub struct PartitionKeyDeriver {
    policy: KeyPolicy,
}

impl PartitionKeyDeriver {
    pub fn new(policy: KeyPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &KeyPolicy {
        &self.policy
    }

    /// Derives the key for any serializable record.
    pub fn derive<T>(&self, event: Option<&T>) -> Result<String, PartitionKeyError>
    where
        T: Serialize + ?Sized,
    {
        let record = event
            .map(serde_json::to_value)
            .transpose()
            .map_err(PartitionKeyError::Serialization)?;
        self.derive_value(record.as_ref())
    }

    /// Derives the key for a record that is already a JSON value.
    pub fn derive_value(&self, event: Option<&Value>) -> Result<String, PartitionKeyError> {
        let candidate = self.select_candidate(event)?;
        Ok(self.enforce_length(candidate))
    }

    /// Parses JSON text, keeping member order, and derives its key.
    pub fn derive_from_json_str(&self, text: &str) -> Result<String, PartitionKeyError> {
        let record: Value = serde_json::from_str(text).map_err(PartitionKeyError::InvalidJson)?;
        self.derive_value(Some(&record))
    }

    fn select_candidate(&self, event: Option<&Value>) -> Result<String, PartitionKeyError> {
        let Some(record) = event.filter(|value| is_truthy(value)) else {
            trace!("record absent or falsy, using trivial key");
            return Ok(self.policy.trivial_key.clone());
        };

        if let Some(key) = record.get(PARTITION_KEY_FIELD).filter(|value| is_truthy(value)) {
            trace!("using explicit {PARTITION_KEY_FIELD}");
            return match key {
                Value::String(text) => Ok(text.clone()),
                other => to_ecma_json(other).map_err(PartitionKeyError::Serialization),
            };
        }

        let text = to_ecma_json(record).map_err(PartitionKeyError::Serialization)?;
        trace!("hashing {} bytes of record JSON", text.len());
        Ok(sha3_512_hex(text.as_bytes()))
    }

    fn enforce_length(&self, candidate: String) -> String {
        let length = utf16_len(&candidate);
        if length <= self.policy.max_key_length {
            return candidate;
        }
        debug!(
            "partition key of length {length} exceeds {}, hashing",
            self.policy.max_key_length
        );
        sha3_512_hex(candidate.as_bytes())
    }
}

/// Derives a partition key with the stock policy (`"0"`, 256).
pub fn deterministic_partition_key<T>(event: Option<&T>) -> Result<String, PartitionKeyError>
where
    T: Serialize + ?Sized,
{
    PartitionKeyDeriver::default().derive(event)
}

/// [`deterministic_partition_key`] for records already held as JSON values.
pub fn deterministic_partition_key_value(event: Option<&Value>) -> Result<String, PartitionKeyError> {
    PartitionKeyDeriver::default().derive_value(event)
}
