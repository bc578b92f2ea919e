//! Deterministic partition keys for stream ingestion. Records of any
//! serializable shape are reduced to a routing key of at most 256 characters
//! so related records always land on the same partition.

pub mod config;
pub mod crypto;
pub mod json;
pub mod partition;

pub use config::{load_policy, ConfigError, KeyPolicy};
pub use crypto::integrity::create_sha3_hash;
pub use partition::{
    deterministic_partition_key, deterministic_partition_key_value, PartitionKeyDeriver,
    PartitionKeyError,
};
