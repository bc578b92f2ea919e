//! Hashing primitives backing key derivation. Kept apart from the derivation
//! rules so the digest contract can be checked on its own.

pub mod integrity;
