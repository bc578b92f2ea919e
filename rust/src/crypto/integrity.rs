//! SHA3-512 helpers used for partition key hashing. Digests are always rendered
//! as lowercase hex so they can be used directly as routing keys.

use sha3::{Digest, Sha3_512};

/// Length of a hex-encoded SHA3-512 digest.
pub const SHA3_512_HEX_LEN: usize = 128;

/// Produces a raw SHA3-512 digest of the provided bytes.
pub fn sha3_512_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha3_512::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Returns the lowercase hexadecimal representation of a SHA3-512 digest.
pub fn sha3_512_hex(data: &[u8]) -> String {
    hex::encode(sha3_512_digest(data))
}

/// Hashes the UTF-8 bytes of `data` with SHA3-512. A missing input hashes the
/// empty string.
pub fn create_sha3_hash(data: Option<&str>) -> String {
    sha3_512_hex(data.unwrap_or_default().as_bytes())
}
