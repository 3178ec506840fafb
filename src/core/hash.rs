#[cfg(feature = "hashing")]
use sha3::{Digest, Sha3_256};

#[cfg(feature = "hashing")]
/// Computes the SHA3-256 hash of byte data as lowercase hex
pub fn compute_sha3_256(data: &[u8]) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(not(feature = "hashing"))]
/// Computes a non-cryptographic fingerprint of byte data (fallback)
pub fn compute_sha3_256(data: &[u8]) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    data.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}
