//! Deterministic hash-based counter-mode expansion.
//!
//! Masks must be reproducible bit-for-bit across independent SDK
//! implementations so that they cancel in the server-side aggregate: output
//! `i` is derived from `SHA-256(seed || i)` with `i` encoded as 4 big-endian
//! bytes, and the first 4 digest bytes are read as a big-endian integer. The
//! byte order is load-bearing; do not change it.

use std::convert::TryInto;

use crate::crypto::{ByteObject, Sha256};

/// Expands `seed` into `count` deterministic pseudorandom integers in
/// `[0, num_range)`.
///
/// A `num_range` of zero yields zeros, mirroring the behavior of drawing
/// from an empty range.
pub fn pseudo_rand_gen(seed: &[u8], num_range: u64, count: usize) -> Vec<u64> {
    (0..count as u32)
        .map(|counter| {
            let digest = Sha256::hash_parts(&[seed, &counter.to_be_bytes()]);
            // UNWRAP_SAFE: the digest is 32 bytes long
            let word = u32::from_be_bytes(digest.as_slice()[..4].try_into().unwrap());
            if num_range == 0 {
                0
            } else {
                u64::from(word) % num_range
            }
        })
        .collect()
}

/// Expands `seed` into `len` deterministic pseudorandom bytes.
///
/// Same counter scheme as [`pseudo_rand_gen`], but whole digests are
/// concatenated and truncated to `len`.
pub fn pseudo_rand_bytes(seed: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + Sha256::LENGTH);
    let mut counter: u32 = 0;
    while out.len() < len {
        let digest = Sha256::hash_parts(&[seed, &counter.to_be_bytes()]);
        out.extend_from_slice(digest.as_slice());
        counter += 1;
    }
    out.truncate(len);
    out
}
