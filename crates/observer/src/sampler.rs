// Path: crates/observer/src/sampler.rs
//! Deterministic selection of indices and byte ranges from entropy.

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Selects `k` distinct indices from a universe of `n`.
///
/// Each step hashes the previous digest (starting from `entropy`) and reduces
/// the first four bytes, big-endian, modulo `n`. Collisions probe forward
/// linearly. `k >= n` returns the whole universe in order.
pub fn select_k(entropy: &[u8], n: usize, k: usize) -> Vec<usize> {
    if k >= n {
        return (0..n).collect();
    }

    let mut used = BTreeSet::new();
    let mut selected = Vec::with_capacity(k);
    let mut digest: [u8; 32] = Sha256::digest(entropy).into();
    while selected.len() < k {
        let [a, b, c, d, ..] = digest;
        let mut index = u32::from_be_bytes([a, b, c, d]) as usize % n;
        while used.contains(&index) {
            index = (index + 1) % n;
        }
        used.insert(index);
        selected.push(index);
        digest = Sha256::digest(digest).into();
    }
    selected
}

/// A hash-chain PRNG yielding floats in `[0, 1)`.
///
/// The state starts as the seed and is replaced by its SHA-256 before every
/// draw. The top 53 bits of the first eight digest bytes become the mantissa.
#[derive(Debug, Clone)]
pub struct HashPrng {
    state: Vec<u8>,
}

impl HashPrng {
    /// Seeds the generator.
    pub fn new(seed: &[u8]) -> Self {
        Self {
            state: seed.to_vec(),
        }
    }

    /// Returns the next value in `[0, 1)`.
    pub fn next_unit(&mut self) -> f64 {
        let digest: [u8; 32] = Sha256::digest(&self.state).into();
        self.state = digest.to_vec();
        let [a, b, c, d, e, f, g, h, ..] = digest;
        let value = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
        (value >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// An inclusive byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// The value of an HTTP `Range` header selecting this range.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Picks `quantity` ranges of `range_size` bytes within `content_size`.
///
/// Ranges may overlap and are returned in draw order.
pub fn select_ranges(
    content_size: u64,
    range_size: u64,
    quantity: usize,
    mut rng: impl FnMut() -> f64,
) -> Vec<ByteRange> {
    if range_size == 0 || content_size == 0 {
        return Vec::new();
    }
    if content_size <= range_size {
        return vec![
            ByteRange {
                start: 0,
                end: content_size - 1,
            };
            quantity
        ];
    }

    let slots = content_size - range_size + 1;
    (0..quantity)
        .map(|_| {
            let start = ((rng() * slots as f64).floor() as u64).min(slots - 1);
            ByteRange {
                start,
                end: start + range_size - 1,
            }
        })
        .collect()
}
