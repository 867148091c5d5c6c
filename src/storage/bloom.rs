//! Membership Filter
//!
//! A fixed-width bit array answering "definitely absent" / "possibly
//! present" for keys. One hash function maps a key to a single bit.
//! Bits are only ever set: deleting a key leaves its bit alone, so the
//! filter can report presence for keys that are gone. That is safe
//! because the filter is consulted strictly as a pre-check before the
//! definitive map lookup, and it keeps the filter free of any rebuild
//! bookkeeping on deletion.

use std::hash::{DefaultHasher, Hash, Hasher};

/// Default filter width in bits.
pub const DEFAULT_FILTER_BITS: usize = 10_000;

/// Additive bit-array membership filter.
///
/// No false negatives; false positives bounded by the load factor.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: Vec<u64>,
    nbits: usize,
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILTER_BITS)
    }
}

impl BloomFilter {
    /// Creates a filter `nbits` wide. Widths below one word are rounded up.
    pub fn new(nbits: usize) -> Self {
        let nbits = nbits.max(64);
        Self {
            words: vec![0u64; nbits.div_ceil(64)],
            nbits,
        }
    }

    #[inline]
    fn bit_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.nbits
    }

    /// Sets the bit for `key`.
    pub fn add(&mut self, key: &[u8]) {
        let bit = self.bit_index(key);
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    /// Returns false only if `key` was never added.
    pub fn probe(&self, key: &[u8]) -> bool {
        let bit = self.bit_index(key);
        self.words[bit / 64] & (1u64 << (bit % 64)) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_added_keys_probe_true() {
        let mut filter = BloomFilter::new(DEFAULT_FILTER_BITS);
        for i in 0..100 {
            let key = format!("key:{i}");
            filter.add(key.as_bytes());
            assert!(filter.probe(key.as_bytes()));
        }
    }

    #[test]
    fn test_fresh_filter_probes_false() {
        let filter = BloomFilter::new(DEFAULT_FILTER_BITS);
        assert!(!filter.probe(b"never-added"));
    }

    #[test]
    fn test_bits_survive_unrelated_adds() {
        let mut filter = BloomFilter::new(DEFAULT_FILTER_BITS);
        filter.add(b"pinned");
        for i in 0..1000 {
            filter.add(format!("noise:{i}").as_bytes());
        }
        assert!(filter.probe(b"pinned"));
    }

    #[test]
    fn test_tiny_width_is_usable() {
        let mut filter = BloomFilter::new(1);
        filter.add(b"a");
        assert!(filter.probe(b"a"));
    }
}
