//! Zobrist hashing.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use super::HashFunction;

/// Zobrist hashing of integer arrays.
///
/// Each (index, value) pair of the state is assigned a random key and
/// the hash is the exclusive-or of the keys of the current state. The
/// key table derives from a seed so equal constructions always produce
/// equal hashes, and [`ZobristHash::toggle`] supports incremental
/// maintenance as single components change.
#[derive(Debug, Clone)]
pub struct ZobristHash {
    /// Random keys, one per (index, value) pair
    keys: Vec<u64>,

    /// Number of distinct values per component
    count: usize,
}

impl ZobristHash {
    /// Default key table seed.
    pub const DEFAULT_SEED: u64 = 0x5EED_0F_2E01;

    /// Creates keys for states of `length` components, each holding a
    /// value below `count`.
    pub fn new(count: usize, length: usize) -> Self {
        Self::with_seed(count, length, Self::DEFAULT_SEED)
    }

    /// Creates a key table from an explicit seed.
    pub fn with_seed(count: usize, length: usize, seed: u64) -> Self {
        let mut random = ChaCha20Rng::seed_from_u64(seed);
        let keys = (0..count * length).map(|_| random.gen()).collect();

        Self { keys, count }
    }

    /// Key assigned to a single (index, value) pair.
    #[inline]
    pub fn key(&self, index: usize, value: usize) -> u64 {
        self.keys[index * self.count + value]
    }

    /// Flips one component in an existing hash.
    #[inline]
    pub fn toggle(&self, hash: u64, index: usize, value: usize) -> u64 {
        hash ^ self.key(index, value)
    }
}

impl HashFunction for ZobristHash {
    fn hash(&self, state: &[i32]) -> u64 {
        let mut hash = 0;

        for (index, &value) in state.iter().enumerate() {
            hash ^= self.key(index, value as usize);
        }

        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_states_hash_equal() {
        let zobrist = ZobristHash::new(3, 9);
        let state = [0, 1, 2, 0, 1, 2, 0, 1, 2];

        assert_eq!(zobrist.hash(&state), zobrist.hash(&state));
        assert_eq!(
            zobrist.hash(&state),
            ZobristHash::new(3, 9).hash(&state),
        );
    }

    #[test]
    fn different_states_hash_different() {
        let zobrist = ZobristHash::new(3, 9);
        let a = [0, 0, 0, 0, 0, 0, 0, 0, 0];
        let b = [1, 0, 0, 0, 0, 0, 0, 0, 0];

        assert_ne!(zobrist.hash(&a), zobrist.hash(&b));
    }

    #[test]
    fn toggle_matches_full_recompute() {
        let zobrist = ZobristHash::new(3, 4);
        let before = [0, 2, 1, 0];
        let after = [0, 2, 1, 2];

        let mut hash = zobrist.hash(&before);
        hash = zobrist.toggle(hash, 3, 0);
        hash = zobrist.toggle(hash, 3, 2);

        assert_eq!(hash, zobrist.hash(&after));
    }
}
