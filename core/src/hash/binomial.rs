//! Combinatorial number system hashing.

use super::HashFunction;

/// Minimal perfect hashing of sorted integer sets.
///
/// Maps a strictly increasing array of `length` elements drawn from
/// `0..count` to its rank in the combinatorial number system. Useful
/// to index endgame tables by piece subsets.
#[derive(Debug, Clone)]
pub struct BinomialHash {
    /// Precomputed C(n, k) table indexed by `n * (length + 1) + k`
    binomials: Vec<u64>,

    /// Fixed length of the hashed arrays
    length: usize,
}

impl BinomialHash {
    /// Creates a hash function for sorted sets of `length` elements
    /// drawn from `count` candidates.
    pub fn new(count: usize, length: usize) -> Self {
        assert!(length > 0 && length <= count);

        let mut binomials = vec![0u64; (count + 1) * (length + 1)];

        for n in 0..=count {
            binomials[n * (length + 1)] = 1;

            for k in 1..=length.min(n) {
                let above = (n - 1) * (length + 1);
                binomials[n * (length + 1) + k] =
                    binomials[above + k - 1] + binomials[above + k];
            }
        }

        Self { binomials, length }
    }

    #[inline]
    fn binomial(&self, n: usize, k: usize) -> u64 {
        if k > n {
            0
        } else {
            self.binomials[n * (self.length + 1) + k]
        }
    }

    /// Converts a hash back into its sorted array representation.
    pub fn unhash(&self, mut hash: u64) -> Vec<i32> {
        let mut state = vec![0i32; self.length];
        let mut n = self.binomials.len() / (self.length + 1) - 1;

        for k in (1..=self.length).rev() {
            while self.binomial(n, k) > hash {
                n -= 1;
            }

            state[k - 1] = n as i32;
            hash -= self.binomial(n, k);
        }

        state
    }
}

impl HashFunction for BinomialHash {
    fn hash(&self, state: &[i32]) -> u64 {
        state
            .iter()
            .enumerate()
            .map(|(i, &value)| self.binomial(value as usize, i + 1))
            .sum()
    }
}
