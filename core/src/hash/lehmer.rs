//! Lehmer code hashing.

use super::HashFunction;

/// Minimal perfect hashing of integer arrays.
///
/// Uses Lehmer codes to compute the hash of each array. Requires that
/// the arrays to hash represent a permutation without replacement:
/// each element is a distinct number from zero to `count`. Partial
/// permutations are supported when `length < count`.
#[derive(Debug, Clone)]
pub struct LehmerHash {
    /// Positional bases of the mixed-radix code
    bases: Vec<u64>,

    /// Fixed length of the hashed arrays
    length: usize,
}

impl LehmerHash {
    /// Creates a hash function for partial permutations of `length`
    /// distinct elements drawn from `count` candidates.
    pub fn new(count: usize, length: usize) -> Self {
        assert!(length > 0 && length <= count);

        let bases = (0..length)
            .map(|i| {
                let n = (count - i - 1) as u64;
                let k = (length - i - 1) as u64;
                factorial(k) * binomial(n, k)
            })
            .collect();

        Self { bases, length }
    }

    /// Converts a hash back into its array representation.
    pub fn unhash(&self, mut hash: u64) -> Vec<i32> {
        let mut state = vec![0i32; self.length];

        for (i, &base) in self.bases.iter().enumerate() {
            state[i] = (hash / base) as i32;
            hash %= base;
        }

        for i in (0..self.length).rev() {
            for n in i + 1..self.length {
                if state[n] >= state[i] {
                    state[n] += 1;
                }
            }
        }

        state
    }
}

impl HashFunction for LehmerHash {
    fn hash(&self, state: &[i32]) -> u64 {
        let mut counted = 1u64 << state[0];
        let mut hash = state[0] as u64 * self.bases[0];

        for i in 1..self.length {
            let bit = 1u64 << state[i];
            let lower = (counted & (bit - 1)).count_ones();
            hash += (state[i] as u64 - u64::from(lower)) * self.bases[i];
            counted ^= bit;
        }

        hash
    }
}

/// Factorial of an integer.
fn factorial(n: u64) -> u64 {
    (1..=n).product::<u64>().max(1)
}

/// Binomial coefficient C(n, k).
fn binomial(n: u64, mut k: u64) -> u64 {
    if k > n {
        return 0;
    }

    if k > n - k {
        k = n - k;
    }

    let mut value = 1u64;

    for i in 0..k {
        value *= n - i;
        value /= i + 1;
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn helpers() {
        assert_eq!(factorial(0), 1);
        assert_eq!(factorial(5), 120);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(6, 6), 1);
        assert_eq!(binomial(3, 5), 0);
    }

    #[test]
    fn full_permutations_are_perfectly_hashed() {
        let lehmer = LehmerHash::new(4, 4);
        let mut seen = HashSet::new();

        for p in permutations(&[0, 1, 2, 3]) {
            let hash = lehmer.hash(&p);
            assert!(hash < 24, "hash {hash} out of range for {p:?}");
            assert!(seen.insert(hash), "collision on {p:?}");
            assert_eq!(lehmer.unhash(hash), p);
        }

        assert_eq!(seen.len(), 24);
    }

    #[test]
    fn partial_permutations_are_perfectly_hashed() {
        let lehmer = LehmerHash::new(5, 2);
        let mut seen = HashSet::new();

        for a in 0..5 {
            for b in 0..5 {
                if a == b {
                    continue;
                }

                let state = [a, b];
                let hash = lehmer.hash(&state);
                assert!(hash < 20);
                assert!(seen.insert(hash));
                assert_eq!(lehmer.unhash(hash), state);
            }
        }

        assert_eq!(seen.len(), 20);
    }

    fn permutations(items: &[i32]) -> Vec<Vec<i32>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }

        let mut result = Vec::new();

        for (i, &item) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(i);

            for mut p in permutations(&rest) {
                p.insert(0, item);
                result.push(p);
            }
        }

        result
    }
}
