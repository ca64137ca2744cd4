//! Endgame oracles.
//!
//! A leaves provider resolves positions close to the end of a match to
//! exact or bounded scores, letting the search stop early. Lookup
//! failures are misses, never errors.

use std::collections::HashMap;

use crate::cache::Flag;
use crate::game::Game;

/// Known value of an endgame position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafEntry {
    /// Exact or bounded score, in engine units from south's view
    pub score: i32,

    /// Whether the score is exact or a bound
    pub flag: Flag,
}

/// Provider of precomputed endgame scores.
pub trait Leaves<G: Game> {
    /// Known value of the game's current position, if stored.
    fn find(&mut self, game: &G) -> Option<LeafEntry>;
}

/// Fallback oracle that knows no positions.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLeaves;

impl<G: Game> Leaves<G> for EmptyLeaves {
    fn find(&mut self, _game: &G) -> Option<LeafEntry> {
        None
    }
}

/// Oracle backed by an in-memory map keyed by position hash. Suitable
/// for small endgame tables and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLeaves {
    entries: HashMap<u64, LeafEntry>,
}

impl MemoryLeaves {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the known value of a position.
    pub fn insert(&mut self, hash: u64, score: i32, flag: Flag) {
        self.entries.insert(hash, LeafEntry { score, flag });
    }

    /// Number of stored positions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<G: Game> Leaves<G> for MemoryLeaves {
    fn find(&mut self, game: &G) -> Option<LeafEntry> {
        self.entries.get(&game.hash()).copied()
    }
}
