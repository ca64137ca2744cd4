//! Transposition cache.
//!
//! Fixed-size table mapping position hashes to the results of earlier
//! searches. Probes and stores are amortized O(1) and the table is not
//! thread-safe; each engine owns its own instance.

use crate::game::Game;

/// Bound kind of a stored score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    /// The score is exact
    Exact,

    /// The score is a lower bound (a beta cutoff occurred)
    Lower,

    /// The score is an upper bound (no move improved alpha)
    Upper,
}

/// Result of a completed search on a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    /// Hash of the position
    pub hash: u64,

    /// Best move found, possibly `NULL_MOVE`
    pub best_move: i32,

    /// Score of the position from the mover's point of view
    pub score: i32,

    /// Depth of the search that produced the score
    pub depth: u32,

    /// Bound kind of the score
    pub flag: Flag,
}

/// Memoization of move computations.
pub trait Cache<G: Game> {
    /// Last stored entry for the game's current position, if any.
    fn find(&mut self, game: &G) -> Option<CacheEntry>;

    /// Records an entry keyed by the game's current position.
    fn store(&mut self, game: &G, score: i32, best_move: i32, depth: u32, flag: Flag);

    /// Ages the stored entries so new entries outrank stale ones
    /// without erasing them. Called once per root search.
    fn discharge(&mut self);

    /// Reshapes the backing table to the given byte budget, discarding
    /// existing entries.
    fn resize(&mut self, bytes: usize);

    /// Discards all stored entries.
    fn clear(&mut self);

    /// Current size of the table in bytes.
    fn size(&self) -> usize;
}

/// Stored slot: an entry plus the generation it was written on.
#[derive(Debug, Clone, Copy)]
struct Slot {
    entry: CacheEntry,
    age: u8,
}

/// Plies of effective depth an entry loses per generation of age.
const AGE_PENALTY: i32 = 2;

/// Single-slot transposition table with generation aging.
///
/// On a collision the incumbent survives only if its age-discounted
/// depth beats the depth of the incoming entry. Fresh entries therefore
/// win against equally deep stale ones, while a much deeper entry from
/// a previous generation survives a shallow overwrite.
#[derive(Debug)]
pub struct TranspositionTable {
    slots: Vec<Option<Slot>>,
    generation: u8,
}

impl TranspositionTable {
    /// Default table budget in bytes.
    pub const DEFAULT_SIZE: usize = 32 << 20;

    /// Creates a table with the given byte budget.
    pub fn new(bytes: usize) -> Self {
        Self {
            slots: vec![None; Self::capacity_for(bytes)],
            generation: 0,
        }
    }

    /// Largest power-of-two entry count that fits the byte budget.
    fn capacity_for(bytes: usize) -> usize {
        let capacity = bytes / std::mem::size_of::<Option<Slot>>();
        if capacity < 2 {
            1
        } else {
            let mut power = 1;
            while power * 2 <= capacity {
                power *= 2;
            }
            power
        }
    }

    fn index(&self, hash: u64) -> usize {
        hash as usize & (self.slots.len() - 1)
    }

    /// Effective depth of a slot after discounting its age.
    fn effective_depth(&self, slot: &Slot) -> i32 {
        let age = self.generation.wrapping_sub(slot.age) as i32;
        slot.entry.depth as i32 - AGE_PENALTY * age
    }

    /// Number of occupied slots, for diagnostics.
    pub fn entries(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

impl<G: Game> Cache<G> for TranspositionTable {
    fn find(&mut self, game: &G) -> Option<CacheEntry> {
        let hash = game.hash();
        let slot = self.slots[self.index(hash)]?;
        (slot.entry.hash == hash).then_some(slot.entry)
    }

    fn store(&mut self, game: &G, score: i32, best_move: i32, depth: u32, flag: Flag) {
        let hash = game.hash();
        let index = self.index(hash);

        if let Some(slot) = &self.slots[index] {
            if slot.entry.hash != hash && self.effective_depth(slot) > depth as i32 {
                return;
            }
        }

        self.slots[index] = Some(Slot {
            entry: CacheEntry {
                hash,
                best_move,
                score,
                depth,
                flag,
            },
            age: self.generation,
        });
    }

    fn discharge(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    fn resize(&mut self, bytes: usize) {
        self.slots = vec![None; Self::capacity_for(bytes)];
        self.generation = 0;
    }

    fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.generation = 0;
    }

    fn size(&self) -> usize {
        self.slots.len() * std::mem::size_of::<Option<Slot>>()
    }
}
