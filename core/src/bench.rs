//! Benchmark decorators.
//!
//! Pass-through adapters that count the operations an engine performs
//! on its game, cache and leaves. All wrappers share one accumulator
//! so a benchmark driver can snapshot every figure at once. The cost
//! on the hot path is one indirection plus a relaxed atomic add.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::{Cache, CacheEntry, Flag};
use crate::error::GameError;
use crate::game::Game;
use crate::leaves::{LeafEntry, Leaves};

/// Shared operation counters.
#[derive(Debug, Default)]
pub struct BenchStats {
    /// Moves made on the game (visited states)
    pub visits: AtomicU64,

    /// Terminal evaluations (`outcome` calls)
    pub terminal: AtomicU64,

    /// Heuristic evaluations (`score` calls)
    pub heuristic: AtomicU64,

    /// Cache probes
    pub cache_probes: AtomicU64,

    /// Cache probes that hit
    pub cache_hits: AtomicU64,

    /// Leaves probes
    pub leaves_probes: AtomicU64,

    /// Leaves probes that hit
    pub leaves_hits: AtomicU64,
}

impl BenchStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Resets every counter to zero.
    pub fn clear(&self) {
        self.visits.store(0, Ordering::Relaxed);
        self.terminal.store(0, Ordering::Relaxed);
        self.heuristic.store(0, Ordering::Relaxed);
        self.cache_probes.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.leaves_probes.store(0, Ordering::Relaxed);
        self.leaves_hits.store(0, Ordering::Relaxed);
    }
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// A decorated game that counts visits and evaluations.
#[derive(Debug)]
pub struct BenchGame<G> {
    inner: G,
    stats: Arc<BenchStats>,
}

impl<G: Game> BenchGame<G> {
    pub fn new(inner: G, stats: Arc<BenchStats>) -> Self {
        Self { inner, stats }
    }

    /// Decorated game instance.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn into_inner(self) -> G {
        self.inner
    }
}

impl<G: Game> Game for BenchGame<G> {
    type Board = G::Board;

    fn length(&self) -> usize {
        self.inner.length()
    }

    fn moves(&self) -> Vec<i32> {
        self.inner.moves()
    }

    fn turn(&self) -> i32 {
        self.inner.turn()
    }

    fn hash(&self) -> u64 {
        self.inner.hash()
    }

    fn has_ended(&self) -> bool {
        self.inner.has_ended()
    }

    fn winner(&self) -> i32 {
        self.inner.winner()
    }

    fn score(&self) -> i32 {
        bump(&self.stats.heuristic);
        self.inner.score()
    }

    fn outcome(&self) -> i32 {
        bump(&self.stats.terminal);
        self.inner.outcome()
    }

    fn contempt(&self) -> i32 {
        self.inner.contempt()
    }

    fn infinity(&self) -> i32 {
        self.inner.infinity()
    }

    fn is_legal(&self, mv: i32) -> bool {
        self.inner.is_legal(mv)
    }

    fn make_move(&mut self, mv: i32) {
        bump(&self.stats.visits);
        self.inner.make_move(mv);
    }

    fn unmake_move(&mut self) {
        self.inner.unmake_move();
    }

    fn next_move(&mut self) -> i32 {
        self.inner.next_move()
    }

    fn legal_moves(&self) -> Vec<i32> {
        self.inner.legal_moves()
    }

    fn get_cursor(&self) -> i32 {
        self.inner.get_cursor()
    }

    fn set_cursor(&mut self, cursor: i32) {
        self.inner.set_cursor(cursor)
    }

    fn ensure_capacity(&mut self, min_capacity: usize) -> Result<(), GameError> {
        self.inner.ensure_capacity(min_capacity)
    }

    fn set_board(&mut self, board: &Self::Board) -> Result<(), GameError> {
        self.inner.set_board(board)
    }

    fn start_board(&self) -> Self::Board {
        self.inner.start_board()
    }

    fn to_board(&self) -> Self::Board {
        self.inner.to_board()
    }

    fn end_match(&mut self) {
        self.inner.end_match()
    }

    fn to_centi_pawns(&self, score: i32) -> i32 {
        self.inner.to_centi_pawns(score)
    }
}

/// A decorated cache that counts probes and hits.
#[derive(Debug)]
pub struct BenchCache<C> {
    inner: C,
    stats: Arc<BenchStats>,
}

impl<C> BenchCache<C> {
    pub fn new(inner: C, stats: Arc<BenchStats>) -> Self {
        Self { inner, stats }
    }

    /// Decorated cache instance.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<G: Game, C: Cache<G>> Cache<G> for BenchCache<C> {
    fn find(&mut self, game: &G) -> Option<CacheEntry> {
        bump(&self.stats.cache_probes);
        let entry = self.inner.find(game);

        if entry.is_some() {
            bump(&self.stats.cache_hits);
        }

        entry
    }

    fn store(&mut self, game: &G, score: i32, best_move: i32, depth: u32, flag: Flag) {
        self.inner.store(game, score, best_move, depth, flag)
    }

    fn discharge(&mut self) {
        self.inner.discharge()
    }

    fn resize(&mut self, bytes: usize) {
        self.inner.resize(bytes)
    }

    fn clear(&mut self) {
        self.inner.clear()
    }

    fn size(&self) -> usize {
        self.inner.size()
    }
}

/// A decorated endgames oracle that counts probes and hits.
#[derive(Debug)]
pub struct BenchLeaves<L> {
    inner: L,
    stats: Arc<BenchStats>,
}

impl<L> BenchLeaves<L> {
    pub fn new(inner: L, stats: Arc<BenchStats>) -> Self {
        Self { inner, stats }
    }

    /// Decorated leaves instance.
    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<G: Game, L: Leaves<G>> Leaves<G> for BenchLeaves<L> {
    fn find(&mut self, game: &G) -> Option<LeafEntry> {
        bump(&self.stats.leaves_probes);
        let entry = self.inner.find(game);

        if entry.is_some() {
            bump(&self.stats.leaves_hits);
        }

        entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TranspositionTable;
    use crate::leaves::{EmptyLeaves, MemoryLeaves};

    use crate::test_utils::StubGame;

    #[test]
    fn cache_decorator_counts_probes_and_hits() {
        let stats = BenchStats::new();
        let mut cache = BenchCache::new(TranspositionTable::new(1 << 12), Arc::clone(&stats));
        let game = StubGame::new(7);

        assert!(cache.find(&game).is_none());
        cache.store(&game, 5, 0, 2, Flag::Exact);
        assert!(cache.find(&game).is_some());

        assert_eq!(stats.cache_probes.load(Ordering::Relaxed), 2);
        assert_eq!(stats.cache_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn leaves_decorator_counts_probes_and_hits() {
        let stats = BenchStats::new();
        let game = StubGame::new(9);

        let mut empty = BenchLeaves::new(EmptyLeaves, Arc::clone(&stats));
        assert!(empty.find(&game).is_none());

        let mut table = MemoryLeaves::new();
        table.insert(9, 100, Flag::Exact);
        let mut leaves = BenchLeaves::new(table, Arc::clone(&stats));
        assert!(leaves.find(&game).is_some());

        assert_eq!(stats.leaves_probes.load(Ordering::Relaxed), 2);
        assert_eq!(stats.leaves_hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn game_decorator_counts_visits_and_evaluations() {
        let stats = BenchStats::new();
        let mut game = BenchGame::new(StubGame::new(1), Arc::clone(&stats));

        game.make_move(0);
        game.unmake_move();
        let _ = game.score();
        let _ = game.outcome();
        let _ = game.outcome();

        assert_eq!(stats.visits.load(Ordering::Relaxed), 1);
        assert_eq!(stats.heuristic.load(Ordering::Relaxed), 1);
        assert_eq!(stats.terminal.load(Ordering::Relaxed), 2);

        stats.clear();
        assert_eq!(stats.visits.load(Ordering::Relaxed), 0);
    }
}
