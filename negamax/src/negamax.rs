//! Negamax engine with iterative deepening.

use std::sync::Arc;

use tracing::debug;

use ronin_core::cache::{Cache, Flag};
use ronin_core::clock::SearchClock;
use ronin_core::engine::{Engine, EngineOptions, Report, ReportConsumer, Reporter};
use ronin_core::error::SearchError;
use ronin_core::game::{Game, DRAW_SCORE, NULL_MOVE};
use ronin_core::leaves::{EmptyLeaves, Leaves};
use ronin_core::TranspositionTable;

/// Depth of the first deepening iteration, in plies.
pub const MIN_DEPTH: u32 = 2;

/// How many root moves are inspected for the hash move.
const HASH_MOVE_WINDOW: usize = 6;

/// Alpha-beta engine with iterative deepening.
///
/// The search deepens two plies per iteration, reordering the root
/// moves from the transposition cache and probing the endgame oracle
/// before descending. Scores returned by the recursion are from the
/// point of view of the player that just received the move, so the
/// root minimizes over its children. The engine stores its final
/// result in the cache and answers ponder requests from it.
pub struct Negamax<G: Game> {
    /// Common engine settings
    pub(crate) opts: EngineOptions,

    /// Shared countdown clock
    pub(crate) clock: Arc<SearchClock>,

    /// Report fan-out
    pub(crate) reporter: Reporter,

    /// Transposition cache
    pub(crate) cache: Box<dyn Cache<G> + Send>,

    /// Endgame oracle
    pub(crate) leaves: Box<dyn Leaves<G> + Send>,

    /// Maximum and minimum scores of the current game
    pub(crate) max_score: i32,
    pub(crate) min_score: i32,

    /// Score of the last computation, from the opponent's view
    pub(crate) best_score: i32,

    /// Depth of the last completed iteration
    pub(crate) score_depth: u32,

    /// Nodes visited by the current computation
    pub(crate) nodes: u64,
}

impl<G: Game> Negamax<G> {
    /// Creates an engine with a default-sized cache and no endgames.
    pub fn new() -> Self {
        let opts = EngineOptions::default();
        let max_score = opts.infinity;

        Self {
            opts,
            clock: Arc::new(SearchClock::new()),
            reporter: Reporter::new(),
            cache: Box::new(TranspositionTable::default()),
            leaves: Box::new(EmptyLeaves),
            max_score,
            min_score: -max_score,
            best_score: DRAW_SCORE,
            score_depth: 0,
            nodes: 0,
        }
    }

    /// Replaces the transposition cache.
    pub fn set_cache(&mut self, cache: Box<dyn Cache<G> + Send>) {
        self.cache = cache;
    }

    /// Replaces the endgame oracle.
    pub fn set_leaves(&mut self, leaves: Box<dyn Leaves<G> + Send>) {
        self.leaves = leaves;
    }

    /// Depth of the last completed iteration.
    pub fn score_depth(&self) -> u32 {
        self.score_depth
    }

    /// Moves the hash move of the current position, when it sits among
    /// the first root moves, to the front. The shifted prefix keeps
    /// the heuristic ordering of the remainder intact.
    pub(crate) fn promote_hash_move(&mut self, game: &G, root_moves: &mut [i32]) {
        let entry = match self.cache.find(game) {
            Some(entry) if entry.best_move != NULL_MOVE => entry,
            _ => return,
        };

        let window = root_moves.len().min(HASH_MOVE_WINDOW);

        for index in 0..window {
            if root_moves[index] == entry.best_move {
                root_moves.copy_within(0..index, 1);
                root_moves[0] = entry.best_move;
                self.best_score = entry.score;
                break;
            }
        }
    }

    /// Recursive alpha-beta search.
    ///
    /// Returns the score of the position from the point of view of the
    /// player to move. Results computed after an abort are garbage and
    /// must be discarded by the caller.
    pub(crate) fn search(&mut self, game: &mut G, mut alpha: i32, mut beta: i32, depth: u32) -> i32 {
        self.nodes += 1;

        if self.clock.aborted() && depth > MIN_DEPTH {
            return self.min_score;
        }

        if game.has_ended() {
            let outcome = game.outcome();
            let score = if outcome == DRAW_SCORE {
                self.opts.contempt
            } else {
                outcome
            };

            return game.turn() * score;
        }

        if depth == 0 {
            return game.turn() * game.score();
        }

        if let Some(leaf) = self.leaves.find(game) {
            let score = game.turn() * leaf.score;

            match leaf.flag {
                Flag::Exact => return score,
                Flag::Lower if score >= beta => return score,
                Flag::Upper if score <= alpha => return score,
                _ => (),
            }
        }

        let mut hash_move = NULL_MOVE;

        if let Some(entry) = self.cache.find(game) {
            hash_move = entry.best_move;

            if entry.depth >= depth {
                match entry.flag {
                    Flag::Exact => return entry.score,
                    Flag::Lower => alpha = alpha.max(entry.score),
                    Flag::Upper => beta = beta.min(entry.score),
                }

                if alpha >= beta {
                    return entry.score;
                }
            }
        }

        let first_alpha = alpha;
        let mut best_score = self.min_score;
        let mut best_move = NULL_MOVE;

        // The hash move is searched before the natural ordering
        if hash_move != NULL_MOVE && game.is_legal(hash_move) {
            game.make_move(hash_move);
            let score = -self.search(game, -beta, -alpha, depth - 1);
            game.unmake_move();

            best_score = score;
            best_move = hash_move;
            alpha = alpha.max(score);
        }

        if alpha < beta {
            loop {
                let mv = game.next_move();

                if mv == NULL_MOVE {
                    break;
                }

                if mv == hash_move {
                    continue;
                }

                game.make_move(mv);
                let score = -self.search(game, -beta, -alpha, depth - 1);
                game.unmake_move();

                if score > best_score {
                    best_score = score;
                    best_move = mv;
                    alpha = alpha.max(score);

                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        if !self.clock.aborted() {
            let flag = if best_score >= beta {
                Flag::Lower
            } else if best_score <= first_alpha {
                Flag::Upper
            } else {
                Flag::Exact
            };

            self.cache.store(game, best_score, best_move, depth, flag);
        }

        best_score
    }

    /// Principal variation recovered from the cache, best move first.
    pub(crate) fn principal_variation(&mut self, game: &mut G) -> Vec<i32> {
        let mut pv = Vec::new();

        loop {
            let entry = match self.cache.find(game) {
                Some(entry) => entry,
                None => break,
            };

            if entry.best_move == NULL_MOVE
                || pv.len() > self.score_depth as usize
                || !game.is_legal(entry.best_move)
            {
                break;
            }

            pv.push(entry.best_move);
            game.make_move(entry.best_move);
        }

        game.unmake_moves(pv.len());
        pv
    }

    /// Publishes a progress report for the given search results.
    pub(crate) fn invoke_consumers(&mut self, game: &mut G, best_move: i32) {
        let report = Report {
            best_move,
            score: -self.best_score,
            depth: self.score_depth,
            nodes: self.nodes,
            pv: self.principal_variation(game),
            flag: Flag::Exact,
        };

        self.reporter.publish(&report);
    }
}

impl<G: Game> Default for Negamax<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game> Engine<G> for Negamax<G> {
    fn set_contempt(&mut self, contempt: i32) {
        self.opts.contempt = contempt;
    }

    fn set_infinity(&mut self, infinity: i32) {
        self.opts.infinity = infinity;
        self.max_score = infinity;
        self.min_score = -infinity;
    }

    fn set_move_time(&mut self, millis: u64) {
        self.opts.move_time = millis;
    }

    fn set_depth(&mut self, depth: u32) {
        self.opts.max_depth = depth.min(ronin_core::engine::MAX_DEPTH);
    }

    fn new_match(&mut self) {
        self.clock.cancel_count_down();
        self.cache.clear();
        self.best_score = DRAW_SCORE;
        self.score_depth = 0;
        self.nodes = 0;
    }

    fn compute_best_move(&mut self, game: &mut G) -> Result<i32, SearchError> {
        // A finished game has no best move; remember its exact score
        // so that compute_best_score can still answer

        if game.has_ended() {
            self.best_score = -(game.outcome() * game.turn());
            return Ok(NULL_MOVE);
        }

        self.clock.schedule_count_down(self.opts.move_time);
        game.ensure_capacity(self.opts.max_depth as usize + game.length())?;
        self.cache.discharge();

        let mut root_moves = game.legal_moves();
        self.best_score = DRAW_SCORE;
        self.score_depth = 0;
        self.nodes = 0;

        self.promote_hash_move(game, &mut root_moves);

        // Iterative deepening: two extra plies per iteration until an
        // exact score is proven, the depth limit is reached or the
        // clock runs out after at least one completed iteration

        let mut depth = MIN_DEPTH;
        let mut last_score = self.max_score;
        let mut last_move = NULL_MOVE;
        let mut best_move = root_moves[0];

        while !self.clock.aborted() || depth == MIN_DEPTH {
            let mut beta = self.max_score;

            for &mv in &root_moves {
                game.make_move(mv);
                let score = self.search(game, self.min_score, beta, depth);
                game.unmake_move();

                if self.clock.aborted() && depth > MIN_DEPTH {
                    best_move = last_move;
                    self.best_score = last_score;
                    break;
                }

                if score < beta {
                    best_move = mv;
                    self.best_score = score;
                    beta = score;
                }
            }

            if !self.clock.aborted() || depth == MIN_DEPTH {
                self.score_depth = depth;
            }

            if self.best_score.abs() == self.max_score {
                break;
            }

            if self.clock.aborted() || depth >= self.opts.max_depth {
                break;
            }

            if depth > MIN_DEPTH
                && (best_move != last_move
                    || self.best_score != last_score
                    || depth == 2 + MIN_DEPTH)
            {
                self.invoke_consumers(game, best_move);
            }

            debug!(depth, score = -self.best_score, nodes = self.nodes, "iteration complete");

            last_move = best_move;
            last_score = self.best_score;
            depth += 2;
        }

        self.cache
            .store(game, self.best_score, best_move, self.score_depth, Flag::Exact);
        self.invoke_consumers(game, best_move);
        self.clock.cancel_count_down();

        Ok(best_move)
    }

    fn compute_best_score(&mut self, game: &mut G) -> Result<i32, SearchError> {
        self.compute_best_move(game)?;
        Ok(-self.best_score)
    }

    fn get_ponder_move(&mut self, game: &mut G) -> i32 {
        let entry = match self.cache.find(game) {
            Some(entry) if entry.best_move != NULL_MOVE => entry,
            _ => return NULL_MOVE,
        };

        if !game.is_legal(entry.best_move) {
            return NULL_MOVE;
        }

        game.make_move(entry.best_move);

        let ponder = match self.cache.find(game) {
            Some(reply) if reply.best_move != NULL_MOVE && game.is_legal(reply.best_move) => {
                reply.best_move
            }
            _ => NULL_MOVE,
        };

        game.unmake_move();
        ponder
    }

    fn clock(&self) -> Arc<SearchClock> {
        Arc::clone(&self.clock)
    }

    fn subscribe(&mut self, consumer: ReportConsumer) {
        self.reporter.subscribe(consumer);
    }
}
