//! MTD(f) refinement of the negamax search.

use std::sync::Arc;

use tracing::debug;

use ronin_core::cache::Flag;
use ronin_core::clock::SearchClock;
use ronin_core::engine::{Engine, ReportConsumer};
use ronin_core::error::SearchError;
use ronin_core::game::{Game, DRAW_SCORE, NULL_MOVE};
use ronin_core::Cache;
use ronin_core::Leaves;

use crate::negamax::{Negamax, MIN_DEPTH};

/// Zero-window engine built on the negamax recursion.
///
/// At each deepening iteration the root is probed with null windows
/// `[g - 1, g]` around a guess seeded from the previous score, walking
/// the guess toward the true minimax value until the lower and upper
/// bounds meet. Abort semantics match [`Negamax`].
pub struct Mtdf<G: Game> {
    inner: Negamax<G>,
}

impl<G: Game> Mtdf<G> {
    pub fn new() -> Self {
        Self {
            inner: Negamax::new(),
        }
    }

    /// Replaces the transposition cache.
    pub fn set_cache(&mut self, cache: Box<dyn Cache<G> + Send>) {
        self.inner.set_cache(cache);
    }

    /// Replaces the endgame oracle.
    pub fn set_leaves(&mut self, leaves: Box<dyn Leaves<G> + Send>) {
        self.inner.set_leaves(leaves);
    }

    /// Depth of the last completed iteration.
    pub fn score_depth(&self) -> u32 {
        self.inner.score_depth()
    }
}

impl<G: Game> Default for Mtdf<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game> Engine<G> for Mtdf<G> {
    fn set_contempt(&mut self, contempt: i32) {
        self.inner.set_contempt(contempt);
    }

    fn set_infinity(&mut self, infinity: i32) {
        self.inner.set_infinity(infinity);
    }

    fn set_move_time(&mut self, millis: u64) {
        self.inner.set_move_time(millis);
    }

    fn set_depth(&mut self, depth: u32) {
        self.inner.set_depth(depth);
    }

    fn new_match(&mut self) {
        self.inner.new_match();
    }

    fn compute_best_move(&mut self, game: &mut G) -> Result<i32, SearchError> {
        let engine = &mut self.inner;

        if game.has_ended() {
            engine.best_score = -(game.outcome() * game.turn());
            return Ok(NULL_MOVE);
        }

        engine.clock.schedule_count_down(engine.opts.move_time);
        game.ensure_capacity(engine.opts.max_depth as usize + game.length())?;
        engine.cache.discharge();

        let mut root_moves = game.legal_moves();
        engine.best_score = DRAW_SCORE;
        engine.score_depth = 0;
        engine.nodes = 0;

        engine.promote_hash_move(game, &mut root_moves);

        let mut depth = MIN_DEPTH;
        let mut last_score = engine.max_score;
        let mut last_move = NULL_MOVE;
        let mut best_move = root_moves[0];

        while !engine.clock.aborted() || depth == MIN_DEPTH {
            let mut upper = engine.max_score;
            let mut lower = engine.min_score;

            // Null-window probes converge on the minimax value

            while !engine.clock.aborted() && lower < upper {
                let guess = engine.best_score.max(lower + 1);
                let alpha = guess - 1;
                let mut beta = guess;

                for &mv in &root_moves {
                    game.make_move(mv);
                    let score = engine.search(game, alpha, beta, depth);
                    game.unmake_move();

                    if engine.clock.aborted() && depth > MIN_DEPTH {
                        best_move = last_move;
                        engine.best_score = last_score;
                        break;
                    }

                    if score < beta {
                        best_move = mv;
                        engine.best_score = score;
                        beta = score;
                    } else if score == beta {
                        engine.best_score = score;
                    }
                }

                if engine.best_score < guess {
                    upper = engine.best_score;
                } else {
                    lower = engine.best_score;
                }
            }

            if !engine.clock.aborted() || depth == MIN_DEPTH {
                engine.score_depth = depth;
            }

            if engine.best_score.abs() == engine.max_score {
                break;
            }

            if engine.clock.aborted() || depth >= engine.opts.max_depth {
                break;
            }

            if depth > MIN_DEPTH
                && (best_move != last_move
                    || engine.best_score != last_score
                    || depth == 2 + MIN_DEPTH)
            {
                engine.invoke_consumers(game, best_move);
            }

            debug!(depth, score = -engine.best_score, "zero-window iteration complete");

            last_move = best_move;
            last_score = engine.best_score;
            depth += 2;
        }

        engine
            .cache
            .store(game, engine.best_score, best_move, engine.score_depth, Flag::Exact);
        engine.invoke_consumers(game, best_move);
        engine.clock.cancel_count_down();

        Ok(best_move)
    }

    fn compute_best_score(&mut self, game: &mut G) -> Result<i32, SearchError> {
        self.compute_best_move(game)?;
        Ok(-self.inner.best_score)
    }

    fn get_ponder_move(&mut self, game: &mut G) -> i32 {
        self.inner.get_ponder_move(game)
    }

    fn clock(&self) -> Arc<SearchClock> {
        self.inner.clock()
    }

    fn subscribe(&mut self, consumer: ReportConsumer) {
        self.inner.subscribe(consumer);
    }
}
