//! Search engine surface and progress reports.

use std::sync::Arc;

use crate::cache::Flag;
use crate::clock::SearchClock;
use crate::error::SearchError;
use crate::game::{Game, NULL_MOVE};

/// Hard ceiling on the depth of any search, in plies.
pub const MAX_DEPTH: u32 = 254;

/// Default time budget per move, in milliseconds.
pub const DEFAULT_MOVE_TIME: u64 = 3_600;

/// A best-move computation service for a game.
///
/// Entry points are exclusive: at most one computation runs on an
/// engine at a time. The only concurrent interaction is through the
/// shared [`SearchClock`], which a driver may use to stop or retarget
/// an ongoing computation.
pub trait Engine<G: Game> {
    /// Sets the score to which a draw evaluates.
    fn set_contempt(&mut self, contempt: i32);

    /// Sets the maximum score a position can obtain.
    fn set_infinity(&mut self, infinity: i32);

    /// Sets the time budget per computation, in milliseconds.
    fn set_move_time(&mut self, millis: u64);

    /// Sets the maximum search depth, in plies.
    fn set_depth(&mut self, depth: u32);

    /// Discards state kept from previous computations.
    fn new_match(&mut self);

    /// Computes a best move for the current position of a game.
    ///
    /// The search runs on the provided game object, which changes
    /// during the computation and must not be touched while it is
    /// ongoing. Returns [`NULL_MOVE`] if the game already ended.
    fn compute_best_move(&mut self, game: &mut G) -> Result<i32, SearchError>;

    /// Computes the best move for a game and returns its score from
    /// the point of view of the player to move.
    fn compute_best_score(&mut self, game: &mut G) -> Result<i32, SearchError>;

    /// Move the engine would consider pondering on, or [`NULL_MOVE`]
    /// when it has nothing to suggest.
    fn get_ponder_move(&mut self, game: &mut G) -> i32 {
        let _ = game;
        NULL_MOVE
    }

    /// Retargets the current computation to stop after the given
    /// milliseconds.
    fn abort_computation(&mut self, millis: u64) {
        self.clock().abort_computation(millis);
    }

    /// Clock shared with the ongoing computation.
    fn clock(&self) -> Arc<SearchClock>;

    /// Registers a consumer notified of search progress.
    fn subscribe(&mut self, consumer: ReportConsumer);
}

/// Settings shared by every engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Time budget per computation in milliseconds
    pub move_time: u64,

    /// Maximum search depth in plies
    pub max_depth: u32,

    /// Score to which draws evaluate
    pub contempt: i32,

    /// Maximum score a position can obtain
    pub infinity: i32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            move_time: DEFAULT_MOVE_TIME,
            max_depth: MAX_DEPTH,
            contempt: crate::game::DRAW_SCORE,
            infinity: i32::MAX,
        }
    }
}

/// Search progress snapshot pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Best move found so far
    pub best_move: i32,

    /// Score of the best move, from the mover's point of view
    pub score: i32,

    /// Depth of the completed search, in plies
    pub depth: u32,

    /// Nodes visited so far
    pub nodes: u64,

    /// Principal variation, best move first
    pub pv: Vec<i32>,

    /// Whether the score is exact or a bound
    pub flag: Flag,
}

/// Callback notified of search progress.
pub type ReportConsumer = Box<dyn Fn(&Report) + Send>;

/// Fans reports out to the registered consumers.
#[derive(Default)]
pub struct Reporter {
    consumers: Vec<ReportConsumer>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a consumer.
    pub fn subscribe(&mut self, consumer: ReportConsumer) {
        self.consumers.push(consumer);
    }

    /// Notifies every registered consumer.
    pub fn publish(&self, report: &Report) {
        for consumer in &self.consumers {
            consumer(report);
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("consumers", &self.consumers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn reporter_notifies_every_consumer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut reporter = Reporter::new();

        for _ in 0..3 {
            let calls = Arc::clone(&calls);
            reporter.subscribe(Box::new(move |_| {
                calls.fetch_add(1, Ordering::Relaxed);
            }));
        }

        let report = Report {
            best_move: 4,
            score: 0,
            depth: 2,
            nodes: 1,
            pv: vec![4],
            flag: Flag::Exact,
        };

        reporter.publish(&report);
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }
}
