//! The opening book trainer.

use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;

use threadpool::ThreadPool;
use thiserror::Error;
use tracing::{debug, warn};

use ronin_core::cache::Flag;
use ronin_core::clock::SearchClock;
use ronin_core::engine::{Engine, EngineOptions, Report, ReportConsumer, Reporter};
use ronin_core::error::{GameError, SearchError};
use ronin_core::game::{Game, DRAW_SCORE, NULL_MOVE};

use crate::node::DoeNode;
use crate::store::{DoeStore, StoreError};

/// Store key of the root node.
const ROOT_KEY: i64 = 1;

/// Penalty for each descendant awaiting evaluation.
const WAIT_PENALTY: i32 = 1;

/// Evaluations submitted between progress reports.
const REPORT_BATCH: usize = 10;

/// Evaluation function supplied by the trainer's caller.
///
/// Receives the move path from the root position and returns a score
/// in engine units. Must be reentrant: several workers invoke it
/// concurrently, each with its own path.
pub type ScorerFn = Arc<dyn Fn(&[i32]) -> Result<i32, ScorerError> + Send + Sync>;

/// Failure raised by a scorer function.
#[derive(Debug, Clone, Error)]
#[error("scorer failure: {0}")]
pub struct ScorerError(pub String);

/// Errors raised by a training run.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Game(#[from] GameError),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    /// The persisted root does not match the supplied game.
    #[error("root state mismatch: stored {stored:#018x}, game {game:#018x}")]
    StateMismatch { stored: u64, game: u64 },
}

/// Trainer configuration.
#[derive(Debug, Clone)]
pub struct DoeConfig {
    /// Worker pool size
    pub pool_size: usize,

    /// Exploration bias parameter
    pub explore_factor: f64,
}

impl Default for DoeConfig {
    fn default() -> Self {
        Self {
            pool_size: 1,
            explore_factor: 0.707,
        }
    }
}

impl DoeConfig {
    /// Builder pattern: set the worker pool size.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Builder pattern: set the exploration bias.
    pub fn with_explore_factor(mut self, factor: f64) -> Self {
        self.explore_factor = factor;
        self
    }
}

/// Result message sent back by a worker.
type Evaluation = (i64, Result<i32, ScorerError>);

/// A multithreaded UCT engine which reads from and stores nodes on a
/// key/value database. It can be used to build opening books.
///
/// The driver thread owns the game object and the store; workers only
/// ever see an immutable move path, and their scores come back over a
/// channel. While an evaluation is outstanding every node on its
/// ancestor chain carries a `waiting` penalty, so concurrent workers
/// spread over different branches instead of piling onto one.
pub struct Doe<G: Game> {
    /// Persisted node store
    store: DoeStore,

    /// Common engine settings
    opts: EngineOptions,

    /// Shared countdown clock
    clock: Arc<SearchClock>,

    /// Report fan-out
    reporter: Reporter,

    /// Trainer configuration
    config: DoeConfig,

    /// Exploration priority multiplier
    bias: f64,

    _game: std::marker::PhantomData<G>,
}

impl<G: Game> Doe<G> {
    /// Creates a trainer over a node store.
    pub fn new(store: DoeStore) -> Self {
        Self::with_config(store, DoeConfig::default())
    }

    /// Creates a trainer with explicit configuration.
    pub fn with_config(store: DoeStore, config: DoeConfig) -> Self {
        let opts = EngineOptions::default();
        let bias = config.explore_factor * opts.infinity as f64;

        Self {
            store,
            opts,
            clock: Arc::new(SearchClock::new()),
            reporter: Reporter::new(),
            config,
            bias,
            _game: std::marker::PhantomData,
        }
    }

    /// Preference for exploring suboptimal moves.
    pub fn set_exploration_bias(&mut self, factor: f64) {
        self.config.explore_factor = factor;
        self.bias = factor * self.opts.infinity as f64;
    }

    /// Backing node store.
    pub fn store(&self) -> &DoeStore {
        &self.store
    }

    /// Consumes the trainer, returning its store.
    pub fn into_store(self) -> DoeStore {
        self.store
    }

    /// Trains the engine using an evaluation function, expanding the
    /// book by `size` nodes with a UCT search.
    ///
    /// Nodes left unevaluated by a previous interrupted run are put
    /// back on the queue before any new expansion happens. When the
    /// run is aborted, in-flight evaluations are still applied and
    /// anything not yet evaluated stays on disk for the next run.
    pub fn train(&mut self, size: usize, game: &mut G, scorer: ScorerFn) -> Result<(), TrainError> {
        game.ensure_capacity(self.opts.max_depth as usize + game.length())?;
        let root = self.root_node(game)?;

        let pool = ThreadPool::new(self.config.pool_size);
        let (tx, rx) = channel::<Evaluation>();

        let mut in_flight = 0usize;
        let mut counter = 0usize;
        let mut failure: Option<TrainError> = None;

        // There may be unevaluated nodes if a previous run was shut
        // down before all tasks completed. Enqueue them now.

        for node in self.store.unevaluated()? {
            debug!(id = node.id, "recovering unevaluated node");
            submit(&pool, &tx, &scorer, &node);
            in_flight += 1;
            counter += 1;
        }

        let mut remaining = size;

        while remaining > 0 && !self.clock.aborted() && failure.is_none() {
            let selected = self.expand(ROOT_KEY, game, self.opts.max_depth)?;

            for node in &selected {
                if node.evaluated {
                    self.backpropagate(node.id, node.score)?;
                } else {
                    self.update_wait_count(node.id, WAIT_PENALTY)?;
                }
            }

            remaining -= 1;

            for node in &selected {
                if !self.clock.aborted() && !node.evaluated {
                    submit(&pool, &tx, &scorer, node);
                    in_flight += 1;
                    counter += 1;
                }
            }

            // Fold in whatever the workers finished meanwhile

            while let Ok((id, result)) = rx.try_recv() {
                in_flight -= 1;

                match result {
                    Ok(score) => self.apply_evaluation(id, score)?,
                    Err(error) => {
                        warn!(%error, "scorer failed, aborting training");
                        self.clock.abort();
                        failure = Some(error.into());
                    }
                }
            }

            if counter >= REPORT_BATCH {
                self.invoke_consumers(root.id)?;
                counter = 0;
            }
        }

        // Drain submitted tasks; their results are applied even when
        // the run was aborted

        pool.join();

        while in_flight > 0 {
            match rx.try_recv() {
                Ok((id, Ok(score))) => {
                    in_flight -= 1;
                    self.apply_evaluation(id, score)?;
                }
                Ok((id, Err(error))) => {
                    in_flight -= 1;
                    warn!(id, %error, "scorer failed during shutdown");
                    failure.get_or_insert(error.into());
                }
                Err(_) => break,
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Best stored move for a game position.
    pub fn best_move(&mut self, game: &mut G) -> Result<i32, TrainError> {
        if game.has_ended() {
            return Ok(NULL_MOVE);
        }

        let root = self.root_node(game)?;

        if root.expanded {
            let child = self.pick_best_child(&root)?;
            return Ok(child.mv);
        }

        Ok(NULL_MOVE)
    }

    /// Score of the best stored move, from the mover's viewpoint.
    pub fn best_score(&mut self, game: &mut G) -> Result<i32, TrainError> {
        let root = self.root_node(game)?;

        if root.expanded {
            let child = self.pick_best_child(&root)?;
            return Ok(-child.score as i32);
        }

        Ok(DRAW_SCORE)
    }

    /// Obtains the root node, creating it on the first run. The store
    /// contains exactly one root and it must match the supplied game.
    fn root_node(&mut self, game: &G) -> Result<DoeNode, TrainError> {
        match self.store.read(ROOT_KEY)? {
            Some(root) if root.hash == game.hash() => Ok(root),
            Some(root) => Err(TrainError::StateMismatch {
                stored: root.hash,
                game: game.hash(),
            }),
            None => {
                let mut root = DoeNode::from_game(game, NULL_MOVE);
                root.evaluated = true;
                root.update_score(0.0);
                self.store.write(&mut root)?;

                debug_assert_eq!(root.id, ROOT_KEY);
                Ok(root)
            }
        }
    }

    /// Computes the expansion priority of an edge.
    ///
    /// Priority is the UCB1 formula with an additional penalty for
    /// each descendant waiting to be evaluated: the virtual loss is
    /// folded in as extra pessimistic samples through the same
    /// running-mean update the real scores use.
    fn compute_priority(&self, child: &DoeNode, factor: f64) -> f64 {
        let mut count = child.count;
        let mut score = child.score;

        for _ in 0..child.waiting {
            let value = f64::from(-self.opts.infinity * child.turn);
            count += 1;
            score += (value - score) / count as f64;
        }

        let exploration = (factor / count as f64).sqrt();
        score - exploration * self.bias
    }

    /// Compute the selection score of a node (secure child).
    fn selection_score(&self, node: &DoeNode) -> f64 {
        let bound = self.opts.infinity as f64 / (node.count as f64).sqrt();
        node.score + bound
    }

    /// Best child found so far for the given node.
    fn pick_best_child(&self, parent: &DoeNode) -> Result<DoeNode, TrainError> {
        let mut next = parent.child;
        let mut best: Option<(f64, DoeNode)> = None;

        while let Some(child) = self.store.read(next)? {
            next = child.sibling;
            let score = self.selection_score(&child);

            match &best {
                Some((best_score, _)) if *best_score <= score => (),
                _ => best = Some((score, child)),
            }
        }

        best.map(|(_, child)| child)
            .ok_or_else(|| StoreError::Database(rusqlite::Error::QueryReturnedNoRows).into())
    }

    /// Pick the child node with the highest expansion priority.
    fn pick_lead_child(&self, parent: &DoeNode) -> Result<DoeNode, TrainError> {
        let factor = (parent.count as f64).ln();

        let mut next = parent.child;
        let mut best: Option<(f64, DoeNode)> = None;

        while let Some(child) = self.store.read(next)? {
            next = child.sibling;
            let priority = self.compute_priority(&child, factor);

            match &best {
                Some((best_priority, _)) if *best_priority <= priority => (),
                _ => best = Some((priority, child)),
            }
        }

        best.map(|(_, child)| child)
            .ok_or_else(|| StoreError::Database(rusqlite::Error::QueryReturnedNoRows).into())
    }

    /// Scores the current game position as a terminal state.
    fn outcome(&self, game: &G) -> i32 {
        let mut score = game.outcome();

        if score == DRAW_SCORE {
            score = self.opts.contempt;
        }

        score * game.turn()
    }

    /// Expands all the children of a node.
    fn append_children(&mut self, parent: &mut DoeNode, game: &mut G) -> Result<Vec<DoeNode>, TrainError> {
        let moves = game.legal_moves();
        let mut children = Vec::with_capacity(moves.len());

        for mv in moves {
            game.make_move(mv);

            let mut node = DoeNode::from_game(game, mv);
            node.parent = parent.id;
            node.sibling = parent.child;

            if node.terminal {
                node.evaluated = true;
                node.update_score(f64::from(self.outcome(game)));
            }

            self.store.write(&mut node)?;
            parent.child = node.id;

            game.unmake_move();
            children.push(node);
        }

        parent.expanded = true;
        self.store.write(parent)?;

        Ok(children)
    }

    /// Expands the most prioritary tree node, returning the selected
    /// set: either a fresh batch of children or a single settled node.
    fn expand(&mut self, key: i64, game: &mut G, depth: u32) -> Result<Vec<DoeNode>, TrainError> {
        let mut node = match self.store.read(key)? {
            Some(node) => node,
            None => return Ok(Vec::new()),
        };

        if node.terminal || depth == 0 {
            return Ok(vec![node]);
        }

        if node.expanded {
            let child = self.pick_lead_child(&node)?;
            game.make_move(child.mv);
            let selected = self.expand(child.id, game, depth - 1)?;
            game.unmake_move();

            return Ok(selected);
        }

        self.append_children(&mut node, game)
    }

    /// Applies a completed evaluation to the stored tree.
    fn apply_evaluation(&mut self, key: i64, score: i32) -> Result<(), TrainError> {
        if let Some(mut node) = self.store.read(key)? {
            node.evaluated = true;
            self.store.write(&mut node)?;

            self.update_wait_count(key, -WAIT_PENALTY)?;
            self.backpropagate(key, f64::from(score))?;
        }

        Ok(())
    }

    /// Backpropagates the score of a node through its parent chain.
    /// The chain terminates at a key that does not resolve.
    fn backpropagate(&mut self, key: i64, score: f64) -> Result<(), TrainError> {
        let mut node = match self.store.read(key)? {
            Some(node) => node,
            None => return Ok(()),
        };

        node.update_score(score);
        self.store.write(&mut node)?;

        while let Some(mut parent) = self.store.read(node.parent)? {
            parent.update_score(-node.score);
            self.store.write(&mut parent)?;
            node = parent;
        }

        Ok(())
    }

    /// Adjusts the waiting count of a node and its ancestor chain.
    fn update_wait_count(&mut self, key: i64, value: i32) -> Result<(), TrainError> {
        let mut node = match self.store.read(key)? {
            Some(node) => node,
            None => return Ok(()),
        };

        node.waiting += value;
        self.store.write(&mut node)?;

        while let Some(mut parent) = self.store.read(node.parent)? {
            parent.waiting += value;
            self.store.write(&mut parent)?;
            node = parent;
        }

        Ok(())
    }

    /// Notifies registered consumers of the training progress.
    fn invoke_consumers(&mut self, root_key: i64) -> Result<(), TrainError> {
        let root = match self.store.read(root_key)? {
            Some(root) if root.expanded => root,
            _ => return Ok(()),
        };

        let child = self.pick_best_child(&root)?;

        let report = Report {
            best_move: child.mv,
            score: -child.score as i32,
            depth: child.moves.len() as u32,
            nodes: root.count as u64,
            pv: vec![child.mv],
            flag: Flag::Lower,
        };

        self.reporter.publish(&report);
        Ok(())
    }
}

/// Hands a node's move path to the worker pool.
fn submit(pool: &ThreadPool, tx: &Sender<Evaluation>, scorer: &ScorerFn, node: &DoeNode) {
    let id = node.id;
    let moves = node.moves.clone();
    let scorer = Arc::clone(scorer);
    let tx = tx.clone();

    pool.execute(move || {
        let result = scorer(&moves);
        let _ = tx.send((id, result));
    });
}

impl<G: Game> Engine<G> for Doe<G> {
    fn set_contempt(&mut self, contempt: i32) {
        self.opts.contempt = contempt;
    }

    fn set_infinity(&mut self, infinity: i32) {
        self.opts.infinity = infinity;
        self.bias = self.config.explore_factor * infinity as f64;
    }

    fn set_move_time(&mut self, millis: u64) {
        self.opts.move_time = millis;
    }

    fn set_depth(&mut self, depth: u32) {
        self.opts.max_depth = depth.min(ronin_core::engine::MAX_DEPTH);
    }

    fn new_match(&mut self) {
        self.clock.cancel_count_down();
    }

    fn compute_best_move(&mut self, game: &mut G) -> Result<i32, SearchError> {
        self.best_move(game)
            .map_err(|error| SearchError::Store(error.to_string()))
    }

    fn compute_best_score(&mut self, game: &mut G) -> Result<i32, SearchError> {
        self.best_score(game)
            .map_err(|error| SearchError::Store(error.to_string()))
    }

    fn clock(&self) -> Arc<SearchClock> {
        Arc::clone(&self.clock)
    }

    fn subscribe(&mut self, consumer: ReportConsumer) {
        self.reporter.subscribe(consumer);
    }
}
