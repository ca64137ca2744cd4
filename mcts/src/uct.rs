//! Best-first tree search.
//!
//! The engine grows a tree one node per iteration: it descends along
//! the minimum-priority edge, appends the next ungenerated child of
//! the frontier node, evaluates it and folds the negated score into
//! every ancestor. Exact scores propagate up as proofs, so the root
//! can settle long before the tree is exhausted.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use ronin_core::cache::Flag;
use ronin_core::clock::SearchClock;
use ronin_core::engine::{Engine, EngineOptions, Report, ReportConsumer, Reporter};
use ronin_core::error::SearchError;
use ronin_core::game::{Game, DRAW_SCORE, NULL_MOVE};
use ronin_core::leaves::{EmptyLeaves, Leaves};

use crate::config::UctConfig;
use crate::node::{NodeId, UctNode};
use crate::tree::UctTree;
use crate::variant::{Cooperative, Predictor, Rollout, Ucb1, Variant};

/// Score change that triggers an off-schedule report.
const REPORT_THRESHOLD: f64 = 5.0;

/// Monte Carlo tree search engine.
///
/// The variant type parameter selects the evaluation and priority
/// policy; see the [`Uct`], [`Montecarlo`], [`Puct`] and [`Partner`]
/// aliases.
pub struct Mcts<G: Game, V: Variant<G>> {
    /// Common engine settings
    opts: EngineOptions,

    /// Shared countdown clock
    clock: Arc<SearchClock>,

    /// Report fan-out
    reporter: Reporter,

    /// Endgame oracle
    leaves: Box<dyn Leaves<G> + Send>,

    /// Tuning knobs
    config: UctConfig,

    /// Node arena
    tree: UctTree,

    /// Current computation root
    root: NodeId,

    /// Best child found so far
    best_child: NodeId,

    /// Exploration bias parameter
    explore_factor: f64,

    /// Exploration priority multiplier
    bias: f64,

    /// Maximum score of the current game
    max_score: f64,

    /// Side the engine is searching for, fixed at computation entry
    turn: i32,

    /// Evaluation and priority policy
    variant: V,

    _game: PhantomData<G>,
}

/// UCB1 engine over the game heuristic.
pub type Uct<G> = Mcts<G, Ucb1>;

/// Engine evaluating leaves with uniformly random playouts.
pub type Montecarlo<G> = Mcts<G, Rollout>;

/// Predictor engine biased by each node's first evaluation.
pub type Puct<G> = Mcts<G, Predictor>;

/// Cooperative single-player engine.
pub type Partner<G> = Mcts<G, Cooperative>;

impl<G: Game, V: Variant<G>> Mcts<G, V> {
    /// Creates an engine with the variant's default exploration bias.
    pub fn new() -> Self {
        Self::with_config(UctConfig::default())
    }

    /// Creates an engine with explicit tuning knobs.
    pub fn with_config(config: UctConfig) -> Self {
        let opts = EngineOptions::default();
        let max_score = opts.infinity as f64;

        Self {
            opts,
            clock: Arc::new(SearchClock::new()),
            reporter: Reporter::new(),
            leaves: Box::new(EmptyLeaves),
            config,
            tree: UctTree::new(),
            root: NodeId::NONE,
            best_child: NodeId::NONE,
            explore_factor: V::DEFAULT_BIAS,
            bias: V::DEFAULT_BIAS * max_score,
            max_score,
            turn: ronin_core::SOUTH,
            variant: V::default(),
            _game: PhantomData,
        }
    }

    /// Creates an engine with a reproducible variant policy.
    pub fn with_variant(variant: V) -> Self {
        let mut engine = Self::new();
        engine.variant = variant;
        engine
    }

    /// Preference for exploring suboptimal moves.
    pub fn set_exploration_bias(&mut self, factor: f64) {
        self.explore_factor = factor;
        self.bias = factor * self.max_score;
    }

    /// Replaces the endgame oracle.
    pub fn set_leaves(&mut self, leaves: Box<dyn Leaves<G> + Send>) {
        self.leaves = leaves;
    }

    /// Number of live nodes in the search tree.
    pub fn tree_size(&self) -> usize {
        self.tree.live_count()
    }

    /// Whether the root value was proven exactly.
    pub fn root_proven(&self) -> bool {
        self.root.is_some() && self.tree.get(self.root).settled()
    }

    /// Score of the root, from the root mover's point of view.
    pub fn root_score(&self) -> f64 {
        self.tree.get(self.root).score
    }

    /// Computes the expansion priority of an edge.
    fn compute_priority(&self, child: NodeId, factor: f64) -> f64 {
        self.variant
            .priority(self.tree.get(child), factor, self.bias)
    }

    /// Compute the selection score of a node (secure child).
    fn selection_score(&self, id: NodeId) -> f64 {
        let node = self.tree.get(id);
        let bound = self.max_score / (node.count as f64).sqrt();

        self.variant.node_score(node) + bound
    }

    /// Best child found so far for the given node.
    ///
    /// Children keep their scores from their own mover's viewpoint,
    /// so the minimum secure score is the best reply for the parent.
    fn pick_best_child(&self, parent: NodeId) -> NodeId {
        let mut child = self.tree.get(parent).child;
        let mut best_child = child;
        let mut best_score = f64::INFINITY;

        while child.is_some() {
            let score = self.selection_score(child);

            if score < best_score {
                best_score = score;
                best_child = child;
            }

            child = self.tree.get(child).sibling;
        }

        best_child
    }

    /// Pick the child node with the highest expansion priority.
    fn pick_lead_child(&self, parent: NodeId) -> NodeId {
        let factor = self.variant.parent_factor(self.tree.get(parent));

        let mut child = self.tree.get(parent).child;
        let mut best_child = child;
        let mut best_score = f64::INFINITY;

        while child.is_some() {
            let score = self.compute_priority(child, factor);

            if score < best_score {
                best_score = score;
                best_child = child;
            }

            child = self.tree.get(child).sibling;
        }

        best_child
    }

    /// Pick the expanded child with the worst score.
    fn pick_futile_child(&self, parent: NodeId) -> NodeId {
        let mut child = self.tree.get(parent).child;
        let mut futile = child;

        while child.is_some() {
            let node = self.tree.get(child);

            if node.expanded && node.score > self.tree.get(futile).score {
                futile = child;
            }

            child = node.sibling;
        }

        futile
    }

    /// Obtains a tree node for the given game position, reusing a
    /// matching descendant of the previous root when one exists.
    fn root_node(&mut self, game: &G) -> NodeId {
        let hash = game.hash();

        // The best child of a previous search no longer names a live
        // node once the tree is rerooted or cleared
        self.best_child = NodeId::NONE;

        if self.root.is_some() {
            if let Some(found) = self.tree.find_node(self.root, hash, 2) {
                self.tree.reroot(found);
                return found;
            }
        }

        self.tree.clear();

        let mut node = UctNode::new(
            NULL_MOVE,
            hash,
            game.turn(),
            game.get_cursor(),
            game.has_ended(),
        );

        node.init_score(0.0);
        self.tree.allocate(node)
    }

    /// Next ungenerated move of a node, or the null move once its
    /// generator is exhausted.
    fn generate_move(&mut self, id: NodeId, game: &mut G) -> i32 {
        if self.tree.get(id).expanded {
            return NULL_MOVE;
        }

        game.set_cursor(self.tree.get(id).cursor);
        let mv = game.next_move();

        let node = self.tree.get_mut(id);
        node.cursor = game.get_cursor();

        if mv == NULL_MOVE {
            node.expanded = true;
        }

        mv
    }

    /// Appends a child for the game's current position.
    fn append_child(&mut self, parent: NodeId, game: &G, mv: i32) -> NodeId {
        let node = UctNode::new(mv, game.hash(), game.turn(), game.get_cursor(), game.has_ended());
        let child = self.tree.allocate(node);
        self.tree.push_child(parent, child);

        child
    }

    /// Scores the current game position for the given node.
    fn score_of(&mut self, id: NodeId, game: &mut G, depth: u32) -> i32 {
        let mut score = if self.tree.get(id).terminal {
            game.outcome()
        } else if let Some(leaf) = self.leaves.find(game) {
            leaf.score
        } else {
            self.variant.simulate(game, depth)
        };

        if score == DRAW_SCORE {
            score = self.opts.contempt * self.turn;
        }

        score * game.turn()
    }

    /// Evaluates a fresh leaf and stores its first score.
    fn evaluate(&mut self, id: NodeId, game: &mut G, depth: u32) -> f64 {
        let score = f64::from(self.score_of(id, game, depth));

        let explore_factor = self.explore_factor;
        let node = self.tree.get_mut(id);
        node.init_score(score);
        self.variant.init_node(node, score, explore_factor);

        score
    }

    /// Settles a node as a loss when every child is a proven win for
    /// the opponent; otherwise folds the score into the mean.
    fn prove_score(&mut self, id: NodeId, score: f64) {
        let mut child = self.tree.get(id).child;
        let mut proven = true;

        while child.is_some() {
            let node = self.tree.get(child);

            if !node.settled() || node.score != -score {
                proven = false;
                break;
            }

            child = node.sibling;
        }

        if proven {
            self.tree.get_mut(id).settle_score(score);
        } else {
            self.tree.get_mut(id).update_score(score);
        }
    }

    /// Expands the most prioritary tree node.
    ///
    /// Returns the sampled score from the viewpoint of the mover at
    /// `id`; callers negate it for the parent.
    fn expand(&mut self, id: NodeId, game: &mut G, depth: u32) -> f64 {
        if self.tree.get(id).settled() || depth == 0 {
            let node = self.tree.get_mut(id);
            node.count += 1;
            return node.score;
        }

        let mv = self.generate_move(id, game);

        let (child, score) = if mv != NULL_MOVE {
            game.make_move(mv);
            let child = self.append_child(id, game, mv);
            let score = -self.evaluate(child, game, depth.saturating_sub(1));
            game.unmake_move();
            (child, score)
        } else {
            let child = self.pick_lead_child(id);
            game.make_move(self.tree.get(child).mv);
            let score = -self.expand(child, game, depth - 1);
            game.unmake_move();
            (child, score)
        };

        // Exact child values settle the parent: a proven loss of the
        // child is a proven win here, and once every reply is a proven
        // win for the opponent this node is a proven loss

        if !self.tree.get(child).settled() {
            self.tree.get_mut(id).update_score(score);
        } else if score == self.max_score {
            self.tree.get_mut(id).settle_score(score);
        } else if score == -self.max_score && self.tree.get(id).expanded {
            self.prove_score(id, score);
        } else {
            self.tree.get_mut(id).update_score(score);
        }

        score
    }

    /// Releases the least promising leaves of the tree once the node
    /// ceiling is exceeded. The root and its direct children survive.
    fn prune_garbage(&mut self, root: NodeId) {
        if self.tree.live_count() <= self.config.max_nodes {
            return;
        }

        debug!(nodes = self.tree.live_count(), "pruning search tree");

        for _ in 0..self.config.prune_iterations {
            self.prune_children(root, root);
        }
    }

    /// Prunes one or more leaves from each subtree of a parent node.
    fn prune_children(&mut self, parent: NodeId, ignore: NodeId) {
        let mut node = self.tree.get(parent).child;

        while node.is_some() {
            if self.tree.get(node).expanded && node != ignore {
                let mut futile = node;

                while self.tree.get(futile).expanded {
                    futile = self.pick_futile_child(futile);
                }

                let target = self.tree.get(futile).parent;

                if target != ignore {
                    self.tree.detach_children(target);
                }
            }

            node = self.tree.get(node).sibling;
        }
    }

    /// Principal variation along the best children of the root.
    fn principal_variation(&self) -> Vec<i32> {
        let mut pv = Vec::new();
        let mut node = self.root;

        while self.tree.get(node).child.is_some() && !self.tree.get(node).terminal {
            let child = self.pick_best_child(node);
            pv.push(self.tree.get(child).mv);
            node = child;
        }

        pv
    }

    /// Notifies registered consumers of a state change.
    fn invoke_consumers(&mut self) {
        if self.best_child.is_none() {
            return;
        }

        let child = self.tree.get(self.best_child);
        let pv = self.principal_variation();

        let report = Report {
            best_move: child.mv,
            score: -child.score as i32,
            depth: pv.len() as u32,
            nodes: self.tree.get(self.root).count,
            pv,
            flag: if child.settled() { Flag::Exact } else { Flag::Lower },
        };

        self.reporter.publish(&report);
    }
}

impl<G: Game, V: Variant<G>> Default for Mcts<G, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Game, V: Variant<G>> Engine<G> for Mcts<G, V> {
    fn set_contempt(&mut self, contempt: i32) {
        self.opts.contempt = contempt;
    }

    fn set_infinity(&mut self, infinity: i32) {
        self.opts.infinity = infinity;
        self.max_score = infinity as f64;
        self.bias = self.explore_factor * self.max_score;
    }

    fn set_move_time(&mut self, millis: u64) {
        self.opts.move_time = millis;
    }

    fn set_depth(&mut self, depth: u32) {
        self.opts.max_depth = depth.min(ronin_core::engine::MAX_DEPTH);
    }

    fn new_match(&mut self) {
        self.clock.cancel_count_down();
        self.tree.clear();
        self.root = NodeId::NONE;
        self.best_child = NodeId::NONE;
    }

    fn compute_best_move(&mut self, game: &mut G) -> Result<i32, SearchError> {
        if game.has_ended() {
            return Ok(NULL_MOVE);
        }

        self.clock.schedule_count_down(self.opts.move_time);
        game.ensure_capacity(self.opts.max_depth as usize + game.length())?;

        self.turn = game.turn();
        self.root = self.root_node(game);

        let root = self.root;
        let max_depth = self.opts.max_depth;
        let mut best_score = f64::from(DRAW_SCORE);
        let mut watch = Instant::now();

        while !self.clock.aborted() || self.tree.get(root).child.is_none() {
            self.expand(root, game, max_depth);
            self.prune_garbage(root);

            if self.tree.get(root).settled() {
                debug!(score = self.tree.get(root).score, "root value proven");
                break;
            }

            // Report search information periodically

            if watch.elapsed() >= self.config.report_interval {
                watch = Instant::now();
                let child = self.pick_best_child(root);
                let change = (self.tree.get(child).score - best_score).abs();

                if child != self.best_child || change > REPORT_THRESHOLD {
                    self.best_child = child;
                    best_score = self.tree.get(child).score;
                    self.invoke_consumers();
                }
            }
        }

        self.best_child = self.pick_best_child(root);
        self.invoke_consumers();
        self.clock.cancel_count_down();

        Ok(self.tree.get(self.best_child).mv)
    }

    fn compute_best_score(&mut self, game: &mut G) -> Result<i32, SearchError> {
        if game.has_ended() {
            return Ok(game.outcome() * game.turn());
        }

        self.compute_best_move(game)?;
        Ok(-self.tree.get(self.best_child).score as i32)
    }

    fn get_ponder_move(&mut self, game: &mut G) -> i32 {
        if self.root.is_none() {
            return NULL_MOVE;
        }

        let node = match self.tree.find_node(self.root, game.hash(), 1) {
            Some(node) => node,
            None => return NULL_MOVE,
        };

        let found = self.tree.get(node);

        if found.child.is_some() && !found.terminal {
            let child = self.pick_best_child(node);
            return self.tree.get(child).mv;
        }

        NULL_MOVE
    }

    fn clock(&self) -> Arc<SearchClock> {
        Arc::clone(&self.clock)
    }

    fn subscribe(&mut self, consumer: ReportConsumer) {
        self.reporter.subscribe(consumer);
    }
}
