//! Engine variants.
//!
//! The search loop is shared by every Monte Carlo engine; what differs
//! is how fresh leaves are evaluated and how edge priorities are
//! computed. Variants plug those policies in at compile time, so no
//! dynamic dispatch sits on the selection path.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use ronin_core::game::{Game, NULL_MOVE};

use crate::node::UctNode;

/// Selection and evaluation policy of a Monte Carlo engine.
pub trait Variant<G: Game>: Send + Default {
    /// Default exploration bias of this variant.
    const DEFAULT_BIAS: f64;

    /// Evaluates a fresh leaf. The default relies on the game's
    /// heuristic; the game must be left exactly as it was received.
    fn simulate(&mut self, game: &mut G, max_depth: u32) -> i32 {
        let _ = max_depth;
        game.score()
    }

    /// Score of a node as seen by the selection formulas.
    fn node_score(&self, node: &UctNode) -> f64 {
        node.score
    }

    /// Hook invoked after a leaf receives its first evaluation.
    fn init_node(&self, node: &mut UctNode, score: f64, explore_factor: f64) {
        let _ = (node, score, explore_factor);
    }

    /// Parent term of the priority formula.
    fn parent_factor(&self, parent: &UctNode) -> f64 {
        (parent.count as f64).ln()
    }

    /// Expansion priority of an edge; the engine descends into the
    /// child with the minimum priority.
    fn priority(&self, child: &UctNode, factor: f64, bias: f64) -> f64 {
        let exploration = (factor / child.count as f64).sqrt();
        self.node_score(child) - exploration * bias
    }
}

/// Classic UCB1 selection over the game heuristic.
#[derive(Debug, Default)]
pub struct Ucb1;

impl<G: Game> Variant<G> for Ucb1 {
    const DEFAULT_BIAS: f64 = 0.353;
}

/// Uniformly random playouts instead of a heuristic.
#[derive(Debug)]
pub struct Rollout {
    random: ChaCha20Rng,
}

impl Rollout {
    /// Creates a playout policy with a reproducible seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            random: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Default for Rollout {
    fn default() -> Self {
        Self {
            random: ChaCha20Rng::from_entropy(),
        }
    }
}

/// Plays uniformly random moves until the match ends or the depth
/// budget runs out, then rewinds the game and returns the outcome.
fn random_playout<G: Game>(random: &mut ChaCha20Rng, game: &mut G, max_depth: u32) -> i32 {
    let mut depth = 0;

    while depth < max_depth && !game.has_ended() {
        let mv = random_move(random, game);

        if mv == NULL_MOVE {
            break;
        }

        game.make_move(mv);
        depth += 1;
    }

    let score = game.outcome();
    game.unmake_moves(depth as usize);

    score
}

/// Selects a move uniformly from the move generator.
///
/// Uses a variant of reservoir sampling that works without knowing
/// how many moves the generator will produce: the n-th candidate
/// replaces the current choice with probability 1/n.
fn random_move<G: Game>(random: &mut ChaCha20Rng, game: &mut G) -> i32 {
    let mut count = 0u32;
    let mut choice = NULL_MOVE;

    loop {
        let mv = game.next_move();

        if mv == NULL_MOVE {
            break;
        }

        count += 1;

        if random.gen_range(0..count) == 0 {
            choice = mv;
        }
    }

    choice
}

impl<G: Game> Variant<G> for Rollout {
    const DEFAULT_BIAS: f64 = 0.707;

    fn simulate(&mut self, game: &mut G, max_depth: u32) -> i32 {
        random_playout(&mut self.random, game, max_depth)
    }
}

/// Cooperative single-player policy.
///
/// Simulates two players secretly working together: scores are read
/// through the mover's sign during selection, so north steers toward
/// the worst continuation while south steers toward the best. Pairs
/// with games whose utility treats losses as draws.
#[derive(Debug)]
pub struct Cooperative {
    random: ChaCha20Rng,
}

impl Cooperative {
    /// Creates a playout policy with a reproducible seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            random: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl Default for Cooperative {
    fn default() -> Self {
        Self {
            random: ChaCha20Rng::from_entropy(),
        }
    }
}

impl<G: Game> Variant<G> for Cooperative {
    const DEFAULT_BIAS: f64 = 0.353;

    fn simulate(&mut self, game: &mut G, max_depth: u32) -> i32 {
        random_playout(&mut self.random, game, max_depth)
    }

    fn node_score(&self, node: &UctNode) -> f64 {
        -f64::from(node.turn) * node.score
    }
}

/// Predictor selection (PUCB).
///
/// Each node carries a prior bias proportional to the magnitude of
/// its first evaluation, and the priority decays with the visit ratio
/// between parent and child rather than with the UCB1 logarithm.
#[derive(Debug, Default)]
pub struct Predictor;

impl<G: Game> Variant<G> for Predictor {
    const DEFAULT_BIAS: f64 = 0.353;

    fn init_node(&self, node: &mut UctNode, score: f64, explore_factor: f64) {
        node.bias = explore_factor * score.abs();
    }

    fn parent_factor(&self, parent: &UctNode) -> f64 {
        (parent.count as f64).sqrt()
    }

    fn priority(&self, child: &UctNode, factor: f64, _bias: f64) -> f64 {
        let exploration = factor / child.count as f64;
        child.score - exploration * child.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use games_tictactoe::TicTacToe;
    use ronin_core::{Game, SOUTH};

    #[test]
    fn default_biases() {
        assert!((<Ucb1 as Variant<TicTacToe>>::DEFAULT_BIAS - 0.353).abs() < 1e-9);
        assert!((<Rollout as Variant<TicTacToe>>::DEFAULT_BIAS - 0.707).abs() < 1e-9);
    }

    #[test]
    fn cooperative_orients_scores_by_turn() {
        let policy = Cooperative::with_seed(1);

        let mut node = UctNode::new(0, 0, SOUTH, 0, false);
        node.init_score(50.0);
        assert!((Variant::<TicTacToe>::node_score(&policy, &node) + 50.0).abs() < 1e-9);

        node.turn = -SOUTH;
        assert!((Variant::<TicTacToe>::node_score(&policy, &node) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn predictor_sets_the_prior_bias() {
        let policy = Predictor;
        let mut node = UctNode::new(0, 0, SOUTH, 0, false);

        Variant::<TicTacToe>::init_node(&policy, &mut node, -40.0, 0.5);
        assert!((node.bias - 20.0).abs() < 1e-9);
    }

    #[test]
    fn reservoir_sampling_covers_every_move() {
        let mut random = ChaCha20Rng::seed_from_u64(3);
        let mut game = TicTacToe::new();
        let mut seen = [0u32; 9];

        for _ in 0..2000 {
            let mv = random_move(&mut random, &mut game);
            seen[mv as usize] += 1;
            game.set_cursor(0);
        }

        // Every opening move is reachable and none dominates
        for &count in &seen {
            assert!(count > 100, "skewed distribution: {seen:?}");
        }
    }

    #[test]
    fn playout_rewinds_the_game() {
        let mut random = ChaCha20Rng::seed_from_u64(9);
        let mut game = TicTacToe::new();
        let hash = game.hash();

        for _ in 0..20 {
            let score = random_playout(&mut random, &mut game, 64);
            assert!(score.abs() <= game.infinity());
            assert_eq!(game.hash(), hash);
            assert_eq!(game.length(), 0);
        }
    }
}
