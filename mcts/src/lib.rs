//! Monte Carlo tree search engines.
//!
//! One shared search loop ([`Mcts`]) with compile-time variants:
//! - [`Uct`]: UCB1 selection over the game heuristic
//! - [`Montecarlo`]: uniformly random playouts
//! - [`Puct`]: predictor bias from each node's first evaluation
//! - [`Partner`]: cooperative single-player search
//!
//! All variants propagate exact scores up the tree, reuse the tree
//! between root searches and prune their least promising branches
//! under memory pressure.

pub mod config;
pub mod node;
pub mod tree;
pub mod uct;
pub mod variant;

pub use config::UctConfig;
pub use node::{NodeId, UctNode};
pub use tree::UctTree;
pub use uct::{Mcts, Montecarlo, Partner, Puct, Uct};
pub use variant::{Cooperative, Predictor, Rollout, Ucb1, Variant};
