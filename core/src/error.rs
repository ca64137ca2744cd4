//! Error types shared across the workspace.

use thiserror::Error;

/// Errors raised by game and board implementations.
#[derive(Debug, Error)]
pub enum GameError {
    /// A diagram string could not be parsed into a position.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// A move coordinate or notation string could not be parsed.
    #[error("invalid move: {0}")]
    InvalidMove(String),

    /// A capacity request exceeded the game's hard limit.
    #[error("capacity exceeded: requested {requested}, maximum {maximum}")]
    CapacityExceeded { requested: usize, maximum: usize },

    /// An unmake was requested on an empty move history.
    #[error("no moves to unmake")]
    EmptyHistory,
}

/// Errors surfaced by a best-move computation.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The game rejected an operation performed by the engine.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A backing store failed while the engine was reading the tree.
    #[error("store failure: {0}")]
    Store(String),
}
