//! Distributed opening expansion.
//!
//! A UCT search whose nodes persist to a key/value store, built to
//! grow opening books across many training runs. A single driver
//! thread owns the game and the store; scorer functions run on a
//! worker pool and communicate through messages, with virtual loss
//! steering concurrent evaluations away from each other.

mod doe;
mod node;
mod store;

pub use doe::{Doe, DoeConfig, ScorerError, ScorerFn, TrainError};
pub use node::DoeNode;
pub use store::{DoeStore, StoreError};
