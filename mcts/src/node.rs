//! Search tree nodes.
//!
//! Each node represents a game position reached by an edge move from
//! its parent. Scores are stored from the point of view of the player
//! to move at the node, so a parent reads a child's score negated.

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// A node of the search tree.
#[derive(Debug, Clone)]
pub struct UctNode {
    /// Parent node (NONE for the root). A lookup relation only; the
    /// arena owns every node
    pub parent: NodeId,

    /// Head of the singly-linked child list
    pub child: NodeId,

    /// Next sibling on the parent's child list
    pub sibling: NodeId,

    /// Edge move that led here from the parent
    pub mv: i32,

    /// Hash of the position
    pub hash: u64,

    /// Player to move at this position
    pub turn: i32,

    /// Saved move generation cursor for progressive expansion
    pub cursor: i32,

    /// Cursor value the generator starts from at this position
    pub first_cursor: i32,

    /// Number of simulations through this node
    pub count: u64,

    /// Mean simulation score, from this node's mover viewpoint
    pub score: f64,

    /// Prior expansion bias, used by the predictor variant
    pub bias: f64,

    /// Whether the match ended at this position
    pub terminal: bool,

    /// Whether the move generator was exhausted
    pub expanded: bool,

    /// Whether the score was settled exactly
    pub proven: bool,
}

impl UctNode {
    /// Creates a node for a position.
    pub fn new(mv: i32, hash: u64, turn: i32, cursor: i32, terminal: bool) -> Self {
        Self {
            parent: NodeId::NONE,
            child: NodeId::NONE,
            sibling: NodeId::NONE,
            mv,
            hash,
            turn,
            cursor,
            first_cursor: cursor,
            count: 0,
            score: 0.0,
            bias: 0.0,
            terminal,
            expanded: false,
            proven: false,
        }
    }

    /// Sets the first evaluation of this node.
    pub fn init_score(&mut self, score: f64) {
        self.score = score;
        self.count = 1;
    }

    /// Folds a new sample into the running mean.
    pub fn update_score(&mut self, score: f64) {
        self.count += 1;
        self.score += (score - self.score) / self.count as f64;
    }

    /// Settles the score exactly; settled nodes are never updated by
    /// new visits and behave as terminal during the descent.
    pub fn settle_score(&mut self, score: f64) {
        self.proven = true;
        self.score = score;
    }

    /// Whether the value of this node is known exactly.
    pub fn settled(&self) -> bool {
        self.terminal || self.proven
    }
}
