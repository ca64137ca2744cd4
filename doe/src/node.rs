//! Persisted tree nodes.

use ronin_core::game::Game;

/// Store key that resolves to no node.
pub const NO_KEY: i64 = 0;

/// A tree node persisted to the key/value store.
///
/// Links between nodes are store keys rather than references; a key
/// that does not resolve terminates the chain. The `moves` path from
/// the root is carried on every node so external evaluators can
/// replay the position without touching the shared game.
#[derive(Debug, Clone, PartialEq)]
pub struct DoeNode {
    /// Store key, assigned on first write ([`NO_KEY`] until then)
    pub id: i64,

    /// Key of the parent node
    pub parent: i64,

    /// Key of the head of the child list
    pub child: i64,

    /// Key of the next sibling
    pub sibling: i64,

    /// Hash of the position
    pub hash: u64,

    /// Edge move that led here from the parent
    pub mv: i32,

    /// Player to move at this position
    pub turn: i32,

    /// Number of evaluations folded into the score
    pub count: i64,

    /// Mean evaluation score, from this node's mover viewpoint
    pub score: f64,

    /// Descendant evaluations outstanding (the virtual-loss weight)
    pub waiting: i32,

    /// Whether the node received its evaluation
    pub evaluated: bool,

    /// Whether the match ended at this position
    pub terminal: bool,

    /// Whether the children of this node were created
    pub expanded: bool,

    /// Moves from the root position to this node
    pub moves: Vec<i32>,
}

impl DoeNode {
    /// Creates a node for the current position of a game.
    pub fn from_game<G: Game>(game: &G, mv: i32) -> Self {
        Self {
            id: NO_KEY,
            parent: NO_KEY,
            child: NO_KEY,
            sibling: NO_KEY,
            hash: game.hash(),
            mv,
            turn: game.turn(),
            count: 0,
            score: 0.0,
            waiting: 0,
            evaluated: false,
            terminal: game.has_ended(),
            expanded: false,
            moves: game.moves(),
        }
    }

    /// Folds a new sample into the running mean.
    pub fn update_score(&mut self, score: f64) {
        self.count += 1;
        self.score += (score - self.score) / self.count as f64;
    }

    /// Serializes the move path as little-endian words.
    pub fn encode_moves(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 * self.moves.len());

        for &mv in &self.moves {
            bytes.extend_from_slice(&mv.to_le_bytes());
        }

        bytes
    }

    /// Parses a move path serialized by [`DoeNode::encode_moves`].
    pub fn decode_moves(bytes: &[u8]) -> Vec<i32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_path_round_trip() {
        let moves = vec![4, 0, 8, -1, 1 << 20];

        let node = DoeNode {
            id: NO_KEY,
            parent: NO_KEY,
            child: NO_KEY,
            sibling: NO_KEY,
            hash: 0,
            mv: -1,
            turn: 1,
            count: 0,
            score: 0.0,
            waiting: 0,
            evaluated: false,
            terminal: false,
            expanded: false,
            moves: moves.clone(),
        };

        assert_eq!(DoeNode::decode_moves(&node.encode_moves()), moves);
        assert!(DoeNode::decode_moves(&[]).is_empty());
    }

    #[test]
    fn update_score_keeps_a_running_mean() {
        let mut node = DoeNode {
            id: NO_KEY,
            parent: NO_KEY,
            child: NO_KEY,
            sibling: NO_KEY,
            hash: 0,
            mv: -1,
            turn: 1,
            count: 0,
            score: 0.0,
            waiting: 0,
            evaluated: false,
            terminal: false,
            expanded: false,
            moves: Vec::new(),
        };

        node.update_score(10.0);
        node.update_score(30.0);

        assert_eq!(node.count, 2);
        assert!((node.score - 20.0).abs() < 1e-9);
    }
}
