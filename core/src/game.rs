//! Game state machine contract.
//!
//! A `Game` is a stack of moves on top of an immutable start `Board`.
//! Performing a move transitions the machine to a new state and
//! `unmake_move` reverts it exactly, including the position hash and
//! the legal-move cursor. Engines rely on this round-trip being exact.

use crate::board::Board;
use crate::error::GameError;

/// South player identifier. South moves are scored positively.
pub const SOUTH: i32 = 1;

/// North player identifier.
pub const NORTH: i32 = -SOUTH;

/// Returned by `winner` when the game ended in a draw.
pub const DRAW: i32 = 0;

/// Identifier of the absent move.
pub const NULL_MOVE: i32 = -1;

/// Utility score of a drawn position.
pub const DRAW_SCORE: i32 = 0;

/// Logic of a match between two players.
///
/// Implementations store the performed moves of a match and provide
/// incremental legal move generation and evaluation of the current
/// position. The contract every engine depends on:
///
/// - After `make_move(m)` followed by `unmake_move()` the hash, the
///   cursor and every evaluation method return exactly their previous
///   values.
/// - `score()` and `outcome()` are always from south's point of view.
/// - `next_move()` keeps returning [`NULL_MOVE`] once the generator is
///   exhausted, until the next make/unmake boundary.
pub trait Game {
    /// Immutable snapshot type for this game.
    type Board: Board;

    /// Number of moves performed since the start board.
    fn length(&self) -> usize;

    /// Moves performed so far, oldest first.
    fn moves(&self) -> Vec<i32>;

    /// Player to move, [`SOUTH`] or [`NORTH`].
    fn turn(&self) -> i32;

    /// Unique hash of the current position.
    fn hash(&self) -> u64;

    /// Whether the match ended on the current position.
    fn has_ended(&self) -> bool;

    /// Winner of the match: [`SOUTH`], [`NORTH`] or [`DRAW`] while the
    /// match is undecided.
    fn winner(&self) -> i32;

    /// Heuristic evaluation of the current position, from south's
    /// point of view. Strictly inside `(-infinity, infinity)`.
    fn score(&self) -> i32;

    /// Utility evaluation of the current position as an endgame:
    /// `infinity` if south won, `-infinity` if north won and
    /// [`DRAW_SCORE`] otherwise.
    fn outcome(&self) -> i32;

    /// Score to which a draw evaluates for this game.
    fn contempt(&self) -> i32;

    /// Maximum utility score a position can reach.
    fn infinity(&self) -> i32;

    /// Whether a move is legal on the current position.
    fn is_legal(&self, mv: i32) -> bool;

    /// Performs a move on the internal board.
    ///
    /// Must be as efficient as possible; it does not check legality
    /// nor that the game has capacity to store the move.
    fn make_move(&mut self, mv: i32);

    /// Reverts the last performed move, restoring the move generation
    /// cursor to the state it had before the matching `make_move`.
    ///
    /// Implementations panic if the history is empty; engines never
    /// unmake more moves than they made.
    fn unmake_move(&mut self);

    /// Reverts the given number of moves.
    fn unmake_moves(&mut self, count: usize) {
        for _ in 0..count {
            self.unmake_move();
        }
    }

    /// Next legal move for the current position or [`NULL_MOVE`] once
    /// all moves were iterated. Generation may be staged; good move
    /// ordering improves engine performance.
    fn next_move(&mut self) -> i32;

    /// All legal moves for the current position. Does not perturb the
    /// move generation cursor.
    fn legal_moves(&self) -> Vec<i32>;

    /// Opaque move generation cursor for the current position.
    fn get_cursor(&self) -> i32;

    /// Restores a move generation cursor.
    fn set_cursor(&mut self, cursor: i32);

    /// Grows the internal stacks to admit at least `min_capacity`
    /// moves. Idempotent.
    fn ensure_capacity(&mut self, min_capacity: usize) -> Result<(), GameError>;

    /// Sets a new start position, discarding the move history.
    fn set_board(&mut self, board: &Self::Board) -> Result<(), GameError>;

    /// Start board of this match.
    fn start_board(&self) -> Self::Board;

    /// Board representation of the current position.
    fn to_board(&self) -> Self::Board;

    /// Recomputes the internal board for a match that ends on the
    /// current position. Only meaningful for games whose board keeps
    /// changing after the match ends.
    fn end_match(&mut self) {}

    /// Converts an evaluation score to centipawns.
    fn to_centi_pawns(&self, score: i32) -> i32;
}
