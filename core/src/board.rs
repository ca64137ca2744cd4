//! Immutable position snapshots.

use std::fmt::Display;

use crate::error::GameError;

/// The immutable state of a game at a specific point in time.
///
/// A board carries enough information to reconstruct an equivalent
/// [`Game`](crate::game::Game) through `set_board`, and provides the
/// codecs between internal move identifiers and the human-readable
/// notation of the game.
///
/// Two boards are equal if and only if their canonical diagram strings
/// are equal; implementations derive `PartialEq` accordingly.
pub trait Board: Clone + PartialEq + Display {
    /// Player to move on this board.
    fn turn(&self) -> i32;

    /// Compact string representation of the board state, suitable for
    /// reconstructing it with [`Board::from_diagram`].
    fn to_diagram(&self) -> String;

    /// Parses a diagram string into a board.
    fn from_diagram(diagram: &str) -> Result<Self, GameError>
    where
        Self: Sized;

    /// Coordinate representation of a single move.
    fn to_coordinates(&self, mv: i32) -> Result<String, GameError>;

    /// Notation representation of a move sequence. The sequence is not
    /// validated.
    fn to_notation(&self, moves: &[i32]) -> Result<String, GameError>;

    /// Parses the coordinate representation of a single move.
    fn to_move(&self, coordinates: &str) -> Result<i32, GameError>;

    /// Parses a notation string into a move sequence.
    fn to_moves(&self, notation: &str) -> Result<Vec<i32>, GameError>;
}
