//! Minimal game stub shared by unit tests.

use crate::board::Board;
use crate::error::GameError;
use crate::game::{Game, DRAW, NULL_MOVE, SOUTH};

/// Board stub with a single canonical diagram.
#[derive(Debug, Clone, PartialEq)]
pub struct StubBoard;

impl std::fmt::Display for StubBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "-")
    }
}

impl Board for StubBoard {
    fn turn(&self) -> i32 {
        SOUTH
    }

    fn to_diagram(&self) -> String {
        "-".into()
    }

    fn from_diagram(_: &str) -> Result<Self, GameError> {
        Ok(StubBoard)
    }

    fn to_coordinates(&self, _: i32) -> Result<String, GameError> {
        Ok(String::new())
    }

    fn to_notation(&self, _: &[i32]) -> Result<String, GameError> {
        Ok(String::new())
    }

    fn to_move(&self, _: &str) -> Result<i32, GameError> {
        Ok(0)
    }

    fn to_moves(&self, _: &str) -> Result<Vec<i32>, GameError> {
        Ok(Vec::new())
    }
}

/// Game stub whose position hash is set directly. It admits any move
/// and never ends; useful to exercise caches and decorators.
#[derive(Debug)]
pub struct StubGame {
    hash: u64,
    history: Vec<i32>,
}

impl StubGame {
    pub fn new(hash: u64) -> Self {
        Self {
            hash,
            history: Vec::new(),
        }
    }
}

impl Game for StubGame {
    type Board = StubBoard;

    fn length(&self) -> usize {
        self.history.len()
    }

    fn moves(&self) -> Vec<i32> {
        self.history.clone()
    }

    fn turn(&self) -> i32 {
        SOUTH
    }

    fn hash(&self) -> u64 {
        self.hash
    }

    fn has_ended(&self) -> bool {
        false
    }

    fn winner(&self) -> i32 {
        DRAW
    }

    fn score(&self) -> i32 {
        0
    }

    fn outcome(&self) -> i32 {
        0
    }

    fn contempt(&self) -> i32 {
        0
    }

    fn infinity(&self) -> i32 {
        1000
    }

    fn is_legal(&self, _: i32) -> bool {
        true
    }

    fn make_move(&mut self, mv: i32) {
        self.history.push(mv);
    }

    fn unmake_move(&mut self) {
        self.history.pop();
    }

    fn next_move(&mut self) -> i32 {
        NULL_MOVE
    }

    fn legal_moves(&self) -> Vec<i32> {
        Vec::new()
    }

    fn get_cursor(&self) -> i32 {
        0
    }

    fn set_cursor(&mut self, _: i32) {}

    fn ensure_capacity(&mut self, _: usize) -> Result<(), GameError> {
        Ok(())
    }

    fn set_board(&mut self, _: &StubBoard) -> Result<(), GameError> {
        Ok(())
    }

    fn start_board(&self) -> StubBoard {
        StubBoard
    }

    fn to_board(&self) -> StubBoard {
        StubBoard
    }

    fn to_centi_pawns(&self, score: i32) -> i32 {
        score
    }
}
