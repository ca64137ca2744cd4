//! End-to-end searches over tictactoe.

use games_tictactoe::{TicTacToe, TicTacToeBoard, MAX_SCORE};
use ronin_core::{Board, Engine, Flag, Game, MemoryLeaves, NULL_MOVE};
use ronin_negamax::{Mtdf, Negamax};

fn engine() -> Negamax<TicTacToe> {
    let mut engine = Negamax::new();
    engine.set_infinity(MAX_SCORE);
    engine.set_depth(11);
    engine
}

fn game_from(diagram: &str) -> TicTacToe {
    let board = TicTacToeBoard::from_diagram(diagram).unwrap();
    let mut game = TicTacToe::new();
    game.set_board(&board).unwrap();
    game
}

#[test]
fn empty_board_is_a_draw() {
    let mut game = TicTacToe::new();
    let mut engine = engine();

    let score = engine.compute_best_score(&mut game).unwrap();
    assert_eq!(score, 0);
    assert_eq!(game.length(), 0);
}

#[test]
fn south_wins_in_three_plies() {
    // X X - / O O - / - - -: c1 wins at once for south
    let mut game = game_from("XX-OO----X");
    let mut engine = engine();

    let best_move = engine.compute_best_move(&mut game).unwrap();
    assert_eq!(best_move, 2);
    assert_eq!(engine.compute_best_score(&mut game).unwrap(), MAX_SCORE);
}

#[test]
fn forced_loss_returns_the_losing_score() {
    // O holds three open threats; south can cover only one of them
    let mut game = game_from("O-OXOX---X");
    let mut engine = engine();

    let best_move = engine.compute_best_move(&mut game).unwrap();
    assert!(game.is_legal(best_move));
    assert_eq!(engine.compute_best_score(&mut game).unwrap(), -MAX_SCORE);
}

#[test]
fn finished_game_yields_null_move_and_exact_score() {
    let mut game = TicTacToe::new();
    for mv in [0, 3, 1, 4, 2] {
        game.make_move(mv);
    }

    // North is to move on the finished board, so the exact score is
    // a loss from the mover's point of view
    let mut engine = engine();
    assert_eq!(engine.compute_best_move(&mut game).unwrap(), NULL_MOVE);
    assert_eq!(engine.compute_best_score(&mut game).unwrap(), -MAX_SCORE);
}

#[test]
fn search_leaves_the_game_unchanged() {
    let mut game = game_from("X---O----X");
    let hash = game.hash();
    let cursor = game.get_cursor();

    let mut engine = engine();
    engine.compute_best_move(&mut game).unwrap();

    assert_eq!(game.hash(), hash);
    assert_eq!(game.get_cursor(), cursor);
    assert_eq!(game.length(), 0);
}

#[test]
fn abort_returns_last_completed_iteration() {
    let mut game = TicTacToe::new();
    let mut engine = engine();

    // A zero budget aborts immediately; the first iteration still
    // completes and provides the move
    engine.set_move_time(0);

    let best_move = engine.compute_best_move(&mut game).unwrap();
    assert!(game.is_legal(best_move));
    assert!(engine.score_depth() >= 2);
}

#[test]
fn reports_are_published() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let mut game = TicTacToe::new();
    let mut engine = engine();
    let reports = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&reports);
    engine.subscribe(Box::new(move |report| {
        assert!(report.pv.first() == Some(&report.best_move) || report.pv.is_empty());
        seen.fetch_add(1, Ordering::Relaxed);
    }));

    engine.compute_best_move(&mut game).unwrap();
    assert!(reports.load(Ordering::Relaxed) >= 1);
}

#[test]
fn ponder_move_follows_the_principal_variation() {
    let mut game = TicTacToe::new();
    let mut engine = engine();

    let best_move = engine.compute_best_move(&mut game).unwrap();
    let ponder = engine.get_ponder_move(&mut game);

    if ponder != NULL_MOVE {
        game.make_move(best_move);
        assert!(game.is_legal(ponder));
        game.unmake_move();
    }
}

#[test]
fn leaves_oracle_short_circuits_the_search() {
    // Teach the oracle that the position after b2 is a win for south,
    // even though the real game calls it a draw in progress
    let mut game = TicTacToe::new();
    game.make_move(4);
    let hash = game.hash();
    game.unmake_move();

    let mut leaves = MemoryLeaves::new();
    leaves.insert(hash, MAX_SCORE, Flag::Exact);

    let mut engine = engine();
    engine.set_leaves(Box::new(leaves));

    assert_eq!(engine.compute_best_move(&mut game).unwrap(), 4);
    assert_eq!(engine.compute_best_score(&mut game).unwrap(), MAX_SCORE);
}

#[test]
fn mtdf_matches_negamax_scores() {
    let diagrams = [
        "---------X",
        "X---O----X",
        "XX-OO----X",
        "X-O-X---OX",
        "-X-OXO--XO",
    ];

    for diagram in diagrams {
        let mut negamax = engine();
        let mut mtdf: Mtdf<TicTacToe> = Mtdf::new();
        mtdf.set_infinity(MAX_SCORE);
        mtdf.set_depth(11);

        let mut game = game_from(diagram);
        let negamax_score = negamax.compute_best_score(&mut game).unwrap();

        let mut game = game_from(diagram);
        let mtdf_score = mtdf.compute_best_score(&mut game).unwrap();

        assert_eq!(negamax_score, mtdf_score, "diagram {diagram}");
    }
}

#[test]
fn mtdf_finds_the_forced_win() {
    let mut game = game_from("XX-OO----X");
    let mut mtdf: Mtdf<TicTacToe> = Mtdf::new();
    mtdf.set_infinity(MAX_SCORE);
    mtdf.set_depth(11);

    assert_eq!(mtdf.compute_best_move(&mut game).unwrap(), 2);
}
