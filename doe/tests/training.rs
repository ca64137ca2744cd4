//! End-to-end training runs over tictactoe.

use std::sync::Arc;

use games_tictactoe::{TicTacToe, TicTacToeBoard, MAX_SCORE};
use ronin_core::{Board, Engine, Game, NULL_MOVE};
use ronin_doe::{Doe, DoeConfig, DoeStore, ScorerFn, ScorerError, TrainError};

/// Deterministic scorer: replays the move path and returns the game
/// heuristic of the reached position.
fn heuristic_scorer() -> ScorerFn {
    Arc::new(|moves: &[i32]| {
        let mut game = TicTacToe::new();

        for &mv in moves {
            game.make_move(mv);
        }

        Ok(game.score())
    })
}

fn trainer(pool_size: usize) -> Doe<TicTacToe> {
    let store = DoeStore::open_in_memory().unwrap();
    let mut doe = Doe::with_config(store, DoeConfig::default().with_pool_size(pool_size));
    doe.set_infinity(MAX_SCORE);
    doe
}

#[test]
fn training_builds_a_consistent_tree() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(1);

    doe.train(50, &mut game, heuristic_scorer()).unwrap();

    let nodes = doe.store().values().unwrap();
    assert!(nodes.len() > 9, "expected a grown tree, got {}", nodes.len());

    let root = doe.store().read(1).unwrap().unwrap();
    assert!(root.expanded);
    assert_eq!(root.hash, game.hash());

    // The root has one child per opening move
    let mut children = 0;
    let mut next = root.child;
    while let Some(child) = doe.store().read(next).unwrap() {
        assert_eq!(child.parent, 1);
        assert_eq!(child.moves.len(), 1);
        children += 1;
        next = child.sibling;
    }
    assert_eq!(children, 9);
}

#[test]
fn waiting_counters_return_to_zero_after_a_run() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(4);

    doe.train(80, &mut game, heuristic_scorer()).unwrap();

    for node in doe.store().values().unwrap() {
        assert_eq!(node.waiting, 0, "node {} still waiting", node.id);
        assert!(node.evaluated, "node {} left unevaluated", node.id);
    }
}

#[test]
fn training_is_resumable_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.db");

    let first_count = {
        let store = DoeStore::open(&path).unwrap();
        let mut doe = Doe::with_config(store, DoeConfig::default());
        doe.set_infinity(MAX_SCORE);

        let mut game = TicTacToe::new();
        doe.train(30, &mut game, heuristic_scorer()).unwrap();
        doe.into_store().len().unwrap()
    };

    // A second run over the same store keeps growing the same tree
    let store = DoeStore::open(&path).unwrap();
    let mut doe = Doe::with_config(store, DoeConfig::default());
    doe.set_infinity(MAX_SCORE);

    let mut game = TicTacToe::new();
    doe.train(20, &mut game, heuristic_scorer()).unwrap();

    let nodes = doe.store().values().unwrap();
    assert!(nodes.len() >= first_count);

    for node in &nodes {
        assert!(node.evaluated);
        assert_eq!(node.waiting, 0);
    }
}

#[test]
fn mismatched_root_is_rejected() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(1);

    doe.train(10, &mut game, heuristic_scorer()).unwrap();

    // Rebinding the same store to another position must fail
    let board = TicTacToeBoard::from_diagram("X---O----X").unwrap();
    let mut other = TicTacToe::new();
    other.set_board(&board).unwrap();

    match doe.train(10, &mut other, heuristic_scorer()) {
        Err(TrainError::StateMismatch { .. }) => (),
        other => panic!("expected a state mismatch, got {other:?}"),
    }
}

#[test]
fn scorer_failures_abort_the_training() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(2);

    let scorer: ScorerFn = Arc::new(|_moves| Err(ScorerError("offline".into())));

    match doe.train(50, &mut game, scorer) {
        Err(TrainError::Scorer(error)) => assert!(error.to_string().contains("offline")),
        other => panic!("expected a scorer failure, got {other:?}"),
    }
}

#[test]
fn trained_book_suggests_a_legal_move() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(2);

    doe.train(100, &mut game, heuristic_scorer()).unwrap();

    let best_move = doe.best_move(&mut game).unwrap();
    assert!(game.is_legal(best_move));

    let score = doe.best_score(&mut game).unwrap();
    assert!(score.abs() <= MAX_SCORE);
}

#[test]
fn engine_surface_answers_from_the_store() {
    let mut game = TicTacToe::new();
    let mut doe = trainer(1);

    // Before any training there is nothing to suggest
    assert_eq!(doe.compute_best_move(&mut game).unwrap(), NULL_MOVE);

    doe.train(30, &mut game, heuristic_scorer()).unwrap();

    let best_move = doe.compute_best_move(&mut game).unwrap();
    assert!(game.is_legal(best_move));
}

#[test]
fn terminal_nodes_are_evaluated_inline() {
    // Start from a position one ply away from the end so expansions
    // reach terminal children quickly
    let board = TicTacToeBoard::from_diagram("XXOOOXX--X").unwrap();
    let mut game = TicTacToe::new();
    game.set_board(&board).unwrap();

    let mut doe = trainer(1);
    doe.train(20, &mut game, heuristic_scorer()).unwrap();

    let nodes = doe.store().values().unwrap();
    let terminals: Vec<_> = nodes.iter().filter(|node| node.terminal).collect();

    assert!(!terminals.is_empty());

    for node in terminals {
        assert!(node.evaluated);
        assert!(node.score.abs() <= f64::from(MAX_SCORE));
    }
}

#[test]
fn single_worker_matches_sequential_expansion_counts() {
    // With one worker and a pure scorer the tree holds exactly the
    // root plus one batch of children per expanded parent
    let mut game = TicTacToe::new();
    let mut doe = trainer(1);

    doe.train(40, &mut game, heuristic_scorer()).unwrap();

    let nodes = doe.store().values().unwrap();
    let expanded = nodes.iter().filter(|node| node.expanded).count();
    let children = nodes.len() - 1;

    let batch_sum: usize = nodes
        .iter()
        .filter(|node| node.expanded)
        .map(|node| {
            let mut count = 0;
            let mut next = node.child;
            while let Some(child) = doe.store().read(next).unwrap() {
                count += 1;
                next = child.sibling;
            }
            count
        })
        .sum();

    assert_eq!(children, batch_sum, "expanded parents: {expanded}");
}
