use criterion::{black_box, criterion_group, criterion_main, Criterion};

use games_tictactoe::TicTacToe;
use ronin_core::Game;

fn bench_make_unmake(c: &mut Criterion) {
    c.bench_function("make_unmake_full_line", |b| {
        b.iter(|| {
            let mut game = TicTacToe::new();

            for mv in [4, 0, 8, 2, 1, 7, 3, 5, 6] {
                game.make_move(black_box(mv));
            }

            game.unmake_moves(9);
            black_box(game.hash())
        })
    });
}

fn bench_move_generation(c: &mut Criterion) {
    c.bench_function("legal_moves_start_position", |b| {
        let game = TicTacToe::new();
        b.iter(|| black_box(game.legal_moves()))
    });
}

criterion_group!(benches, bench_make_unmake, bench_move_generation);
criterion_main!(benches);
