/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    sync::{atomic::AtomicBool, Arc},
    thread,
    time::{Duration, Instant},
};

use newt::{
    Evaluator, Game, GameClock, LogNone, Pesto, Position, Score, SearchConfig, Searcher,
};

/// An evaluator that takes a noticeable amount of time on every node.
#[derive(Debug, Clone, Copy, Default)]
struct SlowEval;

impl Evaluator<Game> for SlowEval {
    fn evaluate(&self, position: &Game) -> Score {
        thread::sleep(Duration::from_millis(1));
        Pesto.evaluate(position)
    }
}

fn think(fen: &str, millis: u64) -> (Game, String) {
    let mut game = Game::from_fen(fen).unwrap();
    let clock = GameClock::with_time(Duration::from_millis(millis));
    let mv = Searcher::<Pesto>::default().think(&mut game, &clock).unwrap();
    (game, mv.to_string())
}

#[test]
fn test_white_mate_in_one() {
    let (_, mv) = think("6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1", 10_000);
    assert_eq!(mv, "d1d8");
}

#[test]
fn test_black_mate_in_one() {
    let (_, mv) = think("3r2k1/8/8/8/8/8/5PPP/6K1 b - - 0 1", 10_000);
    assert_eq!(mv, "d8d1");
}

#[test]
fn test_think_restores_position() {
    let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
    let original = Game::from_fen(fen).unwrap();
    let (game, mv) = think(fen, 3_000);

    assert_eq!(game.to_fen(), original.to_fen());
    assert_eq!(game.key(), original.key());
    assert!(game.find_move(&mv).is_ok(), "{mv} is not legal in {fen}");
}

#[test]
fn test_losing_side_takes_repetition() {
    // White's lone King cannot hold against the Queen, but it can repeat the position
    let mut game = Game::from_fen("6k1/8/8/8/8/8/q7/6K1 w - - 0 1").unwrap();
    for mv in ["g1h1", "a2b2", "h1g1", "b2a2"] {
        game.make_move_uci(mv).unwrap();
    }

    let clock = GameClock::with_time(Duration::from_secs(10));
    let mv = Searcher::<Pesto>::default().think(&mut game, &clock).unwrap();
    assert_eq!(mv, "g1h1");

    // Repeating is scored as a draw
    let config = SearchConfig {
        max_depth: 4,
        ..Default::default()
    };
    let res = Searcher::<Pesto>::default().search::<LogNone, _>(
        &mut game,
        config,
        Arc::new(AtomicBool::new(true)),
    );
    assert_eq!(res.score, Score::DRAW);
    assert_eq!(res.bestmove.unwrap(), "g1h1");
}

#[test]
fn test_respects_time_budget() {
    // A 3 second clock allows a hard limit of 100ms
    let mut game = Game::default();
    let clock = GameClock::with_time(Duration::from_millis(3_000));
    let mut searcher = Searcher::with_evaluator(SlowEval);

    let start = Instant::now();
    let mv = searcher.think(&mut game, &clock).unwrap();
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_millis(500),
        "search took {elapsed:?} with a 100ms budget"
    );
    assert!(game.find_move(&mv.to_string()).is_ok());
    assert_eq!(game.to_fen(), Game::default().to_fen());
}

#[test]
fn test_no_legal_moves() {
    let mut searcher = Searcher::<Pesto>::default();
    let clock = GameClock::with_time(Duration::from_secs(1));

    // Checkmated
    let mut game = Game::from_fen("3R2k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1").unwrap();
    assert!(searcher.think(&mut game, &clock).is_err());

    // Stalemated
    let mut game = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
    assert!(searcher.think(&mut game, &clock).is_err());
}

#[test]
fn test_ttable_persists_between_moves() {
    let mut game = Game::default();
    let clock = GameClock::with_time(Duration::from_millis(3_000));
    let mut searcher = Searcher::<Pesto>::default();

    let first = searcher.think(&mut game, &clock).unwrap();
    assert!(searcher.ttable().num_entries() > 0);

    game.make_move(first);
    let reply = searcher.think(&mut game, &clock).unwrap();
    assert!(game.legal_moves(false).contains(&reply));
}
