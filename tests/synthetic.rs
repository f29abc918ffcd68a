/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Searches over small, fully enumerable game trees.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use chess::{BitBoard, Color, Piece, Square, ALL_SQUARES};
use newt::{
    Evaluator, LogNone, Move, MoveList, Position, Score, SearchConfig, SearchParameters, Searcher,
    TTable,
};

/// A uniform game tree with no captures, checks, or draws.
///
/// Child `i` of every node is reached by a quiet Knight move to square `i + 1`.
#[derive(Debug, Clone)]
struct Tree {
    branching: usize,
    height: usize,
    seed: u64,
    path: Vec<usize>,
    made: usize,
    undone: usize,
}

impl Tree {
    fn new(branching: usize, height: usize, seed: u64) -> Self {
        Self {
            branching,
            height,
            seed,
            path: Vec::new(),
            made: 0,
            undone: 0,
        }
    }

    fn child(i: usize) -> Move {
        Move::new(Square::A1, ALL_SQUARES[i + 1], Piece::Knight)
    }
}

impl Position for Tree {
    fn legal_moves(&self, captures_only: bool) -> MoveList {
        if captures_only || self.path.len() >= self.height {
            return MoveList::new();
        }

        (0..self.branching).map(Self::child).collect()
    }

    fn make_move(&mut self, mv: Move) {
        self.path.push(mv.to.to_index() - 1);
        self.made += 1;
    }

    fn undo_move(&mut self, mv: Move) {
        let last = self.path.pop().expect("undo without a matching make");
        assert_eq!(Self::child(last), mv, "moves must be undone in stack order");
        self.undone += 1;
    }

    fn make_null_move(&mut self) -> bool {
        false
    }

    fn undo_null_move(&mut self) {
        panic!("no null move was made");
    }

    fn is_in_check(&self) -> bool {
        false
    }

    fn is_draw(&self) -> bool {
        false
    }

    fn is_repetition(&self) -> bool {
        false
    }

    fn key(&self) -> u64 {
        // FNV-1a over the path
        let mut key = 0xcbf2_9ce4_8422_2325 ^ self.seed;
        for &i in &self.path {
            key ^= i as u64 + 1;
            key = key.wrapping_mul(0x0100_0000_01b3);
        }
        key ^ self.path.len() as u64
    }

    fn side_to_move(&self) -> Color {
        if self.path.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    fn ply_count(&self) -> usize {
        self.path.len()
    }

    fn pieces(&self, _piece: Piece, _color: Color) -> BitBoard {
        BitBoard::new(0)
    }

    fn king_square(&self, _color: Color) -> Square {
        Square::A1
    }
}

/// Scores each node with a pseudo-random value derived from its key.
#[derive(Debug, Clone, Copy, Default)]
struct KeyEval;

impl Evaluator<Tree> for KeyEval {
    fn evaluate(&self, position: &Tree) -> Score {
        let mut x = position.key();
        x ^= x >> 33;
        x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
        x ^= x >> 33;
        Score::new((x % 1001) as i32 - 500)
    }
}

/// Scores like [`KeyEval`], but stops the search once it has been called `budget` times.
#[derive(Debug, Clone)]
struct StoppingEval {
    budget: usize,
    evals: Arc<AtomicUsize>,
    is_searching: Arc<AtomicBool>,
}

impl Evaluator<Tree> for StoppingEval {
    fn evaluate(&self, position: &Tree) -> Score {
        if self.evals.fetch_add(1, Ordering::Relaxed) + 1 >= self.budget {
            self.is_searching.store(false, Ordering::Relaxed);
        }
        KeyEval.evaluate(position)
    }
}

/// Plain negamax, with no pruning of any kind.
fn minimax(tree: &mut Tree, depth: usize) -> Score {
    let moves = tree.legal_moves(false);
    if depth == 0 || moves.is_empty() {
        return KeyEval.evaluate(tree);
    }

    let mut best = Score::ALPHA;
    for mv in moves {
        tree.make_move(mv);
        best = best.max(-minimax(tree, depth - 1));
        tree.undo_move(mv);
    }
    best
}

fn exhaustive_searcher(ttable: TTable) -> Searcher<KeyEval> {
    Searcher::with_evaluator(KeyEval)
        .with_params(SearchParameters::exhaustive())
        .with_ttable(ttable)
}

fn search(searcher: &mut Searcher<KeyEval>, tree: &mut Tree, config: SearchConfig) -> newt::SearchResult {
    searcher.search::<LogNone, _>(tree, config, Arc::new(AtomicBool::new(true)))
}

#[test]
fn test_matches_minimax() {
    for seed in 0..24 {
        let (branching, height) = (2 + seed as usize % 4, 3 + seed as usize % 3);
        let mut tree = Tree::new(branching, height, seed);
        let expected = minimax(&mut tree, height);

        let mut searcher = exhaustive_searcher(TTable::default());
        let config = SearchConfig {
            max_depth: height as u8,
            ..Default::default()
        };
        let res = search(&mut searcher, &mut tree, config);

        assert_eq!(
            res.score, expected,
            "seed {seed}: search disagrees with minimax on a {branching}x{height} tree"
        );
        assert_eq!(res.depth as usize, height);

        // The best move leads to a child with the minimax score
        let bestmove = res.bestmove.unwrap();
        tree.make_move(bestmove);
        assert_eq!(-minimax(&mut tree, height - 1), expected, "seed {seed}");
        tree.undo_move(bestmove);

        // The principal variation is a path through the tree, starting with the best move
        assert_eq!(res.pv.moves().first(), Some(&bestmove));
        assert!(res.pv.moves().len() <= height);
    }
}

#[test]
fn test_matches_minimax_with_tiny_ttable() {
    // Almost every store collides, so every probe must check its key
    for seed in 100..112 {
        let mut tree = Tree::new(3, 5, seed);
        let expected = minimax(&mut tree, 5);

        let mut searcher = exhaustive_searcher(TTable::from_capacity(4));
        let config = SearchConfig {
            max_depth: 5,
            ..Default::default()
        };

        assert_eq!(search(&mut searcher, &mut tree, config).score, expected, "seed {seed}");
    }
}

#[test]
fn test_repeated_searches_agree() {
    // A warm transposition table must not change the result
    let mut tree = Tree::new(4, 4, 7);
    let expected = minimax(&mut tree, 4);
    let mut searcher = exhaustive_searcher(TTable::default());
    let config = SearchConfig {
        max_depth: 4,
        ..Default::default()
    };

    for _ in 0..3 {
        assert_eq!(search(&mut searcher, &mut tree, config).score, expected);
    }
}

#[test]
fn test_aborted_search_restores_position() {
    let mut tree = Tree::new(3, 10, 42);
    let key = tree.key();

    let mut searcher = Searcher::with_evaluator(KeyEval);
    let config = SearchConfig {
        max_nodes: 500,
        ..Default::default()
    };
    let res = search(&mut searcher, &mut tree, config);

    assert!(res.nodes <= 600, "search overran its node limit: {}", res.nodes);
    assert!(tree.path.is_empty());
    assert_eq!(tree.key(), key);
    assert_eq!(tree.made, tree.undone);

    // A move is always available, even from an interrupted search
    assert!(res.bestmove.is_some());
}

#[test]
fn test_stopped_search_falls_back_to_a_legal_move() {
    let mut tree = Tree::new(5, 6, 9);

    let mut searcher = Searcher::with_evaluator(KeyEval);
    let res = searcher.search::<LogNone, _>(
        &mut tree,
        SearchConfig::default(),
        Arc::new(AtomicBool::new(false)),
    );

    assert_eq!(res.depth, 0);
    let bestmove = res.bestmove.unwrap();
    assert!(tree.legal_moves(false).contains(&bestmove));
    assert_eq!(tree.made, tree.undone);
}

#[test]
fn test_no_evaluations_after_stop() {
    let mut tree = Tree::new(4, 12, 3);
    let is_searching = Arc::new(AtomicBool::new(true));
    let evals = Arc::new(AtomicUsize::new(0));
    let eval = StoppingEval {
        budget: 300,
        evals: Arc::clone(&evals),
        is_searching: Arc::clone(&is_searching),
    };

    let mut searcher = Searcher::with_evaluator(eval);
    let res = searcher.search::<LogNone, _>(&mut tree, SearchConfig::default(), is_searching);

    // Every node checks for a stop before doing any work of its own
    assert_eq!(evals.load(Ordering::Relaxed), 300);
    assert_eq!(tree.made, tree.undone);
    assert!(tree.path.is_empty());
    assert!(res.bestmove.is_some());
}
