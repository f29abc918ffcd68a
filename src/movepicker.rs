/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use arrayvec::ArrayVec;
use chess::{Color, ALL_PIECES, NUM_PIECES};

use crate::{tune, value_of, HistoryTable, KillerTable, Move, MoveList, MAX_NUM_MOVES};

/// This table represents values for [MVV-LVA](https://www.chessprogramming.org/MVV-LVA) move ordering.
///
/// It is indexed by `[attacker][victim]`, and yields a "score" that is used when sorting moves:
/// the most valuable victim first, and the least valuable attacker among equal victims.
///
/// ```text
///                     VICTIM
/// A       P     N     B     R     Q     K
/// T    +-----------------------------------+
/// T   P| 900   3000  3200  4900  8900  -100
/// A   N| 690   2790  2990  4690  8690  -310
/// C   B| 670   2770  2970  4670  8670  -330
/// K   R| 500   2600  2800  4500  8500  -500
/// E   Q| 100   2200  2400  4100  8100  -900
/// R   K| 1000  3100  3300  5000  9000  0
/// ```
const MVV_LVA: [[i32; NUM_PIECES]; NUM_PIECES] = {
    let mut matrix = [[0; NUM_PIECES]; NUM_PIECES];

    let mut attacker = 0;
    while attacker < NUM_PIECES {
        let mut victim = 0;
        while victim < NUM_PIECES {
            matrix[attacker][victim] =
                10 * value_of(ALL_PIECES[victim]) - value_of(ALL_PIECES[attacker]);
            victim += 1;
        }
        attacker += 1;
    }
    matrix
};

/// Assigns ordering scores to the moves of a single node.
///
/// From best to worst: the transposition table move, captures and promotions by MVV-LVA,
/// killer moves, and finally quiet moves by their history score.
#[derive(Debug, Clone, Copy)]
pub struct MoveScorer<'a> {
    /// Best move previously stored for this position.
    pub tt_move: Option<Move>,

    /// Side making the moves.
    pub color: Color,

    /// Distance from the root, for looking up killers.
    pub ply: usize,

    pub history: &'a HistoryTable,

    pub killers: &'a KillerTable,
}

impl MoveScorer<'_> {
    /// Applies a score to the provided move. Higher is better.
    #[inline(always)]
    pub fn score(&self, mv: &Move) -> i32 {
        // TT move should be looked at first, so assign it the best possible score and immediately exit.
        if self.tt_move.is_some_and(|tt_mv| tt_mv == *mv) {
            return tune::tt_move_score!();
        }

        if !mv.is_quiet() {
            let mut score = tune::capture_base_score!();

            // Capturing a high-value piece with a low-value piece is a good idea
            if let Some(victim) = mv.captured {
                score += MVV_LVA[mv.piece.to_index()][victim.to_index()];
            }

            if let Some(promotion) = mv.promotion {
                score += value_of(promotion);
            }

            return score;
        }

        if let Some(rank) = self.killers.rank(self.ply, mv) {
            return tune::killer_score!() - rank as i32;
        }

        self.history.get(self.color, mv)
    }
}

/// Yields moves in descending order of score, sorting lazily.
///
/// Nodes that cut off early never pay for sorting the moves they do not search.
/// Moves with equal scores are yielded in the order they were generated.
pub struct MovePicker {
    moves: MoveList,
    scores: ArrayVec<i32, MAX_NUM_MOVES>,
    current: usize,
}

impl MovePicker {
    /// Creates a new [`MovePicker`] over `moves`, scoring each with `score_fn`.
    pub fn new(moves: MoveList, score_fn: impl Fn(&Move) -> i32) -> Self {
        let scores = moves.iter().map(score_fn).collect();

        Self {
            moves,
            scores,
            current: 0,
        }
    }

    /// Returns all moves yielded so far, excluding the most recent one.
    #[inline(always)]
    pub fn searched_before_current(&self) -> &[Move] {
        &self.moves[..self.current.saturating_sub(1)]
    }
}

impl Iterator for MovePicker {
    type Item = (Move, i32);

    fn next(&mut self) -> Option<Self::Item> {
        // No more moves left
        if self.current >= self.moves.len() {
            return None;
        }

        // Find the index of the next highest score
        let mut best_index = self.current;
        for i in (self.current + 1)..self.moves.len() {
            if self.scores[i] > self.scores[best_index] {
                best_index = i;
            }
        }

        // Shift the best move into place, keeping the rest in generation order
        if best_index != self.current {
            self.moves[self.current..=best_index].rotate_right(1);
            self.scores[self.current..=best_index].rotate_right(1);
        }

        let item = (self.moves[self.current], self.scores[self.current]);
        self.current += 1;

        Some(item)
    }
}
