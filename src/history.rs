/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chess::{Color, NUM_COLORS, NUM_PIECES, NUM_SQUARES};

use crate::{tune, Move, MAX_DEPTH};

/// Stores bonuses and penalties for moving a piece to a square, per side.
///
/// Used to keep track of good/bad quiet moves found during search.
#[derive(Debug, Clone)]
pub struct HistoryTable([[[i32; NUM_SQUARES]; NUM_PIECES]; NUM_COLORS]);

impl HistoryTable {
    /// Clear the history table, removing all scores.
    #[inline(always)]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Fetch the history score of `color` playing `mv`.
    #[inline(always)]
    pub fn get(&self, color: Color, mv: &Move) -> i32 {
        self.0[color.to_index()][mv.piece.to_index()][mv.to.to_index()]
    }

    /// Applies a bonus (or a penalty, if negative) to `color` playing `mv`.
    ///
    /// Uses the "history gravity" formula from <https://www.chessprogramming.org/History_Heuristic#History_Bonuses>,
    /// which keeps every score within `[-max, max]`.
    #[inline(always)]
    pub fn update(&mut self, color: Color, mv: &Move, bonus: i32) {
        let max = tune::max_history_bonus!();
        let clamped = bonus.clamp(-max, max);

        let entry = &mut self.0[color.to_index()][mv.piece.to_index()][mv.to.to_index()];
        *entry += clamped - *entry * clamped.abs() / max;
    }
}

impl Default for HistoryTable {
    #[inline(always)]
    fn default() -> Self {
        Self([[[0; NUM_SQUARES]; NUM_PIECES]; NUM_COLORS])
    }
}

/// Quiet moves that caused a beta cutoff, two per ply.
///
/// See [CPW](https://www.chessprogramming.org/Killer_Heuristic).
#[derive(Debug, Clone)]
pub struct KillerTable(Vec<[Option<Move>; 2]>);

impl KillerTable {
    /// Clear all killer moves.
    #[inline(always)]
    pub fn clear(&mut self) {
        self.0.iter_mut().for_each(|slot| *slot = [None; 2]);
    }

    /// Records `mv` as the newest killer at `ply`, demoting the previous one.
    #[inline(always)]
    pub fn store(&mut self, ply: usize, mv: Move) {
        let Some(slot) = self.0.get_mut(ply) else {
            return;
        };

        if slot[0] != Some(mv) {
            slot[1] = slot[0];
            slot[0] = Some(mv);
        }
    }

    /// Returns the index of `mv` among the killers at `ply`, if it is one.
    #[inline(always)]
    pub fn rank(&self, ply: usize, mv: &Move) -> Option<usize> {
        self.0
            .get(ply)?
            .iter()
            .position(|killer| killer.as_ref() == Some(mv))
    }
}

impl Default for KillerTable {
    #[inline(always)]
    fn default() -> Self {
        Self(vec![[None; 2]; MAX_DEPTH as usize + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{Piece, Square};

    #[test]
    fn test_history_bonus_and_malus() {
        let mut history = HistoryTable::default();
        let mv = Move::new(Square::G1, Square::F3, Piece::Knight);

        history.update(Color::White, &mv, 16);
        assert_eq!(history.get(Color::White, &mv), 16);

        // Histories are kept per side
        assert_eq!(history.get(Color::Black, &mv), 0);

        history.update(Color::White, &mv, -4);
        assert!(history.get(Color::White, &mv) < 16);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = HistoryTable::default();
        let mv = Move::new(Square::E2, Square::E4, Piece::Pawn);

        for _ in 0..1_000 {
            history.update(Color::Black, &mv, 100_000);
        }

        let max = tune::max_history_bonus!();
        assert!(history.get(Color::Black, &mv) <= max);

        history.clear();
        assert_eq!(history.get(Color::Black, &mv), 0);
    }

    #[test]
    fn test_killers() {
        let mut killers = KillerTable::default();
        let a = Move::new(Square::B1, Square::C3, Piece::Knight);
        let b = Move::new(Square::G1, Square::F3, Piece::Knight);
        let c = Move::new(Square::D2, Square::D4, Piece::Pawn);

        killers.store(3, a);
        killers.store(3, a);
        assert_eq!(killers.rank(3, &a), Some(0));
        assert_eq!(killers.rank(3, &b), None);

        killers.store(3, b);
        assert_eq!(killers.rank(3, &b), Some(0));
        assert_eq!(killers.rank(3, &a), Some(1));

        killers.store(3, c);
        assert_eq!(killers.rank(3, &a), None);

        // Other plies are untouched
        assert_eq!(killers.rank(2, &c), None);

        killers.clear();
        assert_eq!(killers.rank(3, &c), None);
    }
}
