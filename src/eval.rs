/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chess::{Color, Piece, Square, ALL_COLORS, ALL_PIECES};

use crate::{Position, Psqt, Score};

/// Game phase of a position with all non-pawn material still on the board.
pub const MAX_PHASE: i32 = 24;

/// Game phase below which the distance between the Kings starts to matter.
const KING_DISTANCE_PHASE: i32 = 20;

/// Weight of each unit of King distance.
const KING_DISTANCE_WEIGHT: i32 = 8;

/// Scores a position statically.
pub trait Evaluator<P: ?Sized> {
    /// Evaluate `position` from the side-to-move's perspective.
    ///
    /// A positive/high number is good for the side-to-move, while a negative number is better for the opponent.
    /// A score of 0 is considered equal.
    fn evaluate(&self, position: &P) -> Score;
}

/// Tapered piece-square evaluation in the style of [PeSTO](https://www.chessprogramming.org/PeSTO%27s_Evaluation_Function).
///
/// Every piece contributes its material value plus a square bonus, once for the middle-game and
/// once for the end-game. The two totals are blended by the game phase. In the end-game, the side
/// that is ahead on material is rewarded for bringing its King closer to the enemy King.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pesto;

impl Pesto {
    /// Evaluate `position` from White's perspective.
    ///
    /// Mirroring the board and swapping the colors of all pieces negates this score.
    pub fn evaluate_white<P: Position + ?Sized>(&self, position: &P) -> Score {
        let mut mg = 0;
        let mut eg = 0;
        let mut material = 0;

        for color in ALL_COLORS {
            let sign = color_sign(color);

            for piece in ALL_PIECES {
                for square in position.pieces(piece, color) {
                    let (mg_value, eg_value) = Psqt::evals(piece, color, square);
                    mg += sign * mg_value;
                    eg += sign * eg_value;
                    material += sign * value_of(piece);
                }
            }
        }

        let phase = Self::phase(position);

        // Only the side with more material wants the Kings close together
        let leader = material.signum();
        let distance = king_distance(
            position.king_square(Color::White),
            position.king_square(Color::Black),
        );
        let king_term =
            leader * distance * (KING_DISTANCE_PHASE - phase).max(0) * KING_DISTANCE_WEIGHT;

        Score::new((mg * phase + eg * (MAX_PHASE - phase) - king_term) / MAX_PHASE)
    }

    /// Computes the game phase of `position`, in the range `[0, MAX_PHASE]`.
    ///
    /// Higher numbers are closer to the beginning of the game.
    pub fn phase<P: Position + ?Sized>(position: &P) -> i32 {
        let phase = ALL_COLORS
            .into_iter()
            .flat_map(|color| ALL_PIECES.into_iter().map(move |piece| (piece, color)))
            .map(|(piece, color)| position.pieces(piece, color).popcnt() as i32 * phase_of(piece))
            .sum::<i32>();

        // Promotions can push the total past the starting material
        phase.min(MAX_PHASE)
    }
}

impl<P: Position + ?Sized> Evaluator<P> for Pesto {
    #[inline(always)]
    fn evaluate(&self, position: &P) -> Score {
        let score = self.evaluate_white(position);

        match position.side_to_move() {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

/// Returns `1` for White and `-1` for Black.
#[inline(always)]
const fn color_sign(color: Color) -> i32 {
    match color {
        Color::White => 1,
        Color::Black => -1,
    }
}

/// Returns the material value of the provided [`Piece`].
///
/// The King is never captured, so its value is 0, which is easier to work with in computations.
#[inline(always)]
pub const fn value_of(piece: Piece) -> i32 {
    match piece {
        Piece::Pawn => 100,
        Piece::Knight => 310,
        Piece::Bishop => 330,
        Piece::Rook => 500,
        Piece::Queen => 900,
        Piece::King => 0,
    }
}

/// Contribution of a [`Piece`] to the game phase.
#[inline(always)]
const fn phase_of(piece: Piece) -> i32 {
    match piece {
        Piece::Knight | Piece::Bishop => 1,
        Piece::Rook => 2,
        Piece::Queen => 4,
        Piece::Pawn | Piece::King => 0,
    }
}

/// Manhattan distance between two squares.
#[inline(always)]
fn king_distance(a: Square, b: Square) -> i32 {
    let files = a.get_file().to_index().abs_diff(b.get_file().to_index());
    let ranks = a.get_rank().to_index().abs_diff(b.get_rank().to_index());
    (files + ranks) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Game, FEN_KIWIPETE, FEN_STARTPOS};

    /// Mirrors a FEN vertically and swaps the colors of every piece and right.
    fn mirror_fen(fen: &str) -> String {
        let swap_case = |s: &str| {
            s.chars()
                .map(|c| {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect::<String>()
        };

        let mut fields = fen.split_ascii_whitespace();
        let placement = fields.next().unwrap();
        let stm = fields.next().unwrap();
        let castling = fields.next().unwrap_or("-");
        let ep = fields.next().unwrap_or("-");
        let rest = fields.collect::<Vec<_>>().join(" ");

        let placement = placement
            .split('/')
            .rev()
            .map(swap_case)
            .collect::<Vec<_>>()
            .join("/");

        let stm = if stm == "w" { "b" } else { "w" };

        let castling = if castling == "-" {
            castling.to_string()
        } else {
            let swapped = swap_case(castling);
            // Keep White's rights first
            let (white, black): (String, String) =
                swapped.chars().partition(|c| c.is_ascii_uppercase());
            white + &black
        };

        let ep = match ep.as_bytes() {
            [file, rank] => format!("{}{}", *file as char, (b'1' + b'8' - *rank) as char),
            _ => ep.to_string(),
        };

        format!("{placement} {stm} {castling} {ep} {rest}")
    }

    const FENS: [&str; 6] = [
        FEN_STARTPOS,
        FEN_KIWIPETE,
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "8/8/8/4k3/8/8/3QK3/8 w - - 0 1",
        "6k1/5ppp/8/8/8/8/5PPP/3R2K1 b - - 0 1",
    ];

    #[test]
    fn test_mirror_fen() {
        assert_eq!(
            mirror_fen("4k3/8/8/3pP3/8/8/8/4K2R w K d6 0 1"),
            "4k2r/8/8/8/3Pp3/8/8/4K3 b k d3 0 1"
        );
    }

    #[test]
    fn test_startpos_is_balanced() {
        let game = Game::default();
        assert_eq!(Pesto.evaluate(&game), Score::DRAW);
        assert_eq!(Pesto::phase(&game), MAX_PHASE);
    }

    #[test]
    fn test_eval_is_antisymmetric() {
        for fen in FENS {
            let game = Game::from_fen(fen).unwrap();
            let mirrored = Game::from_fen(&mirror_fen(fen)).unwrap();

            // From White's perspective, swapping colors negates the score
            assert_eq!(
                Pesto.evaluate_white(&mirrored),
                -Pesto.evaluate_white(&game),
                "White's evaluation of {fen:?} is not antisymmetric"
            );

            // The side to move swaps too, so its own evaluation is unchanged
            assert_eq!(
                Pesto.evaluate(&mirrored),
                Pesto.evaluate(&game),
                "Side-to-move evaluation of {fen:?} changed after mirroring"
            );
        }
    }

    #[test]
    fn test_material_advantage() {
        // White is up a rook
        let game = Game::from_fen("4k3/pppppppp/8/8/8/8/PPPPPPPP/R3K3 w - - 0 1").unwrap();
        assert!(Pesto.evaluate_white(&game) > Score::new(300));

        let game = Game::from_fen("4k3/pppppppp/8/8/8/8/PPPPPPPP/R3K3 b - - 0 1").unwrap();
        assert!(Pesto.evaluate(&game) < Score::new(-300));
    }

    #[test]
    fn test_stronger_side_wants_kings_close() {
        let far = Game::from_fen("7k/8/8/8/8/8/8/KQ6 w - - 0 1").unwrap();
        let near = Game::from_fen("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1").unwrap();

        assert_eq!(Pesto::phase(&far), 4);
        assert!(Pesto.evaluate(&near) > Pesto.evaluate(&far));
    }

    #[test]
    fn test_phase_is_clamped() {
        // Three extra queens from promotions
        let game =
            Game::from_fen("rnbqkbnr/pppppppp/8/8/8/8/QQQPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(Pesto::phase(&game), MAX_PHASE);
    }
}
