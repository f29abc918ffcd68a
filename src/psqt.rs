/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use chess::{Color, Piece, Square};

use crate::value_of;

// Tables are written from White's perspective, with the eighth rank on top.

#[rustfmt::skip]
const PAWN_MG: Psqt = Psqt::new(Piece::Pawn, [
      0,   0,   0,   0,   0,   0,   0,   0,
     96, 128,  56,  88,  64, 120,  32,  -8,
      0,   0,  24,  24,  64,  56,  24, -16,
     -8,   8,   0,  16,  16,   8,  16, -16,
    -24,   0,   0,   8,  16,   0,   8, -24,
    -24,   0,   0,  -8,   0,   0,  32,  -8,
    -32,   0, -16, -16,  -8,  24,  32, -16,
      0,   0,   0,   0,   0,   0,   0,   0,
]);

#[rustfmt::skip]
const PAWN_EG: Psqt = Psqt::new(Piece::Pawn, [
      0,   0,   0,   0,   0,   0,   0,   0,
    176, 168, 152, 128, 144, 128, 160, 184,
     88,  96,  80,  64,  56,  48,  80,  80,
     32,  24,   8,   0,   0,   0,  16,  16,
      8,   8,   0,   0,   0,  -8,   0,   0,
      0,   0,   0,   0,   0,   0,   0,  -8,
      8,   8,   8,   8,   8,   0,   0,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
]);

#[rustfmt::skip]
const KNIGHT_MG: Psqt = Psqt::new(Piece::Knight, [
    -160, -88, -32, -48,  56, -96,  -8, -104,
     -72, -40,  72,  32,  16,  56,   0,  -16,
     -40,  56,  32,  64,  80, 128,  72,   40,
      -8,  16,  16,  48,  32,  64,  16,   16,
      -8,   0,  16,   8,  24,  16,  16,   -8,
     -16,  -8,   8,   8,  16,  16,  24,  -16,
     -24, -48,  -8,   0,   0,  16,  -8,  -16,
    -104, -16, -56, -32, -16, -24, -16,  -16,
]);

#[rustfmt::skip]
const KNIGHT_EG: Psqt = Psqt::new(Piece::Knight, [
    -56, -32,  -8, -24, -24, -24, -56, -96,
    -24,  -8, -24,   0,  -8, -24, -24, -48,
    -24, -16,   8,   8,   0,  -8, -16, -40,
    -16,   0,  16,  16,  16,   8,   8, -16,
    -16,   0,  16,  24,  16,  16,   0, -16,
    -16,   0,   0,   8,   8,   0, -16, -16,
    -40, -16,  -8,   0,   0, -16, -16, -40,
    -24, -48, -16,  -8, -16, -16, -48, -64,
]);

#[rustfmt::skip]
const BISHOP_MG: Psqt = Psqt::new(Piece::Bishop, [
    -24,   0, -80, -32, -24, -40,   0,  -8,
    -24,  16, -16,  -8,  24,  56,  16, -40,
    -16,  32,  40,  40,  32,  48,  32,   0,
      0,   0,  16,  48,  32,  32,   0,   0,
      0,   8,   8,  24,  32,   8,   8,   0,
      0,   8,   8,   8,   8,  24,  16,   8,
      0,   8,  16,   0,   0,  16,  32,   0,
    -32,   0,  -8, -16,  -8,  -8, -32, -16,
]);

#[rustfmt::skip]
const BISHOP_EG: Psqt = Psqt::new(Piece::Bishop, [
     -8, -16,  -8,  -8,   0,  -8, -16, -24,
     -8,   0,   0,  -8,   0,  -8,   0,  -8,
      0,  -8,   0,   0,   0,   0,   0,   0,
      0,   8,   8,   8,   8,   8,   0,   0,
      0,   0,   8,  16,   0,   8,   0,  -8,
     -8,   0,   8,   8,   8,   0,   0,  -8,
     -8, -16,   0,   0,   0,  -8,  -8, -24,
    -16,  -8, -16,   0,  -8, -16,   0, -16,
]);

#[rustfmt::skip]
const ROOK_MG: Psqt = Psqt::new(Piece::Rook, [
     32,  40,  32,  48,  56,   8,  24,  40,
     24,  32,  56,  56,  80,  64,  24,  40,
      0,  16,  24,  32,  16,  40,  56,  16,
    -24,  -8,   0,  24,  24,  32,  -8, -16,
    -32, -24,  -8,   0,   8,   0,   0, -16,
    -40, -24, -16, -16,   0,   0,   0, -32,
    -40, -16, -16,  -8,   0,   8,   0, -64,
    -16,  -8,   0,  16,  16,   0, -32, -24,
]);

#[rustfmt::skip]
const ROOK_EG: Psqt = Psqt::new(Piece::Rook, [
      8,   8,  16,   8,   8,   8,   8,   0,
      8,   8,   8,   8,   0,   0,   8,   0,
      0,   0,   0,   0,   0,   0,   0,   0,
      0,   0,   8,   0,   0,   0,   0,   0,
      0,   0,   8,   0,   0,   0,  -8,  -8,
      0,   0,   0,   0,   0,  -8,  -8, -16,
      0,   0,   0,   0,  -8,  -8,  -8,   0,
     -8,   0,   0,   0,   0,  -8,   0, -16,
]);

#[rustfmt::skip]
const QUEEN_MG: Psqt = Psqt::new(Piece::Queen, [
    -24,   0,  24,   8,  56,  40,  40,  40,
    -24, -32,   0,   0, -16,  56,  24,  48,
     -8, -16,   0,   8,  24,  56,  40,  56,
    -24, -24, -16, -16,   0,  16,   0,   0,
     -8, -24,  -8,  -8,   0,   0,   0,   0,
     -8,   0,  -8,   0,   0,   0,   8,   0,
    -32,  -8,   8,   0,   8,   8,   0,   0,
      0, -16,  -8,   8,  -8, -24, -24, -48,
]);

#[rustfmt::skip]
const QUEEN_EG: Psqt = Psqt::new(Piece::Queen, [
     -8,  16,  16,  24,  24,  16,   8,  16,
    -16,  16,  32,  40,  56,  24,  24,   0,
    -16,   0,   8,  48,  40,  32,  16,   8,
      0,  16,  24,  40,  56,  40,  56,  32,
    -16,  24,  16,  40,  24,  32,  32,  16,
    -16, -24,   8,   0,   8,  16,   8,   0,
    -16, -16, -24, -16, -16, -16, -32, -32,
    -32, -24, -16, -40,   0, -32, -16, -40,
]);

#[rustfmt::skip]
const KING_MG: Psqt = Psqt::new(Piece::King, [
    -64,  16,  16,  -8, -56, -32,   0,   8,
     24,   0, -16,   0,  -8,   0, -32, -24,
     -8,  24,   0, -16, -16,   0,  16, -16,
    -16, -16,  -8, -24, -24, -24,  -8, -32,
    -48,   0, -24, -32, -40, -40, -32, -48,
     -8,  -8, -16, -40, -40, -24,  -8, -24,
      0,   0,  -8, -64, -40, -16,   8,   8,
     -8,  32,   8, -48,   8, -24,  24,   8,
]);

#[rustfmt::skip]
const KING_EG: Psqt = Psqt::new(Piece::King, [
    -72, -32, -16, -16,  -8,   8,   0, -16,
     -8,  16,   8,  16,  16,  32,  16,   8,
      8,  16,  16,   8,  16,  40,  40,   8,
     -8,  16,  24,  24,  24,  32,  24,   0,
    -16,   0,  16,  24,  24,  16,   8,  -8,
    -16,   0,   8,  16,  16,  16,   0,  -8,
    -24,  -8,   0,   8,   8,   0,   0, -16,
    -48, -32, -16,  -8, -24,  -8, -24, -40,
]);

/// A [Piece-Square Table](https://www.chessprogramming.org/Piece-Square_Tables) for use in evaluation.
///
/// Values include the material value of the piece.
#[derive(Debug)]
pub struct Psqt([i32; 64]);

impl Psqt {
    /// Fetch the middle-game and end-game values of a `color` `piece` on `square`.
    #[inline(always)]
    pub fn evals(piece: Piece, color: Color, square: Square) -> (i32, i32) {
        let (mg, eg) = Self::get_tables_for(piece);
        (
            mg.get_relative(square, color),
            eg.get_relative(square, color),
        )
    }

    /// Fetch the Piece-Square Tables (middle-game and end-game) for the provided [`Piece`].
    #[inline(always)]
    pub fn get_tables_for(piece: Piece) -> (&'static Self, &'static Self) {
        match piece {
            Piece::Pawn => (&PAWN_MG, &PAWN_EG),
            Piece::Knight => (&KNIGHT_MG, &KNIGHT_EG),
            Piece::Bishop => (&BISHOP_MG, &BISHOP_EG),
            Piece::Rook => (&ROOK_MG, &ROOK_EG),
            Piece::Queen => (&QUEEN_MG, &QUEEN_EG),
            Piece::King => (&KING_MG, &KING_EG),
        }
    }

    /// Creates a new [`Psqt`] for the provided [`Piece`] and array of values.
    const fn new(piece: Piece, psqt: [i32; 64]) -> Self {
        let mut flipped = psqt;

        let mut i = 0;
        while i < psqt.len() {
            // Flip the rank so the table can be indexed by square from White's perspective
            flipped[i] = psqt[i ^ 56] + value_of(piece);
            i += 1;
        }

        Self(flipped)
    }

    /// Get the value of this PSQT at the provided square, from White's perspective.
    #[inline(always)]
    pub fn get(&self, square: Square) -> i32 {
        self.0[square.to_index()]
    }

    /// Get the value of this PSQT at the provided square, relative to `color`.
    ///
    /// Black's pieces read the table with the ranks mirrored.
    #[inline(always)]
    pub fn get_relative(&self, square: Square, color: Color) -> i32 {
        match color {
            Color::White => self.0[square.to_index()],
            Color::Black => self.0[square.to_index() ^ 56],
        }
    }
}
