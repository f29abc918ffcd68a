/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use arrayvec::ArrayVec;
use chess::{ChessMove, Piece, Square};

/// Maximum number of legal moves in any reachable chess position.
pub const MAX_NUM_MOVES: usize = 218;

/// A list of moves, stored on the stack.
pub type MoveList = ArrayVec<Move, MAX_NUM_MOVES>;

/// A move on a chess board, carrying enough metadata to order and undo it without consulting the board.
///
/// Two moves are equal if and only if all of their fields are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    /// Square the piece moves from.
    pub from: Square,

    /// Square the piece moves to.
    pub to: Square,

    /// Kind of the piece being moved.
    pub piece: Piece,

    /// Kind of the piece being captured, if any.
    ///
    /// For en passant this is a Pawn, even though `to` is empty.
    pub captured: Option<Piece>,

    /// Kind of piece a Pawn promotes to, if any.
    pub promotion: Option<Piece>,

    /// Whether this move is a castling move.
    pub castle: bool,
}

impl Move {
    /// The "null move", which passes the turn without moving a piece.
    pub const NULL: Self = Self {
        from: Square::A1,
        to: Square::A1,
        piece: Piece::Pawn,
        captured: None,
        promotion: None,
        castle: false,
    };

    /// Creates a new quiet [`Move`] of `piece` from `from` to `to`.
    #[inline(always)]
    pub const fn new(from: Square, to: Square, piece: Piece) -> Self {
        Self {
            from,
            to,
            piece,
            captured: None,
            promotion: None,
            castle: false,
        }
    }

    /// Returns a copy of this move that captures `victim`.
    #[inline(always)]
    pub const fn with_capture(mut self, victim: Piece) -> Self {
        self.captured = Some(victim);
        self
    }

    /// Returns a copy of this move that promotes to `promotion`.
    #[inline(always)]
    pub const fn with_promotion(mut self, promotion: Piece) -> Self {
        self.promotion = Some(promotion);
        self
    }

    /// Returns `true` if this is [`Move::NULL`].
    #[inline(always)]
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    /// Returns `true` if this move captures a piece.
    #[inline(always)]
    pub const fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    /// Returns `true` if this move promotes a Pawn.
    #[inline(always)]
    pub const fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    /// Returns `true` if this move neither captures nor promotes.
    #[inline(always)]
    pub const fn is_quiet(&self) -> bool {
        !self.is_capture() && !self.is_promotion()
    }
}

impl From<Move> for ChessMove {
    #[inline(always)]
    fn from(mv: Move) -> Self {
        ChessMove::new(mv.from, mv.to, mv.promotion)
    }
}

/// Lowercase character used for a promotion piece in UCI notation.
#[inline(always)]
const fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::Pawn => 'p',
        Piece::King => 'k',
    }
}

impl fmt::Display for Move {
    /// Formats the move in UCI notation, such as `e2e4` or `e7e8q`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }

        write!(f, "{}{}", self.from, self.to)?;
        if let Some(promotion) = self.promotion {
            write!(f, "{}", promotion_char(promotion))?;
        }

        Ok(())
    }
}

impl fmt::Debug for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self} ({:?}", self.piece)?;
        if let Some(victim) = self.captured {
            write!(f, " takes {victim:?}")?;
        }
        if self.castle {
            write!(f, ", castle")?;
        }
        write!(f, ")")
    }
}

impl PartialEq<&str> for Move {
    /// Compares against a move in UCI notation.
    #[inline(always)]
    fn eq(&self, other: &&str) -> bool {
        self.to_string() == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_kinds() {
        let quiet = Move::new(Square::E2, Square::E4, Piece::Pawn);
        assert!(quiet.is_quiet());
        assert!(!quiet.is_capture());

        let capture = Move::new(Square::D1, Square::D8, Piece::Queen).with_capture(Piece::Rook);
        assert!(capture.is_capture());
        assert!(!capture.is_quiet());

        let promotion = Move::new(Square::E7, Square::E8, Piece::Pawn).with_promotion(Piece::Queen);
        assert!(promotion.is_promotion());
        assert!(!promotion.is_quiet());
    }

    #[test]
    fn test_uci_display() {
        assert_eq!(Move::new(Square::G1, Square::F3, Piece::Knight), "g1f3");
        assert_eq!(
            Move::new(Square::A7, Square::A8, Piece::Pawn).with_promotion(Piece::Knight),
            "a7a8n"
        );
        assert_eq!(Move::NULL.to_string(), "0000");
    }

    #[test]
    fn test_equality_uses_every_field() {
        let a = Move::new(Square::D7, Square::D8, Piece::Pawn).with_promotion(Piece::Queen);
        let b = Move::new(Square::D7, Square::D8, Piece::Pawn).with_promotion(Piece::Rook);
        assert_ne!(a, b);
        assert_eq!(a, a);
    }
}
