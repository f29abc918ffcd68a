/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ops::{Deref, DerefMut};

use chess::{BitBoard, Color, Piece, Square};

use crate::{Move, MoveList};

/// A game state that can be searched.
///
/// Implementors own the board representation, move generation, and draw detection.
/// The search only ever mutates a position through [`MoveGuard`],
/// so every [`Position::make_move`] is paired with a [`Position::undo_move`] in stack order.
pub trait Position {
    /// Generates all legal moves in this position.
    ///
    /// If `captures_only` is set, only moves that capture a piece are generated.
    fn legal_moves(&self, captures_only: bool) -> MoveList;

    /// Applies `mv`, which must be legal in this position.
    fn make_move(&mut self, mv: Move);

    /// Reverts `mv`, which must be the most recent move applied.
    fn undo_move(&mut self, mv: Move);

    /// Passes the turn to the opponent, returning `false` (and changing nothing) if that is not possible.
    fn make_null_move(&mut self) -> bool;

    /// Reverts the most recent successful [`Position::make_null_move`].
    fn undo_null_move(&mut self);

    /// Returns `true` if the side to move is in check.
    fn is_in_check(&self) -> bool;

    /// Returns `true` if the side to move has been checkmated.
    fn is_checkmate(&self) -> bool {
        self.is_in_check() && self.legal_moves(false).is_empty()
    }

    /// Returns `true` if this position is drawn by rule, regardless of the moves available.
    fn is_draw(&self) -> bool;

    /// Returns `true` if this position has occurred before in the game.
    fn is_repetition(&self) -> bool;

    /// Hash key of this position.
    fn key(&self) -> u64;

    /// The side whose turn it is.
    fn side_to_move(&self) -> Color;

    /// Number of plies played in the game so far.
    fn ply_count(&self) -> usize;

    /// All squares occupied by `piece`s of `color`.
    fn pieces(&self, piece: Piece, color: Color) -> BitBoard;

    /// Square of `color`'s King.
    fn king_square(&self, color: Color) -> Square;

    /// Returns `true` if `color` has any pieces besides Pawns and its King.
    fn has_non_pawn_material(&self, color: Color) -> bool {
        [Piece::Knight, Piece::Bishop, Piece::Rook, Piece::Queen]
            .into_iter()
            .any(|piece| self.pieces(piece, color).popcnt() > 0)
    }
}

/// A move applied to a [`Position`] for as long as the guard lives.
///
/// Dropping the guard undoes the move, so the position is restored on every path out of a scope,
/// including early returns.
pub struct MoveGuard<'a, P: Position> {
    position: &'a mut P,

    /// `None` if this guard holds a null move.
    mv: Option<Move>,
}

impl<'a, P: Position> MoveGuard<'a, P> {
    /// Makes `mv` on `position`.
    #[inline(always)]
    pub fn new(position: &'a mut P, mv: Move) -> Self {
        position.make_move(mv);
        Self {
            position,
            mv: Some(mv),
        }
    }

    /// Makes a null move on `position`, if possible.
    #[inline(always)]
    pub fn null(position: &'a mut P) -> Option<Self> {
        if position.make_null_move() {
            Some(Self { position, mv: None })
        } else {
            None
        }
    }
}

impl<P: Position> Deref for MoveGuard<'_, P> {
    type Target = P;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.position
    }
}

impl<P: Position> DerefMut for MoveGuard<'_, P> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.position
    }
}

impl<P: Position> Drop for MoveGuard<'_, P> {
    #[inline(always)]
    fn drop(&mut self) {
        match self.mv {
            Some(mv) => self.position.undo_move(mv),
            None => self.position.undo_null_move(),
        }
    }
}

/// Counts the leaf nodes of the legal move tree of `position` at `depth`.
///
/// See [CPW](https://www.chessprogramming.org/Perft).
pub fn perft<P: Position>(position: &mut P, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let moves = position.legal_moves(false);

    // Bulk counting
    if depth == 1 {
        return moves.len() as u64;
    }

    let mut nodes = 0;
    for mv in moves {
        let mut new = MoveGuard::new(position, mv);
        nodes += perft(&mut *new, depth - 1);
    }

    nodes
}

/// Performs a perft and prints the node count below each root move.
pub fn splitperft<P: Position>(position: &mut P, depth: usize) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut total = 0;
    for mv in position.legal_moves(false) {
        let mut new = MoveGuard::new(position, mv);
        let nodes = perft(&mut *new, depth - 1);
        println!("{mv}\t{nodes}");
        total += nodes;
    }

    println!("\n{total}");
    total
}
