/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{anyhow, bail, Context, Result};
use chess::{BitBoard, Board, ChessMove, Color, MoveGen, Piece, Square, ALL_SQUARES, EMPTY};

use crate::{Move, MoveList, Position};

/// Everything needed to restore a [`Game`] to an earlier ply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct State {
    board: Board,
    halfmove: usize,
}

/// A game of chess.
///
/// Wraps a [`Board`] and adds what a search needs on top of it:
/// a stack of previous states for undoing moves, the halfmove clock, and repetition detection.
#[derive(Clone, Debug)]
pub struct Game {
    /// The current board.
    board: Board,

    /// Number of plies since the last capture or pawn move.
    halfmove: usize,

    /// Ply count of the position this game was created from.
    start_ply: usize,

    /// Every position before the current one, oldest first.
    history: Vec<State>,
}

impl Game {
    /// Creates a new [`Game`] from the provided FEN string.
    ///
    /// The halfmove and fullmove counters are optional and default to `0` and `1`.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let board = Board::from_str(fen).map_err(|e| anyhow!("Invalid FEN {fen:?}: {e:?}"))?;

        let mut counters = fen.split_ascii_whitespace().skip(4);
        let halfmove = match counters.next() {
            Some(s) => s
                .parse()
                .with_context(|| format!("Invalid halfmove counter {s:?}"))?,
            None => 0,
        };
        let fullmove: usize = match counters.next() {
            Some(s) => s
                .parse()
                .with_context(|| format!("Invalid fullmove counter {s:?}"))?,
            None => 1,
        };

        let start_ply =
            fullmove.saturating_sub(1) * 2 + (board.side_to_move() == Color::Black) as usize;

        Ok(Self {
            board,
            halfmove,
            start_ply,
            history: Vec::with_capacity(512),
        })
    }

    /// Number of plies since the last capture or pawn move.
    #[inline(always)]
    pub fn halfmove(&self) -> usize {
        self.halfmove
    }

    /// Fetches the kind and color of the piece at `square`, if there is one.
    #[inline(always)]
    pub fn piece_at(&self, square: Square) -> Option<(Piece, Color)> {
        Some((self.board.piece_on(square)?, self.board.color_on(square)?))
    }

    /// Generates a FEN string of the current position.
    pub fn to_fen(&self) -> String {
        let board = self.board.to_string();
        let placement = board
            .split_ascii_whitespace()
            .take(4)
            .collect::<Vec<_>>()
            .join(" ");

        format!("{placement} {} {}", self.halfmove, self.ply_count() / 2 + 1)
    }

    /// Parses `mv_str` as a move in UCI notation and applies it, if it is legal.
    pub fn make_move_uci(&mut self, mv_str: &str) -> Result<()> {
        let mv = self.find_move(mv_str)?;
        self.make_move(mv);
        Ok(())
    }

    /// Finds the legal move written as `mv_str` in UCI notation.
    pub fn find_move(&self, mv_str: &str) -> Result<Move> {
        let Some(mv) = self
            .legal_moves(false)
            .into_iter()
            .find(|mv| *mv == mv_str)
        else {
            bail!("Illegal move {mv_str:?} in position {:?}", self.to_fen());
        };

        Ok(mv)
    }

    /// Converts a move from the board library into a [`Move`], attaching piece information.
    #[inline(always)]
    fn convert(&self, mv: ChessMove) -> Option<Move> {
        let (from, to) = (mv.get_source(), mv.get_dest());
        let piece = self.board.piece_on(from)?;

        // A Pawn moving diagonally onto an empty square is capturing en passant
        let is_en_passant = piece == Piece::Pawn && from.get_file() != to.get_file();
        let captured = self
            .board
            .piece_on(to)
            .or(is_en_passant.then_some(Piece::Pawn));

        let castle = piece == Piece::King
            && from.get_file().to_index().abs_diff(to.get_file().to_index()) == 2;

        Some(Move {
            from,
            to,
            piece,
            captured,
            promotion: mv.get_promotion(),
            castle,
        })
    }

    /// Returns `true` if neither side has enough material to deliver mate.
    #[inline(always)]
    fn is_insufficient_material(&self) -> bool {
        let occupied = self.board.combined().popcnt();
        let minors = (*self.board.pieces(Piece::Knight) | *self.board.pieces(Piece::Bishop)).popcnt();

        // King vs King, or King + minor piece vs King
        occupied == 2 || (occupied == 3 && minors == 1)
    }
}

impl Position for Game {
    fn legal_moves(&self, captures_only: bool) -> MoveList {
        let mut movegen = MoveGen::new_legal(&self.board);

        if captures_only {
            let stm = self.board.side_to_move();
            let mut targets = *self.board.color_combined(!stm);

            // The destination of an en passant capture is empty, so it must be added manually
            if let Some(pawn) = self.board.en_passant() {
                targets |= BitBoard::from_square(pawn.uforward(stm));
            }

            movegen.set_iterator_mask(targets);
        }

        movegen.filter_map(|mv| self.convert(mv)).collect()
    }

    #[inline(always)]
    fn make_move(&mut self, mv: Move) {
        self.history.push(State {
            board: self.board,
            halfmove: self.halfmove,
        });

        self.board = self.board.make_move_new(mv.into());

        if mv.is_capture() || mv.piece == Piece::Pawn {
            self.halfmove = 0;
        } else {
            self.halfmove += 1;
        }
    }

    #[inline(always)]
    fn undo_move(&mut self, _mv: Move) {
        if let Some(state) = self.history.pop() {
            self.board = state.board;
            self.halfmove = state.halfmove;
        }
    }

    #[inline(always)]
    fn make_null_move(&mut self) -> bool {
        let Some(board) = self.board.null_move() else {
            return false;
        };

        self.history.push(State {
            board: self.board,
            halfmove: self.halfmove,
        });
        self.board = board;

        // Nothing before a null move can be repeated after it
        self.halfmove = 0;

        true
    }

    #[inline(always)]
    fn undo_null_move(&mut self) {
        self.undo_move(Move::NULL);
    }

    #[inline(always)]
    fn is_in_check(&self) -> bool {
        *self.board.checkers() != EMPTY
    }

    #[inline(always)]
    fn is_draw(&self) -> bool {
        self.halfmove >= 100 || self.is_insufficient_material() || self.is_repetition()
    }

    fn is_repetition(&self) -> bool {
        let key = self.board.get_hash();

        // Only positions with the same side to move can repeat, and nothing before the last
        // irreversible move can match the current position.
        self.history
            .iter()
            .rev()
            .take(self.halfmove)
            .skip(1)
            .step_by(2)
            .any(|prev| prev.board.get_hash() == key)
    }

    #[inline(always)]
    fn key(&self) -> u64 {
        self.board.get_hash()
    }

    #[inline(always)]
    fn side_to_move(&self) -> Color {
        self.board.side_to_move()
    }

    #[inline(always)]
    fn ply_count(&self) -> usize {
        self.start_ply + self.history.len()
    }

    #[inline(always)]
    fn pieces(&self, piece: Piece, color: Color) -> BitBoard {
        *self.board.pieces(piece) & *self.board.color_combined(color)
    }

    #[inline(always)]
    fn king_square(&self, color: Color) -> Square {
        self.board.king_square(color)
    }
}

impl Default for Game {
    #[inline(always)]
    fn default() -> Self {
        Self {
            board: Board::default(),
            halfmove: 0,
            start_ply: 0,
            history: Vec::with_capacity(512),
        }
    }
}

impl FromStr for Game {
    type Err = anyhow::Error;
    #[inline(always)]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                let square = ALL_SQUARES[rank * 8 + file];
                let symbol = self
                    .piece_at(square)
                    .map(|(piece, color)| piece.to_string(color))
                    .unwrap_or_else(|| String::from("."));
                write!(f, " {symbol}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "\n   a b c d e f g h\n")?;
        write!(f, "FEN: {}", self.to_fen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoveGuard, FEN_KIWIPETE};

    #[test]
    fn test_make_undo_restores_key() {
        let mut game = Game::from_fen(FEN_KIWIPETE).unwrap();
        let key = game.key();
        let fen = game.to_fen();

        for mv in game.legal_moves(false) {
            {
                let new = MoveGuard::new(&mut game, mv);
                assert_ne!(new.key(), key, "{mv} did not change the key");
            }
            assert_eq!(game.key(), key, "Undoing {mv} did not restore the key");
            assert_eq!(game.to_fen(), fen);
        }
    }

    #[test]
    fn test_repetition() {
        let mut game = Game::default();
        assert!(!game.is_repetition());

        for mv in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_move_uci(mv).unwrap();
        }

        // Back to the starting position
        assert!(game.is_repetition());
        assert!(game.is_draw());
    }

    #[test]
    fn test_repetition_is_reset_by_pawn_moves() {
        let mut game = Game::default();
        for mv in ["g1f3", "g8f6", "f3g1", "e7e5", "g1f3"] {
            game.make_move_uci(mv).unwrap();
        }
        assert!(!game.is_repetition());
    }

    #[test]
    fn test_fifty_move_rule() {
        let game = Game::from_fen("4k3/8/8/8/8/8/4P3/R3K3 w - - 100 80").unwrap();
        assert!(game.is_draw());

        let game = Game::from_fen("4k3/8/8/8/8/8/4P3/R3K3 w - - 99 80").unwrap();
        assert!(!game.is_draw());
    }

    #[test]
    fn test_insufficient_material() {
        let bare_kings = Game::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert!(bare_kings.is_draw());

        let lone_knight = Game::from_fen("8/8/4k3/8/8/3KN3/8/8 w - - 0 1").unwrap();
        assert!(lone_knight.is_draw());

        let lone_rook = Game::from_fen("8/8/4k3/8/8/2RK4/8/8 w - - 0 1").unwrap();
        assert!(!lone_rook.is_draw());
    }

    #[test]
    fn test_checkmate() {
        let mated = Game::from_fen("3R2k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1").unwrap();
        assert!(mated.is_checkmate());

        let stalemated = Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert!(!stalemated.is_checkmate());
        assert!(!Game::from_fen(FEN_KIWIPETE).unwrap().is_checkmate());
    }

    #[test]
    fn test_null_move() {
        let mut game = Game::from_fen(FEN_KIWIPETE).unwrap();
        let key = game.key();

        {
            let new = MoveGuard::null(&mut game).unwrap();
            assert_eq!(new.side_to_move(), Color::Black);
            assert_ne!(new.key(), key);
        }

        assert_eq!(game.side_to_move(), Color::White);
        assert_eq!(game.key(), key);

        // Cannot pass while in check
        let mut checked = Game::from_fen("4k3/8/8/8/8/8/8/R3K2r w - - 0 1").unwrap();
        assert!(checked.is_in_check());
        assert!(MoveGuard::null(&mut checked).is_none());
    }

    #[test]
    fn test_captures_only() {
        // White can capture en passant on d6 as well as the rook on h8
        let game = Game::from_fen("4k2r/8/8/3pP3/8/8/8/4K2R w - d6 0 1").unwrap();
        let captures = game.legal_moves(true);

        assert!(captures.iter().all(Move::is_capture));
        assert!(captures.iter().any(|mv| *mv == "e5d6"));
        assert!(captures.iter().any(|mv| *mv == "h1h8"));
        assert_eq!(captures.len(), 2);
    }

    #[test]
    fn test_move_metadata() {
        let mut game = Game::from_fen(FEN_KIWIPETE).unwrap();

        let castle = game.find_move("e1g1").unwrap();
        assert!(castle.castle);
        assert!(castle.is_quiet());

        let capture = game.find_move("e5f7").unwrap();
        assert_eq!(capture.captured, Some(Piece::Pawn));
        assert_eq!(capture.piece, Piece::Knight);

        game.make_move_uci("d5e6").unwrap();
        assert_eq!(game.halfmove(), 0);
        assert_eq!(game.ply_count(), 1);
    }

    #[test]
    fn test_fen_round_trip() {
        let fen = "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4";
        let game = Game::from_fen(fen).unwrap();
        assert_eq!(game.to_fen(), fen);
    }
}
