/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use uci_parser::UciScore;

use crate::MAX_DEPTH;

pub type ScoreInternal = i32;

/// A numerical representation of the evaluation of a position / move, in units of ["centipawns"](https://www.chessprogramming.org/Score).
///
/// This value is internally capped at [`Self::INF`].
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Score(ScoreInternal);

impl Score {
    /// Largest possible score ever achievable.
    pub const INF: Self = Self(i16::MAX as ScoreInternal);

    /// Score of mate in the current position.
    pub const MATE: Self = Self(Self::INF.0 - 1);

    /// Score of a draw.
    pub const DRAW: Self = Self(0);

    /// Initial value of alpha in alpha-beta pruning.
    pub const ALPHA: Self = Self(-Self::INF.0);

    /// Initial value of beta in alpha-beta pruning.
    pub const BETA: Self = Self::INF;

    /// Lowest possible score for mate.
    ///
    /// This is only obtainable if mate is possible in [`MAX_DEPTH`] plies.
    pub const LOWEST_MATE: Self = Self(Self::MATE.0 - MAX_DEPTH as ScoreInternal);

    /// Constructs a new [`Score`] instance.
    #[inline(always)]
    pub const fn new(score: ScoreInternal) -> Self {
        Self(score)
    }

    /// Score of being checkmated `ply` plies away from the root.
    ///
    /// Mates found closer to the root are worse for the mated side, so they sort below distant ones.
    #[inline(always)]
    pub const fn mated_in(ply: i32) -> Self {
        Self(-Self::MATE.0 + ply)
    }

    /// Returns the inner value of this [`Score`].
    #[inline(always)]
    pub const fn inner(&self) -> ScoreInternal {
        self.0
    }

    /// Returns `true` if the score is a mate score.
    #[inline(always)]
    pub const fn is_mate(&self) -> bool {
        self.0.abs() >= Self::LOWEST_MATE.0
    }

    /// Returns `true` if this score means the side to move delivers mate.
    #[inline(always)]
    pub const fn is_winning_mate(&self) -> bool {
        self.is_mate() && self.0 > 0
    }

    /// Converts this [`Score`] into a [`UciScore`],
    /// determining whether it is a centipawns score or a mate score.
    ///
    /// Used when sending the `info score` message.
    #[inline(always)]
    pub fn into_uci(self) -> UciScore {
        if self.is_mate() {
            UciScore::mate(self.moves_to_mate())
        } else {
            UciScore::cp(self.0)
        }
    }

    /// Returns the number of plies (half moves) this score is from mate.
    #[inline(always)]
    pub const fn plies_to_mate(&self) -> i32 {
        Self::MATE.0 - self.0.abs()
    }

    /// Returns the number of moves (full moves) this score is from mate.
    ///
    /// Positive if the side to move is mating, negative if it is being mated.
    #[inline(always)]
    pub const fn moves_to_mate(&self) -> i32 {
        let plies = self.plies_to_mate();

        if self.0 > 0 {
            (plies + 1) / 2
        } else {
            -(plies / 2)
        }
    }

    /// Normalize a mate score read from storage to the provided ply.
    ///
    /// Score will be relative to `ply`.
    #[inline(always)]
    pub const fn relative(self, ply: i32) -> Self {
        if !self.is_mate() {
            self
        } else if self.0 > 0 {
            Self(self.0 - ply)
        } else {
            Self(self.0 + ply)
        }
    }

    /// De-normalize a mate score found at `ply`, so it can be stored independently of the path that found it.
    ///
    /// Score will be relative to the node it was found at (0 ply).
    #[inline(always)]
    pub const fn absolute(self, ply: i32) -> Self {
        if !self.is_mate() {
            self
        } else if self.0 > 0 {
            Self(self.0 + ply)
        } else {
            Self(self.0 - ply)
        }
    }

    /// Returns the absolute value of this [`Score`].
    #[inline(always)]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// "Normalizes" a score so that it can be printed as a float, in pawns.
    #[inline(always)]
    pub fn normalize(&self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl From<Score> for UciScore {
    #[inline(always)]
    fn from(value: Score) -> Self {
        value.into_uci()
    }
}

macro_rules! impl_binary_op {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$fn(rhs.0))
            }
        }

        impl std::ops::$trait<ScoreInternal> for Score {
            type Output = Self;

            #[inline(always)]
            fn $fn(self, rhs: ScoreInternal) -> Self::Output {
                Self(self.0.$fn(rhs))
            }
        }
    };
}

macro_rules! impl_binary_op_assign {
    ($trait:tt, $fn:ident) => {
        impl std::ops::$trait for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: Self) {
                self.0.$fn(rhs.0);
            }
        }

        impl std::ops::$trait<ScoreInternal> for Score {
            #[inline(always)]
            fn $fn(&mut self, rhs: ScoreInternal) {
                self.0.$fn(rhs);
            }
        }
    };
}

impl_binary_op!(Add, add);
impl_binary_op!(Sub, sub);
impl_binary_op!(Mul, mul);
impl_binary_op!(Div, div);

impl_binary_op_assign!(AddAssign, add_assign);
impl_binary_op_assign!(SubAssign, sub_assign);

impl std::ops::Neg for Score {
    type Output = Self;

    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl fmt::Display for Score {
    #[inline(always)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            write!(
                f,
                "{} (mate in {} plies / {} moves)",
                self.0,
                self.plies_to_mate(),
                self.moves_to_mate()
            )
        } else {
            write!(f, "{}", self.0)
        }
    }
}
