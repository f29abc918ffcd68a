/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Divisor applied to the remaining time when computing the hard time limit of a search.
macro_rules! hard_timeout_divisor {
    () => {
        30
    };
}
pub(crate) use hard_timeout_divisor;

/// Divisor applied to the hard time limit when computing the soft time limit.
macro_rules! soft_timeout_divisor {
    () => {
        2
    };
}
pub(crate) use soft_timeout_divisor;

/// Divisor for computing how much of the time increment to use.
macro_rules! time_inc_divisor {
    () => {
        2
    };
}
pub(crate) use time_inc_divisor;

/// Extra time granted when searching a position that is in check, in milliseconds.
macro_rules! check_time_bonus_ms {
    () => {
        750
    };
}
pub(crate) use check_time_bonus_ms;

/// Remaining time, in milliseconds, below which a clock advantage is not spent.
macro_rules! min_time_for_advantage_ms {
    () => {
        5_000
    };
}
pub(crate) use min_time_for_advantage_ms;

/// Divisor applied to our clock advantage over the opponent when granting extra time.
macro_rules! time_advantage_divisor {
    () => {
        4
    };
}
pub(crate) use time_advantage_divisor;

/// Time, in milliseconds, always kept in reserve for communication overhead.
macro_rules! move_overhead_ms {
    () => {
        50
    };
}
pub(crate) use move_overhead_ms;

/// Multiplier on the previous iteration's duration when predicting the next one.
macro_rules! iteration_growth_factor {
    () => {
        2
    };
}
pub(crate) use iteration_growth_factor;

/// Minimum depth at which null move pruning can be applied.
macro_rules! min_nmp_depth {
    () => {
        2
    };
}
pub(crate) use min_nmp_depth;

/// Constant part of the null move reduction.
macro_rules! nmp_reduction {
    () => {
        3
    };
}
pub(crate) use nmp_reduction;

/// Depth divisor of the null move reduction.
macro_rules! nmp_depth_divisor {
    () => {
        6
    };
}
pub(crate) use nmp_depth_divisor;

/// Maximum depth at which to apply reverse futility pruning.
macro_rules! max_rfp_depth {
    () => {
        6
    };
}
pub(crate) use max_rfp_depth;

/// Margin per ply of depth for reverse futility pruning.
macro_rules! rfp_margin {
    () => {
        85
    };
}
pub(crate) use rfp_margin;

/// Minimum depth at which to apply late move reductions.
macro_rules! min_lmr_depth {
    () => {
        3
    };
}
pub(crate) use min_lmr_depth;

/// Number of moves searched at full depth before late move reductions apply.
macro_rules! min_lmr_moves {
    () => {
        5
    };
}
pub(crate) use min_lmr_moves;

/// Depth divisor in the late move reduction formula.
macro_rules! lmr_depth_divisor {
    () => {
        3
    };
}
pub(crate) use lmr_depth_divisor;

/// Maximum number of plies a single line may be extended by.
macro_rules! max_extensions {
    () => {
        16
    };
}
pub(crate) use max_extensions;

/// Maximum bonus to apply to a move via History Heuristic.
macro_rules! max_history_bonus {
    () => {
        16_384
    };
}
pub(crate) use max_history_bonus;

/// Ordering score of the move stored in the transposition table.
macro_rules! tt_move_score {
    () => {
        i32::MAX
    };
}
pub(crate) use tt_move_score;

/// Base ordering score of captures and promotions, above every quiet move.
macro_rules! capture_base_score {
    () => {
        1 << 24
    };
}
pub(crate) use capture_base_score;

/// Ordering score of the first killer move; the second killer scores one less.
macro_rules! killer_score {
    () => {
        1 << 20
    };
}
pub(crate) use killer_score;
