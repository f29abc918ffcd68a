/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::time::{Duration, Instant};

use chess::Color;

use crate::tune;

/// The time control a move is being played under.
pub trait Clock {
    /// Time spent on the current move so far.
    fn elapsed_this_turn(&self) -> Duration;

    /// Time left on `color`'s clock, including the time already spent this turn.
    fn remaining(&self, color: Color) -> Duration;

    /// Time added to a clock after each move.
    fn increment(&self) -> Duration;
}

/// A [`Clock`] whose turn started at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct GameClock {
    /// When the current turn started.
    pub turn_start: Instant,

    /// Time left for each side, indexed by [`Color::to_index`].
    pub remaining: [Duration; 2],

    /// Increment per move.
    pub increment: Duration,
}

impl GameClock {
    /// Starts a new turn with `white` and `black` time remaining and `increment` per move.
    #[inline(always)]
    pub fn new(white: Duration, black: Duration, increment: Duration) -> Self {
        Self {
            turn_start: Instant::now(),
            remaining: [white, black],
            increment,
        }
    }

    /// Starts a new turn where both sides have `time` remaining and no increment.
    #[inline(always)]
    pub fn with_time(time: Duration) -> Self {
        Self::new(time, time, Duration::ZERO)
    }
}

impl Clock for GameClock {
    #[inline(always)]
    fn elapsed_this_turn(&self) -> Duration {
        self.turn_start.elapsed()
    }

    #[inline(always)]
    fn remaining(&self, color: Color) -> Duration {
        self.remaining[color.to_index()]
    }

    #[inline(always)]
    fn increment(&self) -> Duration {
        self.increment
    }
}

/// Computes the `(soft, hard)` time limits for `us` to make a move.
///
/// The hard limit is a slice of our remaining time plus half the increment.
/// It grows when we are ahead on the clock or in check, and never exceeds what is actually left.
/// The soft limit is half of the hard limit; no new iteration starts after it has passed.
pub fn time_limits<C: Clock + ?Sized>(clock: &C, us: Color, in_check: bool) -> (Duration, Duration) {
    let remaining = clock.remaining(us);
    let opponent = clock.remaining(!us);

    let mut hard = remaining / tune::hard_timeout_divisor!()
        + clock.increment() / tune::time_inc_divisor!();

    // Spend some of our clock advantage
    let min_for_advantage = Duration::from_millis(tune::min_time_for_advantage_ms!());
    if remaining > opponent && remaining > min_for_advantage {
        hard += (remaining - opponent) / tune::time_advantage_divisor!();
    }

    // Positions in check are volatile, so look a little longer
    if in_check {
        hard += Duration::from_millis(tune::check_time_bonus_ms!());
    }

    let overhead = Duration::from_millis(tune::move_overhead_ms!());
    let hard = hard.min(remaining.saturating_sub(overhead));
    let soft = hard / tune::soft_timeout_divisor!();

    (soft, hard)
}
