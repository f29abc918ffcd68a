/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Command-line interface for the engine.
mod cli;

/// Time remaining on the clock, and how much of it a search may spend.
mod clock;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Evaluation of chess positions.
mod eval;

/// The default board representation.
mod game;

/// Tables of good quiet moves, learned during search.
mod history;

/// Move ordering.
mod movepicker;

/// Moves and move lists.
mod moves;

/// The interface the search requires of a board, and tools built on it.
mod position;

/// Piece-Square tables.
mod psqt;

/// Scores of positions, including mate scores.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Transposition table.
mod ttable;

/// Tunable constants.
mod tune;

/// Misc utility functions, constants, and types.
mod utils;

pub use cli::*;
pub use clock::*;
pub use engine::*;
pub use eval::*;
pub use game::*;
pub use history::*;
pub use movepicker::*;
pub use moves::*;
pub use position::*;
pub use psqt::*;
pub use score::*;
pub use search::*;
pub use ttable::*;
pub use utils::*;
