/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::str::FromStr;

use clap::Parser;
use uci_parser::UciCommand;

/// A command to be sent to the engine.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND> | <UCI COMMAND>")
)]
pub enum EngineCommand {
    /// Run a fixed-depth search on a set of positions and report the node count and speed.
    Bench {
        /// If set, the benchmarking results will be printed in a well-formatted table.
        #[arg(short, long, default_value = "false")]
        pretty: bool,

        /// Override the default benchmark depth.
        #[arg(short, long, required = false)]
        depth: Option<u8>,
    },

    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Print an evaluation of the current position, from the side-to-move's perspective.
    Eval {
        /// If set, the table value of every piece will be printed as well.
        #[arg(short, long, default_value = "false")]
        pretty: bool,
    },

    /// Quit the engine.
    Exit {
        /// If set, the engine will await the completion of any search threads before exiting.
        #[arg(short, long, default_value = "false")]
        cleanup: bool,
    },

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Display information about the transposition table.
    #[command(aliases = ["tt", "ttable"])]
    HashInfo,

    /// Apply the provided move to the game, if it is legal.
    MakeMove { mv_string: String },

    /// Shows all legal moves in the current position.
    Moves {
        /// If set, moves will be printed with the pieces they move and capture.
        #[arg(short, long, default_value = "false")]
        debug: bool,

        /// If set, moves will be sorted in alphabetical order.
        #[arg(short, long, default_value = "false")]
        sort: bool,
    },

    /// Performs a perft on the current position at the supplied depth, printing total node count.
    Perft { depth: usize },

    /// Performs a split perft on the current position at the supplied depth.
    #[command(alias = "sperft")]
    Splitperft { depth: usize },

    /// Wrapper over UCI commands sent to the engine.
    #[command(skip)]
    Uci { cmd: UciCommand },

    /// Await the current search, blocking until it completes.
    ///
    /// This is primarily used when executing searches on startup,
    /// to await their results before doing something else.
    Wait,
}

impl FromStr for EngineCommand {
    type Err = clap::Error;
    /// Attempt to parse an [`EngineCommand`] from a string.
    ///
    /// If this fails, it will attempt to parse the string as a [`UciCommand`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::try_parse_from(s.split_ascii_whitespace()) {
            Ok(cmd) => Ok(cmd),
            Err(e) => match UciCommand::new(s) {
                Ok(cmd) => Ok(Self::Uci { cmd }),
                Err(_) => Err(e),
            },
        }
    }
}
