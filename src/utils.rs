/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Maximum depth that can be searched, in plies.
pub const MAX_DEPTH: u8 = u8::MAX / 2;

/// FEN string of the standard starting position.
pub const FEN_STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// FEN string of the "Kiwipete" position, a common move generation stress test.
pub const FEN_KIWIPETE: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

/// Positions searched by the `bench` command.
pub const BENCHMARK_FENS: [&str; 12] = [
    FEN_STARTPOS,
    FEN_KIWIPETE,
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
    "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
    "2rq1rk1/pb2bppp/1pn1pn2/2pp4/3P4/1P2PNP1/PBPN1PBP/R2Q1RK1 w - - 0 11",
    "8/8/1p2k1p1/3p3p/1p1P1P1P/1P2PK2/8/8 w - - 3 54",
    "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1",
    "8/8/8/4k3/8/8/3QK3/8 w - - 0 1",
    "r1b2rk1/2q1b1pp/p2ppn2/1p6/3QP3/1BN1B3/PPP3PP/R4RK1 w - - 0 14",
];

/// Level of output produced by a search.
///
/// Implemented by marker types so that disabled output is compiled out of the search entirely.
pub trait LogLevel {
    /// Whether to print debug information, such as timeouts and hash table statistics.
    const DEBUG: bool = false;

    /// Whether to print UCI `info` lines and the final `bestmove`.
    const INFO: bool = false;
}

/// Marker type for printing nothing during search.
#[derive(Debug, Clone, Copy)]
pub struct LogNone;
impl LogLevel for LogNone {}

/// Marker type for printing standard UCI output during search.
#[derive(Debug, Clone, Copy)]
pub struct LogInfo;
impl LogLevel for LogInfo {
    const INFO: bool = true;
}

/// Marker type for printing UCI output and debug information during search.
#[derive(Debug, Clone, Copy)]
pub struct LogDebug;
impl LogLevel for LogDebug {
    const DEBUG: bool = true;
    const INFO: bool = true;
}
