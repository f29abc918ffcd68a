/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{channel, Receiver, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, bail, Context, Result};
use chess::{Color, Square, ALL_FILES, ALL_RANKS};
use uci_parser::{UciCommand, UciInfo, UciOption, UciParseError, UciResponse};

use crate::{
    perft, splitperft, EngineCommand, Evaluator, Game, LogDebug, LogInfo, LogLevel, LogNone,
    Pesto, Position, Psqt, Replacement, Score, SearchConfig, SearchResult, Searcher, TTable,
    BENCHMARK_FENS, MAX_PHASE,
};

/// Default depth at which to run the benchmark searches.
const BENCH_DEPTH: u8 = 6;

/// The Newt chess engine.
#[derive(Debug)]
pub struct Engine {
    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,

    /// Atomic flag to determine whether a search is currently running
    is_searching: Arc<AtomicBool>,

    /// Handle to the currently-running search thread, if one exists.
    search_thread: Option<JoinHandle<SearchResult>>,

    /// Everything that persists between searches, locked by the search thread while it runs.
    searcher: Arc<Mutex<Searcher>>,

    /// Whether to display extra information during execution.
    debug: bool,
}

impl Engine {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    #[inline(always)]
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            is_searching: Arc::default(),
            search_thread: None,
            searcher: Arc::default(),
            debug: false,
        }
    }

    /// Returns a string of the engine's name and current version.
    #[inline(always)]
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Returns a string of all authors of this engine.
    #[inline(always)]
    pub fn authors(&self) -> String {
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    #[inline(always)]
    pub fn send_command(&self, command: EngineCommand) -> Result<()> {
        self.sender
            .send(command)
            .context("Failed to send a command to the engine")
    }

    /// Entrypoint of the engine.
    ///
    /// This function first spawns a new thread that handles user input from `stdin`.
    /// It then loops on commands received by the engine, executing them in the order received.
    pub fn run(&mut self) {
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                eprintln!("Input handler thread stopping after fatal error: {err:#}");
            }
        });

        let mut game = Game::default();

        while let Ok(cmd) = self.receiver.recv() {
            let res = match cmd {
                EngineCommand::Bench { depth, pretty } => self.bench(depth, pretty),

                EngineCommand::Display => {
                    println!("{game}");
                    Ok(())
                }

                EngineCommand::Eval { pretty } => {
                    self.eval(&game, pretty);
                    Ok(())
                }

                EngineCommand::Exit { cleanup } => {
                    if cleanup {
                        self.stop_search();
                    }

                    break;
                }

                EngineCommand::Fen => {
                    println!("{}", game.to_fen());
                    Ok(())
                }

                EngineCommand::HashInfo => self.hash_info(),

                EngineCommand::MakeMove { mv_string } => game.make_move_uci(&mv_string),

                EngineCommand::Moves { debug, sort } => {
                    self.moves(&game, debug, sort);
                    Ok(())
                }

                EngineCommand::Perft { depth } => {
                    println!("{}", perft(&mut game, depth));
                    Ok(())
                }

                EngineCommand::Splitperft { depth } => {
                    splitperft(&mut game, depth);
                    Ok(())
                }

                EngineCommand::Uci { cmd } => self.handle_uci_command(cmd, &mut game),

                EngineCommand::Wait => {
                    self.stop_search();
                    Ok(())
                }
            };

            // Errors are reported, but never stop the engine
            if let Err(e) = res {
                eprintln!("Error: {e:#}");
            }
        }
    }

    /// Handle the execution of a single [`UciCommand`].
    fn handle_uci_command(&mut self, uci: UciCommand, game: &mut Game) -> Result<()> {
        use UciCommand::*;
        match uci {
            Uci => self.uci(),

            Debug(status) => self.debug = status,

            IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            SetOption { name, value } => self.set_option(&name, value)?,

            Register { name: _, code: _ } => println!("{} requires no registration", self.name()),

            UciNewGame => *game = self.new_game()?,

            Go(options) => {
                if let Some(depth) = options.perft {
                    splitperft(game, depth as usize);
                    return Ok(());
                }

                let config = SearchConfig::from_uci(options, game);
                let game = game.clone();
                self.search_thread = if self.debug {
                    self.start_search::<LogDebug>(game, config)
                } else {
                    self.start_search::<LogInfo>(game, config)
                };
            }

            Position { fen, moves } => *game = Self::position(fen, moves)?,

            Stop => self.set_is_searching(false),

            Quit => self.send_command(EngineCommand::Exit { cleanup: false })?,

            _ => bail!("{} does not support UCI command {uci:?}", self.name()),
        }

        Ok(())
    }

    /// Execute the `bench` command, running a fixed-depth search on a series of positions and displaying the results.
    fn bench(&mut self, depth: Option<u8>, pretty: bool) -> Result<()> {
        let config = SearchConfig {
            max_depth: depth.unwrap_or(BENCH_DEPTH),
            ..Default::default()
        };

        let benches = BENCHMARK_FENS;
        let mut nodes = 0;

        // Padding for printing FENs
        let width = benches.iter().map(|fen| fen.len()).max().unwrap_or_default();

        println!(
            "Running fixed-depth search (d={}) on {} positions",
            config.max_depth,
            benches.len()
        );

        for (i, fen) in benches.into_iter().enumerate() {
            print!("{:>2}/{:>2}: {fen:<width$} := ", i + 1, benches.len());
            // The node count is printed on the same line once the search concludes
            io::stdout().lock().flush()?;

            let game = Game::from_fen(fen)?;
            self.search_thread = self.start_search::<LogNone>(game, config);

            let Some(res) = self.stop_search() else {
                bail!("Search thread failed while running benchmarks on fen {fen}");
            };
            nodes += res.nodes;
            println!("{}", res.nodes);

            // Each bench is essentially a new game
            self.new_game()?;
        }

        let elapsed = config.starttime.elapsed();
        let nps = (nodes as f32 / elapsed.as_secs_f32()) as u64;
        let m_nps = nodes as f32 / elapsed.as_secs_f32() / 1_000_000.0;
        let ms = elapsed.as_millis();

        if pretty {
            println!();
            println!("+-- Benchmark Complete --+");
            println!("| time (ms)  {ms:<12}|");
            println!("|     nodes  {nodes:<12}|");
            println!("|       nps  {nps:<12}|");
            println!("|      Mnps  {m_nps:<12.2}|");
            println!("+------------------------+");
        } else {
            println!("{nodes} nodes / {elapsed:?} := {nps} nps");
        }

        Ok(())
    }

    /// Executes the `eval` command, printing an evaluation of the current position.
    ///
    /// When `pretty` is set, every piece's blended table value is shown on the board as well.
    fn eval(&self, game: &Game, pretty: bool) {
        let score = Pesto.evaluate(game);

        if !pretty {
            println!("{score}");
            return;
        }

        let phase = Pesto::phase(game);

        for rank in ALL_RANKS.into_iter().rev() {
            let row = ALL_FILES
                .into_iter()
                .map(|file| {
                    let square = Square::make_square(rank, file);
                    match game.piece_at(square) {
                        Some((piece, color)) => {
                            let (mg, eg) = Psqt::evals(piece, color, square);
                            let value = (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE;
                            let value = if color == Color::White { value } else { -value };
                            format!("{:>6}", format!("{}{value:+}", piece.to_string(color)))
                        }
                        None => format!("{:>6}", "."),
                    }
                })
                .collect::<String>();

            println!("{} {row}", rank.to_index() + 1);
        }

        let stm = game.side_to_move();
        let winning = match score.cmp(&Score::DRAW) {
            std::cmp::Ordering::Greater => format!("{stm:?}"),
            std::cmp::Ordering::Less => format!("{:?}", !stm),
            std::cmp::Ordering::Equal => String::from("N/A"),
        };

        println!();
        println!("Phase: {phase}/{MAX_PHASE}");
        println!("Winning side: {winning}");
        println!("Score: {score}");
    }

    /// Display info about the transposition table.
    fn hash_info(&self) -> Result<()> {
        let searcher = self.searcher()?;
        let ttable = searcher.ttable();

        let size = ttable.size();
        let num = ttable.num_entries();
        let cap = ttable.capacity();
        let percent = num as f32 / cap as f32 * 100.0;
        println!("TT info: {size}mb @ {num}/{cap} entries ({percent:.2}% full)");
        println!(
            "Replacement: {:?}, hits: {}, accesses: {}, collisions: {}",
            ttable.replacement(),
            ttable.hits,
            ttable.accesses,
            ttable.collisions
        );

        Ok(())
    }

    /// Executes the `moves` command, displaying all legal moves in the current position.
    fn moves(&self, game: &Game, debug: bool, sort: bool) {
        let moves = game.legal_moves(false);

        if moves.is_empty() {
            println!("(none)");
            return;
        }

        let mut strings = moves
            .iter()
            .map(|mv| {
                if debug {
                    format!("{mv:?}")
                } else {
                    mv.to_string()
                }
            })
            .collect::<Vec<_>>();

        if sort {
            strings.sort();
        }

        println!("{}", strings.join(", "));
    }

    /// Resets the engine's internal state and returns a game at the starting position.
    ///
    /// Any ongoing search is cancelled, and its result ignored.
    fn new_game(&mut self) -> Result<Game> {
        self.set_is_searching(false);
        self.stop_search();
        self.searcher()?.clear();
        Ok(Game::default())
    }

    /// Set the position to the supplied FEN string (defaults to the standard startpos if not supplied),
    /// and then apply `moves` one-by-one to the position.
    fn position<T: AsRef<str>>(fen: Option<T>, moves: impl IntoIterator<Item = T>) -> Result<Game> {
        let mut game = match fen {
            Some(fen) => Game::from_fen(fen.as_ref())?,
            None => Game::default(),
        };

        // The game records every move, so repetitions across the move list are seen by the search
        for mv_str in moves {
            game.make_move_uci(mv_str.as_ref())?;
        }

        Ok(game)
    }

    /// Sets the search flag to signal that the engine is starting/stopping a search.
    #[inline(always)]
    fn set_is_searching(&mut self, status: bool) {
        self.is_searching.store(status, Ordering::Relaxed);
    }

    /// Returns `true` if the engine is currently executing a search.
    #[inline(always)]
    fn is_searching(&self) -> bool {
        self.is_searching.load(Ordering::Relaxed)
    }

    /// Starts a search on `game` in a new thread, given the parameters in `config`.
    fn start_search<Log: LogLevel + 'static>(
        &mut self,
        mut game: Game,
        config: SearchConfig,
    ) -> Option<JoinHandle<SearchResult>> {
        if self.is_searching() {
            Self::send_string("A search is already running");
            return None;
        }
        self.set_is_searching(true);

        let is_searching = Arc::clone(&self.is_searching);
        let searcher = Arc::clone(&self.searcher);

        let handle = thread::spawn(move || {
            // Only the search thread may touch the engine state while it runs
            let Ok(mut searcher) = searcher.lock() else {
                is_searching.store(false, Ordering::Relaxed);
                return SearchResult::default();
            };

            searcher.search::<Log, Game>(&mut game, config, is_searching)
        });

        Some(handle)
    }

    /// Awaits the current search thread, blocking until it finishes and returning its result.
    fn stop_search(&mut self) -> Option<SearchResult> {
        let handle = self.search_thread.take()?;

        let id = handle.thread().id();
        let Ok(res) = handle.join() else {
            Self::send_string(format!("Failed to join on thread {id:?}"));
            return None;
        };

        self.set_is_searching(false);

        Some(res)
    }

    /// Called when the engine receives the `uci` command.
    ///
    /// Prints engine's ID, version, and authors, and lists all UCI options.
    fn uci(&self) {
        println!("id name {}\nid author {}\n", self.name(), self.authors());

        for opt in self.options() {
            println!("{}", UciResponse::Option(opt));
        }

        println!("{}", UciResponse::<&str>::UciOk)
    }

    /// Convenience function to return an iterator over all UCI options this engine supports.
    fn options(&self) -> impl Iterator<Item = UciOption> {
        [
            UciOption::button("Clear Hash"),
            UciOption::spin(
                "Hash",
                TTable::DEFAULT_SIZE as i32,
                TTable::MIN_SIZE as i32,
                TTable::MAX_SIZE as i32,
            ),
            UciOption::spin("Threads", 1, 1, 1),
            UciOption::check("Prefer Deeper", false),
        ]
        .into_iter()
    }

    /// Handles the `setoption` command, setting option `name` to `value`, or toggling it if `value` is None.
    ///
    /// Will return an error if `name` isn't a valid option or `value` is not a valid value for that option.
    fn set_option(&mut self, name: &str, value: Option<String>) -> Result<()> {
        match name {
            "Clear Hash" => self.searcher()?.clear(),

            "Hash" => {
                let Some(value) = value.as_ref() else {
                    bail!("usage: setoption name {name} value <value>");
                };

                let Ok(mb) = value.parse() else {
                    bail!("expected integer. got {value:?}");
                };

                if mb < TTable::MIN_SIZE {
                    bail!("Minimum value for Hash is {}mb", TTable::MIN_SIZE);
                }
                if mb > TTable::MAX_SIZE {
                    bail!("Maximum value for Hash is {}mb", TTable::MAX_SIZE);
                }

                let mut searcher = self.searcher()?;
                let mut ttable = TTable::new(mb);
                ttable.set_replacement(searcher.ttable().replacement());
                *searcher.ttable_mut() = ttable;
            }

            "Threads" => {
                if value.as_deref() != Some("1") {
                    bail!("{} currently supports only 1 thread", self.name());
                }
            }

            "Prefer Deeper" => {
                let Some(value) = value.as_ref() else {
                    bail!("usage: setoption name {name} value <true / false>");
                };

                let Ok(enabled) = value.parse::<bool>() else {
                    bail!("expected bool. got {value:?}");
                };

                let replacement = if enabled {
                    Replacement::PreferDeeper
                } else {
                    Replacement::Always
                };

                self.searcher()?.ttable_mut().set_replacement(replacement);
            }

            _ => {
                if let Some(value) = value.as_ref() {
                    bail!("Unrecognized option {name:?} with value {value:?}")
                } else {
                    bail!("Unrecognized option {name:?}")
                }
            }
        }

        if self.debug {
            let info = if let Some(value) = value.as_ref() {
                format!("Option {name} set to {value}")
            } else {
                format!("Option {name} toggled")
            };
            Self::send_string(info);
        }

        Ok(())
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(info: T) {
        let resp = UciResponse::<String>::Info(Box::new(UciInfo::new().string(info)));
        println!("{resp}");
    }

    /// Locks the engine state, blocking until any running search has released it.
    #[inline(always)]
    fn searcher(&self) -> Result<MutexGuard<'_, Searcher>> {
        self.searcher
            .lock()
            .map_err(|_| anyhow!("A search thread panicked while holding the engine state"))
    }
}

impl Default for Engine {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

/// Loops endlessly to await input via `stdin`, sending all successfully-parsed commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048);

    loop {
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line when parsing UCI commands")?;

        // End of input
        if 0 == bytes {
            sender
                .send(EngineCommand::Exit { cleanup: false })
                .context("Failed to send 'quit' command after receiving empty input")?;

            bail!("Engine received input of 0 bytes and is quitting");
        }

        let buf = buffer.trim();

        if buf.is_empty() {
            continue;
        }

        // UCI commands take priority, since that's the primary use case of the engine
        match UciCommand::new(buf) {
            Ok(cmd) => sender
                .send(EngineCommand::Uci { cmd })
                .context("Failed to send UCI command to engine")?,

            Err(UciParseError::UnrecognizedCommand { cmd: _ }) => match buf.parse() {
                Ok(cmd) => sender
                    .send(cmd)
                    .context("Failed to send command to engine")?,

                Err(err) => err.print()?,
            },

            Err(uci_err) => eprintln!("{uci_err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_KIWIPETE;

    #[test]
    fn test_position_applies_moves() {
        let game = Engine::position(None, ["g1f3", "g8f6"]).unwrap();
        assert_eq!(
            game.to_fen(),
            "rnbqkb1r/pppppppp/5n2/8/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 2 2"
        );

        let game = Engine::position(Some(FEN_KIWIPETE), []).unwrap();
        assert_eq!(game.legal_moves(false).len(), 48);

        assert!(Engine::position(None, ["e2e5"]).is_err());
    }

    #[test]
    fn test_set_option() {
        let mut engine = Engine::new();

        engine.set_option("Hash", Some(String::from("2"))).unwrap();
        assert_eq!(
            engine.searcher().unwrap().ttable().capacity(),
            TTable::new(2).capacity()
        );

        engine
            .set_option("Prefer Deeper", Some(String::from("true")))
            .unwrap();
        assert_eq!(
            engine.searcher().unwrap().ttable().replacement(),
            Replacement::PreferDeeper
        );

        // Resizing keeps the replacement policy
        engine.set_option("Hash", Some(String::from("1"))).unwrap();
        assert_eq!(
            engine.searcher().unwrap().ttable().replacement(),
            Replacement::PreferDeeper
        );

        assert!(engine.set_option("Hash", Some(String::from("0"))).is_err());
        assert!(engine.set_option("Hash", Some(String::from("lots"))).is_err());
        assert!(engine.set_option("Threads", Some(String::from("4"))).is_err());
        assert!(engine.set_option("Ponder", None).is_err());
    }

    #[test]
    fn test_search_thread_returns_move() {
        let mut engine = Engine::new();
        let game = Engine::position(None, ["e2e4"]).unwrap();
        let config = SearchConfig {
            max_depth: 3,
            ..Default::default()
        };

        engine.search_thread = engine.start_search::<LogNone>(game, config);
        let res = engine.stop_search().unwrap();

        assert_eq!(res.depth, 3);
        assert!(res.bestmove.is_some());
        assert!(!engine.is_searching());
    }
}
