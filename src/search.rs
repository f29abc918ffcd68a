/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    marker::PhantomData,
    ops::Neg,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use arrayvec::ArrayVec;
use chess::Color;
use uci_parser::{UciInfo, UciResponse, UciSearchOptions};

use crate::{
    time_limits, tune, Clock, Evaluator, GameClock, HistoryTable, KillerTable, LogLevel, LogNone,
    Move, MoveGuard, MovePicker, MoveScorer, Pesto, Position, Score, TTable, TTableEntry,
    MAX_DEPTH,
};

/// A marker trait for the types of nodes encountered during search.
trait NodeType {
    /// Is this node the first searched?
    const ROOT: bool;

    /// Is this node a PV node?
    const PV: bool;
}

/// First node searched.
struct RootNode;
impl NodeType for RootNode {
    const ROOT: bool = true;
    const PV: bool = true;
}

/// A node on the principal variation, searched with a non-null window.
struct PvNode;
impl NodeType for PvNode {
    const ROOT: bool = false;
    const PV: bool = true;
}

/// A node not on the principal variation, searched with a null window.
struct NonPvNode;
impl NodeType for NonPvNode {
    const ROOT: bool = false;
    const PV: bool = false;
}

/// Represents the best sequence of moves found during a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrincipalVariation(ArrayVec<Move, { MAX_DEPTH as usize }>);

impl PrincipalVariation {
    /// An empty PV.
    const EMPTY: Self = Self(ArrayVec::new_const());

    /// The moves of this PV, starting from the root.
    #[inline(always)]
    pub fn moves(&self) -> &[Move] {
        &self.0
    }

    /// clears the moves of `self`.
    #[inline(always)]
    fn clear(&mut self) {
        self.0.clear();
    }

    /// Replace the contents of `self` with `mv` followed by the contents of `other`.
    ///
    /// Moves that do not fit are dropped from the end.
    #[inline(always)]
    fn extend(&mut self, mv: Move, other: &Self) {
        self.clear();
        self.0.push(mv);

        let room = self.0.remaining_capacity();
        self.0.extend(other.0.iter().take(room).copied());
    }
}

impl Default for PrincipalVariation {
    #[inline(always)]
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Bounds within an alpha-beta search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    /// Lower bound.
    ///
    /// We are guaranteed a score that is AT LEAST `alpha`.
    /// During search, if no move can raise `alpha`, we are said to have "failed low."
    pub alpha: Score,

    /// Upper bound.
    ///
    /// Our opponent is guaranteed a score that is AT MOST `beta`.
    /// During search, if a move scores higher than `beta`, we are said to have "failed high."
    pub beta: Score,
}

impl SearchBounds {
    /// Create a new [`SearchBounds`] from the provided `alpha` and `beta` values.
    #[inline(always)]
    pub const fn new(alpha: Score, beta: Score) -> Self {
        Self { alpha, beta }
    }

    /// Create a "null window" around `alpha`.
    #[inline(always)]
    pub fn null_alpha(self) -> Self {
        Self::new(self.alpha, self.alpha + 1)
    }

    /// Create a "null window" around `beta`.
    #[inline(always)]
    pub fn null_beta(self) -> Self {
        Self::new(self.beta - 1, self.beta)
    }
}

impl Neg for SearchBounds {
    type Output = Self;
    /// Negating a [`SearchBounds`] swaps the `alpha` and `beta` fields and negates them both.
    #[inline(always)]
    fn neg(self) -> Self::Output {
        Self {
            alpha: -self.beta,
            beta: -self.alpha,
        }
    }
}

impl Default for SearchBounds {
    /// Default [`SearchBounds`] are a `(-infinity, infinity)`.
    #[inline(always)]
    fn default() -> Self {
        Self::new(Score::ALPHA, Score::BETA)
    }
}

/// The result of a search, containing the best move found, score, and total nodes searched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchResult {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    pub bestmove: Option<Move>,

    /// Evaluation of the position after `bestmove` is made.
    pub score: Score,

    /// The depth of the last completed iteration. Zero if none completed.
    pub depth: u8,

    /// Principal variation of the last completed iteration.
    pub pv: PrincipalVariation,
}

impl Default for SearchResult {
    /// A default search result should initialize to a *very bad* value,
    /// since there isn't a move to play.
    #[inline(always)]
    fn default() -> Self {
        Self {
            nodes: 0,
            bestmove: None,
            score: Score::ALPHA,
            depth: 0,
            pv: PrincipalVariation::EMPTY,
        }
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Maximum depth to execute the search.
    pub max_depth: u8,

    /// Node allowance.
    ///
    /// If the search exceeds this many nodes, it will exit as quickly as possible.
    pub max_nodes: u64,

    /// Start time of the search.
    pub starttime: Instant,

    /// Soft limit on search time.
    ///
    /// During iterative deepening, no new iteration is started once this has passed.
    pub soft_timeout: Duration,

    /// Hard limit on search time.
    ///
    /// During *any* point in the search, if this limit is exceeded, the search will cancel.
    pub hard_timeout: Duration,
}

impl SearchConfig {
    /// Constructs a [`SearchConfig`] that moves within the time allotted by `clock`.
    ///
    /// Time already spent on this turn counts against the budget.
    pub fn from_clock<P: Position + ?Sized, C: Clock + ?Sized>(position: &P, clock: &C) -> Self {
        let (soft_timeout, hard_timeout) =
            time_limits(clock, position.side_to_move(), position.is_in_check());

        let now = Instant::now();
        let starttime = now.checked_sub(clock.elapsed_this_turn()).unwrap_or(now);

        Self {
            starttime,
            soft_timeout,
            hard_timeout,
            ..Default::default()
        }
    }

    /// Constructs a new [`SearchConfig`] from the provided UCI options and position.
    ///
    /// The position is used to determine side to move, and other factors when computing the soft/hard timeouts.
    pub fn from_uci<P: Position + ?Sized>(options: UciSearchOptions, position: &P) -> Self {
        let mut config = Self::default();

        // If supplied, set the max depth / node allowance
        if let Some(depth) = options.depth {
            config.max_depth = (depth as usize).min(MAX_DEPTH as usize) as u8;
        }

        if let Some(nodes) = options.nodes {
            config.max_nodes = nodes as u64;
        }

        // If `movetime` was supplied, search that long.
        if let Some(movetime) = options.movetime {
            config.hard_timeout = movetime;
            config.soft_timeout = movetime;
            return config;
        }

        // Otherwise, search based on time remaining and increment
        let (time, inc, opponent) = if position.side_to_move() == Color::White {
            (options.wtime, options.winc, options.btime)
        } else {
            (options.btime, options.binc, options.wtime)
        };

        // Only calculate timeouts if a time was provided
        if let Some(time) = time {
            let mut clock = GameClock::new(time, opponent.unwrap_or(time), inc.unwrap_or_default());
            clock.turn_start = config.starttime;

            // The clock is indexed by color, so put our time in our slot
            if position.side_to_move() == Color::Black {
                clock.remaining.swap(0, 1);
            }

            let (soft, hard) =
                time_limits(&clock, position.side_to_move(), position.is_in_check());
            config.soft_timeout = soft;
            config.hard_timeout = hard;
        }

        config
    }
}

impl Default for SearchConfig {
    /// A default [`SearchConfig`] will permit an "infinite" search.
    ///
    /// The word "infinite" is quoted here because the actual defaults are the `::MAX` values for each field.
    #[inline(always)]
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            max_nodes: u64::MAX,
            starttime: Instant::now(),
            soft_timeout: Duration::MAX,
            hard_timeout: Duration::MAX,
        }
    }
}

/// Parameters for the various features used to enhance the efficiency of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParameters {
    /// Whether to apply null move pruning.
    pub null_move_pruning: bool,

    /// Whether to apply reverse futility pruning.
    pub reverse_futility_pruning: bool,

    /// Whether to apply late move reductions.
    pub late_move_reductions: bool,

    /// Whether to extend moves that give check or promote.
    pub extensions: bool,

    /// Minimum depth at which null move pruning can be applied.
    pub min_nmp_depth: i32,

    /// Value to subtract from `depth` when applying null move pruning.
    pub nmp_reduction: i32,

    /// Divisor of `depth` for the depth-dependent part of the null move reduction.
    pub nmp_depth_divisor: i32,

    /// Maximum depth at which to apply reverse futility pruning.
    pub max_rfp_depth: i32,

    /// Safety margin per ply when applying reverse futility pruning.
    pub rfp_margin: Score,

    /// Minimum depth at which to apply late move reductions.
    pub min_lmr_depth: i32,

    /// Minimum moves that must be searched before late move reductions can be applied.
    pub min_lmr_moves: usize,

    /// Divisor of `depth` when computing a late move reduction.
    pub lmr_depth_divisor: i32,

    /// Maximum number of extensions along a single path.
    pub max_extensions: u8,
}

impl SearchParameters {
    /// Parameters that disable every pruning, reduction, and extension technique.
    ///
    /// A search with these parameters returns the same score as a plain minimax search to the same depth.
    pub fn exhaustive() -> Self {
        Self {
            null_move_pruning: false,
            reverse_futility_pruning: false,
            late_move_reductions: false,
            extensions: false,
            ..Default::default()
        }
    }
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            null_move_pruning: true,
            reverse_futility_pruning: true,
            late_move_reductions: true,
            extensions: true,
            min_nmp_depth: tune::min_nmp_depth!(),
            nmp_reduction: tune::nmp_reduction!(),
            nmp_depth_divisor: tune::nmp_depth_divisor!(),
            max_rfp_depth: tune::max_rfp_depth!(),
            rfp_margin: Score::new(tune::rfp_margin!()),
            min_lmr_depth: tune::min_lmr_depth!(),
            min_lmr_moves: tune::min_lmr_moves!(),
            lmr_depth_divisor: tune::lmr_depth_divisor!(),
            max_extensions: tune::max_extensions!(),
        }
    }
}

/// Executes a single search on a [`Position`].
///
/// Borrows the long-lived state of a [`Searcher`] for its duration.
pub struct Search<'a, Log, P, E> {
    /// Number of nodes searched.
    nodes: u64,

    /// Set once any cancellation condition has been met. Never cleared.
    stopped: bool,

    /// An atomic flag to determine if the search should be cancelled at any time.
    ///
    /// If this is ever `false`, the search must exit as soon as possible.
    is_searching: Arc<AtomicBool>,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Transposition table used to cache information during search.
    ttable: &'a mut TTable,

    /// Scores of quiet moves that caused (or failed to cause) a beta-cutoff.
    history: &'a mut HistoryTable,

    /// Quiet moves that caused a beta-cutoff, per ply.
    killers: &'a mut KillerTable,

    /// Static evaluation used at the leaves.
    evaluator: &'a E,

    /// Parameters for search features like pruning, extensions, etc.
    params: SearchParameters,

    /// Marker for the kind of position being searched.
    position: PhantomData<fn(&mut P)>,

    /// Marker for the level of logging to print.
    log: PhantomData<Log>,
}

impl<'a, Log: LogLevel, P: Position, E: Evaluator<P>> Search<'a, Log, P, E> {
    /// Construct a new [`Search`] instance to execute.
    #[inline(always)]
    pub fn new(
        is_searching: Arc<AtomicBool>,
        config: SearchConfig,
        params: SearchParameters,
        ttable: &'a mut TTable,
        history: &'a mut HistoryTable,
        killers: &'a mut KillerTable,
        evaluator: &'a E,
    ) -> Self {
        Self {
            nodes: 0,
            stopped: false,
            is_searching,
            config,
            ttable,
            history,
            killers,
            evaluator,
            params,
            position: PhantomData,
            log: PhantomData,
        }
    }

    /// Start the search on the supplied position, returning a [`SearchResult`].
    ///
    /// This is the entrypoint of the search, and prints UCI info before starting iterative deepening,
    /// concluding by sending the `bestmove` message.
    ///
    /// `position` is restored to its original state before this returns.
    pub fn start(mut self, position: &mut P) -> SearchResult {
        if Log::DEBUG {
            let soft = self.config.soft_timeout.as_millis();
            let hard = self.config.hard_timeout.as_millis();
            let nodes = self.config.max_nodes;
            let depth = self.config.max_depth;

            if soft < Duration::MAX.as_millis() {
                self.send_string(format!("Soft timeout := {soft}ms"));
            }
            if hard < Duration::MAX.as_millis() {
                self.send_string(format!("Hard timeout := {hard}ms"));
            }
            if nodes < u64::MAX {
                self.send_string(format!("Max nodes := {nodes} nodes"));
            }
            if depth < MAX_DEPTH {
                self.send_string(format!("Max depth := {depth}"));
            }
        }

        let res = self.iterative_deepening(position);

        if Log::DEBUG {
            let hits = self.ttable.hits;
            let accesses = self.ttable.accesses;
            let hit_rate = hits as f32 / accesses.max(1) as f32 * 100.0;
            let collisions = self.ttable.collisions;
            let info = format!("TT stats: {hits} hits / {accesses} accesses ({hit_rate:.2}% hit rate), {collisions} collisions");
            self.send_string(info);
        }

        // Search has ended; send bestmove
        if Log::INFO {
            self.send_response(UciResponse::BestMove {
                bestmove: res.bestmove,
                ponder: None,
            });
        }

        // Search has concluded, alert other thread(s) that we are no longer searching
        self.is_searching.store(false, Ordering::Relaxed);

        res
    }

    /// Sends a [`UciResponse`] to `stdout`.
    #[inline(always)]
    fn send_response<T: fmt::Display>(&self, response: UciResponse<T>) {
        println!("{response}");
    }

    /// Sends a [`UciInfo`] to `stdout`.
    #[inline(always)]
    fn send_info(&self, info: UciInfo) {
        let resp = UciResponse::info(info);
        self.send_response(resp);
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string<T: fmt::Display>(&self, string: T) {
        self.send_response(UciResponse::info_string(string));
    }

    /// Sends UCI info about a completed iteration.
    #[inline(always)]
    fn send_iteration_info(&self, result: &SearchResult) {
        let elapsed = self.config.starttime.elapsed();

        self.send_info(
            UciInfo::new()
                .depth(result.depth)
                .nodes(self.nodes)
                .score(result.score)
                .nps((self.nodes as f32 / elapsed.as_secs_f32()).trunc())
                .time(elapsed.as_millis())
                .pv(result.pv.moves().iter().map(Move::to_string)),
        );
    }

    /// The move to play if no iteration completes: the TT move if it is legal, otherwise the best-ordered legal move.
    fn fallback_move(&self, position: &P) -> Option<Move> {
        let scorer = MoveScorer {
            tt_move: self.ttable.get(position.key()).map(|entry| entry.bestmove),
            color: position.side_to_move(),
            ply: 0,
            history: self.history,
            killers: self.killers,
        };

        MovePicker::new(position.legal_moves(false), |mv| scorer.score(mv))
            .next()
            .map(|(mv, _)| mv)
    }

    /// Performs [iterative deepening](https://www.chessprogramming.org/Iterative_Deepening) (ID) on the Search's position.
    ///
    /// ID is a basic time management strategy for engines.
    /// It involves performing a search at depth `n`, then, if there is enough time remaining, performing a search at depth `n + 1`.
    /// On it's own, ID does not improve performance, because we are wasting work by re-running searches at low depth.
    /// However, with transposition table move ordering, earlier iterations make later ones much cheaper.
    ///
    /// Before each iteration, we check that the soft timeout has not passed, and that the next iteration
    /// is likely to finish before the hard timeout.
    fn iterative_deepening(&mut self, position: &mut P) -> SearchResult {
        let mut result = SearchResult {
            bestmove: self.fallback_move(position),
            ..Default::default()
        };

        let mut depth = 1;
        let mut last_iteration = Duration::ZERO;

        while depth <= self.config.max_depth && !self.search_cancelled() {
            let elapsed = self.config.starttime.elapsed();

            // No time to start another iteration
            if elapsed >= self.config.soft_timeout {
                break;
            }

            // Each iteration takes longer than the last, so don't start one that can't finish
            let projected = last_iteration.saturating_mul(tune::iteration_growth_factor!());
            if elapsed.saturating_add(projected) > self.config.hard_timeout {
                if Log::DEBUG {
                    self.send_string(format!(
                        "Not starting depth {depth}: last iteration took {}ms",
                        last_iteration.as_millis()
                    ));
                }
                break;
            }

            let iteration_start = Instant::now();
            let mut pv = PrincipalVariation::default();
            let score = self.negamax::<RootNode>(
                position,
                depth as i32,
                0,
                SearchBounds::default(),
                &mut pv,
                0,
                true,
            );

            // A cancelled iteration did not compare every root move, so its results can't be trusted
            if self.stopped {
                if Log::DEBUG {
                    self.send_string(format!(
                        "Search cancelled during depth {depth}, falling back to depth {}",
                        result.depth
                    ));
                }
                break;
            }

            last_iteration = iteration_start.elapsed();

            result.score = score;
            result.depth = depth;
            if let Some(&bestmove) = pv.moves().first() {
                result.bestmove = Some(bestmove);
            }
            result.pv = pv;

            // Send search info to the GUI
            if Log::INFO {
                self.send_iteration_info(&result);
            }

            // A deeper search can't find anything better than a forced mate
            if score.is_winning_mate() {
                break;
            }

            depth += 1;
        }

        result.nodes = self.nodes;
        result
    }

    /// Primary location of search logic.
    ///
    /// Uses the [negamax](https://www.chessprogramming.org/Negamax) algorithm in a [fail soft](https://www.chessprogramming.org/Alpha-Beta#Negamax_Framework) framework.
    ///
    /// If the search was cancelled, the returned score is meaningless and must not be used.
    #[allow(clippy::too_many_arguments)]
    fn negamax<Node: NodeType>(
        &mut self,
        position: &mut P,
        depth: i32,
        ply: i32,
        mut bounds: SearchBounds,
        pv: &mut PrincipalVariation,
        extensions: u8,
        allow_null: bool,
    ) -> Score {
        // Clear any nodes in this PV, since we're searching from a new position
        pv.clear();

        /****************************************************************************************************
         * Quiescence Search: https://www.chessprogramming.org/Quiescence_Search
         *
         * In order to avoid the horizon effect, we don't stop searching at a depth of 0. Instead, we look
         * at all captures until we reach a "quiet" (quiescent) position.
         ****************************************************************************************************/
        if depth <= 0 {
            return self.quiescence(position, ply, bounds);
        }

        self.nodes += 1;

        if !Node::ROOT {
            // The caller discards whatever an interrupted node returns
            if self.search_cancelled() {
                return Score::DRAW;
            }

            if position.is_draw() {
                return Score::DRAW;
            }

            if ply >= MAX_DEPTH as i32 {
                return self.evaluator.evaluate(position);
            }
        }

        /****************************************************************************************************
         * TT Cutoffs: https://www.chessprogramming.org/Transposition_Table#Transposition_Table_Cutoffs
         *
         * If we've already evaluated this position before at a higher depth, we can avoid re-doing a lot of
         * work by just returning the evaluation stored in the transposition table.
         ****************************************************************************************************/
        let key = position.key();
        let tt_entry = self.probe_tt(key);

        if !Node::ROOT {
            if let Some(score) = tt_entry
                .filter(|entry| entry.depth as i32 >= depth)
                .and_then(|entry| entry.try_score(bounds, ply))
            {
                return score;
            }
        }

        let in_check = position.is_in_check();

        // If we CAN prune this node by means other than the TT, do so
        if !Node::PV && !in_check {
            if let Some(score) =
                self.node_pruning_score(position, depth, ply, bounds, extensions, allow_null)
            {
                return score;
            }
        }

        // If there are no legal moves, it's either mate or a draw.
        let moves = position.legal_moves(false);
        if moves.is_empty() {
            return if in_check {
                // Offset by ply to prefer earlier mates
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        // Sort moves so that we look at "promising" ones first
        let color = position.side_to_move();
        let scorer = MoveScorer {
            tt_move: tt_entry.map(|entry| entry.bestmove),
            color,
            ply: ply as usize,
            history: self.history,
            killers: self.killers,
        };
        let mut picker = MovePicker::new(moves, |mv| scorer.score(mv));

        let mut local_pv = PrincipalVariation::default();
        let mut best = Score::ALPHA;
        let mut bestmove = Move::NULL;
        let original_alpha = bounds.alpha;
        let mut moves_searched = 0;

        /****************************************************************************************************
         * Primary move loop
         ****************************************************************************************************/

        while let Some((mv, _)) = picker.next() {
            let mut new = MoveGuard::new(position, mv);

            /****************************************************************************************************
             * Check Extensions: https://www.chessprogramming.org/Check_Extensions
             *
             * Checks and promotions are forcing, so look one ply further, up to a limit per path.
             ****************************************************************************************************/
            let extend = self.params.extensions
                && extensions < self.params.max_extensions
                && (mv.is_promotion() || new.is_in_check());
            let new_depth = depth - 1 + extend as i32;
            let new_extensions = extensions + extend as u8;

            let mut score;

            /****************************************************************************************************
             * Principal Variation Search: https://en.wikipedia.org/wiki/Principal_variation_search#Pseudocode
             *
             * We assume our move ordering is so good that the first move searched is the best available. So,
             * for every other move, we search with a null window and thus prune nodes easier. If we find
             * something that beats the null window, we have to do a costly re-search.
             ****************************************************************************************************/
            if Node::PV && moves_searched == 0 {
                score = -self.negamax::<PvNode>(
                    &mut new,
                    new_depth,
                    ply + 1,
                    -bounds,
                    &mut local_pv,
                    new_extensions,
                    true,
                );
            } else {
                /****************************************************************************************************
                 * Late Move Reductions: https://www.chessprogramming.org/Late_Move_Reductions
                 *
                 * Late quiet moves are probably bad, so scout them at a reduced depth first.
                 ****************************************************************************************************/
                let reduced_depth = if self.params.late_move_reductions
                    && !extend
                    && mv.is_quiet()
                    && depth >= self.params.min_lmr_depth
                    && moves_searched >= self.params.min_lmr_moves
                {
                    (depth - 1 - depth / self.params.lmr_depth_divisor).max(1)
                } else {
                    new_depth
                };

                score = -self.negamax::<NonPvNode>(
                    &mut new,
                    reduced_depth,
                    ply + 1,
                    -bounds.null_alpha(),
                    &mut local_pv,
                    new_extensions,
                    true,
                );

                // If the reduced scout raised alpha, scout again at full depth
                if reduced_depth < new_depth && score > bounds.alpha && !self.stopped {
                    score = -self.negamax::<NonPvNode>(
                        &mut new,
                        new_depth,
                        ply + 1,
                        -bounds.null_alpha(),
                        &mut local_pv,
                        new_extensions,
                        true,
                    );
                }

                // If the scout raised alpha on the PV, it needs an exact score
                if Node::PV && score > bounds.alpha && !self.stopped {
                    score = -self.negamax::<PvNode>(
                        &mut new,
                        new_depth,
                        ply + 1,
                        -bounds,
                        &mut local_pv,
                        new_extensions,
                        true,
                    );
                }
            }

            drop(new);
            moves_searched += 1;

            // The score of an interrupted child is meaningless
            if self.search_cancelled() {
                return best;
            }

            /****************************************************************************************************
             * Score evaluation & bounds adjustments
             ****************************************************************************************************/

            if score > best {
                best = score;
                bestmove = mv;

                // PV found
                if score > bounds.alpha {
                    bounds.alpha = score;

                    // Only extend the PV if we're in a PV node
                    if Node::PV {
                        pv.extend(mv, &local_pv);
                    }
                }

                // Fail high
                if score >= bounds.beta {
                    if mv.is_quiet() {
                        self.update_quiet_heuristics(
                            color,
                            mv,
                            picker.searched_before_current(),
                            depth,
                            ply,
                        );
                    }
                    break;
                }
            }
        }

        // Save this node to the TTable
        self.save_to_tt(
            key,
            bestmove,
            best,
            SearchBounds::new(original_alpha, bounds.beta),
            depth,
            ply,
        );

        best // fail-soft
    }

    /// Quiescence Search (QSearch)
    ///
    /// A search that looks at only captures, or at every evasion when in check.
    /// This is called when [`Search::negamax`] reaches a depth of 0, and has no depth limit.
    /// It terminates because every capture removes material from the board.
    fn quiescence(&mut self, position: &mut P, ply: i32, mut bounds: SearchBounds) -> Score {
        self.nodes += 1;

        if ply > 0 && (self.search_cancelled() || position.is_draw()) {
            return Score::DRAW;
        }

        if ply >= MAX_DEPTH as i32 {
            return self.evaluator.evaluate(position);
        }

        let in_check = position.is_in_check();

        // In check, standing pat is not an option: if there are no evasions, we've been mated
        let mut best = if in_check {
            Score::mated_in(ply)
        } else {
            // Evaluate the current position, to serve as our baseline
            let stand_pat = self.evaluator.evaluate(position);

            // Beta cutoff; this position is "too good" and our opponent would never let us get here
            if stand_pat >= bounds.beta {
                return stand_pat;
            }

            bounds.alpha = bounds.alpha.max(stand_pat);
            stand_pat
        };

        let scorer = MoveScorer {
            tt_move: self.probe_tt(position.key()).map(|entry| entry.bestmove),
            color: position.side_to_move(),
            ply: ply as usize,
            history: self.history,
            killers: self.killers,
        };
        let picker = MovePicker::new(position.legal_moves(!in_check), |mv| scorer.score(mv));

        for (mv, _) in picker {
            let mut new = MoveGuard::new(position, mv);
            let score = -self.quiescence(&mut new, ply + 1, -bounds);
            drop(new);

            // The score of an interrupted child is meaningless
            if self.search_cancelled() {
                break;
            }

            if score > best {
                best = score;

                if score > bounds.alpha {
                    bounds.alpha = score;
                }

                // Fail high
                if score >= bounds.beta {
                    break;
                }
            }
        }

        best // fail-soft
    }

    /// If we can prune the provided node, this function returns a score to return upon pruning.
    ///
    /// Only called in non-PV nodes that are not in check.
    #[inline]
    fn node_pruning_score(
        &mut self,
        position: &mut P,
        depth: i32,
        ply: i32,
        bounds: SearchBounds,
        extensions: u8,
        allow_null: bool,
    ) -> Option<Score> {
        /****************************************************************************************************
         * Reverse Futility Pruning: https://www.chessprogramming.org/Reverse_Futility_Pruning
         *
         * If our static eval is too good (better than beta), we can prune this branch. Multiplying our
         * margin by depth makes this pruning process less risky for higher depths.
         ****************************************************************************************************/
        if self.params.reverse_futility_pruning && depth <= self.params.max_rfp_depth {
            let static_eval = self.evaluator.evaluate(position);
            let rfp_score = static_eval - self.params.rfp_margin * depth;

            if rfp_score >= bounds.beta {
                return Some(rfp_score);
            }
        }

        /****************************************************************************************************
         * Null Move Pruning: https://www.chessprogramming.org/Null_Move_Pruning
         *
         * If we can afford to skip our turn and give our opponent two moves in a row while maintaining a high
         * enough score, we can prune this branch as our opponent would likely never let us reach it anyway.
         ****************************************************************************************************/
        let can_perform_nmp = self.params.null_move_pruning
            && allow_null // Can't play two nullmoves in a row
            && depth >= self.params.min_nmp_depth // Can't play nullmove under a certain depth
            && position.has_non_pawn_material(position.side_to_move()); // Zugzwang is likely with only Kings and Pawns

        if can_perform_nmp {
            let mut null = MoveGuard::null(position)?;

            // Search at a reduced depth with a zero-window
            let nmp_depth =
                depth - self.params.nmp_reduction - depth / self.params.nmp_depth_divisor;
            let mut null_pv = PrincipalVariation::default();
            let score = -self.negamax::<NonPvNode>(
                &mut null,
                nmp_depth,
                ply + 1,
                -bounds.null_beta(),
                &mut null_pv,
                extensions,
                false,
            );
            drop(null);

            if self.stopped {
                return Some(score);
            }

            // If making the nullmove produces a cutoff, we can assume that a full-depth search would also produce a cutoff
            if score >= bounds.beta {
                // Mates found after passing are not real
                return Some(if score.is_mate() { bounds.beta } else { score });
            }
        }

        // If no pruning technique was possible, return no score
        None
    }

    /// Rewards a quiet move that caused a beta cutoff, and penalizes the quiets searched before it.
    #[inline(always)]
    fn update_quiet_heuristics(
        &mut self,
        color: Color,
        mv: Move,
        searched_before: &[Move],
        depth: i32,
        ply: i32,
    ) {
        let bonus = depth * depth;

        self.history.update(color, &mv, bonus);
        self.killers.store(ply as usize, mv);

        for quiet in searched_before.iter().filter(|mv| mv.is_quiet()) {
            self.history.update(color, quiet, -bonus);
        }
    }

    /// Checks if we've exceeded any conditions that would warrant the search to end.
    ///
    /// Once this has returned `true`, it always will.
    #[inline(always)]
    fn search_cancelled(&mut self) -> bool {
        self.stopped = self.stopped
            // Condition 1: We've exceeded the hard limit of our allotted search time
            || self.config.starttime.elapsed() >= self.config.hard_timeout
            // Condition 2: The search was stopped by an external factor, like the `stop` command
            || !self.is_searching.load(Ordering::Relaxed)
            // Condition 3: We've exceeded the maximum amount of nodes we're allowed to search
            || self.nodes >= self.config.max_nodes;

        self.stopped
    }

    /// Saves the provided data to an entry in the TTable.
    ///
    /// Nothing is saved once the search has been cancelled.
    #[inline(always)]
    fn save_to_tt(
        &mut self,
        key: u64,
        bestmove: Move,
        score: Score,
        bounds: SearchBounds,
        depth: i32,
        ply: i32,
    ) {
        if self.stopped {
            return;
        }

        let depth = depth.clamp(0, u8::MAX as i32) as u8;
        let entry = TTableEntry::new(key, bestmove, score, bounds, depth, ply);
        let old = self.ttable.store(entry);

        if Log::DEBUG {
            // If a previous entry existed and had a *different* key, this was a collision
            if old.is_some_and(|old| old.key != key) {
                self.ttable.collisions += 1;
            }
        }
    }

    /// Fetches the entry for the provided position from the TTable, if it exists.
    #[inline(always)]
    fn probe_tt(&mut self, key: u64) -> Option<TTableEntry> {
        let entry = self.ttable.get(key).copied();

        if Log::DEBUG {
            // Regardless whether this was a hit, it was still an access
            self.ttable.accesses += 1;

            // If an entry was found, this was a hit
            if entry.is_some() {
                self.ttable.hits += 1;
            }
        }

        entry
    }
}

/// The state of the engine that outlives a single search.
///
/// The transposition table persists across calls to [`Searcher::think`],
/// while history and killer moves are reset at the start of every search.
#[derive(Debug)]
pub struct Searcher<E = Pesto> {
    ttable: TTable,
    history: HistoryTable,
    killers: KillerTable,
    params: SearchParameters,
    evaluator: E,
}

impl<E> Searcher<E> {
    /// Creates a new [`Searcher`] that evaluates positions with `evaluator`.
    pub fn with_evaluator(evaluator: E) -> Self {
        Self {
            ttable: TTable::default(),
            history: HistoryTable::default(),
            killers: KillerTable::default(),
            params: SearchParameters::default(),
            evaluator,
        }
    }

    /// Replaces the search parameters.
    #[inline(always)]
    pub fn with_params(mut self, params: SearchParameters) -> Self {
        self.params = params;
        self
    }

    /// Replaces the transposition table.
    #[inline(always)]
    pub fn with_ttable(mut self, ttable: TTable) -> Self {
        self.ttable = ttable;
        self
    }

    /// Chooses a move to play in `position` within the time allotted by `clock`.
    ///
    /// Always returns a legal move, even if no iteration of the search completed.
    /// Fails if `position` has no legal moves. `position` is unchanged when this returns.
    pub fn think<P: Position, C: Clock + ?Sized>(
        &mut self,
        position: &mut P,
        clock: &C,
    ) -> Result<Move>
    where
        E: Evaluator<P>,
    {
        if position.legal_moves(false).is_empty() {
            bail!("cannot think in a position without legal moves");
        }

        let config = SearchConfig::from_clock(position, clock);
        let is_searching = Arc::new(AtomicBool::new(true));
        let result = self.search::<LogNone, P>(position, config, is_searching);

        result
            .bestmove
            .context("search did not produce a move in a position with legal moves")
    }

    /// Runs a search on `position` with the provided limits.
    ///
    /// Clearing `is_searching` from another thread stops the search as soon as possible.
    pub fn search<Log: LogLevel, P: Position>(
        &mut self,
        position: &mut P,
        config: SearchConfig,
        is_searching: Arc<AtomicBool>,
    ) -> SearchResult
    where
        E: Evaluator<P>,
    {
        self.history.clear();
        self.killers.clear();

        Search::<Log, P, E>::new(
            is_searching,
            config,
            self.params,
            &mut self.ttable,
            &mut self.history,
            &mut self.killers,
            &self.evaluator,
        )
        .start(position)
    }

    /// Runs a quiescence search on `position` within `bounds`.
    pub fn quiesce<P: Position>(&mut self, position: &mut P, bounds: SearchBounds) -> Score
    where
        E: Evaluator<P>,
    {
        Search::<LogNone, P, E>::new(
            Arc::new(AtomicBool::new(true)),
            SearchConfig::default(),
            self.params,
            &mut self.ttable,
            &mut self.history,
            &mut self.killers,
            &self.evaluator,
        )
        .quiescence(position, 0, bounds)
    }

    /// The transposition table shared by all searches.
    #[inline(always)]
    pub fn ttable(&self) -> &TTable {
        &self.ttable
    }

    /// Mutable access to the transposition table, for resizing or changing its policy.
    #[inline(always)]
    pub fn ttable_mut(&mut self) -> &mut TTable {
        &mut self.ttable
    }

    /// Forgets everything learned in previous searches.
    pub fn clear(&mut self) {
        self.ttable.clear();
        self.history.clear();
        self.killers.clear();
    }
}

impl<E: Default> Default for Searcher<E> {
    #[inline(always)]
    fn default() -> Self {
        Self::with_evaluator(E::default())
    }
}
