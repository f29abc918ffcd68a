/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Move, Score, SearchBounds};

/// Number of bytes in a megabyte
const BYTES_IN_MB: usize = 1024 * 1024;

/// How a stored score relates to the true score of its position.
///
/// See [CPW](https://www.chessprogramming.org/Node_Types) for more.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Bound {
    /// The score is exact.
    Exact,

    /// The score failed high: the true score is at least this much.
    Lower,

    /// The score failed low: the true score is at most this much.
    Upper,
}

impl Bound {
    /// Creates a new [`Bound`] for `score`, found within the original window `bounds`, as follows:
    ///
    /// ```text
    /// if score <= alpha:
    ///     UPPERBOUND
    /// else if score >= beta:
    ///     LOWERBOUND
    /// else:
    ///     EXACT
    /// ```
    #[inline(always)]
    pub fn new(score: Score, bounds: SearchBounds) -> Self {
        if score <= bounds.alpha {
            Self::Upper
        } else if score >= bounds.beta {
            Self::Lower
        } else {
            Self::Exact
        }
    }
}

/// When a new entry may replace the entry already stored in its slot.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Replacement {
    /// Every store overwrites the slot.
    #[default]
    Always,

    /// An entry for a different position is only replaced by one searched at least as deep.
    PreferDeeper,
}

/// An entry into a hash table
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TTableEntry {
    /// Key of the node this entry represents.
    pub key: u64,

    /// Best move found for this position.
    pub bestmove: Move,

    /// Depth at which the data for this entry was found.
    pub depth: u8,

    /// Best score found for this position, with mate scores relative to this position.
    pub score: Score,

    /// How `score` relates to the true score.
    pub bound: Bound,
}

impl TTableEntry {
    /// Creates a new [`TTableEntry`] from the provided parameters.
    ///
    /// This will generate a bound through [`Bound::new`] and
    /// will adjust `score` by `ply` if it was a mate score.
    #[inline(always)]
    pub fn new(
        key: u64,
        bestmove: Move,
        score: Score,
        bounds: SearchBounds,
        depth: u8,
        ply: i32,
    ) -> Self {
        // Determine the bound first, before score adjustment
        let bound = Bound::new(score, bounds);

        Self {
            key,
            bestmove,
            depth,
            score: score.absolute(ply),
            bound,
        }
    }

    /// Determine whether the score in this entry can be used to end a search of `bounds` at `ply`, and if so, return it.
    ///
    /// An exact score is returned immediately. A lower bound raises `alpha` and an upper bound lowers `beta`.
    /// If that leaves an empty window, the stored score is returned.
    #[inline(always)]
    pub fn try_score(&self, mut bounds: SearchBounds, ply: i32) -> Option<Score> {
        // Adjust mate scores to be relative to current ply
        let score = self.score.relative(ply);

        match self.bound {
            Bound::Exact => return Some(score),
            Bound::Lower => bounds.alpha = bounds.alpha.max(score),
            Bound::Upper => bounds.beta = bounds.beta.min(score),
        }

        (bounds.alpha >= bounds.beta).then_some(score)
    }
}

/// Transposition Table.
///
/// Used during a search to keep track of previous search results on positions,
/// avoiding unnecessary re-computations. Entries live until they are overwritten.
#[derive(Debug)]
pub struct TTable {
    /// Internal cache of the TTable. Its length is always a power of two.
    cache: Vec<Option<TTableEntry>>,

    /// When a store may overwrite an occupied slot.
    replacement: Replacement,

    /// Number of collisions that have occurred since last clearing.
    pub(crate) collisions: usize,

    /// Number of accesses that have occurred since last clearing.
    pub(crate) accesses: usize,

    /// Number of hits that have occurred since last clearing.
    pub(crate) hits: usize,
}

impl TTable {
    /// Default size of the Transposition Table, in megabytes.
    pub const DEFAULT_SIZE: usize = 16;

    /// Minimum size of the Transposition Table, in megabytes.
    pub const MIN_SIZE: usize = 1;

    /// Maximum size of the Transposition Table, in megabytes.
    pub const MAX_SIZE: usize = 1_024;

    /// Create a new [`TTable`] that is at most `size` megabytes.
    #[inline(always)]
    pub fn new(size: usize) -> Self {
        Self::from_capacity((size * BYTES_IN_MB) / size_of::<Option<TTableEntry>>())
    }

    /// Create a new [`TTable`] that can hold at most `capacity` entries.
    ///
    /// The capacity is rounded down to a power of two, so that a key can be mapped to a slot with a mask.
    #[inline(always)]
    pub fn from_capacity(capacity: usize) -> Self {
        let capacity = match capacity {
            0 => 1,
            n if n.is_power_of_two() => n,
            n => n.next_power_of_two() / 2,
        };

        Self {
            cache: vec![None; capacity],
            replacement: Replacement::default(),
            collisions: 0,
            accesses: 0,
            hits: 0,
        }
    }

    /// Sets the policy for replacing occupied slots.
    #[inline(always)]
    pub fn set_replacement(&mut self, replacement: Replacement) {
        self.replacement = replacement;
    }

    /// Returns the policy for replacing occupied slots.
    #[inline(always)]
    pub fn replacement(&self) -> Replacement {
        self.replacement
    }

    /// Clears the entries of this [`TTable`].
    #[inline(always)]
    pub fn clear(&mut self) {
        self.cache.iter_mut().for_each(|entry| *entry = None);
        self.collisions = 0;
        self.accesses = 0;
        self.hits = 0;
    }

    /// Returns the number of entries that can fit within this [`TTable`]
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.cache.len()
    }

    /// Returns the size of this [`TTable`], in megabytes.
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.cache.len() * size_of::<Option<TTableEntry>>() / BYTES_IN_MB
    }

    /// Returns the number of `Some` entries in this [`TTable`].
    #[inline(always)]
    pub fn num_entries(&self) -> usize {
        self.cache.iter().filter(|entry| entry.is_some()).count()
    }

    /// Map `key` to an index into this [`TTable`].
    #[inline(always)]
    pub fn index(&self, key: u64) -> usize {
        key as usize & (self.capacity() - 1)
    }

    /// Get the entry if and only if it matches the provided key
    #[inline(always)]
    pub fn get(&self, key: u64) -> Option<&TTableEntry> {
        self.entry(key).filter(|e| e.key == key)
    }

    /// Get the entry, without regards for whether it matches the provided key
    #[inline(always)]
    fn entry(&self, key: u64) -> Option<&TTableEntry> {
        // The cache is never empty, so the masked index is always in bounds
        self.cache[self.index(key)].as_ref()
    }

    /// Store `entry` in the table at `entry.key`, returning whatever was there if it was replaced.
    ///
    /// Returns `None` if the slot was empty, or if the replacement policy kept the old entry.
    #[inline(always)]
    pub fn store(&mut self, entry: TTableEntry) -> Option<TTableEntry> {
        let index = self.index(entry.key);
        let slot = &mut self.cache[index];

        if let Some(old) = slot {
            let keep_old = self.replacement == Replacement::PreferDeeper
                && old.key != entry.key
                && old.depth > entry.depth;

            if keep_old {
                return None;
            }
        }

        slot.replace(entry)
    }
}

impl Default for TTable {
    #[inline(always)]
    fn default() -> Self {
        Self::new(Self::DEFAULT_SIZE)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(key: u64, score: i32, depth: u8, bound: Bound) -> TTableEntry {
        TTableEntry {
            key,
            bestmove: Move::NULL,
            depth,
            score: Score::new(score),
            bound,
        }
    }

    #[test]
    fn test_capacity_is_power_of_two() {
        assert_eq!(TTable::from_capacity(1000).capacity(), 512);
        assert_eq!(TTable::from_capacity(1024).capacity(), 1024);
        assert_eq!(TTable::from_capacity(0).capacity(), 1);
        assert!(TTable::new(1).capacity().is_power_of_two());
    }

    #[test]
    fn test_store_then_probe() {
        let mut tt = TTable::from_capacity(16);
        let stored = entry(0xDEAD_BEEF, 42, 5, Bound::Lower);
        assert!(tt.store(stored).is_none());

        assert_eq!(tt.get(0xDEAD_BEEF), Some(&stored));
        assert_eq!(tt.num_entries(), 1);
    }

    #[test]
    fn test_ttable_overwrites() {
        // Both keys map to the same slot in a table of capacity 2
        let key1 = 0b10;
        let key2 = 0b100;
        let entry1 = entry(key1, 0, 9, Bound::Exact);
        let entry2 = entry(key2, 100, 1, Bound::Exact);

        let mut tt = TTable::from_capacity(2);
        assert_eq!(
            tt.num_entries(),
            0,
            "TTable should initialize to being empty"
        );

        tt.store(entry1);
        assert_eq!(tt.get(key1), Some(&entry1));

        let old = tt.store(entry2);
        assert_eq!(old, Some(entry1), "Storing returns the overwritten entry");
        assert_eq!(tt.num_entries(), 1);
        assert!(
            tt.get(key1).is_none(),
            "Cannot get an entry that has been overridden"
        );
        assert_eq!(tt.get(key2), Some(&entry2));
    }

    #[test]
    fn test_prefer_deeper() {
        let key1 = 0b10;
        let key2 = 0b100;
        let deep = entry(key1, 0, 9, Bound::Exact);
        let shallow = entry(key2, 100, 1, Bound::Exact);

        let mut tt = TTable::from_capacity(2);
        tt.set_replacement(Replacement::PreferDeeper);

        tt.store(deep);
        assert!(tt.store(shallow).is_none());
        assert_eq!(tt.get(key1), Some(&deep));
        assert!(tt.get(key2).is_none());

        // The same position is always refreshed, even from a shallower search
        let refreshed = entry(key1, 7, 2, Bound::Upper);
        assert_eq!(tt.store(refreshed), Some(deep));
        assert_eq!(tt.get(key1), Some(&refreshed));
    }

    #[test]
    fn test_clear() {
        let mut tt = TTable::from_capacity(8);
        tt.store(entry(3, 0, 1, Bound::Exact));
        tt.clear();
        assert_eq!(tt.num_entries(), 0);
    }

    #[test]
    fn test_try_score() {
        let window = SearchBounds::new(Score::new(-50), Score::new(50));

        // Exact scores are always usable
        assert_eq!(
            entry(1, 10, 1, Bound::Exact).try_score(window, 0),
            Some(Score::new(10))
        );

        // A lower bound above beta fails high
        assert_eq!(
            entry(1, 80, 1, Bound::Lower).try_score(window, 0),
            Some(Score::new(80))
        );
        assert_eq!(entry(1, 20, 1, Bound::Lower).try_score(window, 0), None);

        // An upper bound below alpha fails low
        assert_eq!(
            entry(1, -60, 1, Bound::Upper).try_score(window, 0),
            Some(Score::new(-60))
        );
        assert_eq!(entry(1, 0, 1, Bound::Upper).try_score(window, 0), None);
    }

    #[test]
    fn test_mate_scores_are_stored_relative_to_node() {
        let window = SearchBounds::default();

        // Mate in 3 plies from a node at ply 4 is 7 plies from the root
        let found = Score::MATE - 7;
        let stored = TTableEntry::new(9, Move::NULL, found, window, 3, 4);
        assert_eq!(stored.score, Score::MATE - 3);

        // Reached again at ply 2, the mate is 5 plies away
        assert_eq!(stored.try_score(window, 2), Some(Score::MATE - 5));
    }
}
