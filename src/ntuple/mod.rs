//! N-tuple network value function.
//!
//! A board's value is the sum of table lookups over every pattern and every
//! symmetric view of the board. Two layouts give that sum:
//! - [`Layout::Isomorphic`]: one table per base pattern, looked up on each of
//!   the 8 transformed boards.
//! - [`Layout::Explicit`]: one table per pre-rotated image of each base
//!   pattern (8x the tables), looked up on the board as is.
//!
//! Both layouts agree whenever the tables of a symmetry orbit hold the same
//! weights, and [`NTupleNetwork::adjust`] keeps them that way. The isomorphic
//! layout needs an eighth of the memory, so it is the default.
//!
//! ```
//! use threes_ntuple::engine::Board;
//! use threes_ntuple::ntuple::{Layout, NTupleNetwork};
//!
//! let mut net = NTupleNetwork::new(Layout::Isomorphic, 4).unwrap();
//! let b = Board::from_cells([1, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
//! assert_eq!(net.value(&b), 0.0);
//! net.adjust(&b, 0.5);
//! assert!(net.value(&b) > 0.0);
//! assert_eq!(net.value(&b), net.value(&b.rotate_right()));
//! ```

use std::path::Path;

use tracing::info;

use crate::engine::Board;
use crate::weights::{self, WeightError, WeightTable};

mod pattern;

pub use pattern::{feature_index, feature_space, symmetric_images, Pattern, BASE_PATTERNS, DEFAULT_RANKS, TUPLE_LEN};

#[derive(thiserror::Error, Debug)]
pub enum NetworkError {
    #[error("rank cap {0} outside 2..=16")]
    RankCap(usize),
    #[error("pattern cell {0} outside the 4x4 grid")]
    Cell(u8),
    #[error("network needs {expected} tables, got {found}")]
    TableCount { expected: usize, found: usize },
    #[error("table {table} holds {len} weights, needs at least {needed}")]
    TableSize { table: usize, len: usize, needed: usize },
    #[error(transparent)]
    Weights(#[from] WeightError),
}

/// How symmetric views are folded into the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Base-pattern tables summed over the 8 transformed boards.
    #[default]
    Isomorphic,
    /// One table per pre-rotated pattern, summed on the board as is.
    Explicit,
}

/// Weight tables addressed by board patterns.
#[derive(Debug, Clone)]
pub struct NTupleNetwork {
    layout: Layout,
    ranks: usize,
    patterns: Vec<Pattern>,
    tables: Vec<WeightTable>,
}

impl NTupleNetwork {
    /// Zeroed network over [`BASE_PATTERNS`].
    pub fn new(layout: Layout, ranks: usize) -> Result<Self, NetworkError> {
        Self::with_patterns(layout, ranks, &BASE_PATTERNS)
    }

    /// Zeroed network over custom base patterns.
    pub fn with_patterns(layout: Layout, ranks: usize, base: &[Pattern]) -> Result<Self, NetworkError> {
        if !(2..=16).contains(&ranks) {
            return Err(NetworkError::RankCap(ranks));
        }
        let patterns = match layout {
            Layout::Isomorphic => base.to_vec(),
            Layout::Explicit => symmetric_images(base),
        };
        let size = feature_space(ranks);
        let tables = patterns.iter().map(|_| WeightTable::new(size)).collect();
        Ok(Self { layout, ranks, patterns, tables })
    }

    /// Replace every table, checking each can address the full feature space.
    pub fn set_tables(&mut self, tables: Vec<WeightTable>) -> Result<(), NetworkError> {
        if tables.len() != self.patterns.len() {
            return Err(NetworkError::TableCount { expected: self.patterns.len(), found: tables.len() });
        }
        let needed = feature_space(self.ranks);
        if let Some((table, t)) = tables.iter().enumerate().find(|(_, t)| t.len() < needed) {
            return Err(NetworkError::TableSize { table, len: t.len(), needed });
        }
        self.tables = tables;
        Ok(())
    }

    #[inline]
    pub fn layout(&self) -> Layout { self.layout }

    #[inline]
    pub fn ranks(&self) -> usize { self.ranks }

    /// Patterns in table order (the pre-rotated images for the explicit layout).
    #[inline]
    pub fn patterns(&self) -> &[Pattern] { &self.patterns }

    #[inline]
    pub fn tables(&self) -> &[WeightTable] { &self.tables }

    /// Estimated value of `board`.
    #[inline]
    pub fn value(&self, board: &Board) -> f32 {
        match self.layout {
            Layout::Explicit => self.view_value(board),
            Layout::Isomorphic => board
                .symmetries()
                .iter()
                .fold(0.0, |acc, view| acc + self.view_value(view)),
        }
    }

    /// Add `delta` to every weight that [`Self::value`] reads for `board` or
    /// any of its symmetric views.
    ///
    /// Under the explicit layout, image `k` of a pattern on view `j` reads the
    /// base pattern on a composed view, so every image table of an orbit
    /// receives the same updates and the orbit stays equal.
    pub fn adjust(&mut self, board: &Board, delta: f32) {
        for view in board.symmetries() {
            self.adjust_view(&view, delta);
        }
    }

    #[inline]
    fn view_value(&self, view: &Board) -> f32 {
        self.patterns
            .iter()
            .zip(&self.tables)
            .map(|(p, t)| t[p.feature_index(view, self.ranks)])
            .sum()
    }

    #[inline]
    fn adjust_view(&mut self, view: &Board, delta: f32) {
        let ranks = self.ranks;
        for (p, t) in self.patterns.iter().zip(self.tables.iter_mut()) {
            t[p.feature_index(view, ranks)] += delta;
        }
    }

    /// Load tables from a weight file, replacing the current ones.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        self.set_tables(weights::load_tables(path)?)?;
        info!(path = %path.display(), tables = self.tables.len(), "loaded network");
        Ok(())
    }

    /// Save tables to a weight file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), NetworkError> {
        let path = path.as_ref();
        weights::save_tables(path, &self.tables)?;
        info!(path = %path.display(), tables = self.tables.len(), "saved network");
        Ok(())
    }
}
