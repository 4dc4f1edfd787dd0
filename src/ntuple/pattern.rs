use crate::engine::Board;

use super::NetworkError;

/// Cells per N-tuple.
pub const TUPLE_LEN: usize = 6;

/// Rank buckets used unless configured otherwise; ranks 13 and above share the last bucket.
pub const DEFAULT_RANKS: usize = 14;

/// An ordered tuple of 6 board cells addressing one weight table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pattern([u8; TUPLE_LEN]);

/// Two L-shaped and two 2x3 rectangle tuples along the left/bottom edges.
pub const BASE_PATTERNS: [Pattern; 4] = [
    Pattern([0, 4, 8, 9, 12, 13]),
    Pattern([1, 5, 9, 10, 13, 14]),
    Pattern([1, 2, 5, 6, 9, 10]),
    Pattern([2, 3, 6, 7, 10, 11]),
];

impl Pattern {
    pub fn new(cells: [u8; TUPLE_LEN]) -> Result<Self, NetworkError> {
        match cells.iter().find(|&&c| c >= 16) {
            Some(&c) => Err(NetworkError::Cell(c)),
            None => Ok(Pattern(cells)),
        }
    }

    /// Pack the ranks under this tuple into a base-`ranks` number, first cell
    /// most significant. Ranks at or above `ranks - 1` share the top bucket.
    ///
    /// ```
    /// use threes_ntuple::engine::Board;
    /// use threes_ntuple::ntuple::BASE_PATTERNS;
    /// let b = Board::from_cells([1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0]);
    /// // cells 0, 4, 8 hold ranks 1, 2, 3; cells 9, 12, 13 are empty
    /// assert_eq!(BASE_PATTERNS[0].feature_index(&b, 14), ((1 * 14 + 2) * 14 + 3) * 14 * 14 * 14);
    /// ```
    #[inline]
    pub fn feature_index(&self, board: &Board, ranks: usize) -> usize {
        let cap = ranks - 1;
        self.0
            .iter()
            .fold(0, |index, &cell| index * ranks + usize::from(board.at(cell as usize)).min(cap))
    }

    fn remap(&self, src: &Board) -> Pattern { Pattern(self.0.map(|cell| src.at(cell as usize))) }
}

/// Free-function form of [`Pattern::feature_index`].
#[inline]
pub fn feature_index(board: &Board, pattern: &Pattern, ranks: usize) -> usize {
    pattern.feature_index(board, ranks)
}

/// Number of distinct feature indices for `ranks` buckets, `ranks^6`.
#[inline]
pub fn feature_space(ranks: usize) -> usize { ranks.pow(TUPLE_LEN as u32) }

/// The images of `patterns` under the 8 symmetries of the square, grouped by
/// symmetry in [`Board::symmetries`] order.
///
/// Image `k` of pattern `p` reads from any board exactly the ranks that `p`
/// reads from view `k` of that board, so one table per image covers every
/// orientation without transforming the board.
pub fn symmetric_images(patterns: &[Pattern]) -> Vec<Pattern> {
    // Each cell holds its own index, so a view maps a position to its source cell.
    let mut cells = [0u8; 16];
    for (pos, cell) in cells.iter_mut().enumerate() {
        *cell = pos as u8;
    }
    Board::from_cells(cells)
        .symmetries()
        .iter()
        .flat_map(|view| patterns.iter().map(move |p| p.remap(view)))
        .collect()
}
