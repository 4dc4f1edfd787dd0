use std::fmt;
use std::sync::OnceLock;

/// A direction to slide tiles, in opcode order (`Up` = 0 .. `Left` = 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    /// All directions in opcode order. Policies iterate this to break ties.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Right, Direction::Down, Direction::Left];

    #[inline]
    pub fn opcode(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Right => 1,
            Direction::Down => 2,
            Direction::Left => 3,
        }
    }
}

const LINE_TABLE_SIZE: usize = 0x1_0000; // 65,536 possible 16-bit lines

/// Highest representable tile rank (one nibble).
pub const MAX_RANK: Cell = 15;

/// One copy of each of the low tiles 1, 2 and 3.
const FULL_BAG: [u8; 3] = [1, 1, 1];

struct Stores {
    slide_left: Box<[u64]>,
    slide_right: Box<[u64]>,
    slide_up: Box<[u64]>,
    slide_down: Box<[u64]>,
    score: Box<[Score]>,
}

type BoardRaw = u64;
type Line = u64;
type Score = u64;

/// Tile rank stored in a cell: 0 empty, 1 and 2 the basic tiles, `r >= 3` the tile `3 * 2^(r-3)`.
pub type Cell = u8;

/// Immediate reward of a legal slide (score gained by its merges).
pub type Reward = u32;

/// Packed 4x4 Threes! board plus its placement state.
///
/// Cells are 16 4-bit ranks in a `u64`, row-major, cell 0 (top-left) in the
/// most significant nibble. Next to the grid the board keeps the announced
/// hint tile, the remaining tile bag and the direction of the last slide,
/// which the placer needs to know where new tiles may enter.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    tiles: BoardRaw,
    hint: Cell,
    bag: [u8; 3],
    last: Option<Direction>,
}

impl Default for Board {
    fn default() -> Self { Board::EMPTY }
}

impl Board {
    /// An empty grid with a full bag and no hint.
    pub const EMPTY: Board = Board { tiles: 0, hint: 0, bag: FULL_BAG, last: None };

    /// Construct a `Board` from its raw packed grid (fresh placement state).
    #[inline]
    pub fn from_raw(raw: BoardRaw) -> Self { Board { tiles: raw, ..Board::EMPTY } }

    /// Construct a `Board` from 16 row-major ranks. Ranks above [`MAX_RANK`] saturate.
    pub fn from_cells(cells: [Cell; 16]) -> Self {
        let raw = cells
            .iter()
            .fold(0u64, |acc, &c| (acc << 4) | u64::from(c.min(MAX_RANK)));
        Board::from_raw(raw)
    }

    /// The raw packed grid.
    #[inline]
    pub fn raw(&self) -> BoardRaw { self.tiles }

    /// Rank at cell `pos` (0..16, row-major).
    #[inline]
    pub fn at(&self, pos: usize) -> Cell { ((self.tiles >> ((15 - pos) * 4)) & 0xf) as Cell }

    /// Face value of the tile at `pos` (0 if empty), e.g. 1, 2, 3, 6, 12, ...
    #[inline]
    pub fn tile_value(&self, pos: usize) -> u32 { rank_value(self.at(pos)) }

    /// The announced next tile, 0 when none has been announced yet.
    #[inline]
    pub fn hint(&self) -> Cell { self.hint }

    /// Remaining copies of `tile` (1..=3) in the bag.
    #[inline]
    pub fn bag(&self, tile: Cell) -> u8 {
        match tile {
            1..=3 => self.bag[tile as usize - 1],
            _ => 0,
        }
    }

    /// Direction of the last slide, `None` before the first one.
    #[inline]
    pub fn last(&self) -> Option<Direction> { self.last }

    /// Slide all lines toward `dir`.
    ///
    /// Returns the resulting board and the score gained, or `None` when no tile
    /// can move (an illegal slide, not an error).
    ///
    /// ```
    /// use threes_ntuple::engine::{Board, Direction};
    /// let b = Board::from_cells([0, 1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    /// let (after, reward) = b.slide(Direction::Left).unwrap();
    /// assert_eq!(after.at(0), 1);
    /// assert_eq!(reward, 0);
    /// assert!(Board::EMPTY.slide(Direction::Up).is_none());
    /// ```
    #[inline]
    pub fn slide(self, dir: Direction) -> Option<(Board, Reward)> {
        let tiles = match dir {
            Direction::Left | Direction::Right => slide_rows(self.tiles, dir),
            Direction::Up | Direction::Down => slide_cols(self.tiles, dir),
        };
        if tiles == self.tiles {
            return None;
        }
        let reward = (score_raw(tiles) - score_raw(self.tiles)) as Reward;
        Some((Board { tiles, last: Some(dir), ..self }, reward))
    }

    /// Put `tile` on the empty cell `pos` and announce `hint` as the next tile.
    ///
    /// The placed tile must be the current hint when one was announced,
    /// otherwise it is drawn from the bag; the new hint is always drawn from
    /// the bag. An emptied bag is refilled. Returns `None` for an occupied
    /// cell, a rank outside 1..=3, or a tile the bag does not hold.
    pub fn place(self, pos: usize, tile: Cell, hint: Cell) -> Option<Board> {
        if pos >= 16 || self.at(pos) != 0 {
            return None;
        }
        if !(1..=3).contains(&tile) || !(1..=3).contains(&hint) {
            return None;
        }
        let mut next = self;
        if self.hint == 0 {
            next.draw(tile)?;
        } else if tile != self.hint {
            return None;
        }
        next.draw(hint)?;
        next.tiles |= u64::from(tile) << ((15 - pos) * 4);
        next.hint = hint;
        Some(next)
    }

    fn draw(&mut self, tile: Cell) -> Option<()> {
        let slot = &mut self.bag[tile as usize - 1];
        if *slot == 0 {
            return None;
        }
        *slot -= 1;
        if self.bag.iter().all(|&n| n == 0) {
            self.bag = FULL_BAG;
        }
        Some(())
    }

    /// Total score of the tiles on the grid.
    #[inline]
    pub fn score(&self) -> Score { score_raw(self.tiles) }

    /// True if no slide in any direction moves a tile.
    #[inline]
    pub fn is_game_over(&self) -> bool { is_game_over(*self) }

    /// Highest rank on the grid.
    pub fn max_rank(&self) -> Cell { (0..16).map(|pos| self.at(pos)).max().unwrap_or(0) }

    /// Face value of the highest tile.
    #[inline]
    pub fn highest_tile(&self) -> u32 { rank_value(self.max_rank()) }

    /// Count the number of empty cells.
    #[inline]
    pub fn count_empty(&self) -> u64 { count_empty(*self) }

    /// Mirror along the main diagonal.
    #[inline]
    pub fn transpose(self) -> Self { Board { tiles: transpose(self.tiles), ..self } }

    /// Mirror left-right.
    #[inline]
    pub fn reflect_horizontal(self) -> Self {
        let x = self.tiles;
        let tiles = ((x & 0x000F_000F_000F_000F) << 12)
            | ((x & 0x00F0_00F0_00F0_00F0) << 4)
            | ((x & 0x0F00_0F00_0F00_0F00) >> 4)
            | ((x & 0xF000_F000_F000_F000) >> 12);
        Board { tiles, ..self }
    }

    /// Mirror top-bottom.
    #[inline]
    pub fn reflect_vertical(self) -> Self {
        let x = self.tiles;
        let tiles = ((x & 0x0000_0000_0000_FFFF) << 48)
            | ((x & 0x0000_0000_FFFF_0000) << 16)
            | ((x & 0x0000_FFFF_0000_0000) >> 16)
            | ((x & 0xFFFF_0000_0000_0000) >> 48);
        Board { tiles, ..self }
    }

    /// Rotate clockwise by a quarter turn.
    #[inline]
    pub fn rotate_right(self) -> Self { self.transpose().reflect_horizontal() }

    /// Rotate counter-clockwise by a quarter turn.
    #[inline]
    pub fn rotate_left(self) -> Self { self.transpose().reflect_vertical() }

    #[inline]
    pub fn reverse(self) -> Self { self.reflect_horizontal().reflect_vertical() }

    /// The 8 views of the board under the symmetries of the square: the
    /// identity and three rotations, then each of those mirrored left-right.
    ///
    /// ```
    /// use threes_ntuple::engine::Board;
    /// let b = Board::from_cells([1, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]);
    /// let views = b.symmetries();
    /// assert_eq!(views[0], b);
    /// assert!(views.iter().all(|v| v.score() == b.score()));
    /// ```
    pub fn symmetries(self) -> [Board; 8] {
        let r1 = self.rotate_right();
        let r2 = self.reverse();
        let r3 = self.rotate_left();
        [
            self,
            r1,
            r2,
            r3,
            self.reflect_horizontal(),
            r1.reflect_horizontal(),
            r2.reflect_horizontal(),
            r3.reflect_horizontal(),
        ]
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({:#018x}, hint={}, bag={:?})", self.tiles, self.hint, self.bag)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "+------------------------+")?;
        for row in 0..4 {
            write!(f, "|")?;
            for col in 0..4 {
                match self.tile_value(row * 4 + col) {
                    0 => write!(f, "{:>6}", "")?,
                    v => write!(f, "{:>6}", v)?,
                }
            }
            writeln!(f, "|")?;
        }
        writeln!(f, "+------------------------+")?;
        writeln!(f, "hint: {}", rank_value(self.hint))
    }
}

/// Initialize the line tables. Safe to call multiple times; optional, since
/// the tables are also built on first use.
pub fn new() {
    let _ = stores();
}

/// Face value of a rank: 0, 1, 2, then 3, 6, 12, ...
#[inline]
pub fn rank_value(rank: Cell) -> u32 {
    match rank {
        0..=2 => u32::from(rank),
        r => 3 << (r - 3),
    }
}

/// True if no move in any direction changes the board.
pub fn is_game_over(board: Board) -> bool {
    Direction::ALL.iter().all(|&dir| board.slide(dir).is_none())
}

// https://stackoverflow.com/questions/38225571/count-number-of-zero-nibbles-in-an-unsigned-64-bit-integer
/// Count the number of zero tiles.
pub fn count_empty(board: Board) -> u64 {
    16 - count_non_empty(board.tiles)
}

// Credit to Nneonneo
pub(crate) fn transpose(x: BoardRaw) -> BoardRaw {
    let a1 = x & 0xF0F00F0FF0F00F0F;
    let a2 = x & 0x0000F0F00000F0F0;
    let a3 = x & 0x0F0F00000F0F0000;
    let a = a1 | (a2 << 12) | (a3 >> 12);
    let b1 = a & 0xFF00FF0000FF00FF;
    let b2 = a & 0x00FF00FF00000000;
    let b3 = a & 0x00000000FF00FF00;
    b1 | (b2 >> 24) | (b3 << 24)
}

pub(crate) fn extract_line(board: BoardRaw, line_idx: u64) -> Line {
    (board >> ((3 - line_idx) * 16)) & 0xffff
}

fn line_to_vec(line: Line) -> Vec<Cell> {
    (0..4).map(|idx| ((line >> ((3 - idx) * 4)) & 0xf) as Cell).collect()
}

static STORES: OnceLock<Stores> = OnceLock::new();

#[inline(always)]
fn stores() -> &'static Stores { STORES.get_or_init(create_stores) }

fn create_stores() -> Stores {
    // Allocate on the heap to avoid large stack frames
    let mut slide_left = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_right = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_up = vec![0u64; LINE_TABLE_SIZE];
    let mut slide_down = vec![0u64; LINE_TABLE_SIZE];
    let mut score = vec![0u64; LINE_TABLE_SIZE];

    for val in 0..LINE_TABLE_SIZE {
        let line = val as Line;
        slide_left[val] = slide_line(line, Direction::Left);
        slide_right[val] = slide_line(line, Direction::Right);
        slide_up[val] = slide_line(line, Direction::Up);
        slide_down[val] = slide_line(line, Direction::Down);
        score[val] = calc_score(line);
    }

    Stores {
        slide_left: slide_left.into_boxed_slice(),
        slide_right: slide_right.into_boxed_slice(),
        slide_up: slide_up.into_boxed_slice(),
        slide_down: slide_down.into_boxed_slice(),
        score: score.into_boxed_slice(),
    }
}

#[inline(always)]
fn get_line_entry(table: &[u64], idx: u16) -> u64 {
    debug_assert!((idx as usize) < LINE_TABLE_SIZE);
    unsafe { *table.get_unchecked(idx as usize) }
}

fn score_raw(board: BoardRaw) -> Score {
    let score_table = &stores().score;
    (0..4).fold(0, |acc, idx| {
        let row_val = extract_line(board, idx) as u16;
        acc + get_line_entry(score_table, row_val)
    })
}

fn slide_rows(board: BoardRaw, dir: Direction) -> BoardRaw {
    let s = stores();
    let table: &[u64] = match dir {
        Direction::Left => &s.slide_left,
        Direction::Right => &s.slide_right,
        _ => unreachable!("vertical slide routed to rows"),
    };
    (0..4).fold(0, |new_board, row_idx| {
        let row_val = extract_line(board, row_idx) as u16;
        new_board | (get_line_entry(table, row_val) << (48 - (16 * row_idx)))
    })
}

fn slide_cols(board: BoardRaw, dir: Direction) -> BoardRaw {
    let transposed = transpose(board);
    let s = stores();
    let table: &[u64] = match dir {
        Direction::Up => &s.slide_up,
        Direction::Down => &s.slide_down,
        _ => unreachable!("horizontal slide routed to columns"),
    };
    (0..4).fold(0, |new_board, col_idx| {
        let col_val = extract_line(transposed, col_idx) as u16;
        new_board | (get_line_entry(table, col_val) << (12 - (4 * col_idx)))
    })
}

fn slide_line(line: Line, dir: Direction) -> Line {
    let tiles = line_to_vec(line);
    let moved = match dir {
        Direction::Left | Direction::Up => slide_vec_left(tiles),
        Direction::Right | Direction::Down => slide_vec_right(tiles),
    };
    match dir {
        Direction::Left | Direction::Right => vec_to_row(&moved),
        Direction::Up | Direction::Down => vec_to_col(&moved),
    }
}

fn vec_to_row(tiles: &[Cell]) -> Line {
    tiles.iter().fold(0, |acc, &t| (acc << 4) | Line::from(t))
}

fn vec_to_col(tiles: &[Cell]) -> Line {
    tiles.iter().fold(0, |acc, &t| (acc << 16) | Line::from(t))
}

fn slide_vec_right(vec: Vec<Cell>) -> Vec<Cell> {
    let rev_vec: Vec<Cell> = vec.into_iter().rev().collect();
    slide_vec_left(rev_vec).into_iter().rev().collect()
}

/// One Threes! step toward index 0: the first cell that can advance moves
/// into the gap or merges, and every tile behind it follows by one cell.
fn slide_vec_left(mut vec: Vec<Cell>) -> Vec<Cell> {
    for c in 1..vec.len() {
        let (hold, tile) = (vec[c - 1], vec[c]);
        if tile == 0 {
            continue;
        }
        if hold == 0 {
            vec[c - 1] = tile;
            vec[c] = 0;
        } else if let Some(merged) = merge(hold, tile) {
            vec[c - 1] = merged;
            vec[c] = 0;
        }
    }
    vec
}

#[inline]
fn merge(hold: Cell, tile: Cell) -> Option<Cell> {
    match (hold, tile) {
        (1, 2) | (2, 1) => Some(3),
        (a, b) if a == b && a >= 3 && a < MAX_RANK => Some(a + 1),
        _ => None,
    }
}

fn calc_score(line: Line) -> Score {
    line_to_vec(line)
        .into_iter()
        .filter(|&rank| rank >= 3)
        .map(|rank| 3u64.pow(u32::from(rank) - 2))
        .sum()
}

fn count_non_empty(board: BoardRaw) -> u64 {
    let mut board_copy = board;
    board_copy |= board_copy >> 1;
    board_copy |= board_copy >> 2;
    board_copy &= 0x1111111111111111;
    board_copy.count_ones() as u64
}
