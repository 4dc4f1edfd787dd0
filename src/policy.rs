//! One-ply afterstate selection.
//!
//! Directions are tried in opcode order (`Up`, `Right`, `Down`, `Left`); the
//! first direction with the strictly highest score wins, so ties go to the
//! lower opcode.

use crate::engine::{Board, Direction, Reward};
use crate::ntuple::NTupleNetwork;

/// Answers what a slide does to a board.
pub trait MoveOracle {
    /// The afterstate and reward of sliding `board` toward `dir`, `None` if illegal.
    fn slide(&self, board: &Board, dir: Direction) -> Option<(Board, Reward)>;
}

/// The game's own slide rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rules;

impl MoveOracle for Rules {
    #[inline]
    fn slide(&self, board: &Board, dir: Direction) -> Option<(Board, Reward)> { board.slide(dir) }
}

/// The chosen slide with its afterstate, reward and score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub dir: Direction,
    pub after: Board,
    pub reward: Reward,
    pub score: f32,
}

/// Pick the legal slide maximizing `score(afterstate, reward)`.
///
/// Returns `None` when every direction is illegal.
pub fn best_afterstate<O, F>(oracle: &O, board: &Board, mut score: F) -> Option<Decision>
where
    O: MoveOracle + ?Sized,
    F: FnMut(&Board, Reward) -> f32,
{
    let mut best: Option<Decision> = None;
    for dir in Direction::ALL {
        let Some((after, reward)) = oracle.slide(board, dir) else {
            continue;
        };
        let s = score(&after, reward);
        if best.map_or(true, |b| s > b.score) {
            best = Some(Decision { dir, after, reward, score: s });
        }
    }
    best
}

/// Maximize `reward + V(afterstate)`.
///
/// ```
/// use threes_ntuple::engine::{Board, Direction};
/// use threes_ntuple::ntuple::{Layout, NTupleNetwork};
/// use threes_ntuple::policy::{greedy, Rules};
///
/// let net = NTupleNetwork::new(Layout::Isomorphic, 4).unwrap();
/// let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0]);
/// // only the horizontal merge scores; Up is legal too but earns nothing
/// let d = greedy(&Rules, &b, &net).unwrap();
/// assert_eq!(d.dir, Direction::Left);
/// assert_eq!(d.reward, 3);
/// ```
pub fn greedy<O: MoveOracle + ?Sized>(oracle: &O, board: &Board, net: &NTupleNetwork) -> Option<Decision> {
    best_afterstate(oracle, board, |after, reward| reward as f32 + net.value(after))
}

/// Maximize the immediate reward only.
pub fn greedy_reward<O: MoveOracle + ?Sized>(oracle: &O, board: &Board) -> Option<Decision> {
    best_afterstate(oracle, board, |_, reward| reward as f32)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ntuple::Layout;

    /// Oracle with a fixed outcome per direction.
    pub(crate) struct Scripted(pub [Option<(Board, Reward)>; 4]);

    impl MoveOracle for Scripted {
        fn slide(&self, _board: &Board, dir: Direction) -> Option<(Board, Reward)> { self.0[dir.opcode()] }
    }

    fn b(rank: u8) -> Board { Board::from_cells([rank; 16]) }

    #[test]
    fn ties_keep_the_lower_direction() {
        let oracle = Scripted([None, Some((b(1), 3)), Some((b(2), 3)), Some((b(3), 3))]);
        let net = NTupleNetwork::new(Layout::Isomorphic, 4).unwrap();
        let d = greedy(&oracle, &Board::EMPTY, &net).unwrap();
        assert_eq!(d.dir, Direction::Right);
        assert_eq!(d.after, b(1));
    }

    #[test]
    fn value_can_outweigh_reward() {
        let oracle = Scripted([Some((b(1), 6)), None, Some((b(2), 3)), None]);
        let mut net = NTupleNetwork::new(Layout::Isomorphic, 4).unwrap();
        assert_eq!(greedy(&oracle, &Board::EMPTY, &net).unwrap().dir, Direction::Up);
        net.adjust(&b(2), 0.25);
        let d = greedy(&oracle, &Board::EMPTY, &net).unwrap();
        assert_eq!(d.dir, Direction::Down);
        assert_eq!(d.score, 3.0 + net.value(&b(2)));
        // reward-only selection ignores the network
        assert_eq!(greedy_reward(&oracle, &Board::EMPTY).unwrap().dir, Direction::Up);
    }

    #[test]
    fn no_legal_move() {
        let oracle = Scripted([None; 4]);
        assert_eq!(greedy_reward(&oracle, &Board::EMPTY), None);
        let blocked = Board::from_cells([1, 3, 1, 3, 3, 1, 3, 1, 1, 3, 1, 3, 3, 1, 3, 1]);
        assert_eq!(greedy_reward(&Rules, &blocked), None);
    }
}
