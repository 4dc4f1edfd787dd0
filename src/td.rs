//! Backward TD(0) over a finished episode.
//!
//! For a trajectory `(s_1, r_1) .. (s_n, r_n)` of afterstates and rewards:
//! - the last afterstate moves toward 0: `delta = -alpha * V(s_n)`
//! - every earlier one moves toward its successor:
//!   `delta = alpha * (r_{i+1} + V(s_{i+1}) - V(s_i))`
//!
//! Steps are visited from last to first, so each target already reflects the
//! update of its successor. Every delta goes through [`NTupleNetwork::adjust`],
//! which moves all symmetric cells together.

use tracing::{debug, info};

use crate::engine::{Board, Reward};
use crate::ntuple::NTupleNetwork;

/// One recorded move: the board right after the slide and the reward it earned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub after: Board,
    pub reward: Reward,
}

/// Afterstates of one episode in play order.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    steps: Vec<Step>,
}

impl Trajectory {
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn push(&mut self, after: Board, reward: Reward) { self.steps.push(Step { after, reward }); }

    #[inline]
    pub fn clear(&mut self) { self.steps.clear(); }

    #[inline]
    pub fn len(&self) -> usize { self.steps.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.steps.is_empty() }

    #[inline]
    pub fn steps(&self) -> &[Step] { &self.steps }
}

/// Summary of one training pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrainStats {
    /// Number of states updated.
    pub updates: usize,
    /// Mean absolute TD error over the pass.
    pub mean_abs_error: f32,
}

/// TD(0) learner with a fixed learning rate.
#[derive(Debug, Clone, Copy)]
pub struct TdTrainer {
    alpha: f32,
}

impl TdTrainer {
    pub fn new(alpha: f32) -> Self { Self { alpha } }

    #[inline]
    pub fn alpha(&self) -> f32 { self.alpha }

    /// Halve the learning rate.
    pub fn decay(&mut self) {
        let old = self.alpha;
        self.alpha /= 2.0;
        info!(from = old, to = self.alpha, "learning rate decayed");
    }

    /// Replay `steps` backward, updating `net`.
    ///
    /// An empty trajectory is a no-op; a single step only gets the terminal update.
    ///
    /// ```
    /// use threes_ntuple::engine::Board;
    /// use threes_ntuple::ntuple::{Layout, NTupleNetwork};
    /// use threes_ntuple::td::{TdTrainer, Trajectory};
    ///
    /// let mut net = NTupleNetwork::new(Layout::Isomorphic, 4).unwrap();
    /// let mut episode = Trajectory::new();
    /// episode.push(Board::from_cells([1; 16]), 0);
    /// episode.push(Board::from_cells([2; 16]), 3);
    /// let stats = TdTrainer::new(0.01).train(&mut net, episode.steps());
    /// assert_eq!(stats.updates, 2);
    /// assert!(net.value(&Board::from_cells([1; 16])) > 0.0);
    /// ```
    pub fn train(&self, net: &mut NTupleNetwork, steps: &[Step]) -> TrainStats {
        let Some(last) = steps.last() else {
            return TrainStats::default();
        };

        let error = -net.value(&last.after);
        net.adjust(&last.after, self.alpha * error);
        let mut total_abs = error.abs();

        for pair in steps.windows(2).rev() {
            let (current, next) = (&pair[0], &pair[1]);
            let error = next.reward as f32 + net.value(&next.after) - net.value(&current.after);
            net.adjust(&current.after, self.alpha * error);
            total_abs += error.abs();
        }

        let stats = TrainStats { updates: steps.len(), mean_abs_error: total_abs / steps.len() as f32 };
        debug!(updates = stats.updates, mean_abs_error = stats.mean_abs_error, "trained episode");
        stats
    }
}
