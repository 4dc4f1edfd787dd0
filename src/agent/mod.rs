//! Players and environments.
//!
//! Every agent owns a [`Properties`] map built from its defaults plus the
//! caller's `key=value` arguments, and answers boards with an [`Action`]:
//! - [`RandomSlider`]: a uniformly random legal slide.
//! - [`GreedySlider`]: the slide with the highest immediate reward.
//! - [`TdSlider`]: greedy on `reward + V(afterstate)`, learning `V` by TD(0).
//! - [`RandomPlacer`]: the environment, dropping the next tile on the board.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{ConfigError, Properties};
use crate::engine::{Board, Cell, Direction, Reward};
use crate::ntuple::NetworkError;

mod greedy;
mod learner;
mod random;

pub use greedy::GreedySlider;
pub use learner::TdSlider;
pub use random::{RandomPlacer, RandomSlider};

#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("weight network: {0}")]
    Network(#[from] NetworkError),
}

/// A move by either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Slide(Direction),
    Place { pos: usize, tile: Cell, hint: Cell },
}

impl Action {
    /// Apply to `board`; `None` if the action is illegal there. Placing earns nothing.
    pub fn apply(self, board: Board) -> Option<(Board, Reward)> {
        match self {
            Action::Slide(dir) => board.slide(dir),
            Action::Place { pos, tile, hint } => board.place(pos, tile, hint).map(|b| (b, 0)),
        }
    }
}

/// Episode lifecycle plus one decision per turn.
pub trait Agent {
    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    fn open_episode(&mut self) {}

    fn close_episode(&mut self) {}

    /// The agent's move, `None` when it has none (for a slider: game over).
    fn take_action(&mut self, board: &Board) -> Option<Action>;

    fn name(&self) -> &str { self.properties().name() }

    fn role(&self) -> &str { self.properties().role() }

    fn property(&self, key: &str) -> Option<&str> { self.properties().get(key) }

    /// Set one `key=value` pair after construction.
    fn notify(&mut self, msg: &str) -> Result<(), ConfigError> {
        self.properties_mut().notify(msg);
        Ok(())
    }
}

/// Seeded generator when `seed` is set, otherwise seeded from entropy.
fn rng_from(props: &Properties) -> Result<StdRng, ConfigError> {
    Ok(match props.seed()? {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    })
}
