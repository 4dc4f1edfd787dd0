use crate::config::Properties;
use crate::engine::Board;
use crate::policy::{self, Rules};

use super::{Action, Agent, AgentError};

/// Takes the slide with the largest immediate reward; a baseline for the learner.
pub struct GreedySlider {
    props: Properties,
}

impl GreedySlider {
    pub fn new(args: &str) -> Result<Self, AgentError> {
        Ok(Self { props: Properties::parse("name=greedy role=slider", args) })
    }
}

impl Agent for GreedySlider {
    fn properties(&self) -> &Properties { &self.props }

    fn properties_mut(&mut self) -> &mut Properties { &mut self.props }

    fn take_action(&mut self, board: &Board) -> Option<Action> {
        policy::greedy_reward(&Rules, board).map(|d| Action::Slide(d.dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;

    #[test]
    fn prefers_the_merge() {
        let mut slider = GreedySlider::new("").unwrap();
        assert_eq!(slider.role(), "slider");
        // Up and Right are legal but score nothing
        let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0]);
        assert_eq!(slider.take_action(&b), Some(Action::Slide(Direction::Left)));
    }
}
