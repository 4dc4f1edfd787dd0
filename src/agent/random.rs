use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::Properties;
use crate::engine::{Board, Cell, Direction};

use super::{rng_from, Action, Agent, AgentError};

/// Picks uniformly among legal slides.
pub struct RandomSlider {
    props: Properties,
    rng: StdRng,
}

impl RandomSlider {
    pub fn new(args: &str) -> Result<Self, AgentError> {
        let props = Properties::parse("name=random role=slider", args);
        let rng = rng_from(&props)?;
        Ok(Self { props, rng })
    }
}

impl Agent for RandomSlider {
    fn properties(&self) -> &Properties { &self.props }

    fn properties_mut(&mut self) -> &mut Properties { &mut self.props }

    fn take_action(&mut self, board: &Board) -> Option<Action> {
        let mut dirs = Direction::ALL;
        dirs.shuffle(&mut self.rng);
        dirs.into_iter()
            .find(|&dir| board.slide(dir).is_some())
            .map(Action::Slide)
    }
}

/// Cells where a tile may enter after a slide, indexed by opcode; the last
/// entry covers the opening placements.
const SPACES: [&[usize]; 5] = [
    &[12, 13, 14, 15],
    &[0, 4, 8, 12],
    &[0, 1, 2, 3],
    &[3, 7, 11, 15],
    &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
];

/// The environment: drops the announced tile on the edge the last slide
/// vacated and announces the next one from the bag.
pub struct RandomPlacer {
    props: Properties,
    rng: StdRng,
}

impl RandomPlacer {
    pub fn new(args: &str) -> Result<Self, AgentError> {
        let props = Properties::parse("name=place role=placer", args);
        let rng = rng_from(&props)?;
        Ok(Self { props, rng })
    }
}

impl Agent for RandomPlacer {
    fn properties(&self) -> &Properties { &self.props }

    fn properties_mut(&mut self) -> &mut Properties { &mut self.props }

    fn take_action(&mut self, after: &Board) -> Option<Action> {
        let spaces = SPACES[after.last().map_or(4, Direction::opcode)];
        let mut space = spaces.to_vec();
        space.shuffle(&mut self.rng);
        let pos = space.into_iter().find(|&pos| after.at(pos) == 0)?;

        let mut bag: Vec<Cell> = (1..=3)
            .flat_map(|t| std::iter::repeat(t).take(after.bag(t) as usize))
            .collect();
        bag.shuffle(&mut self.rng);

        let tile = match after.hint() {
            0 => draw(&mut bag, &mut self.rng),
            hint => hint,
        };
        let hint = draw(&mut bag, &mut self.rng);
        Some(Action::Place { pos, tile, hint })
    }
}

/// Pop the next tile, refilling an emptied bag with one of each.
fn draw(bag: &mut Vec<Cell>, rng: &mut StdRng) -> Cell {
    if bag.is_empty() {
        bag.extend([1, 2, 3]);
        bag.shuffle(rng);
    }
    bag.pop().unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_slider_only_plays_legal_moves() {
        let mut slider = RandomSlider::new("seed=11").unwrap();
        assert_eq!(slider.name(), "random");
        // only Left and Down move this tile
        let b = Board::from_cells([0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        for _ in 0..20 {
            let Some(Action::Slide(dir)) = slider.take_action(&b) else { panic!("expected a slide") };
            assert!(matches!(dir, Direction::Left | Direction::Down));
        }
        let blocked = Board::from_cells([1, 3, 1, 3, 3, 1, 3, 1, 1, 3, 1, 3, 3, 1, 3, 1]);
        assert_eq!(slider.take_action(&blocked), None);
    }

    #[test]
    fn placer_fills_the_vacated_edge() {
        let mut placer = RandomPlacer::new("seed=5").unwrap();
        let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 0, 0]);
        let (after, _) = b.slide(Direction::Left).unwrap();
        for _ in 0..10 {
            let Some(Action::Place { pos, .. }) = placer.take_action(&after) else { panic!("expected a placement") };
            assert!([3, 7, 11, 15].contains(&pos));
        }
    }

    #[test]
    fn placer_plays_hint_then_draws_new_one() {
        let mut placer = RandomPlacer::new("seed=1").unwrap();
        let mut board = Board::EMPTY;
        for _ in 0..9 {
            let action = placer.take_action(&board).unwrap();
            let Action::Place { tile, .. } = action else { panic!("expected a placement") };
            if board.hint() != 0 {
                assert_eq!(tile, board.hint());
            }
            board = action.apply(board).unwrap().0;
        }
        assert_eq!(board.count_empty(), 7);
        assert!((1..=3).contains(&board.hint()));
    }

    #[test]
    fn seeded_placers_agree() {
        let mut a = RandomPlacer::new("seed=42").unwrap();
        let mut b = RandomPlacer::new("seed=42").unwrap();
        assert_eq!(a.take_action(&Board::EMPTY), b.take_action(&Board::EMPTY));
    }

    #[test]
    fn bad_seed_is_rejected() {
        assert!(matches!(RandomPlacer::new("seed=-3"), Err(AgentError::Config(_))));
    }
}
