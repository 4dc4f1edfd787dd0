//! Playing full games between a slider and a placer.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{trace, warn};

use crate::agent::{Action, Agent};
use crate::engine::Board;

/// Tiles the placer drops before the first slide.
pub const OPENING_TILES: usize = 9;

/// Outcome of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeSummary {
    /// Slides played.
    pub moves: u64,
    pub score: u64,
    /// Face value of the highest tile reached.
    pub max_tile: u32,
}

/// Play one game from an empty board.
///
/// Opens both episodes, lets `placer` drop the opening tiles, then alternates
/// slider and placer until either has no action. Both episodes are closed
/// before returning, which is when a learning slider trains.
pub fn play_episode(slider: &mut dyn Agent, placer: &mut dyn Agent) -> EpisodeSummary {
    slider.open_episode();
    placer.open_episode();

    let mut board = Board::EMPTY;
    let mut moves = 0;
    let mut opening = true;
    for _ in 0..OPENING_TILES {
        match step(placer, &board) {
            Some(next) => board = next,
            None => {
                opening = false;
                break;
            }
        }
    }

    while opening {
        let Some(next) = step(slider, &board) else { break };
        board = next;
        moves += 1;
        let Some(next) = step(placer, &board) else { break };
        board = next;
    }

    slider.close_episode();
    placer.close_episode();

    let summary = EpisodeSummary { moves, score: board.score(), max_tile: board.highest_tile() };
    trace!(moves = summary.moves, score = summary.score, max_tile = summary.max_tile, "episode over");
    summary
}

/// Ask `agent` for an action and apply it; `None` ends the game.
fn step(agent: &mut dyn Agent, board: &Board) -> Option<Board> {
    let action: Action = agent.take_action(board)?;
    match action.apply(*board) {
        Some((next, _)) => Some(next),
        None => {
            warn!(agent = agent.name(), ?action, "illegal action ends the episode");
            None
        }
    }
}

/// Running statistics over a block of episodes.
#[derive(Debug, Clone, Default)]
pub struct BlockStats {
    episodes: u64,
    moves: u64,
    total_score: u64,
    max_score: u64,
    /// Episodes per highest tile reached.
    tiles: BTreeMap<u32, u64>,
}

impl BlockStats {
    pub fn new() -> Self { Self::default() }

    pub fn record(&mut self, summary: &EpisodeSummary) {
        self.episodes += 1;
        self.moves += summary.moves;
        self.total_score += summary.score;
        self.max_score = self.max_score.max(summary.score);
        *self.tiles.entry(summary.max_tile).or_default() += 1;
    }

    #[inline]
    pub fn episodes(&self) -> u64 { self.episodes }

    #[inline]
    pub fn max_score(&self) -> u64 { self.max_score }

    pub fn mean_score(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        self.total_score as f64 / self.episodes as f64
    }

    pub fn mean_moves(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        self.moves as f64 / self.episodes as f64
    }

    /// For each highest tile seen, the fraction of episodes that reached at
    /// least that tile, ascending by tile.
    pub fn reach_rates(&self) -> Vec<(u32, f64)> {
        let mut remaining = self.episodes;
        self.tiles
            .iter()
            .map(|(&tile, &count)| {
                let rate = remaining as f64 / self.episodes as f64;
                remaining -= count;
                (tile, rate)
            })
            .collect()
    }

    pub fn clear(&mut self) { *self = Self::default(); }
}

impl fmt::Display for BlockStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mean = {:.1}\tmax = {}\tmoves = {:.1}", self.mean_score(), self.max_score, self.mean_moves())?;
        let mut remaining = self.episodes;
        for (&tile, &count) in &self.tiles {
            let reach = 100.0 * remaining as f64 / self.episodes as f64;
            let only = 100.0 * count as f64 / self.episodes as f64;
            writeln!(f, "\t{}\t{:.1}%\t({:.1}%)", tile, reach, only)?;
            remaining -= count;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{GreedySlider, RandomPlacer, RandomSlider, TdSlider};
    use crate::config::Properties;

    fn summary(score: u64, max_tile: u32) -> EpisodeSummary { EpisodeSummary { moves: 10, score, max_tile } }

    #[test]
    fn block_stats() {
        let mut stats = BlockStats::new();
        assert_eq!(stats.mean_score(), 0.0);
        assert!(stats.reach_rates().is_empty());
        stats.record(&summary(30, 24));
        stats.record(&summary(90, 48));
        stats.record(&summary(60, 48));
        stats.record(&summary(0, 12));
        assert_eq!(stats.episodes(), 4);
        assert_eq!(stats.max_score(), 90);
        assert_eq!(stats.mean_score(), 45.0);
        assert_eq!(stats.mean_moves(), 10.0);
        assert_eq!(stats.reach_rates(), vec![(12, 1.0), (24, 0.75), (48, 0.5)]);
        assert!(stats.to_string().contains("48\t50.0%\t(50.0%)"));
        stats.clear();
        assert_eq!(stats.episodes(), 0);
    }

    /// Random slider that remembers the last board it was shown.
    struct Watched {
        inner: RandomSlider,
        last: Board,
    }

    impl Agent for Watched {
        fn properties(&self) -> &Properties { self.inner.properties() }
        fn properties_mut(&mut self) -> &mut Properties { self.inner.properties_mut() }
        fn take_action(&mut self, board: &Board) -> Option<Action> {
            self.last = *board;
            self.inner.take_action(board)
        }
    }

    #[test]
    fn games_end_on_a_full_blocked_board() {
        let mut slider = Watched { inner: RandomSlider::new("seed=3").unwrap(), last: Board::EMPTY };
        let mut placer = RandomPlacer::new("seed=4").unwrap();
        for _ in 0..5 {
            let s = play_episode(&mut slider, &mut placer);
            assert!(s.moves > 0);
            assert!(s.max_tile >= 3);
            assert!(slider.last.is_game_over());
            assert_eq!(slider.last.count_empty(), 0);
            assert_eq!(slider.last.highest_tile(), s.max_tile);
        }
    }

    #[test]
    fn seeded_games_repeat() {
        let run = || {
            let mut slider = GreedySlider::new("").unwrap();
            let mut placer = RandomPlacer::new("seed=99").unwrap();
            play_episode(&mut slider, &mut placer)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn learner_trains_during_play() {
        let mut slider = TdSlider::new("ranks=8 alpha=0.1").unwrap();
        let mut placer = RandomPlacer::new("seed=7").unwrap();
        let s = play_episode(&mut slider, &mut placer);
        assert_eq!(slider.trajectory().len() as u64, s.moves);
        assert_eq!(slider.last_stats().updates as u64, s.moves);
        assert!(slider.network().tables().iter().any(|t| t.as_slice().iter().any(|&w| w != 0.0)));
    }

    struct Stuck(Properties);

    impl Agent for Stuck {
        fn properties(&self) -> &Properties { &self.0 }
        fn properties_mut(&mut self) -> &mut Properties { &mut self.0 }
        fn take_action(&mut self, _board: &Board) -> Option<Action> { None }
    }

    #[test]
    fn placer_without_action_ends_the_opening() {
        let mut slider = RandomSlider::new("seed=1").unwrap();
        let mut placer = Stuck(Properties::parse("name=stuck role=placer", ""));
        let s = play_episode(&mut slider, &mut placer);
        assert_eq!(s, EpisodeSummary { moves: 0, score: 0, max_tile: 0 });
    }
}
