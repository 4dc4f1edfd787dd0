use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{ConfigError, LearnerConfig, Properties};
use crate::engine::Board;
use crate::ntuple::NTupleNetwork;
use crate::policy::{self, Decision, MoveOracle, Rules};
use crate::td::{TdTrainer, TrainStats, Trajectory};
use crate::weights::WeightTable;

use super::{Action, Agent, AgentError};

/// Greedy slider over an n-tuple value function, trained by TD(0) at the end
/// of every episode.
///
/// Recognized properties: `alpha`, `ranks`, `layout`, `init`, `load`, `save`.
pub struct TdSlider {
    props: Properties,
    net: NTupleNetwork,
    trainer: TdTrainer,
    episode: Trajectory,
    last_stats: TrainStats,
}

impl TdSlider {
    /// Build the network, then apply `init` sizes and `load` in that order.
    pub fn new(args: &str) -> Result<Self, AgentError> {
        let props = Properties::parse("name=learner role=slider", args);
        let cfg = LearnerConfig::from_properties(&props)?;

        let mut net = NTupleNetwork::new(cfg.layout, cfg.ranks)?;
        if let Some(sizes) = &cfg.init {
            net.set_tables(sizes.iter().map(|&len| WeightTable::new(len)).collect())?;
        }
        if let Some(path) = &cfg.load {
            net.load(path)?;
        }
        info!(
            layout = ?net.layout(),
            ranks = net.ranks(),
            tables = net.tables().len(),
            alpha = cfg.alpha,
            "learner ready"
        );

        Ok(Self {
            props,
            net,
            trainer: TdTrainer::new(cfg.alpha),
            episode: Trajectory::new(),
            last_stats: TrainStats::default(),
        })
    }

    /// Choose a slide with `oracle` and record its afterstate.
    ///
    /// Nothing is recorded when no slide is legal.
    pub fn decide_with<O: MoveOracle + ?Sized>(&mut self, oracle: &O, board: &Board) -> Option<Decision> {
        let d = policy::greedy(oracle, board, &self.net)?;
        self.episode.push(d.after, d.reward);
        Some(d)
    }

    #[inline]
    pub fn network(&self) -> &NTupleNetwork { &self.net }

    #[inline]
    pub fn trajectory(&self) -> &Trajectory { &self.episode }

    #[inline]
    pub fn alpha(&self) -> f32 { self.trainer.alpha() }

    /// Statistics of the most recent `close_episode`.
    #[inline]
    pub fn last_stats(&self) -> TrainStats { self.last_stats }

    /// Halve the learning rate.
    pub fn decay_rate(&mut self) { self.trainer.decay(); }

    /// Write the weights to `save`, if set. Returns the path written.
    pub fn save_weights(&self) -> Result<Option<PathBuf>, AgentError> {
        let Some(path) = self.props.get("save").map(PathBuf::from) else {
            debug!("no save path, weights not written");
            return Ok(None);
        };
        self.net.save(&path)?;
        Ok(Some(path))
    }

    /// Consume the agent, saving its weights if configured.
    pub fn finish(self) -> Result<Option<PathBuf>, AgentError> { self.save_weights() }
}

impl Agent for TdSlider {
    fn properties(&self) -> &Properties { &self.props }

    fn properties_mut(&mut self) -> &mut Properties { &mut self.props }

    fn open_episode(&mut self) { self.episode.clear(); }

    fn close_episode(&mut self) {
        self.last_stats = self.trainer.train(&mut self.net, self.episode.steps());
    }

    fn take_action(&mut self, board: &Board) -> Option<Action> {
        self.decide_with(&Rules, board).map(|d| Action::Slide(d.dir))
    }

    /// Also re-reads `alpha`; other learner keys only take effect at construction.
    /// A rejected value leaves both the properties and the trainer untouched.
    fn notify(&mut self, msg: &str) -> Result<(), ConfigError> {
        let mut next = self.props.clone();
        next.notify(msg);
        if msg.split_once('=').map_or(msg, |(key, _)| key) == "alpha" {
            let cfg = LearnerConfig::from_properties(&next)?;
            self.trainer = TdTrainer::new(cfg.alpha);
        }
        self.props = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Direction;
    use crate::ntuple::NetworkError;
    use crate::policy::tests::Scripted;
    use tempfile::NamedTempFile;

    fn all_zero(net: &NTupleNetwork) -> bool {
        net.tables().iter().all(|t| t.as_slice().iter().all(|&w| w == 0.0))
    }

    #[test]
    fn defaults() {
        let slider = TdSlider::new("ranks=4").unwrap();
        assert_eq!(slider.name(), "learner");
        assert_eq!(slider.role(), "slider");
        assert_eq!(slider.alpha(), 0.01);
        assert_eq!(slider.network().tables().len(), 4);
        assert!(slider.trajectory().is_empty());
    }

    #[test]
    fn scripted_episode_trains_nothing_from_zero() {
        let mut slider = TdSlider::new("ranks=4").unwrap();
        slider.open_episode();

        let after = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3]);
        let oracle = Scripted([None, None, Some((after, 4)), None]);
        let d = slider.decide_with(&oracle, &Board::EMPTY).unwrap();
        assert_eq!(d.dir, Direction::Down);
        assert_eq!(d.score, 4.0);

        assert_eq!(slider.decide_with(&Scripted([None; 4]), &after), None);
        assert_eq!(slider.trajectory().len(), 1);

        // one terminal update toward 0 from 0 changes nothing
        slider.close_episode();
        assert_eq!(slider.last_stats().updates, 1);
        assert!(all_zero(slider.network()));

        slider.open_episode();
        assert!(slider.trajectory().is_empty());
    }

    #[test]
    fn real_rules_record_each_move() {
        let mut slider = TdSlider::new("ranks=4 alpha=0.1").unwrap();
        let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0]);
        slider.open_episode();
        assert_eq!(slider.take_action(&b), Some(Action::Slide(Direction::Left)));
        assert_eq!(slider.trajectory().steps()[0].reward, 3);
    }

    #[test]
    fn notify_updates_alpha() {
        let mut slider = TdSlider::new("ranks=4").unwrap();
        slider.notify("alpha=0.5").unwrap();
        assert_eq!(slider.alpha(), 0.5);
        assert!(slider.notify("alpha=zero").is_err());
        assert!(slider.notify("alpha=-1").is_err());
        // a rejected value is not stored
        assert_eq!(slider.property("alpha"), Some("0.5"));
        assert_eq!(slider.alpha(), 0.5);
        assert!(LearnerConfig::from_properties(slider.properties()).is_ok());
        slider.notify("note=kept").unwrap();
        assert_eq!(slider.property("note"), Some("kept"));
        slider.decay_rate();
        assert_eq!(slider.alpha(), 0.25);
    }

    #[test]
    fn explicit_learner_stays_symmetric() {
        let mut slider = TdSlider::new("ranks=4 layout=explicit alpha=0.1").unwrap();
        assert_eq!(slider.network().tables().len(), 32);
        let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0]);
        slider.open_episode();
        slider.take_action(&b).unwrap();
        slider.take_action(&b).unwrap();
        slider.close_episode();

        let after = slider.trajectory().steps()[0].after;
        let v = slider.network().value(&after);
        assert!(v > 0.0);
        for view in after.symmetries() {
            assert!((slider.network().value(&view) - v).abs() < 1e-4);
        }
    }

    #[test]
    fn init_must_fit_the_layout() {
        assert!(TdSlider::new("ranks=4 init=4096,4096,4096,4096").is_ok());
        assert!(matches!(
            TdSlider::new("ranks=4 init=4096,4096"),
            Err(AgentError::Network(NetworkError::TableCount { expected: 4, found: 2 }))
        ));
        assert!(matches!(
            TdSlider::new("ranks=4 init=4096,4096,4096,10"),
            Err(AgentError::Network(NetworkError::TableSize { .. }))
        ));
        assert!(matches!(TdSlider::new("init=none"), Err(AgentError::Config(_))));
    }

    #[test]
    fn save_then_load() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().display().to_string();

        let mut slider = TdSlider::new(&format!("ranks=4 save={}", path)).unwrap();
        slider.open_episode();
        let b = Board::from_cells([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 2, 0, 0]);
        // the second merge's reward flows back into the first afterstate
        slider.take_action(&b).unwrap();
        slider.take_action(&b).unwrap();
        slider.close_episode();
        assert!(!all_zero(slider.network()));

        let probe = slider.trajectory().steps()[0].after;
        let expected = slider.network().value(&probe);
        assert_eq!(slider.finish().unwrap(), Some(file.path().to_path_buf()));

        let restored = TdSlider::new(&format!("ranks=4 load={}", path)).unwrap();
        assert_eq!(restored.network().value(&probe), expected);
        assert_eq!(restored.save_weights().unwrap(), None);
    }

    #[test]
    fn missing_weights_fail() {
        assert!(matches!(
            TdSlider::new("ranks=4 load=/nonexistent/weights.bin"),
            Err(AgentError::Network(NetworkError::Weights(_)))
        ));
    }
}
