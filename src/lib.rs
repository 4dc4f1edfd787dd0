//! threes-ntuple: an n-tuple network TD(0) learner for Threes!
//!
//! This crate provides:
//! - A packed `Board` with table-driven slides, tile placement and the 8 board symmetries (`engine`)
//! - An n-tuple value function over 6-cell patterns with two table layouts (`ntuple`)
//! - Backward TD(0) training over finished episodes (`td`)
//! - Greedy afterstate selection behind a pluggable move oracle (`policy`)
//! - Sliders, the tile placer and their `key=value` configuration (`agent`, `config`)
//! - A little-endian weight file format (`weights`) and an episode runner (`episode`)
//!
//! Quick start:
//! ```
//! use threes_ntuple::agent::{RandomPlacer, TdSlider};
//! use threes_ntuple::episode::play_episode;
//!
//! let mut slider = TdSlider::new("ranks=6 alpha=0.1").unwrap();
//! let mut placer = RandomPlacer::new("seed=42").unwrap();
//! let summary = play_episode(&mut slider, &mut placer);
//! assert!(summary.moves > 0);
//! assert_eq!(slider.trajectory().len() as u64, summary.moves);
//! ```
//!
pub mod agent;
pub mod config;
pub mod engine;
pub mod episode;
pub mod ntuple;
pub mod policy;
pub mod td;
pub mod weights;
