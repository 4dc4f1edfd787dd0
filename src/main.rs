use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::prelude::*;

use threes_ntuple::agent::{Agent, RandomPlacer, TdSlider};
use threes_ntuple::engine as GameEngine;
use threes_ntuple::episode::{play_episode, BlockStats};

#[derive(Debug, Parser)]
#[command(name = "threes-ntuple", about = "Train an n-tuple TD(0) player for Threes!")]
struct Args {
    /// Episodes to play
    #[arg(long, default_value_t = 1000)]
    total: u64,

    /// Episodes per statistics block
    #[arg(long, default_value_t = 1000)]
    block: u64,

    /// Learner properties, e.g. "alpha=0.01 load=w.bin save=w.bin"
    #[arg(long, default_value = "")]
    slide: String,

    /// Placer properties, e.g. "seed=42"
    #[arg(long, default_value = "")]
    place: String,

    /// Halve the learning rate every N episodes
    #[arg(long)]
    decay_every: Option<u64>,

    /// Suppress the progress bar and block statistics
    #[arg(long)]
    quiet: bool,

    /// Increase log verbosity (-v = INFO, -vv = DEBUG, -vvv = TRACE)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(level)
        .init();

    GameEngine::new();
    let mut slider = TdSlider::new(&args.slide).context("configuring the slider")?;
    let mut placer = RandomPlacer::new(&args.place).context("configuring the placer")?;
    info!(slider = slider.name(), placer = placer.name(), total = args.total, "training");

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(args.total);
        pb.set_style(
            ProgressStyle::with_template("{spinner} {elapsed_precise} [{bar:40}] {pos}/{len} | {msg}")?
                .progress_chars("=> "),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    let start = Instant::now();
    let block = args.block.max(1);
    let mut stats = BlockStats::new();
    for episode in 1..=args.total {
        let summary = play_episode(&mut slider, &mut placer);
        stats.record(&summary);
        pb.inc(1);

        if episode % block == 0 || episode == args.total {
            pb.set_message(format!("mean: {:.1} | max: {}", stats.mean_score(), stats.max_score()));
            if !args.quiet {
                pb.println(format!("{}\t{}", episode, stats));
            }
            info!(episode, mean = stats.mean_score(), max = stats.max_score(), "block done");
            stats.clear();
        }
        if let Some(every) = args.decay_every.filter(|&n| n > 0) {
            if episode % every == 0 {
                slider.decay_rate();
            }
        }
    }
    pb.finish_and_clear();

    let elapsed = start.elapsed().as_secs_f64().max(1e-6);
    info!(episodes = args.total, per_sec = args.total as f64 / elapsed, "training finished");

    if let Some(path) = slider.finish().context("saving weights")? {
        if !args.quiet {
            println!("Saved weights to {}", path.display());
        }
    }
    Ok(())
}
