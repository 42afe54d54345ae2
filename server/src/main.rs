use std::path::PathBuf;

use bevy::app::AppExit;
use clap::Parser;
use server::config::{load_tuning, SessionTuning};
use server::init::{self, SessionConfig};
use shared::constants::DEFAULT_SEED;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Drift current speed, clamped to [0, 2]
    #[arg(short, long)]
    drift_speed: Option<f32>,

    /// Stop after this many ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// RON file with raft, coupling and drift tuning
    #[arg(long)]
    tuning: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    no_shark: bool,

    /// Drive the player with a scripted input loop
    #[arg(short, long, default_value_t = false)]
    autopilot: bool,

    /// Follow the wavy channel instead of free wandering
    #[arg(long, default_value_t = false)]
    channel: bool,

    #[arg(long, default_value_t = 0)]
    reefs: usize,

    /// Periodic raft physics report
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> AppExit {
    let args = Args::parse();

    let mut tuning = match &args.tuning {
        Some(path) => match load_tuning(path) {
            Ok(tuning) => tuning,
            Err(err) => {
                eprintln!("Error: could not load tuning {}: {err}", path.display());
                std::process::exit(1);
            }
        },
        None => SessionTuning::default(),
    };
    if let Some(speed) = args.drift_speed {
        tuning.drift.speed = speed;
    }
    tuning.drift.follow_channel |= args.channel;
    tuning.raft.debug |= args.debug;

    init::init(SessionConfig {
        seed: args.seed,
        tick_limit: args.ticks,
        tuning,
        shark: !args.no_shark,
        autopilot: args.autopilot,
        reefs: args.reefs,
        log: true,
    })
}
