// CLI entry point: runs a headless game and prints the final standings.
//
// Every seat is played by the computer (`--computer-players` overrides the
// config and zeroes the human seats, since there is no keyboard to read).
// Game events are logged through `tracing`; `RUST_LOG` takes precedence
// over `--verbose`.
//
// Usage:
//   set_rush [OPTIONS]
//     --config <PATH>           JSON game config (default: classic game)
//     --computer-players <N>    Number of computer players
//     --seed <SEED>             PRNG seed (default: clock)
//     --duration-secs <SECS>    Stop the game after this long
//     --verbose                 Log claims and timer updates

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use set_rush_engine::{FeatureSetFinder, GameConfig, GameError, TracingUi, start_game};

#[derive(Parser, Debug)]
#[command(name = "set_rush", about = "Run a headless Set Rush game")]
struct Args {
    /// JSON game config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of computer players.
    #[arg(long)]
    computer_players: Option<usize>,

    /// PRNG seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Stop the game after this many seconds.
    #[arg(long)]
    duration_secs: Option<u64>,

    /// Log claims and timer updates.
    #[arg(long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_thread_names(true)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), GameError> {
    let mut config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };
    config.human_players = 0;
    if let Some(n) = args.computer_players {
        config.computer_players = n;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let finder = Arc::new(FeatureSetFinder::from_config(&config));
    let game = start_game(config, Arc::new(TracingUi), finder)?;

    let deadline = args
        .duration_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    while !game.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("time limit reached");
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    let summary = game.shutdown();
    for (id, score) in summary.scores.iter().enumerate() {
        println!("player {id}: {score}");
    }
    let winners: Vec<String> = summary.winners.iter().map(|p| p.0.to_string()).collect();
    println!("winners: {}", winners.join(", "));
    Ok(())
}
