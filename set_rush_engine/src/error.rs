// Error types for game setup.
//
// Normal play has no error paths: rejected sets, cancelled claims and an
// exhausted deck are all ordinary outcomes. What can fail is everything
// before the first deal: reading and validating the config, and spawning
// the player and dealer threads.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A `GameConfig` that could not be loaded or does not describe a playable
/// game.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("feature_size must be at least 2 (got {0})")]
    FeatureSizeTooSmall(usize),
    #[error("deck_size ({deck_size}) must equal feature_size^feature_count ({expected})")]
    DeckSizeMismatch { deck_size: usize, expected: usize },
    #[error("table_size ({table_size}) must hold at least one full claim of {feature_size} cards")]
    TableTooSmall {
        table_size: usize,
        feature_size: usize,
    },
    #[error("game needs at least one player")]
    NoPlayers,
    #[error("feature_size^feature_count overflows the card encoding")]
    DeckTooLarge,
}

/// Failure to start a game.
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn {thread} thread: {source}")]
    Spawn {
        thread: String,
        #[source]
        source: io::Error,
    },
    #[error("no player with id {0}")]
    UnknownPlayer(usize),
}
