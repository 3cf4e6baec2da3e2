// Data-driven game configuration.
//
// Every tunable of a game lives in `GameConfig`, loaded from JSON at
// startup (missing fields fall back to the classic game in `Default`). The
// engine never hard-codes table geometry, deck size or timings; it reads
// them from here.
//
// `turn_timeout_millis` selects the round timer mode (see `TimerMode`):
// positive values run a countdown that forces a reshuffle, zero shows the
// elapsed time without ever forcing a reshuffle, and negative values run
// with no timer at all. In the two non-countdown modes the dealer never
// leaves a board without a findable set on it.
//
// Seats are laid out humans first: ids `0..human_players` are human, the
// rest are computer players.
//
// See also: `timer.rs` for the timer modes, `game.rs` which validates the
// config before spawning any thread.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::PlayerId;

/// Who produces a seat's input events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    /// Input arrives through `GameHandle::key_pressed`.
    Human,
    /// Input is generated by a helper thread owned by the player.
    Computer,
}

/// Round timer mode, derived from `turn_timeout_millis`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerMode {
    /// Reshuffle when `timeout` runs out; the display switches to its
    /// warning state once less than `warning` remains.
    Countdown { timeout: Duration, warning: Duration },
    /// Show time since the last deal. Rounds never time out.
    Elapsed,
    /// No timer display and no timeout.
    Disabled,
}

impl TimerMode {
    /// True when a board with no set on it must be redealt rather than
    /// waited out. Only a countdown guarantees the round ends by itself.
    pub fn requires_visible_set(self) -> bool {
        !matches!(self, TimerMode::Countdown { .. })
    }
}

/// Top-level game configuration. Loaded once, never mutated during a game.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Number of board slots.
    pub table_size: usize,

    /// Number of distinct cards. Must equal `feature_size ^ feature_count`.
    pub deck_size: usize,

    /// Values per feature, which is also the number of cards (and tokens)
    /// in one claim.
    pub feature_size: usize,

    /// Features per card.
    pub feature_count: usize,

    /// >0: countdown per round. 0: elapsed display. <0: no timer.
    pub turn_timeout_millis: i64,

    /// Remaining countdown below which the display warns and the dealer
    /// polls at its fine granularity.
    pub turn_timeout_warning_millis: u64,

    /// Freeze applied to a player after a point.
    pub point_freeze_millis: u64,

    /// Freeze applied to a player after a rejected claim.
    pub penalty_freeze_millis: u64,

    /// Artificial latency of every card placement and removal.
    pub table_delay_millis: u64,

    /// Number of human seats (ids `0..human_players`).
    pub human_players: usize,

    /// Number of computer seats, following the human ones.
    pub computer_players: usize,

    /// Display names by seat id. Missing entries get a generated name.
    pub player_names: Vec<String>,

    /// Log every set on the board after each deal.
    pub hints: bool,

    /// PRNG seed for shuffles and computer input. `None` seeds from the
    /// clock.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            table_size: 12,
            deck_size: 81,
            feature_size: 3,
            feature_count: 4,
            turn_timeout_millis: 60_000,
            turn_timeout_warning_millis: 5_000,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            table_delay_millis: 0,
            human_players: 0,
            computer_players: 2,
            player_names: Vec::new(),
            hints: false,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Parse a config from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that the config describes a playable game.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_size < 2 {
            return Err(ConfigError::FeatureSizeTooSmall(self.feature_size));
        }
        let expected = u32::try_from(self.feature_count)
            .ok()
            .and_then(|count| self.feature_size.checked_pow(count))
            .ok_or(ConfigError::DeckTooLarge)?;
        if self.deck_size != expected {
            return Err(ConfigError::DeckSizeMismatch {
                deck_size: self.deck_size,
                expected,
            });
        }
        if self.table_size < self.feature_size {
            return Err(ConfigError::TableTooSmall {
                table_size: self.table_size,
                feature_size: self.feature_size,
            });
        }
        if self.player_count() == 0 {
            return Err(ConfigError::NoPlayers);
        }
        Ok(())
    }

    pub fn player_count(&self) -> usize {
        self.human_players + self.computer_players
    }

    pub fn player_kind(&self, id: PlayerId) -> PlayerKind {
        if id.0 < self.human_players {
            PlayerKind::Human
        } else {
            PlayerKind::Computer
        }
    }

    /// Display name for a seat: the configured one, else "Player N"
    /// (1-based) for humans and "Computer N" for computer seats.
    pub fn player_name(&self, id: PlayerId) -> String {
        if let Some(name) = self.player_names.get(id.0) {
            return name.clone();
        }
        match self.player_kind(id) {
            PlayerKind::Human => format!("Player {}", id.0 + 1),
            PlayerKind::Computer => format!("Computer {}", id.0 + 1),
        }
    }

    pub fn timer_mode(&self) -> TimerMode {
        match self.turn_timeout_millis {
            t if t > 0 => TimerMode::Countdown {
                timeout: Duration::from_millis(t as u64),
                warning: Duration::from_millis(self.turn_timeout_warning_millis),
            },
            0 => TimerMode::Elapsed,
            _ => TimerMode::Disabled,
        }
    }

    pub fn table_delay(&self) -> Duration {
        Duration::from_millis(self.table_delay_millis)
    }

    pub fn point_freeze(&self) -> Duration {
        Duration::from_millis(self.point_freeze_millis)
    }

    pub fn penalty_freeze(&self) -> Duration {
        Duration::from_millis(self.penalty_freeze_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_the_classic_game() {
        let config = GameConfig::default();
        config.validate().unwrap();
        assert_eq!(config.deck_size, 81);
        assert_eq!(config.table_size, 12);
        assert_eq!(
            config.timer_mode(),
            TimerMode::Countdown {
                timeout: Duration::from_secs(60),
                warning: Duration::from_secs(5),
            }
        );
    }

    #[test]
    fn default_config_serializes() {
        let config = GameConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = GameConfig::from_json_str(&json).unwrap();
        assert_eq!(config.deck_size, restored.deck_size);
        assert_eq!(config.turn_timeout_millis, restored.turn_timeout_millis);
        assert_eq!(config.seed, restored.seed);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = GameConfig::from_json_str(
            r#"{
                "turn_timeout_millis": -1,
                "human_players": 1,
                "computer_players": 1,
                "player_names": ["Alice"],
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(config.table_size, 12);
        assert_eq!(config.timer_mode(), TimerMode::Disabled);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.player_name(PlayerId(0)), "Alice");
        assert_eq!(config.player_name(PlayerId(1)), "Computer 2");
        assert_eq!(config.player_kind(PlayerId(0)), PlayerKind::Human);
        assert_eq!(config.player_kind(PlayerId(1)), PlayerKind::Computer);
    }

    #[test]
    fn zero_timeout_is_elapsed_mode() {
        let config = GameConfig {
            turn_timeout_millis: 0,
            ..GameConfig::default()
        };
        assert_eq!(config.timer_mode(), TimerMode::Elapsed);
        assert!(config.timer_mode().requires_visible_set());
        assert!(!GameConfig::default().timer_mode().requires_visible_set());
    }

    #[test]
    fn deck_size_must_match_features() {
        let config = GameConfig {
            deck_size: 80,
            ..GameConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DeckSizeMismatch {
                deck_size: 80,
                expected: 81
            })
        ));
    }

    #[test]
    fn rejects_tiny_table_and_empty_game() {
        let tiny = GameConfig {
            table_size: 2,
            ..GameConfig::default()
        };
        assert!(matches!(tiny.validate(), Err(ConfigError::TableTooSmall { .. })));

        let empty = GameConfig {
            computer_players: 0,
            ..GameConfig::default()
        };
        assert!(matches!(empty.validate(), Err(ConfigError::NoPlayers)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            GameConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
