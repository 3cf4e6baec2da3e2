// set_rush_engine: real-time multiplayer Set-style card game engine.
//
// Several player threads (human input or random computer input) race to
// claim groups of cards on a shared board; one dealer thread validates the
// claims in submission order, scores them, runs the round timer and
// reshuffles. Rendering, key capture and the matching rule sit behind small
// traits so the engine runs headless.
//
// Module overview:
// - `types.rs`:      `CardId`, `SlotId`, `PlayerId`, `Ticket` newtypes.
// - `error.rs`:      `ConfigError` and `GameError` (setup failures only).
// - `config.rs`:     `GameConfig` (serde/JSON) and the derived `TimerMode`.
// - `set_finder.rs`: `SetFinder` trait and the standard feature rule.
// - `ui.rs`:         `UiSink` trait plus tracing, recording and null sinks.
// - `mailbox.rs`:    FIFO of submitted claims with cancel-in-place.
// - `input.rs`:      Bounded per-player input queue and the start gate.
// - `board.rs`:      The shared board. Single lock for cards, tokens, the
//                    mailbox and claim resolution.
// - `player.rs`:     Player seats, the player loop and computer input.
// - `timer.rs`:      Round timer polled by the dealer.
// - `dealer.rs`:     Round lifecycle, validation, scoring, shutdown.
// - `game.rs`:       `start_game` and `GameHandle`.
//
// The CLI (`main.rs`) runs a game of computer players from a JSON config.

pub mod board;
pub mod config;
pub mod dealer;
pub mod error;
pub mod game;
pub mod input;
pub mod mailbox;
pub mod player;
pub mod set_finder;
pub mod timer;
pub mod types;
pub mod ui;

pub use set_rush_prng as prng;

pub use config::GameConfig;
pub use dealer::GameSummary;
pub use error::{ConfigError, GameError};
pub use game::{GameHandle, start_game};
pub use set_finder::{FeatureSetFinder, SetFinder};
pub use types::{CardId, PlayerId, SlotId};
pub use ui::{NullUi, RecordingUi, TracingUi, UiEvent, UiSink};
