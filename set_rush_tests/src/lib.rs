// Test-only driver for end-to-end game tests.
//
// Wraps a real `GameHandle` (every thread running, real board and dealer)
// together with a `RecordingUi`, and adds synchronous polling helpers:
// wait for the board to open, find a set or a non-set on it, press keys as
// a human player, wait for a score. Nothing here reaches into engine
// internals; the game is driven exactly the way an embedding UI would.
//
// See also: `tests/full_game.rs` for the scenarios.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use set_rush_engine::board::Board;
use set_rush_engine::{
    CardId, FeatureSetFinder, GameConfig, GameHandle, GameSummary, PlayerId, RecordingUi,
    SetFinder, SlotId, UiEvent, start_game,
};

/// Default timeout for blocking poll operations.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Sleep duration between poll attempts.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// A running game plus its recorded UI traffic.
pub struct TestGame {
    pub game: GameHandle,
    pub ui: Arc<RecordingUi>,
    pub finder: FeatureSetFinder,
}

impl TestGame {
    pub fn start(config: GameConfig) -> Self {
        let finder = FeatureSetFinder::from_config(&config);
        let ui = Arc::new(RecordingUi::new());
        let game = start_game(config, ui.clone(), Arc::new(finder.clone()))
            .expect("start_game failed");
        Self { game, ui, finder }
    }

    pub fn board(&self) -> &Board {
        self.game.board()
    }

    /// Poll `check` until it returns true, panicking after `POLL_TIMEOUT`.
    pub fn wait_until(&self, what: &str, mut check: impl FnMut(&Self) -> bool) {
        let start = Instant::now();
        while !check(self) {
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Block until the dealer has dealt and opened the board.
    pub fn wait_for_open_board(&self) {
        self.wait_until("open board", |t| {
            t.board().is_open() && t.board().count_cards() > 0
        });
    }

    pub fn wait_for_score(&self, player: PlayerId, score: u32) {
        self.wait_until(&format!("{player} to reach {score}"), |t| {
            t.game.scores()[player.0] >= score
        });
    }

    pub fn wait_for_event(&self, what: &str, mut matches: impl FnMut(&UiEvent) -> bool) {
        self.wait_until(what, |t| t.ui.events().iter().any(&mut matches));
    }

    fn slots_of(&self, cards: &[CardId]) -> Vec<SlotId> {
        cards
            .iter()
            .map(|card| self.board().slot_of(*card).expect("card left the board"))
            .collect()
    }

    /// Slots of some set currently on the board, if there is one.
    pub fn find_set(&self) -> Option<Vec<SlotId>> {
        let cards = self.board().cards_on_table();
        let set = self.finder.find_sets(&cards, 1).pop()?;
        Some(self.slots_of(&set))
    }

    /// Slots of three board cards that do not form a set.
    pub fn find_non_set(&self) -> Vec<SlotId> {
        let cards = self.board().cards_on_table();
        for a in 0..cards.len() {
            for b in a + 1..cards.len() {
                for c in b + 1..cards.len() {
                    let triple = [cards[a], cards[b], cards[c]];
                    if !self.finder.test_set(&triple) {
                        return self.slots_of(&triple);
                    }
                }
            }
        }
        panic!("every triple on the board is a set");
    }

    /// Press every slot as `player`, asserting each press is accepted.
    pub fn press_all(&self, player: PlayerId, slots: &[SlotId]) {
        for slot in slots {
            let mut queued = false;
            let start = Instant::now();
            // The queue holds one claim's worth of presses; wait for the
            // player thread to drain it if needed.
            while !queued {
                queued = self
                    .game
                    .key_pressed(player, *slot)
                    .expect("unknown player");
                if !queued {
                    assert!(
                        start.elapsed() < POLL_TIMEOUT,
                        "press of {slot} by {player} never accepted"
                    );
                    thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }

    pub fn shutdown(self) -> GameSummary {
        self.game.shutdown()
    }
}

/// One human seat, no computers, fixed seed.
pub fn solo_config() -> GameConfig {
    GameConfig {
        human_players: 1,
        computer_players: 0,
        seed: Some(42),
        ..GameConfig::default()
    }
}
