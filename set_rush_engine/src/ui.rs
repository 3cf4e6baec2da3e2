// Render sink: everything the engine wants shown to the players.
//
// The engine calls these methods synchronously, fire-and-forget, from the
// board (card and token changes), the players (freeze countdown) and the
// dealer (scores, timer, winners). Implementations must be fast and must not
// call back into the engine: several of the calls are made while the board
// lock is held.
//
// Three sinks ship with the crate:
// - `TracingUi`: emits every call as a `tracing` event. The CLI uses it.
// - `RecordingUi`: appends every call to an in-memory log as a `UiEvent`.
//   Tests assert against the log.
// - `NullUi`: drops everything.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, trace};

use crate::types::{CardId, PlayerId, SlotId};

/// Display surface driven by the engine.
pub trait UiSink: Send + Sync {
    fn place_card(&self, card: CardId, slot: SlotId);
    fn remove_card(&self, slot: SlotId);
    fn place_token(&self, player: PlayerId, slot: SlotId);
    fn remove_token(&self, player: PlayerId, slot: SlotId);
    fn remove_all_tokens(&self);
    fn set_score(&self, player: PlayerId, score: u32);
    /// Remaining freeze of `player`; 0 means the player may act again.
    fn set_freeze(&self, player: PlayerId, millis: u64);
    fn set_countdown(&self, millis: u64, warning: bool);
    fn set_elapsed(&self, millis: u64);
    fn announce_winners(&self, players: &[PlayerId]);
}

/// One recorded `UiSink` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    PlaceCard { card: CardId, slot: SlotId },
    RemoveCard { slot: SlotId },
    PlaceToken { player: PlayerId, slot: SlotId },
    RemoveToken { player: PlayerId, slot: SlotId },
    RemoveAllTokens,
    Score { player: PlayerId, score: u32 },
    Freeze { player: PlayerId, millis: u64 },
    Countdown { millis: u64, warning: bool },
    Elapsed { millis: u64 },
    Winners { players: Vec<PlayerId> },
}

/// Sink that logs through `tracing`. Card and token traffic goes to
/// `trace`, timers to `debug`, scores and winners to `info`.
#[derive(Debug, Default)]
pub struct TracingUi;

impl UiSink for TracingUi {
    fn place_card(&self, card: CardId, slot: SlotId) {
        trace!(%card, %slot, "place card");
    }

    fn remove_card(&self, slot: SlotId) {
        trace!(%slot, "remove card");
    }

    fn place_token(&self, player: PlayerId, slot: SlotId) {
        trace!(%player, %slot, "place token");
    }

    fn remove_token(&self, player: PlayerId, slot: SlotId) {
        trace!(%player, %slot, "remove token");
    }

    fn remove_all_tokens(&self) {
        trace!("remove all tokens");
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        info!(%player, score, "score");
    }

    fn set_freeze(&self, player: PlayerId, millis: u64) {
        trace!(%player, millis, "freeze");
    }

    fn set_countdown(&self, millis: u64, warning: bool) {
        if warning {
            debug!(millis, "countdown (warning)");
        } else {
            trace!(millis, "countdown");
        }
    }

    fn set_elapsed(&self, millis: u64) {
        trace!(millis, "elapsed");
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        let ids: Vec<usize> = players.iter().map(|p| p.0).collect();
        info!(winners = ?ids, "game over");
    }
}

/// Sink that records every call, in order.
#[derive(Debug, Default)]
pub struct RecordingUi {
    events: Mutex<Vec<UiEvent>>,
}

impl RecordingUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn events(&self) -> Vec<UiEvent> {
        self.lock().clone()
    }

    /// Drain the log.
    pub fn take(&self) -> Vec<UiEvent> {
        std::mem::take(&mut *self.lock())
    }

    fn push(&self, event: UiEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UiEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl UiSink for RecordingUi {
    fn place_card(&self, card: CardId, slot: SlotId) {
        self.push(UiEvent::PlaceCard { card, slot });
    }

    fn remove_card(&self, slot: SlotId) {
        self.push(UiEvent::RemoveCard { slot });
    }

    fn place_token(&self, player: PlayerId, slot: SlotId) {
        self.push(UiEvent::PlaceToken { player, slot });
    }

    fn remove_token(&self, player: PlayerId, slot: SlotId) {
        self.push(UiEvent::RemoveToken { player, slot });
    }

    fn remove_all_tokens(&self) {
        self.push(UiEvent::RemoveAllTokens);
    }

    fn set_score(&self, player: PlayerId, score: u32) {
        self.push(UiEvent::Score { player, score });
    }

    fn set_freeze(&self, player: PlayerId, millis: u64) {
        self.push(UiEvent::Freeze { player, millis });
    }

    fn set_countdown(&self, millis: u64, warning: bool) {
        self.push(UiEvent::Countdown { millis, warning });
    }

    fn set_elapsed(&self, millis: u64) {
        self.push(UiEvent::Elapsed { millis });
    }

    fn announce_winners(&self, players: &[PlayerId]) {
        self.push(UiEvent::Winners {
            players: players.to_vec(),
        });
    }
}

/// Sink that ignores every call.
#[derive(Debug, Default)]
pub struct NullUi;

impl UiSink for NullUi {
    fn place_card(&self, _card: CardId, _slot: SlotId) {}
    fn remove_card(&self, _slot: SlotId) {}
    fn place_token(&self, _player: PlayerId, _slot: SlotId) {}
    fn remove_token(&self, _player: PlayerId, _slot: SlotId) {}
    fn remove_all_tokens(&self) {}
    fn set_score(&self, _player: PlayerId, _score: u32) {}
    fn set_freeze(&self, _player: PlayerId, _millis: u64) {}
    fn set_countdown(&self, _millis: u64, _warning: bool) {}
    fn set_elapsed(&self, _millis: u64) {}
    fn announce_winners(&self, _players: &[PlayerId]) {}
}
