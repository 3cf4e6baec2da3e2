// Player seats and the per-player threads.
//
// A `PlayerSeat` is the shared, thread-safe half of a player: identity,
// score, freeze deadline, the terminate flag and the input queue. The
// dealer reads and writes it (awarding points, freezing, terminating), the
// game handle feeds human input into it, and the player's own thread drains
// it.
//
// The player thread (`run_player`) loops:
//
//   Frozen?          → wait the deadline out, reporting the remainder
//   board closed?    → wait until the dealer reopens it
//   next input       → `Board::press`
//   claim submitted? → block until the dealer (or a card removal) resolves it
//
// and exits as soon as the terminate flag is raised, after joining its
// input generator if it has one. Score and freeze are applied by the dealer
// before the claim is resolved, so when the player wakes with `Point` or
// `Penalty` the deadline is already set and the next iteration sleeps it
// out.
//
// Computer seats get a second thread (`run_generator`) that pushes
// uniformly random slots into the seat's input queue, blocking while it is
// full.
//
// The seat's record lock is a leaf: nothing else is locked while it is
// held, and the board is never called with it held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use set_rush_prng::GameRng;
use tracing::{debug, info, warn};

use crate::board::{Board, ClaimOutcome, PressOutcome};
use crate::config::PlayerKind;
use crate::input::{InputQueue, StartGate};
use crate::timer::millis;
use crate::types::{PlayerId, SlotId};
use crate::ui::UiSink;

/// How long an idle player waits for input before re-checking the board.
const INPUT_POLL: Duration = Duration::from_secs(1);

/// Longest single sleep while frozen, so the remaining time is reported
/// about once a second.
const FREEZE_TICK: Duration = Duration::from_secs(1);

/// Where a player thread currently is in its loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerPhase {
    AwaitingBoard,
    AwaitingInput,
    TokenMutation,
    AwaitingValidation,
    Frozen,
    Terminated,
}

struct Record {
    score: u32,
    freeze_until: Option<Instant>,
    phase: PlayerPhase,
}

/// Shared state of one player.
pub struct PlayerSeat {
    id: PlayerId,
    name: String,
    kind: PlayerKind,
    record: Mutex<Record>,
    record_changed: Condvar,
    terminate: AtomicBool,
    inputs: InputQueue,
}

impl PlayerSeat {
    /// New seat with an input queue of `input_capacity` presses.
    pub fn new(id: PlayerId, name: String, kind: PlayerKind, input_capacity: usize) -> Self {
        Self {
            id,
            name,
            kind,
            record: Mutex::new(Record {
                score: 0,
                freeze_until: None,
                phase: PlayerPhase::AwaitingBoard,
            }),
            record_changed: Condvar::new(),
            terminate: AtomicBool::new(false),
            inputs: InputQueue::new(input_capacity),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }

    fn lock(&self) -> MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn score(&self) -> u32 {
        self.lock().score
    }

    pub fn phase(&self) -> PlayerPhase {
        self.lock().phase
    }

    fn set_phase(&self, phase: PlayerPhase) {
        self.lock().phase = phase;
    }

    /// Whether the freeze deadline is still in the future.
    pub fn is_frozen(&self) -> bool {
        self.lock()
            .freeze_until
            .is_some_and(|until| until > Instant::now())
    }

    pub fn is_terminated(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    pub(crate) fn terminate_flag(&self) -> &AtomicBool {
        &self.terminate
    }

    pub(crate) fn inputs(&self) -> &InputQueue {
        &self.inputs
    }

    /// Human key press. Dropped when the player is frozen, the slot is
    /// empty, or the input queue is full. Returns whether it was queued.
    pub fn key_pressed(&self, board: &Board, slot: SlotId) -> bool {
        if self.is_frozen() || slot.0 >= board.table_size() || board.is_slot_empty(slot) {
            return false;
        }
        self.inputs.offer(slot)
    }

    /// One point, then a freeze of `freeze`.
    pub fn award_point(&self, ui: &dyn UiSink, freeze: Duration) {
        let score = {
            let mut record = self.lock();
            record.score += 1;
            record.score
        };
        info!(player = %self.id, name = %self.name, score, "point");
        ui.set_score(self.id, score);
        self.freeze(ui, freeze);
    }

    /// Freeze for `freeze` after a rejected claim.
    pub fn penalize(&self, ui: &dyn UiSink, freeze: Duration) {
        debug!(player = %self.id, millis = millis(freeze), "penalty");
        self.freeze(ui, freeze);
    }

    fn freeze(&self, ui: &dyn UiSink, freeze: Duration) {
        if freeze.is_zero() {
            return;
        }
        {
            let mut record = self.lock();
            record.freeze_until = Some(Instant::now() + freeze);
            self.record_changed.notify_all();
        }
        ui.set_freeze(self.id, millis(freeze));
    }

    /// Raise the terminate flag and wake the player thread from wherever it
    /// is blocked. Does not join.
    pub fn request_terminate(&self, board: &Board) {
        self.terminate.store(true, Ordering::SeqCst);
        {
            let _record = self.lock();
            self.record_changed.notify_all();
        }
        board.wake_player(self.id);
        self.inputs.close();
    }

    /// Sleep until the freeze deadline passes, reporting the remaining time
    /// each tick. Returns false if terminated first.
    fn wait_out_freeze(&self, ui: &dyn UiSink) -> bool {
        let mut record = self.lock();
        loop {
            if self.is_terminated() {
                return false;
            }
            let Some(until) = record.freeze_until else {
                return true;
            };
            let now = Instant::now();
            if now >= until {
                record.freeze_until = None;
                drop(record);
                ui.set_freeze(self.id, 0);
                return true;
            }
            record.phase = PlayerPhase::Frozen;
            let remaining = until - now;
            ui.set_freeze(self.id, millis(remaining));
            record = self
                .record_changed
                .wait_timeout(record, remaining.min(FREEZE_TICK))
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Body of a player thread.
pub(crate) fn run_player(
    seat: Arc<PlayerSeat>,
    board: Arc<Board>,
    ui: Arc<dyn UiSink>,
    gate: Arc<StartGate>,
    generator: Option<JoinHandle<()>>,
) {
    let id = seat.id();
    info!(player = %id, name = %seat.name(), kind = ?seat.kind(), "player thread started");
    gate.arrive();

    while !seat.is_terminated() {
        if !seat.wait_out_freeze(ui.as_ref()) {
            break;
        }
        seat.set_phase(PlayerPhase::AwaitingBoard);
        if !board.wait_until_open(id, seat.terminate_flag()) {
            break;
        }
        seat.set_phase(PlayerPhase::AwaitingInput);
        let Some(slot) = seat.inputs().take(INPUT_POLL) else {
            continue;
        };
        if seat.is_frozen() {
            continue;
        }
        seat.set_phase(PlayerPhase::TokenMutation);
        let PressOutcome::Claimed(ticket) = board.press(id, slot) else {
            continue;
        };

        seat.set_phase(PlayerPhase::AwaitingValidation);
        match board.await_resolution(id, ticket, seat.terminate_flag()) {
            Some(ClaimOutcome::Point) | Some(ClaimOutcome::Penalty) => seat.inputs().clear(),
            Some(ClaimOutcome::Cancelled) => {}
            None => break,
        }
    }

    seat.set_phase(PlayerPhase::Terminated);
    if let Some(generator) = generator {
        if generator.join().is_err() {
            warn!(player = %id, "input generator panicked");
        }
    }
    info!(player = %id, "player thread terminated");
}

/// Body of a computer player's input generator.
pub(crate) fn run_generator(seat: Arc<PlayerSeat>, table_size: usize, mut rng: GameRng) {
    while !seat.is_terminated() {
        let slot = SlotId(rng.range_usize(0, table_size));
        if !seat.inputs().put(slot) {
            break;
        }
    }
    debug!(player = %seat.id(), "input generator stopped");
}
