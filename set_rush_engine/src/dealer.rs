// The dealer: round lifecycle, claim validation, scoring and shutdown.
//
// One dealer thread runs `Dealer::run`:
//
//   wait for every player at the start gate
//   until should_finish:
//       deal          fill empty slots from the shuffled deck, open board
//       timer loop    sleep (1 s, or 10 ms in the warning window), cut short
//                     by claims; refresh the timer; drain claims FIFO
//       clear         close board, drop tokens and queued input, return
//                     every card to the deck
//   terminate players, highest id first, joining each
//   announce winners
//
// A valid claim is handled entirely by the dealer: close the board, remove
// the claimed cards (which cancels every other queued claim on those
// slots), award the point, resolve the claim, refill the freed slots and
// restart the timer. Cards of a valid set leave the game. An invalid claim
// freezes its owner and changes nothing on the board.
//
// When the timer is not a countdown, nothing would ever end a round with
// no set on the board, so dealing repeats (clear and redeal) until the
// board shows a set or the game is over.
//
// The deck, the timer and the dealer's RNG are owned by the dealer alone;
// everything shared goes through `Board` and `PlayerSeat`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use set_rush_prng::GameRng;
use tracing::{debug, info, warn};

use crate::board::{Board, ClaimOutcome};
use crate::config::GameConfig;
use crate::input::StartGate;
use crate::mailbox::Candidate;
use crate::player::PlayerSeat;
use crate::set_finder::SetFinder;
use crate::timer::RoundTimer;
use crate::types::{CardId, PlayerId, SlotId};
use crate::ui::UiSink;

/// Final standings, returned when the dealer thread exits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSummary {
    /// Score per seat, indexed by player id.
    pub scores: Vec<u32>,
    /// Every player whose score equals the maximum.
    pub winners: Vec<PlayerId>,
}

/// Ids of every player holding the highest score. Empty for no players.
pub fn winners(scores: &[u32]) -> Vec<PlayerId> {
    let Some(best) = scores.iter().copied().max() else {
        return Vec::new();
    };
    scores
        .iter()
        .enumerate()
        .filter(|(_, score)| **score == best)
        .map(|(id, _)| PlayerId(id))
        .collect()
}

pub struct Dealer {
    config: GameConfig,
    board: Arc<Board>,
    ui: Arc<dyn UiSink>,
    finder: Arc<dyn SetFinder>,
    seats: Vec<Arc<PlayerSeat>>,
    player_threads: Vec<Option<JoinHandle<()>>>,
    gate: Arc<StartGate>,
    stop: Arc<AtomicBool>,
    deck: Vec<CardId>,
    timer: RoundTimer,
    rng: GameRng,
    players_terminated: bool,
}

impl Dealer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: GameConfig,
        board: Arc<Board>,
        ui: Arc<dyn UiSink>,
        finder: Arc<dyn SetFinder>,
        seats: Vec<Arc<PlayerSeat>>,
        gate: Arc<StartGate>,
        stop: Arc<AtomicBool>,
        rng: GameRng,
    ) -> Self {
        let deck = (0..config.deck_size).map(CardId).collect();
        let timer = RoundTimer::new(config.timer_mode());
        Self {
            config,
            board,
            ui,
            finder,
            seats,
            player_threads: Vec::new(),
            gate,
            stop,
            deck,
            timer,
            rng,
            players_terminated: false,
        }
    }

    /// Hand over the player thread handles, indexed by player id. The dealer
    /// joins them on shutdown.
    pub fn attach_player_threads(&mut self, threads: Vec<JoinHandle<()>>) {
        self.player_threads = threads.into_iter().map(Some).collect();
    }

    /// Body of the dealer thread.
    pub fn run(mut self) -> GameSummary {
        info!(players = self.seats.len(), "dealer thread started");
        if self.gate.wait() {
            while !self.should_finish() {
                self.place_cards_on_table();
                self.timer_loop();
                if !self.stop_requested() {
                    self.remove_all_cards_from_table();
                }
            }
        } else {
            warn!("start cancelled before every player arrived");
        }
        self.terminate_players();
        let summary = self.announce_winners();
        info!("dealer thread terminated");
        summary
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Stop requested, or no set left anywhere: neither in the deck nor on
    /// the board.
    pub fn should_finish(&self) -> bool {
        self.stop_requested()
            || (self.finder.find_sets(&self.deck, 1).is_empty() && !self.board.set_can_be_found())
    }

    /// Fill every empty slot from the shuffled deck, in shuffled slot order,
    /// then reopen the board and restart the timer.
    fn place_cards_on_table(&mut self) {
        loop {
            let mut empty: Vec<SlotId> = (0..self.config.table_size)
                .map(SlotId)
                .filter(|slot| self.board.is_slot_empty(*slot))
                .collect();
            self.rng.shuffle(&mut self.deck);
            self.rng.shuffle(&mut empty);
            for slot in empty {
                let Some(card) = self.deck.pop() else {
                    break;
                };
                self.board.place_card(card, slot);
            }

            if !self.timer.mode().requires_visible_set()
                || self.board.set_can_be_found()
                || self.should_finish()
            {
                break;
            }
            debug!("no set on the board, redealing");
            self.remove_all_cards_from_table();
        }

        info!(
            on_board = self.board.count_cards(),
            in_deck = self.deck.len(),
            "cards dealt"
        );
        if self.config.hints {
            self.board.hints();
        }
        self.board.open();
        self.timer.display(self.ui.as_ref(), true);
    }

    /// Run one round: sleep, refresh, drain, until the round is over.
    fn timer_loop(&mut self) {
        while !self.stop_requested() && !self.timer.deadline_passed() && !self.should_finish() {
            let interval = self.timer.sleep_interval();
            self.board.wait_for_candidate(interval, &self.stop);
            self.timer.display(self.ui.as_ref(), false);
            self.drain_candidates();
        }
        debug!(timed_out = self.timer.deadline_passed(), "round over");
    }

    /// Resolve queued claims oldest first until none remain, the countdown
    /// runs out or a stop is requested.
    fn drain_candidates(&mut self) {
        while !self.stop_requested() && !self.timer.deadline_passed() {
            let Some(candidate) = self.board.take_next_candidate() else {
                break;
            };
            self.resolve(candidate);
        }
    }

    fn resolve(&mut self, candidate: Candidate) {
        let owner = candidate.owner;
        let seat = self.seats[owner.0].clone();
        let slots: Vec<usize> = candidate.slots.iter().map(|slot| slot.0).collect();

        if self.board.is_valid_set(&candidate) {
            info!(player = %owner, ?slots, "valid set");
            self.board.close();
            for slot in &candidate.slots {
                self.board.remove_card(*slot);
            }
            seat.award_point(self.ui.as_ref(), self.config.point_freeze());
            self.board.resolve_claim(owner, candidate.ticket, ClaimOutcome::Point);
            self.place_cards_on_table();
        } else {
            debug!(player = %owner, ?slots, "rejected set");
            seat.penalize(self.ui.as_ref(), self.config.penalty_freeze());
            self.board.resolve_claim(owner, candidate.ticket, ClaimOutcome::Penalty);
        }
    }

    /// Close the board, drop every token and queued input, and return every
    /// card to the deck. Queued claims are cancelled by the removals.
    fn remove_all_cards_from_table(&mut self) {
        self.board.close();
        self.board.remove_all_tokens();
        for seat in &self.seats {
            seat.inputs().clear();
        }
        for slot in (0..self.config.table_size).map(SlotId) {
            if let Some(card) = self.board.remove_card(slot) {
                self.deck.push(card);
            }
        }
    }

    /// Terminate players from the highest id down, joining each before the
    /// next. Safe to call more than once.
    pub fn terminate_players(&mut self) {
        if self.players_terminated {
            return;
        }
        self.players_terminated = true;
        for (index, seat) in self.seats.iter().enumerate().rev() {
            seat.request_terminate(&self.board);
            let handle = self.player_threads.get_mut(index).and_then(Option::take);
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!(player = %seat.id(), "player thread panicked");
                }
            }
        }
    }

    fn announce_winners(&self) -> GameSummary {
        let scores: Vec<u32> = self.seats.iter().map(|seat| seat.score()).collect();
        let winners = winners(&scores);
        info!(?scores, winners = ?winners.iter().map(|p| p.0).collect::<Vec<_>>(), "final scores");
        self.ui.announce_winners(&winners);
        GameSummary { scores, winners }
    }
}
