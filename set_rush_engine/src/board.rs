// Shared board: slot/card assignment, player tokens, the candidate mailbox
// and per-player claim resolution.
//
// `Board` is the one structure written by both the players (tokens, claims)
// and the dealer (cards, resolutions). All of that state sits behind a
// single mutex and is only reachable through `Board` methods, so every
// operation that touches more than one part of it (a card removal that
// clears tokens and cancels queued claims, a key press that completes a
// claim and enqueues it) is one critical section. Callers never hold any
// other engine lock while calling in, and nothing here calls out to the
// players or dealer, so there is no lock order to respect.
//
// Wakeups are condition variables on the same mutex:
// - `wakeups[p]`: player `p` waits here for the board to open and for its
//   claim to resolve. `open()` notifies every player; a resolution or a
//   termination notifies only the player concerned.
// - `candidate_ready`: the dealer's interruptible sleep. Notified on every
//   submission and by `wake_dealer`.
//
// Claim lifecycle per player (`ClaimState`): `Idle` → `Pending(ticket)` on
// submission → `Resolved(ticket, outcome)` when the dealer scores or
// penalizes it, or when a card removal cancels it → back to `Idle` once the
// owner has picked the outcome up in `await_resolution`.
//
// Invariants, at every point where the lock is free:
// - `slot_to_card` and `card_to_slot` are exact inverses.
// - every token references an occupied slot.
// - a player has at most one `Pending` claim and at most one live
//   candidate in the mailbox.
//
// `table_delay` is applied before taking the lock on card placement and
// removal, so the artificial latency never blocks token traffic.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::config::GameConfig;
use crate::mailbox::{Candidate, CandidateMailbox, ClaimCards, ClaimSlots};
use crate::set_finder::SetFinder;
use crate::types::{CardId, PlayerId, SlotId, Ticket};
use crate::ui::UiSink;

/// How a submitted claim ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Valid set: one point, cards replaced.
    Point,
    /// Not a set: the owner is frozen.
    Penalty,
    /// A claimed card left the board before validation.
    Cancelled,
}

/// Result of a single key press, as applied by `Board::press`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// Board closed, slot empty or out of range, claim already pending, or
    /// tokens already full and the slot is not one of them.
    Ignored,
    TokenRemoved,
    TokenPlaced,
    /// The press completed a claim, which is now queued for the dealer.
    Claimed(Ticket),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClaimState {
    Idle,
    Pending(Ticket),
    Resolved(Ticket, ClaimOutcome),
}

struct BoardState {
    slot_to_card: Vec<Option<CardId>>,
    card_to_slot: Vec<Option<SlotId>>,
    tokens: Vec<ClaimSlots>,
    claims: Vec<ClaimState>,
    mailbox: CandidateMailbox,
    open: bool,
}

/// The shared table.
pub struct Board {
    table_size: usize,
    feature_size: usize,
    table_delay: Duration,
    state: Mutex<BoardState>,
    wakeups: Vec<Condvar>,
    candidate_ready: Condvar,
    ui: Arc<dyn UiSink>,
    finder: Arc<dyn SetFinder>,
}

impl Board {
    /// Empty, closed board sized from `config`.
    pub fn new(config: &GameConfig, ui: Arc<dyn UiSink>, finder: Arc<dyn SetFinder>) -> Self {
        let players = config.player_count();
        Self {
            table_size: config.table_size,
            feature_size: config.feature_size,
            table_delay: config.table_delay(),
            state: Mutex::new(BoardState {
                slot_to_card: vec![None; config.table_size],
                card_to_slot: vec![None; config.deck_size],
                tokens: vec![ClaimSlots::new(); players],
                claims: vec![ClaimState::Idle; players],
                mailbox: CandidateMailbox::new(players),
                open: false,
            }),
            wakeups: (0..players).map(|_| Condvar::new()).collect(),
            candidate_ready: Condvar::new(),
            ui,
            finder,
        }
    }

    pub fn table_size(&self) -> usize {
        self.table_size
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn delay(&self) {
        if !self.table_delay.is_zero() {
            thread::sleep(self.table_delay);
        }
    }

    // -----------------------------------------------------------------------
    // Cards
    // -----------------------------------------------------------------------

    /// Put `card` into the empty `slot`. Returns false (and changes
    /// nothing) if either id is out of range, the slot is occupied or the
    /// card is already on the board.
    pub fn place_card(&self, card: CardId, slot: SlotId) -> bool {
        self.delay();
        let mut state = self.lock();
        let slot_free = state.slot_to_card.get(slot.0).is_some_and(Option::is_none);
        let card_free = state.card_to_slot.get(card.0).is_some_and(Option::is_none);
        if !slot_free || !card_free {
            return false;
        }
        state.slot_to_card[slot.0] = Some(card);
        state.card_to_slot[card.0] = Some(slot);
        self.ui.place_card(card, slot);
        true
    }

    /// Clear `slot` and return the card it held. Every token on the slot is
    /// removed, and every queued claim referencing it is cancelled and its
    /// owner woken with `ClaimOutcome::Cancelled`.
    pub fn remove_card(&self, slot: SlotId) -> Option<CardId> {
        self.delay();
        let mut state = self.lock();
        let card = state.slot_to_card.get_mut(slot.0)?.take()?;
        state.card_to_slot[card.0] = None;

        for player in 0..state.tokens.len() {
            let tokens = &mut state.tokens[player];
            if let Some(pos) = tokens.iter().position(|s| *s == slot) {
                tokens.remove(pos);
                self.ui.remove_token(PlayerId(player), slot);
            }
        }
        self.ui.remove_card(slot);

        for (owner, ticket) in state.mailbox.cancel_referencing(slot) {
            debug!(%owner, ticket = ticket.0, %slot, "claim cancelled by card removal");
            self.resolve_locked(&mut state, owner, ticket, ClaimOutcome::Cancelled);
        }
        Some(card)
    }

    pub fn card_at(&self, slot: SlotId) -> Option<CardId> {
        self.lock().slot_to_card.get(slot.0).copied().flatten()
    }

    pub fn slot_of(&self, card: CardId) -> Option<SlotId> {
        self.lock().card_to_slot.get(card.0).copied().flatten()
    }

    pub fn is_slot_empty(&self, slot: SlotId) -> bool {
        self.card_at(slot).is_none()
    }

    pub fn cards_on_table(&self) -> Vec<CardId> {
        self.lock().slot_to_card.iter().flatten().copied().collect()
    }

    pub fn count_cards(&self) -> usize {
        self.lock().slot_to_card.iter().flatten().count()
    }

    /// Whether at least one set can be formed from the cards on the board.
    pub fn set_can_be_found(&self) -> bool {
        let cards = self.cards_on_table();
        !self.finder.find_sets(&cards, 1).is_empty()
    }

    /// Log every set currently on the board, by sorted slot, with the
    /// features of its cards.
    pub fn hints(&self) {
        let state = self.lock();
        let cards: Vec<CardId> = state.slot_to_card.iter().flatten().copied().collect();
        for set in self.finder.find_sets(&cards, usize::MAX) {
            let mut slots: Vec<usize> = set
                .iter()
                .filter_map(|card| state.card_to_slot[card.0])
                .map(|slot| slot.0)
                .collect();
            slots.sort_unstable();
            let features: Vec<Vec<usize>> =
                set.iter().map(|card| self.finder.card_features(*card)).collect();
            info!(?slots, ?features, "hint: set on board");
        }
    }

    /// Check the slot/card bijection and that no token sits on an empty
    /// slot.
    pub fn is_consistent(&self) -> bool {
        let state = self.lock();
        let forward = state.slot_to_card.iter().enumerate().all(|(slot, card)| {
            card.is_none_or(|card| state.card_to_slot[card.0] == Some(SlotId(slot)))
        });
        let backward = state.card_to_slot.iter().enumerate().all(|(card, slot)| {
            slot.is_none_or(|slot| state.slot_to_card[slot.0] == Some(CardId(card)))
        });
        let tokens = state
            .tokens
            .iter()
            .flatten()
            .all(|slot| state.slot_to_card[slot.0].is_some());
        forward && backward && tokens
    }

    // -----------------------------------------------------------------------
    // Tokens and claims
    // -----------------------------------------------------------------------

    /// Put a token of `player` on the occupied `slot`. No set validation and
    /// no cap on the token count; `press` enforces the claim size.
    pub fn place_token(&self, player: PlayerId, slot: SlotId) -> bool {
        let mut state = self.lock();
        self.place_token_locked(&mut state, player, slot)
    }

    /// Take a token of `player` off `slot`. Returns false if there was none.
    pub fn remove_token(&self, player: PlayerId, slot: SlotId) -> bool {
        let mut state = self.lock();
        self.remove_token_locked(&mut state, player, slot)
    }

    /// Clear every token of every player.
    pub fn remove_all_tokens(&self) {
        let mut state = self.lock();
        for tokens in state.tokens.iter_mut() {
            tokens.clear();
        }
        self.ui.remove_all_tokens();
    }

    /// Slots currently holding a token of `player`, in placement order.
    pub fn tokens_of(&self, player: PlayerId) -> Vec<SlotId> {
        self.lock()
            .tokens
            .get(player.0)
            .map(|tokens| tokens.to_vec())
            .unwrap_or_default()
    }

    /// Apply one key press of `player` on `slot`: toggle the player's token
    /// there, and queue a claim if that completes one.
    pub fn press(&self, player: PlayerId, slot: SlotId) -> PressOutcome {
        let mut state = self.lock();
        if !state.open
            || slot.0 >= self.table_size
            || player.0 >= state.claims.len()
            || state.slot_to_card[slot.0].is_none()
            || matches!(state.claims[player.0], ClaimState::Pending(_))
        {
            return PressOutcome::Ignored;
        }
        if state.tokens[player.0].contains(&slot) {
            self.remove_token_locked(&mut state, player, slot);
            return PressOutcome::TokenRemoved;
        }
        if state.tokens[player.0].len() >= self.feature_size {
            return PressOutcome::Ignored;
        }
        self.place_token_locked(&mut state, player, slot);
        if state.tokens[player.0].len() == self.feature_size {
            return PressOutcome::Claimed(self.submit_candidate(&mut state, player));
        }
        PressOutcome::TokenPlaced
    }

    /// Oldest live claim, or `None` when nothing is queued. Never blocks.
    pub fn take_next_candidate(&self) -> Option<Candidate> {
        self.lock().mailbox.pop_live()
    }

    /// Sleep until a live claim is queued, `stop` is raised (and
    /// `wake_dealer` called), or `timeout` passes. Returns whether a claim is
    /// waiting.
    pub fn wait_for_candidate(&self, timeout: Duration, stop: &AtomicBool) -> bool {
        let state = self.lock();
        let (state, _) = self
            .candidate_ready
            .wait_timeout_while(state, timeout, |s| {
                !s.mailbox.has_live() && !stop.load(Ordering::SeqCst)
            })
            .unwrap_or_else(PoisonError::into_inner);
        state.mailbox.has_live()
    }

    /// Whether the cards behind the candidate's slots form a set.
    pub fn is_valid_set(&self, candidate: &Candidate) -> bool {
        let cards: Option<ClaimCards> = {
            let state = self.lock();
            candidate
                .slots
                .iter()
                .map(|slot| state.slot_to_card[slot.0])
                .collect()
        };
        match cards {
            Some(cards) => {
                debug_assert_eq!(cards, candidate.cards, "claimed cards changed under a live claim");
                self.finder.test_set(&cards)
            }
            None => false,
        }
    }

    /// Record the outcome of `owner`'s claim `ticket` and wake the owner.
    /// Returns false if that claim is no longer pending.
    pub fn resolve_claim(&self, owner: PlayerId, ticket: Ticket, outcome: ClaimOutcome) -> bool {
        let mut state = self.lock();
        self.resolve_locked(&mut state, owner, ticket, outcome)
    }

    /// Block `player` until its claim `ticket` resolves. Returns `None` if
    /// `terminate` is raised first (the caller must also call
    /// `wake_player` after raising it).
    pub fn await_resolution(
        &self,
        player: PlayerId,
        ticket: Ticket,
        terminate: &AtomicBool,
    ) -> Option<ClaimOutcome> {
        let state = self.lock();
        let mut state = self.wakeups[player.0]
            .wait_while(state, |s| {
                s.claims[player.0] == ClaimState::Pending(ticket) && !terminate.load(Ordering::SeqCst)
            })
            .unwrap_or_else(PoisonError::into_inner);
        match state.claims[player.0] {
            ClaimState::Resolved(t, outcome) if t == ticket => {
                state.claims[player.0] = ClaimState::Idle;
                Some(outcome)
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Open/closed gate and wakeups
    // -----------------------------------------------------------------------

    /// Let players act again and wake everyone waiting for it.
    pub fn open(&self) {
        let mut state = self.lock();
        state.open = true;
        for wakeup in &self.wakeups {
            wakeup.notify_all();
        }
    }

    /// Stop players from acting. Presses in flight are ignored from here on.
    pub fn close(&self) {
        self.lock().open = false;
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Block until the board is open. Returns false if `terminate` is
    /// raised first.
    pub fn wait_until_open(&self, player: PlayerId, terminate: &AtomicBool) -> bool {
        let state = self.lock();
        let _state = self.wakeups[player.0]
            .wait_while(state, |s| !s.open && !terminate.load(Ordering::SeqCst))
            .unwrap_or_else(PoisonError::into_inner);
        !terminate.load(Ordering::SeqCst)
    }

    /// Wake `player` from any board wait so it re-checks its terminate flag.
    pub fn wake_player(&self, player: PlayerId) {
        let _state = self.lock();
        self.wakeups[player.0].notify_all();
    }

    /// Wake the dealer from `wait_for_candidate`.
    pub fn wake_dealer(&self) {
        let _state = self.lock();
        self.candidate_ready.notify_all();
    }

    // -----------------------------------------------------------------------
    // Locked helpers
    // -----------------------------------------------------------------------

    fn place_token_locked(&self, state: &mut BoardState, player: PlayerId, slot: SlotId) -> bool {
        let occupied = state.slot_to_card.get(slot.0).is_some_and(Option::is_some);
        let Some(tokens) = state.tokens.get_mut(player.0) else {
            return false;
        };
        if !occupied || tokens.contains(&slot) {
            return false;
        }
        tokens.push(slot);
        trace!(%player, %slot, "token placed");
        self.ui.place_token(player, slot);
        true
    }

    fn remove_token_locked(&self, state: &mut BoardState, player: PlayerId, slot: SlotId) -> bool {
        let Some(tokens) = state.tokens.get_mut(player.0) else {
            return false;
        };
        let Some(pos) = tokens.iter().position(|s| *s == slot) else {
            return false;
        };
        tokens.remove(pos);
        trace!(%player, %slot, "token removed");
        self.ui.remove_token(player, slot);
        true
    }

    /// Queue the full token set of `owner` as a claim and mark it pending.
    /// The caller has checked that the tokens are full and nothing is
    /// pending.
    fn submit_candidate(&self, state: &mut BoardState, owner: PlayerId) -> Ticket {
        let slots = state.tokens[owner.0].clone();
        let cards: ClaimCards = slots
            .iter()
            .filter_map(|slot| state.slot_to_card[slot.0])
            .collect();
        let ticket = state.mailbox.push(owner, slots, cards);
        state.claims[owner.0] = ClaimState::Pending(ticket);
        debug!(%owner, ticket = ticket.0, "claim submitted");
        self.candidate_ready.notify_all();
        ticket
    }

    fn resolve_locked(
        &self,
        state: &mut BoardState,
        owner: PlayerId,
        ticket: Ticket,
        outcome: ClaimOutcome,
    ) -> bool {
        if state.claims[owner.0] != ClaimState::Pending(ticket) {
            return false;
        }
        state.claims[owner.0] = ClaimState::Resolved(ticket, outcome);
        self.wakeups[owner.0].notify_all();
        true
    }
}
