// Candidate mailbox: the FIFO of full claims waiting for the dealer.
//
// Players push a `Candidate` the moment their token count reaches the claim
// size; the dealer pops them one at a time, oldest first. When a card leaves
// the board, every still-queued candidate that references its slot is
// tagged cancelled in place rather than removed, and `pop_live` discards
// tagged entries as it reaches them. A cancelled claim is therefore never
// delivered to the dealer, and the queue order of the surviving claims is
// untouched.
//
// The mailbox has no locking of its own; it lives inside the board state
// and is only touched under the board lock.
//
// Capacity: a player has at most one queued candidate (it blocks until the
// claim resolves), so the queue never holds more live entries than there
// are players.

use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::types::{CardId, PlayerId, SlotId, Ticket};

/// Slots or cards of one claim. Claims are `feature_size` long, which is 3
/// in every shipped config.
pub type ClaimSlots = SmallVec<[SlotId; 4]>;
pub type ClaimCards = SmallVec<[CardId; 4]>;

/// A full claim submitted for validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub ticket: Ticket,
    pub owner: PlayerId,
    /// Claimed slots, in the order the tokens were placed.
    pub slots: ClaimSlots,
    /// Cards in those slots at submission time.
    pub cards: ClaimCards,
}

#[derive(Debug)]
struct Entry {
    candidate: Candidate,
    cancelled: bool,
}

/// FIFO of candidates with cancel-in-place.
#[derive(Debug)]
pub struct CandidateMailbox {
    entries: VecDeque<Entry>,
    capacity: usize,
    next_ticket: u64,
}

impl CandidateMailbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_ticket: 0,
        }
    }

    /// Enqueue a claim and return its ticket.
    pub fn push(&mut self, owner: PlayerId, slots: ClaimSlots, cards: ClaimCards) -> Ticket {
        debug_assert!(
            self.live_count() < self.capacity,
            "more live candidates than players"
        );
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.entries.push_back(Entry {
            candidate: Candidate {
                ticket,
                owner,
                slots,
                cards,
            },
            cancelled: false,
        });
        ticket
    }

    /// Tag every live candidate that references `slot` as cancelled.
    /// Returns the `(owner, ticket)` of each newly cancelled claim.
    pub fn cancel_referencing(&mut self, slot: SlotId) -> Vec<(PlayerId, Ticket)> {
        let mut cancelled = Vec::new();
        for entry in self.entries.iter_mut() {
            if !entry.cancelled && entry.candidate.slots.contains(&slot) {
                entry.cancelled = true;
                cancelled.push((entry.candidate.owner, entry.candidate.ticket));
            }
        }
        cancelled
    }

    /// Oldest live candidate, discarding cancelled entries in front of it.
    pub fn pop_live(&mut self) -> Option<Candidate> {
        while let Some(entry) = self.entries.pop_front() {
            if !entry.cancelled {
                return Some(entry.candidate);
            }
        }
        None
    }

    pub fn has_live(&self) -> bool {
        self.entries.iter().any(|e| !e.cancelled)
    }

    pub fn live_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.cancelled).count()
    }
}

#[cfg(test)]
mod tests {
    use smallvec::smallvec;

    use super::*;

    fn push(mailbox: &mut CandidateMailbox, owner: usize, slots: &[usize]) -> Ticket {
        mailbox.push(
            PlayerId(owner),
            slots.iter().map(|s| SlotId(*s)).collect(),
            slots.iter().map(|s| CardId(*s + 100)).collect(),
        )
    }

    #[test]
    fn pops_in_submission_order() {
        let mut mailbox = CandidateMailbox::new(4);
        let a = push(&mut mailbox, 2, &[0, 1, 2]);
        let b = push(&mut mailbox, 0, &[3, 4, 5]);
        assert!(a < b);
        assert_eq!(mailbox.pop_live().unwrap().owner, PlayerId(2));
        assert_eq!(mailbox.pop_live().unwrap().owner, PlayerId(0));
        assert!(mailbox.pop_live().is_none());
    }

    #[test]
    fn cancelled_entries_are_skipped() {
        let mut mailbox = CandidateMailbox::new(4);
        push(&mut mailbox, 0, &[0, 1, 2]);
        let survivor = push(&mut mailbox, 1, &[3, 4, 5]);
        push(&mut mailbox, 2, &[2, 6, 7]);

        let cancelled = mailbox.cancel_referencing(SlotId(2));
        let owners: Vec<usize> = cancelled.iter().map(|(p, _)| p.0).collect();
        assert_eq!(owners, vec![0, 2]);
        assert_eq!(mailbox.live_count(), 1);

        let next = mailbox.pop_live().unwrap();
        assert_eq!(next.ticket, survivor);
        assert_eq!(next.cards.as_slice(), &[CardId(103), CardId(104), CardId(105)]);
        assert!(mailbox.pop_live().is_none());
        assert!(!mailbox.has_live());
    }

    #[test]
    fn cancellation_reports_each_claim_once() {
        let mut mailbox = CandidateMailbox::new(2);
        push(&mut mailbox, 0, &[0, 1, 2]);
        assert_eq!(mailbox.cancel_referencing(SlotId(0)).len(), 1);
        assert!(mailbox.cancel_referencing(SlotId(1)).is_empty());
    }

    #[test]
    fn unrelated_slot_cancels_nothing() {
        let mut mailbox = CandidateMailbox::new(2);
        mailbox.push(PlayerId(0), smallvec![SlotId(0), SlotId(1)], smallvec![CardId(0), CardId(1)]);
        assert!(mailbox.cancel_referencing(SlotId(9)).is_empty());
        assert!(mailbox.has_live());
    }
}
