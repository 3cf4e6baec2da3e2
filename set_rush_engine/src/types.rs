// Core ID types shared by the board, players and dealer.
//
// Lightweight index newtypes: a `CardId` indexes the deck, a `SlotId`
// indexes the board grid, a `PlayerId` indexes the seat list. Keeping them
// distinct stops a slot from being passed where a card is expected, which
// is the easiest mistake to make in code that maps one to the other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Card identifier, `0..deck_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub usize);

/// Board slot index, `0..table_size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub usize);

/// Player seat index, starting at 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub usize);

/// Monotonic number stamped on every submitted candidate. Lets a player
/// match a resolution to the claim it is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "card#{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot#{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player{}", self.0)
    }
}
