// Fixed-size card decks.
//
// A `Deck` is an ordered sequence of `CardSlot`s whose length is always
// `rows * columns`. Empty positions hold `CardSlot::empty()` rather than
// being absent, so slot indices are stable identities for the UI and the
// wire protocol.
//
// Mutations are all local no-fail or bool-fail operations: placing into a
// full deck or removing an absent card returns `false`, never panics.
// `resize` never fails — it collects occupied slots in order, then refills
// a fresh grid as far as they fit, silently dropping overflow.

use serde::{Deserialize, Serialize};
use snapdeck_protocol::types::CardSlot;

/// One player's deck. Invariant: `slots.len() == rows * columns` after
/// every operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    rows: u32,
    columns: u32,
    slots: Vec<CardSlot>,
}

impl Deck {
    pub fn new(rows: u32, columns: u32) -> Self {
        let len = (rows * columns) as usize;
        Self {
            rows,
            columns,
            slots: vec![CardSlot::empty(); len],
        }
    }

    /// Rebuild a deck from raw slot contents (snapshot apply). Truncates or
    /// pads with empty slots so the length invariant holds regardless of
    /// what arrived.
    pub fn from_slots(rows: u32, columns: u32, mut slots: Vec<CardSlot>) -> Self {
        let len = (rows * columns) as usize;
        slots.resize(len, CardSlot::empty());
        Self {
            rows,
            columns,
            slots,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no slot holds a card.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(CardSlot::is_empty)
    }

    /// True when every slot holds a card.
    pub fn is_full(&self) -> bool {
        !self.slots.iter().any(CardSlot::is_empty)
    }

    pub fn empty_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_empty()).count()
    }

    pub fn get(&self, index: usize) -> Option<&CardSlot> {
        self.slots.get(index)
    }

    pub fn slots(&self) -> &[CardSlot] {
        &self.slots
    }

    /// Position of the given card, if present.
    pub fn find(&self, card: &CardSlot) -> Option<usize> {
        self.slots.iter().position(|s| s == card)
    }

    pub fn contains(&self, card: &CardSlot) -> bool {
        self.find(card).is_some()
    }

    /// Indices of empty slots, in order.
    pub fn empty_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of occupied slots, in order.
    pub fn occupied_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Place a card, either at the given slot or the first empty one.
    /// Returns the slot index actually used, or `None` when the target slot
    /// is occupied/out of range, the card is empty, or no empty slot exists.
    pub fn place(&mut self, card: CardSlot, index: Option<usize>) -> Option<usize> {
        if card.is_empty() {
            return None;
        }
        let target = match index {
            Some(i) => {
                if self.slots.get(i)?.is_empty() {
                    i
                } else {
                    return None;
                }
            }
            None => self.slots.iter().position(CardSlot::is_empty)?,
        };
        self.slots[target] = card;
        Some(target)
    }

    /// Remove a card. Returns `false` if it is not present.
    pub fn remove(&mut self, card: &CardSlot) -> bool {
        match self.find(card) {
            Some(i) => {
                self.slots[i] = CardSlot::empty();
                true
            }
            None => false,
        }
    }

    /// Take the card at `index`, leaving the slot empty. Returns `None` for
    /// an empty or out-of-range slot.
    pub fn take_at(&mut self, index: usize) -> Option<CardSlot> {
        let slot = self.slots.get_mut(index)?;
        if slot.is_empty() {
            return None;
        }
        Some(std::mem::replace(slot, CardSlot::empty()))
    }

    /// Change dimensions, preserving occupied slots in original order as
    /// far as they fit. Never fails; overflow cards are dropped.
    pub fn resize(&mut self, rows: u32, columns: u32) {
        let len = (rows * columns) as usize;
        let occupied: Vec<CardSlot> = self
            .slots
            .drain(..)
            .filter(|s| !s.is_empty())
            .take(len)
            .collect();
        self.rows = rows;
        self.columns = columns;
        self.slots = occupied;
        self.slots.resize(len, CardSlot::empty());
    }
}
