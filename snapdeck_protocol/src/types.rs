// Core types shared by both peers.
//
// Everything here crosses the wire, so all types derive `Serialize` and
// `Deserialize` and encode deterministically (fixed field order, no maps).
//
// The indexing convention is **local = player 0**: each endpoint models
// itself as slot 0 and its opponent as slot 1, regardless of host/guest
// role. The role-reversal functions in `event.rs` and `snapshot.rs` flip
// indices at the synchronization boundary; game logic never does.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a character that can appear on a card. Characters are owned
/// by the surrounding application (art, music, names); the protocol only
/// needs a stable, comparable identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CharacterId(pub String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two player slots. Slot 0 is always "me" from the holding
/// endpoint's perspective; slot 1 is the opponent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerSlot(pub u8);

impl PlayerSlot {
    /// The local player, always slot 0.
    pub const LOCAL: PlayerSlot = PlayerSlot(0);
    /// The remote (or automated) opponent, always slot 1.
    pub const REMOTE: PlayerSlot = PlayerSlot(1);

    /// The other slot. Applied to every inbound event so that "slot 0"
    /// keeps meaning "me" on both endpoints.
    pub fn flipped(self) -> Self {
        Self(1 - self.0)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

/// A card position in a deck: which character occupies it (if any) and the
/// card's index within that character's card set. `character_id = None`
/// denotes an empty slot and always serializes as an explicit `null`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSlot {
    pub character_id: Option<CharacterId>,
    pub card_index: u32,
}

impl CardSlot {
    pub fn new(character_id: CharacterId, card_index: u32) -> Self {
        Self {
            character_id: Some(character_id),
            card_index,
        }
    }

    /// An unoccupied slot.
    pub fn empty() -> Self {
        Self {
            character_id: None,
            card_index: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.character_id.is_none()
    }

    /// Stable string key derived from both fields, usable as a map key or
    /// UI widget identity. Empty slots key as `"-#<index>"`.
    pub fn key(&self) -> String {
        match &self.character_id {
            Some(id) => format!("{}#{}", id.0, self.card_index),
            None => format!("-#{}", self.card_index),
        }
    }
}

/// A player claiming a character during the current turn. Timestamps are
/// wall-clock milliseconds supplied by each endpoint; ties and ordering are
/// resolved by the turn engine, which sorts and de-duplicates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickEvent {
    pub timestamp_ms: i64,
    pub player: PlayerSlot,
    pub card: CardSlot,
}

impl PickEvent {
    /// The same pick seen from the opposite endpoint.
    pub fn role_reversed(mut self) -> Self {
        self.player = self.player.flipped();
        self
    }
}

/// A pair of per-player consent bits backing one two-phase confirmation
/// gate (game start, turn advance).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation([bool; 2]);

impl Confirmation {
    pub fn get(self, slot: PlayerSlot) -> bool {
        self.0[slot.index()]
    }

    pub fn set(&mut self, slot: PlayerSlot, value: bool) {
        self.0[slot.index()] = value;
    }

    /// True if either side has confirmed.
    pub fn any(self) -> bool {
        self.0[0] || self.0[1]
    }

    /// Consensus check. Without an opponent the local bit alone decides.
    pub fn all(self, has_opponent: bool) -> bool {
        if has_opponent {
            self.0[0] && self.0[1]
        } else {
            self.0[0]
        }
    }

    /// Exchanged bits — used when reinterpreting a remote snapshot from the
    /// opponent's point of view.
    pub fn swapped(self) -> Self {
        Self([self.0[1], self.0[0]])
    }

    /// Back to `{false, false}`, ready for the next round of negotiation.
    pub fn reset(&mut self) {
        self.0 = [false, false];
    }
}

/// Which negotiation an acknowledgment belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckKind {
    /// Game-start handshake.
    Start,
    /// Turn-advance handshake.
    Next,
    /// Drift check / full-state push outside any handshake.
    Sync,
}

/// The session's lifecycle phase. `SelectingCards` is both the initial
/// phase and the universal stop/reset target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    SelectingCards,
    TurnCountdownStart,
    TurnStart,
    TurnWinnerDetermined,
    TurnCountdownNext,
    GameFinished,
}

/// Deterministic 32-bit signed hash of a canonical snapshot encoding.
/// See `snapshot.rs` for how it is computed and compared across peers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateHash(pub i32);

impl StateHash {
    /// Hash a canonical string: `h = h * 31 + byte` over the UTF-8 bytes,
    /// wrapping in `i32`. Matches across platforms by construction.
    pub fn of(canonical: &str) -> Self {
        let mut h: i32 = 0;
        for &b in canonical.as_bytes() {
            h = h.wrapping_mul(31).wrapping_add(i32::from(b));
        }
        Self(h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_slot_flip_is_involution() {
        assert_eq!(PlayerSlot::LOCAL.flipped(), PlayerSlot::REMOTE);
        assert_eq!(PlayerSlot::REMOTE.flipped(), PlayerSlot::LOCAL);
        assert_eq!(PlayerSlot::LOCAL.flipped().flipped(), PlayerSlot::LOCAL);
    }

    #[test]
    fn card_slot_keys_are_stable_and_distinct() {
        let a = CardSlot::new(CharacterId::new("fox"), 2);
        let b = CardSlot::new(CharacterId::new("fox"), 3);
        let empty = CardSlot::empty();
        assert_eq!(a.key(), "fox#2");
        assert_ne!(a.key(), b.key());
        assert_eq!(empty.key(), "-#0");
    }

    #[test]
    fn empty_slot_serializes_explicit_null() {
        let json = serde_json::to_string(&CardSlot::empty()).unwrap();
        assert_eq!(json, r#"{"character_id":null,"card_index":0}"#);
    }

    #[test]
    fn confirmation_consensus_rules() {
        let mut c = Confirmation::default();
        assert!(!c.any());
        c.set(PlayerSlot::LOCAL, true);
        assert!(c.any());
        assert!(c.all(false), "lone side decides without an opponent");
        assert!(!c.all(true), "opponent bit still required");
        c.set(PlayerSlot::REMOTE, true);
        assert!(c.all(true));
        c.reset();
        assert!(!c.any());
    }

    #[test]
    fn confirmation_swap() {
        let mut c = Confirmation::default();
        c.set(PlayerSlot::LOCAL, true);
        let s = c.swapped();
        assert!(!s.get(PlayerSlot::LOCAL));
        assert!(s.get(PlayerSlot::REMOTE));
        assert_eq!(s.swapped(), c);
    }

    #[test]
    fn state_hash_is_order_sensitive() {
        assert_eq!(StateHash::of("abc"), StateHash::of("abc"));
        assert_ne!(StateHash::of("abc"), StateHash::of("acb"));
        assert_ne!(StateHash::of("abc"), StateHash::of(""));
    }
}
