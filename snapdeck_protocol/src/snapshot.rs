// Full-state snapshots for drift detection and repair.
//
// `SyncSnapshot` is a serializable projection of one endpoint's entire
// session view: decks, dimensions, confirmations, picks, piles, the gives
// balance, plus the externally-owned playing order, per-character music
// selection, and per-character disable flags. It is sufficient to fully
// reconstruct the peer's state after divergence.
//
// Two operations make snapshots useful across the peer link:
//
// - `state_hash()`: a deterministic 32-bit signed hash over the canonical
//   JSON encoding. serde preserves struct field order and every map here is
//   a `BTreeMap`, so two snapshots with identical field content hash
//   identically on both endpoints.
// - `role_reversed()`: reinterprets the snapshot from the opposite
//   endpoint's viewpoint — decks, piles, and names swap, confirmations
//   swap their bits, pick actors and the winner flip, and the gives balance
//   negates (a card owed *to* me is owed *by* the peer's "me"). The
//   function is an involution: reversing twice yields the original.
//
// Hash comparison convention: a hash on the wire is always computed in the
// sender's own perspective. The receiver compares it against
// `self_snapshot.role_reversed().state_hash()`, which reconstructs exactly
// the sender's perspective when the two states agree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{CardSlot, CharacterId, Confirmation, Phase, PickEvent, PlayerSlot, StateHash};

/// A serializable full copy of session state, used for drift repair and the
/// host's proactive push on (re)connect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub phase: Phase,
    pub rows: u32,
    pub columns: u32,
    /// Deck contents, index 0 = the sending endpoint's own deck.
    pub decks: [Vec<CardSlot>; 2],
    /// Collected-card piles, same indexing as `decks`.
    pub piles: [Vec<CardSlot>; 2],
    pub start_confirm: Confirmation,
    pub next_confirm: Confirmation,
    /// Current turn's pick events, de-duplicated and timestamp-sorted.
    pub picks: Vec<PickEvent>,
    pub turn_winner: Option<PlayerSlot>,
    /// Signed pending card-transfer balance. Positive: the sending endpoint
    /// is owed cards; negative: it owes them.
    pub gives: i32,
    pub traditional_rules: bool,
    pub current_character: Option<CharacterId>,
    /// Externally-owned playing order, referenced (not owned) by the session.
    pub playing_order: Vec<CharacterId>,
    /// Externally-owned per-character music choice.
    pub music_selection: BTreeMap<CharacterId, String>,
    /// Externally-owned per-character temporary-disable flags.
    pub disabled: BTreeMap<CharacterId, bool>,
    /// Display names, index 0 = the sending endpoint's own name.
    pub names: [String; 2],
}

impl SyncSnapshot {
    /// Canonical encoding used for hashing: plain JSON with serde's fixed
    /// struct field order and sorted map keys (all maps are `BTreeMap`).
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deterministic hash of the canonical encoding.
    pub fn state_hash(&self) -> Result<StateHash, serde_json::Error> {
        Ok(StateHash::of(&self.canonical_json()?))
    }

    /// The same logical state seen from the opposite endpoint.
    pub fn role_reversed(mut self) -> Self {
        self.decks.swap(0, 1);
        self.piles.swap(0, 1);
        self.names.swap(0, 1);
        self.start_confirm = self.start_confirm.swapped();
        self.next_confirm = self.next_confirm.swapped();
        for pick in &mut self.picks {
            pick.player = pick.player.flipped();
        }
        self.turn_winner = self.turn_winner.map(PlayerSlot::flipped);
        self.gives = -self.gives;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str, idx: u32) -> CardSlot {
        CardSlot::new(CharacterId::new(id), idx)
    }

    fn sample() -> SyncSnapshot {
        let mut start_confirm = Confirmation::default();
        start_confirm.set(PlayerSlot::LOCAL, true);
        let mut music = BTreeMap::new();
        music.insert(CharacterId::new("fox"), "waltz".to_string());
        let mut disabled = BTreeMap::new();
        disabled.insert(CharacterId::new("owl"), true);
        SyncSnapshot {
            phase: Phase::TurnStart,
            rows: 2,
            columns: 3,
            decks: [
                vec![card("fox", 0), CardSlot::empty()],
                vec![card("owl", 1)],
            ],
            piles: [vec![card("bear", 0)], vec![]],
            start_confirm,
            next_confirm: Confirmation::default(),
            picks: vec![PickEvent {
                timestamp_ms: 100,
                player: PlayerSlot::LOCAL,
                card: card("fox", 0),
            }],
            turn_winner: Some(PlayerSlot::LOCAL),
            gives: 2,
            traditional_rules: false,
            current_character: Some(CharacterId::new("fox")),
            playing_order: vec![CharacterId::new("fox"), CharacterId::new("owl")],
            music_selection: music,
            disabled,
            names: ["Ada".into(), "Brik".into()],
        }
    }

    #[test]
    fn hash_is_deterministic_for_equal_content() {
        let a = sample();
        let b = sample();
        assert_eq!(a.state_hash().unwrap(), b.state_hash().unwrap());
    }

    #[test]
    fn any_field_change_changes_the_hash() {
        let base = sample();
        let base_hash = base.state_hash().unwrap();

        let mut changed = sample();
        changed.gives = 1;
        assert_ne!(changed.state_hash().unwrap(), base_hash);

        let mut changed = sample();
        changed.decks[0][1] = card("newt", 7);
        assert_ne!(changed.state_hash().unwrap(), base_hash);

        let mut changed = sample();
        changed.disabled.insert(CharacterId::new("fox"), true);
        assert_ne!(changed.state_hash().unwrap(), base_hash);
    }

    #[test]
    fn role_reversal_is_an_involution() {
        let snap = sample();
        assert_eq!(snap.clone().role_reversed().role_reversed(), snap);
    }

    #[test]
    fn role_reversal_swaps_perspective() {
        let snap = sample();
        let rev = snap.clone().role_reversed();
        assert_eq!(rev.decks[1], snap.decks[0]);
        assert_eq!(rev.piles[0], snap.piles[1]);
        assert_eq!(rev.names, ["Brik".to_string(), "Ada".to_string()]);
        assert_eq!(rev.gives, -snap.gives);
        assert_eq!(rev.turn_winner, Some(PlayerSlot::REMOTE));
        assert_eq!(rev.picks[0].player, PlayerSlot::REMOTE);
        assert!(rev.start_confirm.get(PlayerSlot::REMOTE));
        assert!(!rev.start_confirm.get(PlayerSlot::LOCAL));
        // Shared, perspective-free fields are untouched.
        assert_eq!(rev.playing_order, snap.playing_order);
        assert_eq!(rev.current_character, snap.current_character);
    }

    #[test]
    fn reversed_hash_reconstructs_sender_perspective() {
        // If two endpoints hold the same logical state (each in its own
        // perspective), the receiver's reversed hash equals the sender's
        // own-perspective hash.
        let sender = sample();
        let receiver = sender.clone().role_reversed();
        assert_eq!(
            receiver.role_reversed().state_hash().unwrap(),
            sender.state_hash().unwrap()
        );
    }

    #[test]
    fn snapshot_json_roundtrip() {
        let snap = sample();
        let json = serde_json::to_string(&snap).unwrap();
        let restored: SyncSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snap);
    }
}
