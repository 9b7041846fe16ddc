// snapdeck_protocol — wire protocol for two-party game sessions.
//
// This crate defines the shared vocabulary used by both endpoints of a
// Snapdeck session: the core card/player types, the discriminated wire
// events, full-state snapshots with deterministic hashing, and the framing
// used to move events over a byte stream. It is shared between the game
// core (`snapdeck_game`) and the transport (`snapdeck_link`) and depends
// on neither.
//
// Module overview:
// - `types.rs`:    `CharacterId`, `PlayerSlot`, `CardSlot`, `PickEvent`,
//                  `Confirmation`, `AckKind`, `Phase`, `StateHash`.
// - `event.rs`:    `WireEvent` — the complete protocol vocabulary — plus
//                  the role-reversal mapping applied to inbound events.
// - `snapshot.rs`: `SyncSnapshot` with canonical JSON encoding, 32-bit
//                  deterministic hashing, and perspective reversal.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write`:
//                  4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Human-inspectable on the wire, and the
//   canonical encoding doubles as the hashing input. serde struct field
//   order plus `BTreeMap` keys make it deterministic across endpoints.
// - **Local = player 0.** Each endpoint writes all state from its own
//   viewpoint; `role_reversed()` is applied once, at the boundary.
// - **No async runtime.** Framing works over blocking `std::io` streams.

pub mod event;
pub mod framing;
pub mod snapshot;
pub mod types;

pub use event::WireEvent;
pub use framing::{MAX_EVENT_SIZE, decode_event, read_frame, write_event};
pub use snapshot::SyncSnapshot;
pub use types::{
    AckKind, CardSlot, CharacterId, Confirmation, Phase, PickEvent, PlayerSlot, StateHash,
};

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Cursor;

    use super::*;

    /// Serialize an event to JSON, frame it, read it back, deserialize.
    fn roundtrip(event: &WireEvent) {
        let mut wire = Vec::new();
        write_event(&mut wire, event).unwrap();

        let mut cursor = Cursor::new(&wire);
        let frame = read_frame(&mut cursor).unwrap();
        let recovered = decode_event(&frame).unwrap();
        assert_eq!(&recovered, event);
    }

    fn card(id: &str, idx: u32) -> CardSlot {
        CardSlot::new(CharacterId::new(id), idx)
    }

    #[test]
    fn roundtrip_hello() {
        roundtrip(&WireEvent::Hello {
            display_name: "Ada".into(),
        });
    }

    #[test]
    fn roundtrip_add_card() {
        roundtrip(&WireEvent::AddCard {
            player: PlayerSlot::LOCAL,
            card: card("fox", 2),
            index: 5,
        });
    }

    #[test]
    fn roundtrip_add_card_empty_slot_sentinel() {
        // An empty card reference still carries an explicit null character.
        roundtrip(&WireEvent::AddCard {
            player: PlayerSlot::REMOTE,
            card: CardSlot::empty(),
            index: 0,
        });
    }

    #[test]
    fn roundtrip_remove_card() {
        roundtrip(&WireEvent::RemoveCard {
            player: PlayerSlot::LOCAL,
            card: card("owl", 0),
        });
    }

    #[test]
    fn roundtrip_resize_deck() {
        roundtrip(&WireEvent::ResizeDeck {
            rows: 5,
            columns: 15,
        });
    }

    #[test]
    fn roundtrip_confirm_start() {
        roundtrip(&WireEvent::ConfirmStart {
            player: PlayerSlot::LOCAL,
        });
    }

    #[test]
    fn roundtrip_confirm_next() {
        roundtrip(&WireEvent::ConfirmNext {
            player: PlayerSlot::REMOTE,
        });
    }

    #[test]
    fn roundtrip_pick() {
        roundtrip(&WireEvent::Pick(PickEvent {
            timestamp_ms: 1_722_000_000_123,
            player: PlayerSlot::LOCAL,
            card: card("bear", 1),
        }));
    }

    #[test]
    fn roundtrip_request_ack() {
        roundtrip(&WireEvent::RequestAck {
            kind: AckKind::Next,
            hash: StateHash(-194_712_004),
        });
    }

    #[test]
    fn roundtrip_lightweight_ack() {
        roundtrip(&WireEvent::Ack {
            kind: AckKind::Start,
            hash: StateHash(77),
            has_full_data: false,
            snapshot: None,
        });
    }

    #[test]
    fn roundtrip_full_data_ack() {
        let snapshot = SyncSnapshot {
            phase: Phase::TurnWinnerDetermined,
            rows: 1,
            columns: 2,
            decks: [vec![card("fox", 0), CardSlot::empty()], vec![
                CardSlot::empty(),
                card("owl", 3),
            ]],
            piles: [vec![], vec![card("bear", 0)]],
            start_confirm: Confirmation::default(),
            next_confirm: Confirmation::default(),
            picks: vec![PickEvent {
                timestamp_ms: 100,
                player: PlayerSlot::REMOTE,
                card: card("owl", 3),
            }],
            turn_winner: Some(PlayerSlot::REMOTE),
            gives: -1,
            traditional_rules: true,
            current_character: Some(CharacterId::new("owl")),
            playing_order: vec![CharacterId::new("owl"), CharacterId::new("fox")],
            music_selection: BTreeMap::new(),
            disabled: BTreeMap::new(),
            names: ["Ada".into(), "Brik".into()],
        };
        roundtrip(&WireEvent::Ack {
            kind: AckKind::Sync,
            hash: snapshot.state_hash().unwrap(),
            has_full_data: true,
            snapshot: Some(Box::new(snapshot)),
        });
    }
}
