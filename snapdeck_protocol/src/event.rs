// Wire events exchanged between the two peers.
//
// Every cross-peer action is one `WireEvent`, sent as a single framed
// message (see `framing.rs`). The enum is the complete protocol vocabulary;
// there is no second channel.
//
// Role reversal: each endpoint models itself as player 0, so every inbound
// event must be passed through `role_reversed()` exactly once — at the
// synchronization boundary, before the session applies it. The function
// flips every player index it carries, including the actors inside an
// embedded snapshot. Outbound events are sent as-is, in the sender's own
// perspective.
//
// The `Ack` snapshot is boxed: it is by far the largest payload and would
// otherwise inflate every `WireEvent` on the stack.

use serde::{Deserialize, Serialize};

use crate::snapshot::SyncSnapshot;
use crate::types::{AckKind, CardSlot, PickEvent, PlayerSlot, StateHash};

/// A single peer-to-peer protocol message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WireEvent {
    /// Sender's display name, announced by both sides on (re)connect.
    Hello { display_name: String },
    /// A card was placed into a deck. `index` is the slot actually used,
    /// so both sides converge on identical layouts.
    AddCard {
        player: PlayerSlot,
        card: CardSlot,
        index: u32,
    },
    /// A card was removed from a deck.
    RemoveCard { player: PlayerSlot, card: CardSlot },
    /// Board dimensions changed; applies to both decks.
    ResizeDeck { rows: u32, columns: u32 },
    /// Sender confirmed the start gate.
    ConfirmStart { player: PlayerSlot },
    /// Sender confirmed the next-turn gate.
    ConfirmNext { player: PlayerSlot },
    /// Sender claimed a character this turn.
    Pick(PickEvent),
    /// Request acknowledgment for a start/next/sync negotiation, carrying
    /// the sender's own-perspective state hash.
    RequestAck { kind: AckKind, hash: StateHash },
    /// Acknowledgment reply (or unsolicited full-state push). Carries the
    /// full snapshot only when the responder detected drift or is pushing
    /// state proactively.
    Ack {
        kind: AckKind,
        hash: StateHash,
        has_full_data: bool,
        snapshot: Option<Box<SyncSnapshot>>,
    },
}

impl WireEvent {
    /// Reinterpret the event from the receiving endpoint's viewpoint.
    /// Applied exactly once per inbound event, never to outbound ones.
    pub fn role_reversed(self) -> Self {
        match self {
            WireEvent::AddCard {
                player,
                card,
                index,
            } => WireEvent::AddCard {
                player: player.flipped(),
                card,
                index,
            },
            WireEvent::RemoveCard { player, card } => WireEvent::RemoveCard {
                player: player.flipped(),
                card,
            },
            WireEvent::ConfirmStart { player } => WireEvent::ConfirmStart {
                player: player.flipped(),
            },
            WireEvent::ConfirmNext { player } => WireEvent::ConfirmNext {
                player: player.flipped(),
            },
            WireEvent::Pick(pick) => WireEvent::Pick(pick.role_reversed()),
            WireEvent::Ack {
                kind,
                hash,
                has_full_data,
                snapshot,
            } => WireEvent::Ack {
                kind,
                hash,
                has_full_data,
                snapshot: snapshot.map(|s| Box::new(s.role_reversed())),
            },
            // Hello, ResizeDeck, and RequestAck carry no player indices.
            other => other,
        }
    }
}
