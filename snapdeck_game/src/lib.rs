// snapdeck_game — deterministic game core for two-party card sessions.
//
// Everything in this crate is single-threaded and clock-free: operations
// take `now_ms` arguments and timers are polled through `tick()`, so the
// same inputs always produce the same state on both endpoints. The crate
// knows nothing about sockets; it consumes decoded `WireEvent`s and emits
// outbound ones through the session outbox, leaving transport to
// `snapdeck_link`.
//
// Module overview:
// - `session.rs`:  `GameSession` — the aggregate state machine: phases,
//                  confirmations, the acknowledgment handshake, picks,
//                  the gives economy, snapshots and drift repair.
// - `deck.rs`:     Fixed-geometry card grid with placement, removal and
//                  order-preserving resize.
// - `turn.rs`:     Pick normalization and winner derivation, plus the
//                  gives calculation.
// - `context.rs`:  Externally-owned shared context (playing order, music,
//                  disabled characters) with change tracking.
// - `config.rs`:   Session configuration and board bounds.
// - `settings.rs`: Local persistence of display name and board geometry
//                  behind a key-value store trait.
// - `rng.rs`:      Seeded xoshiro256++ generator for the order shuffle
//                  and automated card transfers.
//
// Determinism constraint: no `HashMap` iteration and no ambient
// randomness anywhere in this crate. Ordered containers and the seeded
// generator only, so state hashes agree across endpoints.

pub mod config;
pub mod context;
pub mod deck;
pub mod rng;
pub mod session;
pub mod settings;
pub mod turn;

pub use config::GameConfig;
pub use context::{ContextDirty, SharedContext};
pub use deck::Deck;
pub use session::{GameSession, OpponentKind};
pub use turn::TurnState;
