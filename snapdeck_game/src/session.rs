// Game session state machine and peer synchronization.
//
// `GameSession` is the aggregate root for one local play session: decks,
// confirmations, the current turn, collected piles, the gives balance, and
// the lifecycle phase. It is single-owner and single-threaded — every
// mutation happens through its methods, driven either by local user
// actions or by decoded wire events from the peer.
//
// ## Phases
//
//   SelectingCards → TurnCountdownStart → TurnStart
//                          → TurnWinnerDetermined → TurnCountdownNext
//                          → TurnStart | GameFinished
//
// `SelectingCards` is also the universal stop/reset target: explicit stop
// and peer disconnect both land there. The start countdown is skipped when
// no remote peer is present.
//
// ## Authority and acknowledgment
//
// The host (or either side when the opponent is absent or automated) is
// the authority: it computes the turn order and drives phase timing. The
// non-authority side, after confirming start or next, marks itself
// awaiting acknowledgment and sends `RequestAck` with its own-perspective
// state hash. The authority replies with a lightweight `Ack` when the
// hashes agree (sender compares against the role-reversed hash of its own
// snapshot) or a full-snapshot `Ack` when they differ — which they
// normally do right after the authority advanced. Applying the snapshot
// both releases the waiting side and repairs any divergence in one step.
//
// ## Role reversal
//
// Inbound events pass through `WireEvent::role_reversed()` exactly once,
// at the top of `handle_remote()`. Everything below that line — and every
// other method — is written from the fixed "self = player 0" viewpoint.
//
// ## Time and timers
//
// The session never reads a clock. Callers pass `now_ms` into operations
// and drive `tick(now_ms)` periodically; the single scheduled turn-advance
// deadline is an `Option<i64>` that is always replaced, never duplicated.
//
// ## Outbox
//
// Mutations that need to reach the peer push `WireEvent`s into an outbox;
// the transport-owning caller drains it with `drain_outbox()` after each
// operation. Events are only queued when the opponent is a remote human.
//
// Every mutating method bumps `version()`, so a caller holding a stale
// view can detect it without diffing state.

use snapdeck_protocol::event::WireEvent;
use snapdeck_protocol::snapshot::SyncSnapshot;
use snapdeck_protocol::types::{
    AckKind, CardSlot, CharacterId, Confirmation, Phase, PickEvent, PlayerSlot, StateHash,
};

use crate::config::{GameConfig, MAX_COLUMNS, MAX_ROWS, MIN_COLUMNS, MIN_ROWS};
use crate::context::SharedContext;
use crate::deck::Deck;
use crate::rng::GameRng;
use crate::turn::{TurnState, calculate_gives};

/// Who the local player is up against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpponentKind {
    /// Practice session, no opponent at all.
    None,
    /// Local automated opponent (no wire traffic).
    Automated,
    /// A human on the other end of the peer link.
    RemoteHuman,
}

/// Inputs to the gives computation captured at winner-determination time,
/// kept so a retroactive winner change can recompute on the same basis.
#[derive(Clone, Copy, Debug)]
struct GivesBasis {
    target_holder: Option<PlayerSlot>,
    empty_local: usize,
    empty_remote: usize,
}

/// One local play session. See the module docs for the big picture.
pub struct GameSession {
    config: GameConfig,
    opponent: OpponentKind,
    is_host: bool,
    phase: Phase,
    decks: [Deck; 2],
    piles: [Vec<CardSlot>; 2],
    start_confirm: Confirmation,
    next_confirm: Confirmation,
    awaiting_ack: Option<AckKind>,
    turn: TurnState,
    gives: i32,
    gives_basis: Option<GivesBasis>,
    /// Net amount of the gives balance already settled by card transfers
    /// this turn, so a late pick can recompute without double-charging.
    gives_settled: i32,
    current_character: Option<CharacterId>,
    turn_started_at_ms: i64,
    advance_deadline_ms: Option<i64>,
    names: [String; 2],
    rng: GameRng,
    version: u64,
    outbox: Vec<WireEvent>,
}

impl GameSession {
    pub fn new(config: GameConfig, opponent: OpponentKind, is_host: bool, seed: u64) -> Self {
        let config = config.clamped();
        let decks = [
            Deck::new(config.rows, config.columns),
            Deck::new(config.rows, config.columns),
        ];
        Self {
            decks,
            opponent,
            is_host,
            phase: Phase::SelectingCards,
            piles: [Vec::new(), Vec::new()],
            start_confirm: Confirmation::default(),
            next_confirm: Confirmation::default(),
            awaiting_ack: None,
            turn: TurnState::default(),
            gives: 0,
            gives_basis: None,
            gives_settled: 0,
            current_character: None,
            turn_started_at_ms: 0,
            advance_deadline_ms: None,
            names: [String::new(), String::new()],
            rng: GameRng::new(seed),
            version: 0,
            outbox: Vec::new(),
            config,
        }
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Monotonic mutation counter. Bumped by every state-changing method.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn deck(&self, player: PlayerSlot) -> &Deck {
        &self.decks[player.index()]
    }

    pub fn pile(&self, player: PlayerSlot) -> &[CardSlot] {
        &self.piles[player.index()]
    }

    pub fn gives(&self) -> i32 {
        self.gives
    }

    pub fn current_character(&self) -> Option<&CharacterId> {
        self.current_character.as_ref()
    }

    pub fn turn_winner(&self) -> Option<PlayerSlot> {
        self.turn.winner()
    }

    pub fn picks(&self) -> &[PickEvent] {
        self.turn.picks()
    }

    pub fn start_confirm(&self) -> Confirmation {
        self.start_confirm
    }

    pub fn next_confirm(&self) -> Confirmation {
        self.next_confirm
    }

    pub fn is_host(&self) -> bool {
        self.is_host
    }

    pub fn opponent(&self) -> OpponentKind {
        self.opponent
    }

    pub fn awaiting_ack(&self) -> Option<AckKind> {
        self.awaiting_ack
    }

    pub fn name(&self, player: PlayerSlot) -> &str {
        &self.names[player.index()]
    }

    /// Display-facing elapsed time for the current turn. Never drives
    /// game logic.
    pub fn turn_elapsed_ms(&self, now_ms: i64) -> i64 {
        (now_ms - self.turn_started_at_ms).max(0)
    }

    /// Drain the queued outbound events. The transport-owning caller sends
    /// them in order after every operation.
    pub fn drain_outbox(&mut self) -> Vec<WireEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn has_remote_human(&self) -> bool {
        self.opponent == OpponentKind::RemoteHuman
    }

    fn gives_economy_enabled(&self) -> bool {
        match self.opponent {
            OpponentKind::RemoteHuman | OpponentKind::Automated => true,
            OpponentKind::None => self.config.solo_gives,
        }
    }

    /// The authority computes turn order and timing. Host, or either side
    /// when there is no remote human to disagree with.
    fn is_authority(&self) -> bool {
        self.is_host || !self.has_remote_human()
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    /// Queue an outbound event, but only when someone is actually listening.
    fn send(&mut self, event: WireEvent) {
        if self.has_remote_human() {
            self.outbox.push(event);
        }
    }

    // -----------------------------------------------------------------
    // Deck mutation
    // -----------------------------------------------------------------

    pub fn set_local_name(&mut self, name: impl Into<String>) {
        self.names[0] = name.into();
        self.touch();
    }

    /// Place a card into a deck. Emits `AddCard` (with the slot actually
    /// used) when `emit` is set and a remote peer is present.
    pub fn place_card(
        &mut self,
        player: PlayerSlot,
        card: CardSlot,
        index: Option<usize>,
        emit: bool,
    ) -> bool {
        let Some(used) = self.decks[player.index()].place(card.clone(), index) else {
            return false;
        };
        self.touch();
        if emit {
            #[expect(clippy::cast_possible_truncation)]
            self.send(WireEvent::AddCard {
                player,
                card,
                index: used as u32,
            });
        }
        true
    }

    /// Remove a card from a deck. Emits `RemoveCard` when requested.
    pub fn remove_card(&mut self, player: PlayerSlot, card: &CardSlot, emit: bool) -> bool {
        if !self.decks[player.index()].remove(card) {
            return false;
        }
        self.touch();
        if emit {
            self.send(WireEvent::RemoveCard {
                player,
                card: card.clone(),
            });
        }
        true
    }

    /// Resize both decks, clamped to the board bounds. Never fails.
    pub fn resize_deck(&mut self, rows: u32, columns: u32, emit: bool) {
        let rows = rows.clamp(MIN_ROWS, MAX_ROWS);
        let columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.config.rows = rows;
        self.config.columns = columns;
        for deck in &mut self.decks {
            deck.resize(rows, columns);
        }
        self.touch();
        if emit {
            self.send(WireEvent::ResizeDeck { rows, columns });
        }
    }

    // -----------------------------------------------------------------
    // Confirmation gates
    // -----------------------------------------------------------------

    /// Confirm game start for the local player. Blocked while an earlier
    /// start acknowledgment is still outstanding. Returns whether the
    /// confirmation was accepted.
    pub fn confirm_start(&mut self, now_ms: i64, ctx: &mut SharedContext, emit: bool) -> bool {
        if self.phase != Phase::SelectingCards || self.awaiting_ack == Some(AckKind::Start) {
            return false;
        }
        if self.start_confirm.get(PlayerSlot::LOCAL) {
            return false;
        }
        self.start_confirm.set(PlayerSlot::LOCAL, true);
        self.touch();
        if emit {
            self.send(WireEvent::ConfirmStart {
                player: PlayerSlot::LOCAL,
            });
        }
        self.check_start_consensus(now_ms, ctx);
        true
    }

    fn check_start_consensus(&mut self, now_ms: i64, ctx: &mut SharedContext) {
        if !self.start_confirm.all(self.has_remote_human()) {
            return;
        }
        if self.is_authority() {
            self.begin_game(now_ms, ctx);
        } else {
            self.awaiting_ack = Some(AckKind::Start);
            let hash = self.own_hash(ctx);
            self.send(WireEvent::RequestAck {
                kind: AckKind::Start,
                hash,
            });
        }
    }

    /// Authority-side game start: shuffle the playing order, pick the first
    /// eligible character, and enter the first turn (via countdown when a
    /// remote peer is present).
    fn begin_game(&mut self, now_ms: i64, ctx: &mut SharedContext) {
        self.start_confirm.reset();
        let mut order: Vec<CharacterId> = ctx.playing_order().to_vec();
        self.rng.shuffle(&mut order);
        ctx.set_playing_order(order);

        let first = ctx
            .playing_order()
            .iter()
            .find(|id| !ctx.is_disabled(id))
            .cloned();
        self.set_current_character(first, ctx);

        if self.current_character.is_none() {
            // Nothing eligible to play.
            self.phase = Phase::GameFinished;
            self.touch();
            return;
        }

        if self.has_remote_human() {
            self.phase = Phase::TurnCountdownStart;
            self.advance_deadline_ms = Some(now_ms + self.config.start_countdown_ms);
            self.touch();
        } else {
            self.enter_turn_start(now_ms);
        }
    }

    /// Confirm turn advance for the local player. Idempotent per player;
    /// refused while a non-zero gives balance is unresolved against a
    /// remote human. Also legal during `TurnStart`, which is how an
    /// unresolvable turn gets skipped.
    pub fn confirm_next(&mut self, now_ms: i64, ctx: &mut SharedContext, emit: bool) -> bool {
        if !matches!(self.phase, Phase::TurnStart | Phase::TurnWinnerDetermined)
            || self.awaiting_ack == Some(AckKind::Next)
        {
            return false;
        }
        if self.has_remote_human() && self.gives != 0 {
            return false;
        }
        if self.next_confirm.get(PlayerSlot::LOCAL) {
            return false;
        }
        self.next_confirm.set(PlayerSlot::LOCAL, true);
        self.touch();
        if emit {
            self.send(WireEvent::ConfirmNext {
                player: PlayerSlot::LOCAL,
            });
        }
        self.check_next_consensus(now_ms, ctx);
        true
    }

    fn check_next_consensus(&mut self, now_ms: i64, ctx: &mut SharedContext) {
        if !self.next_confirm.all(self.has_remote_human()) {
            return;
        }
        self.next_confirm.reset();
        self.cleanup_unresolved_turn(ctx);
        if self.is_authority() {
            self.phase = Phase::TurnCountdownNext;
            // Replacing the deadline also cancels any previously scheduled
            // advance — there is never more than one timer.
            self.advance_deadline_ms = Some(now_ms + self.config.next_delay_ms);
            self.touch();
        } else {
            self.awaiting_ack = Some(AckKind::Next);
            let hash = self.own_hash(ctx);
            self.send(WireEvent::RequestAck {
                kind: AckKind::Next,
                hash,
            });
            self.touch();
        }
    }

    /// If the turn ended with no winner, the target card vanishes silently
    /// from whichever deck holds it.
    fn cleanup_unresolved_turn(&mut self, _ctx: &SharedContext) {
        if self.turn.winner().is_some() {
            return;
        }
        if let Some(target) = self.current_character.clone() {
            for deck in &mut self.decks {
                if let Some(i) = deck
                    .slots()
                    .iter()
                    .position(|s| s.character_id.as_ref() == Some(&target))
                {
                    deck.take_at(i);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Picks and the gives economy
    // -----------------------------------------------------------------

    /// Record a local pick during `TurnStart`. Returns whether it was
    /// accepted.
    pub fn record_local_pick(
        &mut self,
        timestamp_ms: i64,
        card: CardSlot,
        ctx: &mut SharedContext,
        emit: bool,
    ) -> bool {
        if !matches!(self.phase, Phase::TurnStart | Phase::TurnWinnerDetermined) {
            return false;
        }
        let pick = PickEvent {
            timestamp_ms,
            player: PlayerSlot::LOCAL,
            card,
        };
        if emit {
            self.send(WireEvent::Pick(pick.clone()));
        }
        self.apply_pick(pick, ctx);
        true
    }

    /// Apply a pick (local or inbound-reversed remote) and react to winner
    /// determination or retroactive reassignment.
    fn apply_pick(&mut self, pick: PickEvent, ctx: &mut SharedContext) {
        let previous = self.turn.winner();
        let target = self.current_character.clone();
        let winner = self.turn.record_pick(pick, target.as_ref());
        self.touch();
        match (previous, winner) {
            (None, Some(w)) => self.on_winner_determined(w, ctx),
            (Some(a), Some(b)) if a != b => self.reassign_winner(a, b, ctx),
            (Some(_), Some(w)) => {
                // The winner stands, but a late pick (say a wrong pick that
                // arrived after the win) can still change the balance.
                if let (Some(target), Some(basis)) =
                    (self.current_character.clone(), self.gives_basis)
                {
                    self.gives = self.compute_gives(&target, w, basis) - self.gives_settled;
                    if self.opponent == OpponentKind::Automated {
                        self.resolve_gives_randomly();
                    }
                }
            }
            _ => {}
        }
    }

    /// First winner determination for this turn: compute gives, collect the
    /// target card, transition the phase.
    fn on_winner_determined(&mut self, winner: PlayerSlot, _ctx: &mut SharedContext) {
        let Some(target) = self.current_character.clone() else {
            return;
        };

        // Which deck holds the target right now (at most one can).
        let target_holder = [PlayerSlot::LOCAL, PlayerSlot::REMOTE]
            .into_iter()
            .find(|p| {
                self.decks[p.index()]
                    .slots()
                    .iter()
                    .any(|s| s.character_id.as_ref() == Some(&target))
            });

        let basis = GivesBasis {
            target_holder,
            empty_local: self.decks[0].empty_count(),
            empty_remote: self.decks[1].empty_count(),
        };
        self.gives_basis = Some(basis);
        self.gives_settled = 0;
        self.gives = self.compute_gives(&target, winner, basis);

        self.collect_target(&target, winner);
        self.phase = Phase::TurnWinnerDetermined;
        self.touch();

        // Automated opponents settle the transfer economy immediately.
        if self.opponent == OpponentKind::Automated {
            self.resolve_gives_randomly();
        }
    }

    /// A pick with an earlier timestamp arrived after the winner was
    /// already applied: move the collected card and recompute gives on the
    /// original basis.
    fn reassign_winner(&mut self, from: PlayerSlot, to: PlayerSlot, _ctx: &mut SharedContext) {
        let Some(target) = self.current_character.clone() else {
            return;
        };
        if let Some(i) = self.piles[from.index()]
            .iter()
            .position(|c| c.character_id.as_ref() == Some(&target))
        {
            let card = self.piles[from.index()].remove(i);
            self.piles[to.index()].push(card);
        }
        if let Some(basis) = self.gives_basis {
            self.gives = self.compute_gives(&target, to, basis) - self.gives_settled;
            if self.opponent == OpponentKind::Automated {
                self.resolve_gives_randomly();
            }
        }
        self.touch();
    }

    fn compute_gives(&self, target: &CharacterId, winner: PlayerSlot, basis: GivesBasis) -> i32 {
        if !self.gives_economy_enabled() {
            return 0;
        }
        calculate_gives(
            self.turn.picks(),
            target,
            winner,
            basis.target_holder == Some(winner),
            basis.empty_local,
            basis.empty_remote,
            self.config.traditional_rules,
        )
    }

    /// Move the target card into the winner's pile and scrub it from both
    /// decks (only one can actually hold it). When no deck holds the
    /// target the win stands but there is nothing to collect.
    fn collect_target(&mut self, target: &CharacterId, winner: PlayerSlot) {
        let mut collected: Option<CardSlot> = None;
        for deck in &mut self.decks {
            if let Some(i) = deck
                .slots()
                .iter()
                .position(|s| s.character_id.as_ref() == Some(target))
                && let Some(card) = deck.take_at(i)
                && collected.is_none()
            {
                collected = Some(card);
            }
        }
        if let Some(card) = collected {
            self.piles[winner.index()].push(card);
        }
    }

    /// Human flow for settling a debt: the local player gives one of their
    /// cards to the opponent. Only valid while the local side owes
    /// (`gives < 0`). Emits the matching remove/add pair.
    pub fn give_card(&mut self, card: &CardSlot, emit: bool) -> bool {
        if self.gives >= 0 || !self.decks[0].contains(card) {
            return false;
        }
        let Some(index) = self.decks[1].place(card.clone(), None) else {
            return false;
        };
        self.decks[0].remove(card);
        self.gives += 1;
        self.gives_settled -= 1;
        self.touch();
        if emit {
            self.send(WireEvent::RemoveCard {
                player: PlayerSlot::LOCAL,
                card: card.clone(),
            });
            #[expect(clippy::cast_possible_truncation)]
            self.send(WireEvent::AddCard {
                player: PlayerSlot::REMOTE,
                card: card.clone(),
                index: index as u32,
            });
        }
        true
    }

    /// Settle the whole gives balance by randomly pairing occupied source
    /// slots with empty destination slots, capped by capacity on each side.
    /// Used for automated opponents (and solo sessions with `solo_gives`).
    fn resolve_gives_randomly(&mut self) {
        while self.gives != 0 {
            let (src, dst) = if self.gives > 0 { (1, 0) } else { (0, 1) };
            let occupied = self.decks[src].occupied_indices();
            let empty = self.decks[dst].empty_indices();
            if occupied.is_empty() || empty.is_empty() {
                // Out of cards or out of room - forgive the remainder.
                self.gives = 0;
                break;
            }
            let from = occupied[self.rng.below(occupied.len())];
            let to = empty[self.rng.below(empty.len())];
            if let Some(card) = self.decks[src].take_at(from) {
                self.decks[dst].place(card, Some(to));
            }
            self.gives_settled += self.gives.signum();
            self.gives -= self.gives.signum();
        }
        self.touch();
    }

    // -----------------------------------------------------------------
    // Timers and turn advancement
    // -----------------------------------------------------------------

    /// Drive the scheduled turn-advance timer. Call periodically with the
    /// current wall clock; fires at most one transition per call.
    pub fn tick(&mut self, now_ms: i64, ctx: &mut SharedContext) {
        let Some(deadline) = self.advance_deadline_ms else {
            return;
        };
        if now_ms < deadline {
            return;
        }
        self.advance_deadline_ms = None;
        match self.phase {
            Phase::TurnCountdownStart => self.enter_turn_start(now_ms),
            Phase::TurnCountdownNext => self.advance_character(now_ms, ctx),
            _ => {}
        }
    }

    fn enter_turn_start(&mut self, now_ms: i64) {
        self.phase = Phase::TurnStart;
        self.turn.reset();
        self.gives = 0;
        self.gives_basis = None;
        self.gives_settled = 0;
        self.turn_started_at_ms = now_ms;
        self.touch();
    }

    /// Move to the next eligible character in the playing order, skipping
    /// temporarily-disabled entries. Exhausting the order finishes the
    /// game; an order with no eligible characters at all clears the current
    /// character and aborts the advance.
    fn advance_character(&mut self, now_ms: i64, ctx: &mut SharedContext) {
        let order = ctx.playing_order().to_vec();
        let next = match &self.current_character {
            Some(cur) => {
                let after = order.iter().position(|id| id == cur).map_or(0, |i| i + 1);
                order[after..]
                    .iter()
                    .find(|id| !ctx.is_disabled(id))
                    .cloned()
            }
            None => order.iter().find(|id| !ctx.is_disabled(id)).cloned(),
        };
        match next {
            Some(id) => {
                self.set_current_character(Some(id), ctx);
                self.enter_turn_start(now_ms);
            }
            None => {
                self.set_current_character(None, ctx);
                self.phase = Phase::GameFinished;
                self.touch();
            }
        }
    }

    fn set_current_character(&mut self, id: Option<CharacterId>, ctx: &mut SharedContext) {
        if self.current_character != id {
            self.current_character = id;
            ctx.mark_current_character_changed();
            self.touch();
        }
    }

    // -----------------------------------------------------------------
    // Stop / connection lifecycle
    // -----------------------------------------------------------------

    /// Reset to the card-selection phase: confirmations reset, piles and
    /// picks cleared, pending gives discarded, timers cancelled. Deck
    /// contents survive.
    pub fn stop(&mut self, ctx: &mut SharedContext) {
        self.phase = Phase::SelectingCards;
        self.start_confirm.reset();
        self.next_confirm.reset();
        self.awaiting_ack = None;
        self.turn.reset();
        self.gives = 0;
        self.gives_basis = None;
        self.gives_settled = 0;
        self.piles = [Vec::new(), Vec::new()];
        self.advance_deadline_ms = None;
        self.set_current_character(None, ctx);
        self.touch();
    }

    /// Peer link dropped: unconditional reset. No game-resume-after-
    /// disconnect is supported.
    pub fn peer_disconnected(&mut self, ctx: &mut SharedContext) {
        self.stop(ctx);
    }

    /// Peer link (re)established. Both sides announce their display name;
    /// the host additionally pushes full synchronization data.
    pub fn peer_connected(&mut self, ctx: &SharedContext) {
        let display_name = self.names[0].clone();
        self.send(WireEvent::Hello { display_name });
        if self.is_host {
            self.push_full_sync(ctx);
        }
    }

    /// Unsolicited full-state push (`Ack{Sync, has_full_data}`).
    pub fn push_full_sync(&mut self, ctx: &SharedContext) {
        let snapshot = self.snapshot(ctx);
        let hash = snapshot.state_hash().unwrap_or(StateHash(0));
        self.send(WireEvent::Ack {
            kind: AckKind::Sync,
            hash,
            has_full_data: true,
            snapshot: Some(Box::new(snapshot)),
        });
        self.touch();
    }

    /// Ask the peer to verify consistency against our state hash.
    pub fn request_sync(&mut self, ctx: &SharedContext) {
        let hash = self.own_hash(ctx);
        self.send(WireEvent::RequestAck {
            kind: AckKind::Sync,
            hash,
        });
        self.touch();
    }

    // -----------------------------------------------------------------
    // Snapshots and hashing
    // -----------------------------------------------------------------

    /// Project the full session state (own perspective) for hashing or
    /// transmission.
    pub fn snapshot(&self, ctx: &SharedContext) -> SyncSnapshot {
        SyncSnapshot {
            phase: self.phase,
            rows: self.config.rows,
            columns: self.config.columns,
            decks: [self.decks[0].slots().to_vec(), self.decks[1].slots().to_vec()],
            piles: [self.piles[0].clone(), self.piles[1].clone()],
            start_confirm: self.start_confirm,
            next_confirm: self.next_confirm,
            picks: self.turn.picks().to_vec(),
            turn_winner: self.turn.winner(),
            gives: self.gives,
            traditional_rules: self.config.traditional_rules,
            current_character: self.current_character.clone(),
            playing_order: ctx.playing_order().to_vec(),
            music_selection: ctx.music_selection().clone(),
            disabled: ctx.disabled_map().clone(),
            names: self.names.clone(),
        }
    }

    /// Own-perspective state hash. Snapshot serialization cannot fail for
    /// these types; the zero fallback would merely force a full resync.
    fn own_hash(&self, ctx: &SharedContext) -> StateHash {
        self.snapshot(ctx).state_hash().unwrap_or(StateHash(0))
    }

    /// Hash our state as the *peer* would see it — used to compare against
    /// hashes received on the wire, which are always in the sender's
    /// perspective.
    fn reversed_hash(&self, ctx: &SharedContext) -> StateHash {
        self.snapshot(ctx)
            .role_reversed()
            .state_hash()
            .unwrap_or(StateHash(0))
    }

    /// Overwrite local state from an already-role-reversed snapshot.
    /// Externally-owned data goes through the context setters, which are
    /// no-ops when nothing actually differs.
    pub fn apply_snapshot(&mut self, snap: SyncSnapshot, now_ms: i64, ctx: &mut SharedContext) {
        let SyncSnapshot {
            phase,
            rows,
            columns,
            decks,
            piles,
            start_confirm,
            next_confirm,
            picks,
            turn_winner,
            gives,
            traditional_rules,
            current_character,
            playing_order,
            music_selection,
            disabled,
            names,
        } = snap;

        self.config.rows = rows.clamp(MIN_ROWS, MAX_ROWS);
        self.config.columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.config.traditional_rules = traditional_rules;
        let [deck0, deck1] = decks;
        self.decks = [
            Deck::from_slots(self.config.rows, self.config.columns, deck0),
            Deck::from_slots(self.config.rows, self.config.columns, deck1),
        ];
        self.piles = piles;
        self.start_confirm = start_confirm;
        self.next_confirm = next_confirm;
        self.gives = gives;
        self.gives_basis = None;
        self.gives_settled = 0;
        // The remote name is authoritative for slot 1; our own stays ours.
        self.names[1] = names[1].clone();

        ctx.set_playing_order(playing_order);
        ctx.set_music_selection(music_selection);
        ctx.set_disabled_map(disabled);
        self.set_current_character(current_character, ctx);

        self.turn
            .restore(picks, turn_winner, self.current_character.as_ref());

        if self.phase != phase {
            self.phase = phase;
            match phase {
                Phase::TurnCountdownStart => {
                    self.advance_deadline_ms = Some(now_ms + self.config.start_countdown_ms);
                }
                Phase::TurnCountdownNext => {
                    self.advance_deadline_ms = Some(now_ms + self.config.next_delay_ms);
                }
                Phase::TurnStart => {
                    self.advance_deadline_ms = None;
                    self.turn_started_at_ms = now_ms;
                }
                _ => {
                    self.advance_deadline_ms = None;
                }
            }
        }
        self.touch();
    }

    // -----------------------------------------------------------------
    // Inbound event dispatch
    // -----------------------------------------------------------------

    /// Apply one decoded wire event from the peer. Role reversal happens
    /// here, once, and nowhere else.
    pub fn handle_remote(&mut self, event: WireEvent, now_ms: i64, ctx: &mut SharedContext) {
        match event.role_reversed() {
            WireEvent::Hello { display_name } => {
                self.names[1] = display_name;
                self.touch();
            }
            WireEvent::AddCard {
                player,
                card,
                index,
            } => {
                self.decks[player.index()].place(card, Some(index as usize));
                // An inbound card landing in our deck mid-settlement is the
                // peer paying down its debt to us.
                if player == PlayerSlot::LOCAL
                    && self.phase == Phase::TurnWinnerDetermined
                    && self.gives > 0
                {
                    self.gives -= 1;
                    self.gives_settled += 1;
                }
                self.touch();
            }
            WireEvent::RemoveCard { player, card } => {
                self.decks[player.index()].remove(&card);
                self.touch();
            }
            WireEvent::ResizeDeck { rows, columns } => {
                self.resize_deck(rows, columns, false);
            }
            WireEvent::ConfirmStart { player } => {
                if !self.start_confirm.get(player) {
                    self.start_confirm.set(player, true);
                    self.touch();
                    self.check_start_consensus(now_ms, ctx);
                }
            }
            WireEvent::ConfirmNext { player } => {
                // Idempotent: a repeat confirm before consensus is a no-op.
                if matches!(self.phase, Phase::TurnStart | Phase::TurnWinnerDetermined)
                    && !self.next_confirm.get(player)
                {
                    self.next_confirm.set(player, true);
                    self.touch();
                    self.check_next_consensus(now_ms, ctx);
                }
            }
            WireEvent::Pick(pick) => {
                self.apply_pick(pick, ctx);
            }
            WireEvent::RequestAck { kind, hash } => {
                self.answer_ack_request(kind, hash, ctx);
            }
            WireEvent::Ack {
                kind,
                hash: _,
                has_full_data,
                snapshot,
            } => {
                self.receive_ack(kind, has_full_data, snapshot.map(|s| *s), now_ms, ctx);
            }
        }
    }

    /// Reply to a `RequestAck`: lightweight when the peer's hash matches
    /// our role-reversed hash, full snapshot when it does not.
    fn answer_ack_request(&mut self, kind: AckKind, peer_hash: StateHash, ctx: &SharedContext) {
        let matches = peer_hash == self.reversed_hash(ctx);
        let own_hash = self.own_hash(ctx);
        let snapshot = if matches {
            None
        } else {
            Some(Box::new(self.snapshot(ctx)))
        };
        self.send(WireEvent::Ack {
            kind,
            hash: own_hash,
            has_full_data: !matches,
            snapshot,
        });
        self.touch();
    }

    /// Handle an `Ack` reply or unsolicited push. Full data overwrites our
    /// state; either form releases a matching awaiting-acknowledgment gate.
    fn receive_ack(
        &mut self,
        kind: AckKind,
        has_full_data: bool,
        snapshot: Option<SyncSnapshot>,
        now_ms: i64,
        ctx: &mut SharedContext,
    ) {
        let was_awaiting = self.awaiting_ack == Some(kind);
        if was_awaiting {
            self.awaiting_ack = None;
            self.touch();
        }
        if has_full_data {
            if let Some(snap) = snapshot {
                self.apply_snapshot(snap, now_ms, ctx);
            }
            return;
        }
        // Lightweight ack while waiting: states already agree, so the
        // pending transition is derivable locally.
        if was_awaiting {
            match kind {
                AckKind::Start => {
                    self.start_confirm.reset();
                    let first = ctx
                        .playing_order()
                        .iter()
                        .find(|id| !ctx.is_disabled(id))
                        .cloned();
                    self.set_current_character(first, ctx);
                    if self.current_character.is_some() {
                        self.phase = Phase::TurnCountdownStart;
                        self.advance_deadline_ms = Some(now_ms + self.config.start_countdown_ms);
                    } else {
                        self.phase = Phase::GameFinished;
                    }
                    self.touch();
                }
                AckKind::Next => {
                    self.phase = Phase::TurnCountdownNext;
                    self.advance_deadline_ms = Some(now_ms + self.config.next_delay_ms);
                    self.touch();
                }
                AckKind::Sync => {}
            }
        }
    }
}
