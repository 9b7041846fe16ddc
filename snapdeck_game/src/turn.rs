// Turn engine: winner determination and the card-transfer economy.
//
// A turn has a target character. Both sides race to pick it; pick events
// arrive with sender-side timestamps and may duplicate (both players
// claiming the same character, or a re-delivered local echo). The engine
// keeps the pick list sorted ascending by timestamp and de-duplicated per
// character — only the earliest claim of a character survives, so a
// character can be "won" at most once per turn and duplicates never count
// twice in the gives computation.
//
// The gives balance is signed from the local viewpoint: positive means the
// local player is owed cards, negative means they owe them. Every wrong
// pick costs the picker one card; a correct pick whose winner did *not*
// already hold the target in their own deck earns the winner one card
// instead (the steal rule). Traditional rules suppress the whole economy.
// The net is clamped to the receiving side's empty-slot count in both
// directions — nobody can be forced to receive cards they have no room for.

use smallvec::SmallVec;
use snapdeck_protocol::types::{CharacterId, PickEvent, PlayerSlot};

/// Pick events and winner for the current turn. Reset at every turn start.
#[derive(Clone, Debug, Default)]
pub struct TurnState {
    picks: SmallVec<[PickEvent; 8]>,
    winner: Option<PlayerSlot>,
}

impl TurnState {
    /// Clear picks and winner for a fresh turn.
    pub fn reset(&mut self) {
        self.picks.clear();
        self.winner = None;
    }

    pub fn winner(&self) -> Option<PlayerSlot> {
        self.winner
    }

    /// Sorted, de-duplicated pick events recorded so far.
    pub fn picks(&self) -> &[PickEvent] {
        &self.picks
    }

    /// Replace the pick list wholesale (snapshot apply). Re-normalizes and
    /// re-derives the winner against the given target.
    pub fn restore(
        &mut self,
        picks: Vec<PickEvent>,
        winner: Option<PlayerSlot>,
        target: Option<&CharacterId>,
    ) {
        self.picks = picks.into();
        self.normalize();
        self.winner = winner.or_else(|| self.scan_winner(target));
    }

    /// Record one pick and re-derive the winner from the normalized list.
    ///
    /// The winner is never latched: a pick with an earlier timestamp may
    /// arrive after a later one was already applied (messages carry sender
    /// timestamps, not arrival order), in which case the earlier claim
    /// takes the win retroactively. Callers compare the returned winner
    /// with the previous one to detect both first determination and
    /// reassignment.
    pub fn record_pick(
        &mut self,
        pick: PickEvent,
        target: Option<&CharacterId>,
    ) -> Option<PlayerSlot> {
        self.picks.push(pick);
        self.normalize();
        self.winner = self.scan_winner(target);
        self.winner
    }

    /// Sort ascending by timestamp and keep only the earliest claim per
    /// character. The sort is stable, so simultaneous timestamps keep
    /// arrival order.
    fn normalize(&mut self) {
        self.picks.sort_by_key(|p| p.timestamp_ms);
        let mut seen: Vec<Option<CharacterId>> = Vec::new();
        self.picks.retain(|p| {
            if seen.contains(&p.card.character_id) {
                false
            } else {
                seen.push(p.card.character_id.clone());
                true
            }
        });
    }

    /// First pick in sorted order claiming the target character.
    fn scan_winner(&self, target: Option<&CharacterId>) -> Option<PlayerSlot> {
        let target = target?;
        self.picks
            .iter()
            .find(|p| p.card.character_id.as_ref() == Some(target))
            .map(|p| p.player)
    }
}

/// Compute the signed gives balance after a winner is determined.
///
/// `winner_held_target` is whether the winner's own deck contained the
/// target card at the time of the pick; `empty_local` / `empty_remote` are
/// the receiving capacities used for clamping.
pub fn calculate_gives(
    picks: &[PickEvent],
    target: &CharacterId,
    winner: PlayerSlot,
    winner_held_target: bool,
    empty_local: usize,
    empty_remote: usize,
    traditional_rules: bool,
) -> i32 {
    if traditional_rules {
        return 0;
    }

    let mut gives: i32 = 0;
    for pick in picks {
        if pick.card.character_id.as_ref() == Some(target) {
            continue;
        }
        // Wrong pick: the picker owes one card to the other side.
        if pick.player == PlayerSlot::LOCAL {
            gives -= 1;
        } else {
            gives += 1;
        }
    }

    // Steal rule: winning with a card you never held earns a card instead.
    if !winner_held_target {
        if winner == PlayerSlot::LOCAL {
            gives += 1;
        } else {
            gives -= 1;
        }
    }

    // Clamp to the receiving side's capacity.
    let empty_local = i32::try_from(empty_local).unwrap_or(i32::MAX);
    let empty_remote = i32::try_from(empty_remote).unwrap_or(i32::MAX);
    if gives > 0 {
        gives.min(empty_local)
    } else {
        gives.max(-empty_remote)
    }
}

#[cfg(test)]
mod tests {
    use snapdeck_protocol::types::CardSlot;

    use super::*;

    fn pick(ts: i64, player: PlayerSlot, id: &str) -> PickEvent {
        PickEvent {
            timestamp_ms: ts,
            player,
            card: CardSlot::new(CharacterId::new(id), 0),
        }
    }

    #[test]
    fn earlier_timestamp_wins_even_when_it_arrives_second() {
        let mut turn = TurnState::default();
        let target = CharacterId::new("x");
        // Later claim arrives first on this endpoint.
        let w = turn.record_pick(pick(105, PlayerSlot::REMOTE, "x"), Some(&target));
        assert_eq!(w, Some(PlayerSlot::REMOTE));
        let w = turn.record_pick(pick(100, PlayerSlot::LOCAL, "x"), Some(&target));

        assert_eq!(turn.picks().len(), 1, "duplicate claim discarded");
        assert_eq!(turn.picks()[0].timestamp_ms, 100);
        assert_eq!(w, Some(PlayerSlot::LOCAL), "win reassigned to earlier claim");
    }

    #[test]
    fn winner_is_earliest_correct_pick() {
        let mut turn = TurnState::default();
        let target = CharacterId::new("x");
        assert_eq!(
            turn.record_pick(pick(90, PlayerSlot::LOCAL, "wrong"), Some(&target)),
            None
        );
        assert_eq!(
            turn.record_pick(pick(100, PlayerSlot::LOCAL, "x"), Some(&target)),
            Some(PlayerSlot::LOCAL)
        );
        assert_eq!(
            turn.record_pick(pick(105, PlayerSlot::REMOTE, "x"), Some(&target)),
            Some(PlayerSlot::LOCAL)
        );
        assert_eq!(turn.picks().len(), 2, "duplicate x dropped, wrong kept");
    }

    #[test]
    fn no_target_no_winner() {
        let mut turn = TurnState::default();
        assert_eq!(turn.record_pick(pick(100, PlayerSlot::LOCAL, "x"), None), None);
        assert_eq!(turn.winner(), None);
    }

    #[test]
    fn reset_clears_everything() {
        let mut turn = TurnState::default();
        let target = CharacterId::new("x");
        turn.record_pick(pick(100, PlayerSlot::LOCAL, "x"), Some(&target));
        turn.reset();
        assert!(turn.picks().is_empty());
        assert_eq!(turn.winner(), None);
    }

    #[test]
    fn restore_rederives_winner() {
        let mut turn = TurnState::default();
        let target = CharacterId::new("x");
        turn.restore(
            vec![
                pick(105, PlayerSlot::REMOTE, "x"),
                pick(100, PlayerSlot::LOCAL, "x"),
            ],
            None,
            Some(&target),
        );
        assert_eq!(turn.winner(), Some(PlayerSlot::LOCAL));
        assert_eq!(turn.picks().len(), 1);
    }

    // -----------------------------------------------------------------
    // Gives economy
    // -----------------------------------------------------------------

    #[test]
    fn wrong_picks_cost_the_picker() {
        let target = CharacterId::new("x");
        let picks = vec![
            pick(90, PlayerSlot::LOCAL, "wrong1"),
            pick(95, PlayerSlot::REMOTE, "wrong2"),
            pick(96, PlayerSlot::REMOTE, "wrong3"),
            pick(100, PlayerSlot::LOCAL, "x"),
        ];
        // Winner held the target: no steal bonus. Net: -1 + 2 = +1.
        let gives = calculate_gives(&picks, &target, PlayerSlot::LOCAL, true, 10, 10, false);
        assert_eq!(gives, 1);
    }

    #[test]
    fn steal_rule_awards_the_winner() {
        let target = CharacterId::new("x");
        let picks = vec![pick(100, PlayerSlot::LOCAL, "x")];
        let gives = calculate_gives(&picks, &target, PlayerSlot::LOCAL, false, 10, 10, false);
        assert_eq!(gives, 1, "winner who never held the target receives one");

        let picks = vec![pick(100, PlayerSlot::REMOTE, "x")];
        let gives = calculate_gives(&picks, &target, PlayerSlot::REMOTE, false, 10, 10, false);
        assert_eq!(gives, -1);
    }

    #[test]
    fn traditional_rules_suppress_everything() {
        let target = CharacterId::new("x");
        let picks = vec![
            pick(90, PlayerSlot::REMOTE, "wrong"),
            pick(100, PlayerSlot::LOCAL, "x"),
        ];
        assert_eq!(
            calculate_gives(&picks, &target, PlayerSlot::LOCAL, false, 10, 10, true),
            0
        );
    }

    #[test]
    fn gives_clamped_to_receiver_capacity() {
        let target = CharacterId::new("x");
        let picks = vec![
            pick(90, PlayerSlot::REMOTE, "w1"),
            pick(91, PlayerSlot::REMOTE, "w2"),
            pick(92, PlayerSlot::REMOTE, "w3"),
            pick(100, PlayerSlot::LOCAL, "x"),
        ];
        // Net +3 (or +4 with steal) but local only has 2 empty slots.
        let gives = calculate_gives(&picks, &target, PlayerSlot::LOCAL, true, 2, 10, false);
        assert_eq!(gives, 2);

        // Mirror: local owes 3 but remote only has room for 1.
        let picks = vec![
            pick(90, PlayerSlot::LOCAL, "w1"),
            pick(91, PlayerSlot::LOCAL, "w2"),
            pick(92, PlayerSlot::LOCAL, "w3"),
            pick(100, PlayerSlot::REMOTE, "x"),
        ];
        let gives = calculate_gives(&picks, &target, PlayerSlot::REMOTE, true, 10, 1, false);
        assert_eq!(gives, -1);
    }

    #[test]
    fn duplicate_pick_not_double_counted() {
        // Scenario C from the session tests, at the engine level: the
        // de-duplicated list has one claim of x, so the loser's duplicate
        // contributes nothing to gives.
        let mut turn = TurnState::default();
        let target = CharacterId::new("x");
        turn.record_pick(pick(100, PlayerSlot::LOCAL, "x"), Some(&target));
        turn.record_pick(pick(105, PlayerSlot::REMOTE, "x"), Some(&target));
        let gives = calculate_gives(
            turn.picks(),
            &target,
            turn.winner().unwrap(),
            true,
            10,
            10,
            false,
        );
        assert_eq!(gives, 0);
    }
}
