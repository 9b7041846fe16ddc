// Externally-owned shared context.
//
// The playing order, per-character music selection, and per-character
// temporary-disable flags belong to the surrounding application (character
// roster, audio system), not to the game session. The session reads and
// requests changes to them through this explicit dependency — passed in by
// `&mut` per operation and never stored — so ownership stays with the
// caller and the session's synchronization code can still overwrite them
// during a full-state resync.
//
// Dirty flags track which parts a session operation actually changed, so
// the consumer can skip downstream updates (re-sorting lists, reloading
// audio) when nothing moved. `take_dirty()` drains them.

use std::collections::BTreeMap;

use snapdeck_protocol::types::CharacterId;

/// Which externally-owned data a session operation changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContextDirty {
    pub playing_order: bool,
    pub music_selection: bool,
    pub disabled: bool,
    pub current_character: bool,
}

impl ContextDirty {
    pub fn any(self) -> bool {
        self.playing_order || self.music_selection || self.disabled || self.current_character
    }
}

/// Externally-owned mutable context threaded through session operations.
#[derive(Clone, Debug, Default)]
pub struct SharedContext {
    playing_order: Vec<CharacterId>,
    music_selection: BTreeMap<CharacterId, String>,
    disabled: BTreeMap<CharacterId, bool>,
    dirty: ContextDirty,
}

impl SharedContext {
    pub fn new(playing_order: Vec<CharacterId>) -> Self {
        Self {
            playing_order,
            ..Self::default()
        }
    }

    pub fn playing_order(&self) -> &[CharacterId] {
        &self.playing_order
    }

    pub fn music_selection(&self) -> &BTreeMap<CharacterId, String> {
        &self.music_selection
    }

    pub fn disabled_map(&self) -> &BTreeMap<CharacterId, bool> {
        &self.disabled
    }

    pub fn is_disabled(&self, id: &CharacterId) -> bool {
        self.disabled.get(id).copied().unwrap_or(false)
    }

    /// Replace the playing order. No-op (and no dirty flag) when the new
    /// order equals the current one, to minimize downstream churn.
    pub fn set_playing_order(&mut self, order: Vec<CharacterId>) {
        if self.playing_order != order {
            self.playing_order = order;
            self.dirty.playing_order = true;
        }
    }

    pub fn set_music_selection(&mut self, selection: BTreeMap<CharacterId, String>) {
        if self.music_selection != selection {
            self.music_selection = selection;
            self.dirty.music_selection = true;
        }
    }

    pub fn set_disabled_map(&mut self, disabled: BTreeMap<CharacterId, bool>) {
        if self.disabled != disabled {
            self.disabled = disabled;
            self.dirty.disabled = true;
        }
    }

    pub fn set_disabled(&mut self, id: CharacterId, value: bool) {
        if self.is_disabled(&id) != value {
            self.disabled.insert(id, value);
            self.dirty.disabled = true;
        }
    }

    /// Mark that the current turn character changed (set by the session).
    pub(crate) fn mark_current_character_changed(&mut self) {
        self.dirty.current_character = true;
    }

    /// Drain the dirty flags accumulated since the last call.
    pub fn take_dirty(&mut self) -> ContextDirty {
        std::mem::take(&mut self.dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CharacterId {
        CharacterId::new(s)
    }

    #[test]
    fn identical_order_does_not_dirty() {
        let mut ctx = SharedContext::new(vec![id("a"), id("b")]);
        ctx.set_playing_order(vec![id("a"), id("b")]);
        assert!(!ctx.take_dirty().any());
    }

    #[test]
    fn changed_order_dirties_once() {
        let mut ctx = SharedContext::new(vec![id("a"), id("b")]);
        ctx.set_playing_order(vec![id("b"), id("a")]);
        let dirty = ctx.take_dirty();
        assert!(dirty.playing_order);
        assert!(!dirty.music_selection);
        // Drained.
        assert!(!ctx.take_dirty().any());
    }

    #[test]
    fn disabled_flag_roundtrip() {
        let mut ctx = SharedContext::default();
        assert!(!ctx.is_disabled(&id("a")));
        ctx.set_disabled(id("a"), true);
        assert!(ctx.is_disabled(&id("a")));
        assert!(ctx.take_dirty().disabled);
        // Setting the same value again is a no-op.
        ctx.set_disabled(id("a"), true);
        assert!(!ctx.take_dirty().any());
    }
}
