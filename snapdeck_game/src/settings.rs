// Persisted local settings.
//
// Two keys live in an external key/value store (platform preferences, a
// settings file — the session does not care): the player's display name
// and the board geometry. Both are read once at startup and written only
// when they differ from the built-in defaults, so a fresh install leaves
// the store untouched.
//
// Geometry is clamped to the board bounds from `config.rs` on load;
// whatever junk the store holds, the session sees a legal board.

use serde::{Deserialize, Serialize};

use crate::config::{
    DEFAULT_PLAYER_NAME, MAX_COLUMNS, MAX_ROWS, MIN_COLUMNS, MIN_ROWS,
};

/// Store key for the player's display name.
pub const KEY_PLAYER_NAME: &str = "player_display_name";
/// Store key for the board geometry JSON object.
pub const KEY_BOARD_GEOMETRY: &str = "board_geometry";

/// Minimal key/value storage surface the settings layer needs.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Card size plus deck dimensions, persisted as one JSON object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardGeometry {
    pub card_size: f32,
    pub deck_rows: u32,
    pub deck_columns: u32,
}

impl Default for BoardGeometry {
    fn default() -> Self {
        Self {
            card_size: 1.0,
            deck_rows: 3,
            deck_columns: 8,
        }
    }
}

impl BoardGeometry {
    /// Clamp dimensions into the legal board bounds.
    pub fn clamped(mut self) -> Self {
        self.deck_rows = self.deck_rows.clamp(MIN_ROWS, MAX_ROWS);
        self.deck_columns = self.deck_columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self
    }
}

/// Settings as loaded at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalSettings {
    pub player_name: String,
    pub geometry: BoardGeometry,
}

/// Read both settings, falling back to defaults for missing or unparseable
/// values and clamping geometry to legal bounds.
pub fn load_settings(store: &dyn KeyValueStore) -> LocalSettings {
    let player_name = store
        .get(KEY_PLAYER_NAME)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| DEFAULT_PLAYER_NAME.to_string());

    let geometry = store
        .get(KEY_BOARD_GEOMETRY)
        .and_then(|json| serde_json::from_str::<BoardGeometry>(&json).ok())
        .unwrap_or_default()
        .clamped();

    LocalSettings {
        player_name,
        geometry,
    }
}

/// Persist the display name, but only when it differs from the default
/// placeholder. Reverting to the placeholder removes the key.
pub fn store_player_name(store: &mut dyn KeyValueStore, name: &str) {
    if name == DEFAULT_PLAYER_NAME || name.is_empty() {
        store.remove(KEY_PLAYER_NAME);
    } else {
        store.set(KEY_PLAYER_NAME, name);
    }
}

/// Persist the board geometry, but only when it differs from the defaults.
pub fn store_geometry(
    store: &mut dyn KeyValueStore,
    geometry: &BoardGeometry,
) -> Result<(), serde_json::Error> {
    if *geometry == BoardGeometry::default() {
        store.remove(KEY_BOARD_GEOMETRY);
    } else {
        store.set(KEY_BOARD_GEOMETRY, &serde_json::to_string(geometry)?);
    }
    Ok(())
}

/// In-memory store, used in tests and headless runs.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(std::collections::BTreeMap<String, String>);

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.0.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_store_loads_defaults() {
        let store = MemoryStore::default();
        let settings = load_settings(&store);
        assert_eq!(settings.player_name, DEFAULT_PLAYER_NAME);
        assert_eq!(settings.geometry, BoardGeometry::default());
    }

    #[test]
    fn default_name_is_not_persisted() {
        let mut store = MemoryStore::default();
        store_player_name(&mut store, DEFAULT_PLAYER_NAME);
        assert_eq!(store.get(KEY_PLAYER_NAME), None);

        store_player_name(&mut store, "Ada");
        assert_eq!(store.get(KEY_PLAYER_NAME), Some("Ada".to_string()));

        // Reverting to the placeholder clears the key again.
        store_player_name(&mut store, DEFAULT_PLAYER_NAME);
        assert_eq!(store.get(KEY_PLAYER_NAME), None);
    }

    #[test]
    fn default_geometry_is_not_persisted() {
        let mut store = MemoryStore::default();
        store_geometry(&mut store, &BoardGeometry::default()).unwrap();
        assert_eq!(store.get(KEY_BOARD_GEOMETRY), None);

        let custom = BoardGeometry {
            card_size: 1.5,
            deck_rows: 2,
            deck_columns: 10,
        };
        store_geometry(&mut store, &custom).unwrap();
        assert!(store.get(KEY_BOARD_GEOMETRY).is_some());
        assert_eq!(load_settings(&store).geometry, custom);
    }

    #[test]
    fn out_of_bounds_geometry_is_clamped_on_load() {
        let mut store = MemoryStore::default();
        store.set(
            KEY_BOARD_GEOMETRY,
            r#"{"card_size":1.0,"deck_rows":50,"deck_columns":0}"#,
        );
        let settings = load_settings(&store);
        assert_eq!(settings.geometry.deck_rows, MAX_ROWS);
        assert_eq!(settings.geometry.deck_columns, MIN_COLUMNS);
    }

    #[test]
    fn unparseable_geometry_falls_back_to_defaults() {
        let mut store = MemoryStore::default();
        store.set(KEY_BOARD_GEOMETRY, "not json at all");
        assert_eq!(load_settings(&store).geometry, BoardGeometry::default());
    }
}
