// Game configuration.
//
// All tunable session parameters live in `GameConfig`, loadable from JSON.
// The session never uses magic numbers for timing or board geometry — it
// reads from the config. Per-field serde defaults let a partial JSON
// document (or `{}`) produce a fully-populated config.
//
// Board bounds are hard limits, not config: the UI and the settings store
// both clamp to them, and `GameConfig::clamped()` normalizes out-of-range
// values rather than erroring.
//
// `solo_gives` deserves a note: whether the card-transfer economy applies
// in a practice session with no opponent is genuinely ambiguous in the
// rules, so it is an explicit switch rather than a baked-in guess. Both
// settings are exercised in the turn-engine tests.

use serde::{Deserialize, Serialize};

/// Minimum deck rows.
pub const MIN_ROWS: u32 = 1;
/// Maximum deck rows.
pub const MAX_ROWS: u32 = 5;
/// Minimum deck columns.
pub const MIN_COLUMNS: u32 = 1;
/// Maximum deck columns.
pub const MAX_COLUMNS: u32 = 15;

/// Placeholder shown until the player picks a name. Never persisted.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Tunable session parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Initial deck rows.
    #[serde(default = "default_rows")]
    pub rows: u32,
    /// Initial deck columns.
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Delay between start consensus and the first turn when a remote peer
    /// is present, in milliseconds.
    #[serde(default = "default_start_countdown_ms")]
    pub start_countdown_ms: i64,
    /// Fixed delay between next-consensus and the following turn, in
    /// milliseconds.
    #[serde(default = "default_next_delay_ms")]
    pub next_delay_ms: i64,
    /// Traditional rules: the gives economy is disabled entirely.
    #[serde(default)]
    pub traditional_rules: bool,
    /// Whether the gives economy applies in a session with no opponent.
    #[serde(default)]
    pub solo_gives: bool,
}

fn default_rows() -> u32 {
    3
}

fn default_columns() -> u32 {
    8
}

fn default_start_countdown_ms() -> i64 {
    3_000
}

fn default_next_delay_ms() -> i64 {
    3_000
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            start_countdown_ms: default_start_countdown_ms(),
            next_delay_ms: default_next_delay_ms(),
            traditional_rules: false,
            solo_gives: false,
        }
    }
}

impl GameConfig {
    /// Normalize out-of-range values to the board bounds.
    pub fn clamped(mut self) -> Self {
        self.rows = self.rows.clamp(MIN_ROWS, MAX_ROWS);
        self.columns = self.columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self
    }
}
