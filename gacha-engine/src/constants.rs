//! Centralized tuning constants for the draw engine.
//!
//! Pity thresholds and storage keys live here so the defaults can only be
//! adjusted via reviewed code changes.

// Pity defaults --------------------------------------------------------------
pub const DEFAULT_EPIC_THRESHOLD: u32 = 10;
pub const DEFAULT_LEGENDARY_THRESHOLD: u32 = 90;

// Economy --------------------------------------------------------------------
pub const DEFAULT_COST_PER_PULL: f64 = 2.0;

// Storage keys ---------------------------------------------------------------
pub const STATE_KEY: &str = "gacha_state";
pub const HISTORY_KEY: &str = "gacha_history";

// Anchor ids shared by the built-in presets ------------------------------------
pub const LEGENDARY_ANCHOR_ID: &str = "legendary";
pub const EPIC_ANCHOR_ID: &str = "epic";

// Randomness -----------------------------------------------------------------
pub(crate) const DRAW_STREAM_TAG: &[u8] = b"gacha-draw";
