//! Pity configuration and the two-counter streak state machine.
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_EPIC_THRESHOLD, DEFAULT_LEGENDARY_THRESHOLD};
use crate::error::{GachaError, Result};
use crate::tiers::TierTable;

/// Guarantee thresholds. A threshold of `n` forces the anchor on the `n`-th
/// consecutive draw without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityConfig {
    #[serde(default = "PityConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "PityConfig::default_epic_threshold")]
    pub epic_threshold: u32,
    #[serde(default = "PityConfig::default_legendary_threshold")]
    pub legendary_threshold: u32,
}

impl PityConfig {
    const fn default_enabled() -> bool {
        true
    }

    const fn default_epic_threshold() -> u32 {
        DEFAULT_EPIC_THRESHOLD
    }

    const fn default_legendary_threshold() -> u32 {
        DEFAULT_LEGENDARY_THRESHOLD
    }

    /// Same thresholds with guarantees switched off.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::standard()
        }
    }

    #[must_use]
    pub const fn standard() -> Self {
        Self {
            enabled: Self::default_enabled(),
            epic_threshold: Self::default_epic_threshold(),
            legendary_threshold: Self::default_legendary_threshold(),
        }
    }

    /// # Errors
    ///
    /// Returns [`GachaError::InvalidArgument`] when a threshold is zero.
    pub fn validate(&self) -> Result<()> {
        if self.epic_threshold == 0 {
            return Err(GachaError::InvalidArgument(
                "epic threshold must be at least 1".into(),
            ));
        }
        if self.legendary_threshold == 0 {
            return Err(GachaError::InvalidArgument(
                "legendary threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for PityConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Consecutive-miss counters, one per guaranteed anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PityCounter {
    #[serde(default)]
    pub epic: u32,
    #[serde(default)]
    pub legendary: u32,
}

impl PityCounter {
    #[must_use]
    pub const fn new(epic: u32, legendary: u32) -> Self {
        Self { epic, legendary }
    }

    /// The next draw is forced to the legendary anchor.
    #[must_use]
    pub const fn hard_pity_due(&self, config: &PityConfig) -> bool {
        config.enabled && self.legendary >= config.legendary_threshold.saturating_sub(1)
    }

    /// The next draw is upgraded to the epic anchor if it undershoots.
    #[must_use]
    pub const fn soft_pity_due(&self, config: &PityConfig) -> bool {
        config.enabled && self.epic >= config.epic_threshold.saturating_sub(1)
    }

    /// Advance both streaks given the tier that was finally awarded.
    pub fn record(&mut self, table: &TierTable, tier_id: &str) {
        if table.is_legendary_or_better(tier_id) {
            self.legendary = 0;
            self.epic = 0;
        } else if table.is_epic_or_better(tier_id) {
            self.epic = 0;
            self.legendary = self.legendary.saturating_add(1);
        } else {
            self.epic = self.epic.saturating_add(1);
            self.legendary = self.legendary.saturating_add(1);
        }
    }

    /// Hard pity only closes the legendary streak; the epic streak keeps counting.
    pub fn reset_legendary(&mut self) {
        self.legendary = 0;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
