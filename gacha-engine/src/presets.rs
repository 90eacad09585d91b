//! Named preset tables and the catalog that resolves them.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::constants::{EPIC_ANCHOR_ID, LEGENDARY_ANCHOR_ID};
use crate::error::{GachaError, Result};
use crate::tiers::{Tier, TierTable};

/// Identifier of a built-in rate preset.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresetId {
    #[default]
    Standard,
    Generous,
    Predatory,
}

impl PresetId {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Generous, Self::Predatory];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Generous => "GENEROUS",
            Self::Predatory => "PREDATORY",
        }
    }
}

impl fmt::Display for PresetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetId {
    type Err = GachaError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| GachaError::UnknownPreset(wanted.to_string()))
    }
}

fn standard_table() -> Result<TierTable> {
    TierTable::new(
        vec![
            Tier::new("common", "Common", 0.60, "#b0b0b0"),
            Tier::new("uncommon", "Uncommon", 0.25, "#4caf50"),
            Tier::new("rare", "Rare", 0.10, "#2196f3"),
            Tier::new("epic", "Epic", 0.035, "#9c27b0"),
            Tier::new("legendary", "Legendary", 0.013, "#ffc107"),
            Tier::new("mythic", "Mythic", 0.002, "#ff0055"),
        ],
        LEGENDARY_ANCHOR_ID,
        EPIC_ANCHOR_ID,
    )
}

fn generous_table() -> Result<TierTable> {
    TierTable::new(
        vec![
            Tier::new("common", "Trash", 0.40, "#b0b0b0"),
            Tier::new("uncommon", "Normal", 0.30, "#4caf50"),
            Tier::new("rare", "Cool", 0.15, "#2196f3"),
            Tier::new("epic", "Super", 0.10, "#9c27b0"),
            Tier::new("legendary", "Hyper", 0.04, "#ffc107"),
            Tier::new("mythic", "ULTRA", 0.01, "#ff0055"),
        ],
        LEGENDARY_ANCHOR_ID,
        EPIC_ANCHOR_ID,
    )
}

fn predatory_table() -> Result<TierTable> {
    TierTable::new(
        vec![
            Tier::new("common", "Junk", 0.80, "#787878"),
            Tier::new("uncommon", "Basic", 0.15, "#555"),
            Tier::new("rare", "Rare", 0.04, "#2196f3"),
            Tier::new("epic", "Epic", 0.008, "#9c27b0"),
            Tier::new("legendary", "Legend", 0.0019, "#ffc107"),
            Tier::new("mythic", "GOD", 0.0001, "#ff0055"),
        ],
        LEGENDARY_ANCHOR_ID,
        EPIC_ANCHOR_ID,
    )
}

/// Tables for every preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetCatalog {
    tables: BTreeMap<PresetId, TierTable>,
}

impl PresetCatalog {
    /// The three shipped rate presets.
    #[must_use]
    pub fn builtin() -> Self {
        let mut tables = BTreeMap::new();
        for (preset, table) in [
            (PresetId::Standard, standard_table()),
            (PresetId::Generous, generous_table()),
            (PresetId::Predatory, predatory_table()),
        ] {
            match table {
                Ok(table) => {
                    tables.insert(preset, table);
                }
                Err(err) => log::error!("built-in preset {preset} rejected: {err}"),
            }
        }
        Self { tables }
    }

    /// Load preset overrides from JSON, keyed by preset name. Presets not
    /// named in the document keep their built-in table.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed, names an unknown preset,
    /// or any table fails validation.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: BTreeMap<PresetId, TierTable> = serde_json::from_str(json)
            .map_err(|err| GachaError::InvalidTable(err.to_string()))?;
        let mut catalog = Self::builtin();
        catalog.tables.extend(overrides);
        Ok(catalog)
    }

    /// Resolve a preset table.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::UnknownPreset`] when the catalog has no table for the preset.
    pub fn table(&self, preset: PresetId) -> Result<&TierTable> {
        self.tables
            .get(&preset)
            .ok_or_else(|| GachaError::UnknownPreset(preset.to_string()))
    }

    /// Resolve a preset table by its name.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::UnknownPreset`] when the name matches no preset.
    pub fn table_by_name(&self, name: &str) -> Result<&TierTable> {
        self.table(name.parse()?)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PresetId, &TierTable)> + '_ {
        self.tables.iter().map(|(preset, table)| (*preset, table))
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
