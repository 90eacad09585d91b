//! Reward tiers and the ordered tables draws are made from.
//!
//! Rarity rank is never stored. It is derived from weight: the lower the weight,
//! the higher the rank. Tiers sharing a weight keep their declaration order, so
//! the tier declared first outranks the one declared after it.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{GachaError, Result};

/// A single reward tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Stable identifier, shared across presets for the same rarity band.
    pub id: String,
    pub name: String,
    /// Draw probability in (0, 1].
    pub weight: f64,
    /// Presentation hint only.
    #[serde(default)]
    pub color: String,
}

impl Tier {
    #[must_use]
    pub fn new(id: &str, name: &str, weight: f64, color: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            weight,
            color: color.to_string(),
        }
    }

    /// Label shown for the item awarded by this tier.
    #[must_use]
    pub fn item_label(&self) -> String {
        format!("{} Item", self.name)
    }
}

/// Serialized shape of a [`TierTable`]; validated on conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTableSpec {
    pub tiers: Vec<Tier>,
    pub legendary_anchor: String,
    pub epic_anchor: String,
}

/// Validated, rank-indexed set of tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TierTableSpec", into = "TierTableSpec")]
pub struct TierTable {
    tiers: Vec<Tier>,
    /// Indices into `tiers`, rarest first.
    ranked: Vec<usize>,
    legendary: usize,
    epic: usize,
}

impl TierTable {
    /// Build a table from tiers in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::InvalidTable`] when the table is empty, ids repeat,
    /// a weight falls outside (0, 1], an anchor is missing, or the epic anchor
    /// is not strictly below the legendary anchor in rank.
    pub fn new(tiers: Vec<Tier>, legendary_anchor: &str, epic_anchor: &str) -> Result<Self> {
        if tiers.is_empty() {
            return Err(GachaError::InvalidTable("table has no tiers".into()));
        }
        let mut seen = HashSet::new();
        for tier in &tiers {
            if !seen.insert(tier.id.as_str()) {
                return Err(GachaError::InvalidTable(format!(
                    "duplicate tier id `{}`",
                    tier.id
                )));
            }
            if !tier.weight.is_finite() || tier.weight <= 0.0 || tier.weight > 1.0 {
                return Err(GachaError::InvalidTable(format!(
                    "tier `{}` weight {} outside (0, 1]",
                    tier.id, tier.weight
                )));
            }
        }

        let mut ranked: Vec<usize> = (0..tiers.len()).collect();
        // sort_by is stable: equal weights keep declaration order.
        ranked.sort_by(|&a, &b| tiers[a].weight.total_cmp(&tiers[b].weight));

        let position = |id: &str| tiers.iter().position(|tier| tier.id == id);
        let legendary = position(legendary_anchor).ok_or_else(|| {
            GachaError::InvalidTable(format!("legendary anchor `{legendary_anchor}` missing"))
        })?;
        let epic = position(epic_anchor).ok_or_else(|| {
            GachaError::InvalidTable(format!("epic anchor `{epic_anchor}` missing"))
        })?;

        let table = Self {
            tiers,
            ranked,
            legendary,
            epic,
        };
        if table.rank_at(epic) <= table.rank_at(legendary) {
            return Err(GachaError::InvalidTable(format!(
                "epic anchor `{epic_anchor}` must rank below legendary anchor `{legendary_anchor}`"
            )));
        }
        Ok(table)
    }

    fn rank_at(&self, index: usize) -> usize {
        self.ranked
            .iter()
            .position(|&i| i == index)
            .unwrap_or(self.ranked.len())
    }

    /// Tiers in declaration order.
    #[must_use]
    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Tiers ordered rarest first (ascending weight).
    pub fn ranked(&self) -> impl Iterator<Item = &Tier> + '_ {
        self.ranked.iter().map(|&i| &self.tiers[i])
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.id == id)
    }

    /// Rank of a tier, 0 being the rarest.
    #[must_use]
    pub fn rank_of(&self, id: &str) -> Option<usize> {
        self.ranked.iter().position(|&i| self.tiers[i].id == id)
    }

    #[must_use]
    pub fn legendary_anchor(&self) -> &Tier {
        &self.tiers[self.legendary]
    }

    #[must_use]
    pub fn epic_anchor(&self) -> &Tier {
        &self.tiers[self.epic]
    }

    /// Highest-weight tier; the fallback when a roll is not covered.
    #[must_use]
    pub fn common(&self) -> &Tier {
        let last = self.ranked[self.ranked.len() - 1];
        &self.tiers[last]
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.tiers.iter().map(|tier| tier.weight).sum()
    }

    /// Whether `id` ranks at or above the legendary anchor.
    #[must_use]
    pub fn is_legendary_or_better(&self, id: &str) -> bool {
        self.at_or_above(id, self.legendary)
    }

    /// Whether `id` ranks at or above the epic anchor.
    #[must_use]
    pub fn is_epic_or_better(&self, id: &str) -> bool {
        self.at_or_above(id, self.epic)
    }

    fn at_or_above(&self, id: &str, anchor: usize) -> bool {
        self.rank_of(id)
            .is_some_and(|rank| rank <= self.rank_at(anchor))
    }
}

impl TryFrom<TierTableSpec> for TierTable {
    type Error = GachaError;

    fn try_from(spec: TierTableSpec) -> Result<Self> {
        Self::new(spec.tiers, &spec.legendary_anchor, &spec.epic_anchor)
    }
}

impl From<TierTable> for TierTableSpec {
    fn from(table: TierTable) -> Self {
        let legendary_anchor = table.legendary_anchor().id.clone();
        let epic_anchor = table.epic_anchor().id.clone();
        Self {
            tiers: table.tiers,
            legendary_anchor,
            epic_anchor,
        }
    }
}
