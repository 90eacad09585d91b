//! Immutable draw records and the append-only log that keeps them.
use serde::{Deserialize, Serialize};

use crate::presets::PresetId;
use crate::tiers::Tier;

/// Which guarantee, if any, produced an outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PityTrigger {
    #[default]
    None,
    /// Soft pity upgraded an undershooting roll to the epic anchor.
    Soft,
    /// Hard pity forced the legendary anchor without rolling.
    Hard,
}

/// One draw, with the tier's weight snapshotted at draw time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawOutcome {
    pub tier_id: String,
    pub tier_name: String,
    /// Weight of the tier when the draw was made.
    pub weight: f64,
    /// One-based position across the lifetime of the session.
    pub index: u64,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    #[serde(default)]
    pub preset: PresetId,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub item_label: String,
    #[serde(default)]
    pub pity: PityTrigger,
}

impl DrawOutcome {
    #[must_use]
    pub fn new(
        tier: &Tier,
        index: u64,
        timestamp: i64,
        preset: PresetId,
        pity: PityTrigger,
    ) -> Self {
        Self {
            tier_id: tier.id.clone(),
            tier_name: tier.name.clone(),
            weight: tier.weight,
            index,
            timestamp,
            preset,
            color: tier.color.clone(),
            item_label: tier.item_label(),
            pity,
        }
    }
}

/// Highest-ranked outcome of a batch, judged by snapshotted weight. Earlier
/// outcomes win ties.
#[must_use]
pub fn best_outcome(outcomes: &[DrawOutcome]) -> Option<&DrawOutcome> {
    outcomes.iter().reduce(|best, candidate| {
        if candidate.weight < best.weight {
            candidate
        } else {
            best
        }
    })
}

/// Ordered, append-only record of every draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    outcomes: Vec<DrawOutcome>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, batch: impl IntoIterator<Item = DrawOutcome>) {
        self.outcomes.extend(batch);
    }

    #[must_use]
    pub fn outcomes(&self) -> &[DrawOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DrawOutcome> {
        self.outcomes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DrawOutcome> {
        self.outcomes.last()
    }

    pub(crate) fn clear(&mut self) {
        self.outcomes.clear();
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a DrawOutcome;
    type IntoIter = std::slice::Iter<'a, DrawOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl From<Vec<DrawOutcome>> for History {
    fn from(outcomes: Vec<DrawOutcome>) -> Self {
        Self { outcomes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(id: &str, weight: f64, index: u64) -> DrawOutcome {
        DrawOutcome::new(
            &Tier::new(id, id, weight, "#fff"),
            index,
            1_700_000_000_000,
            PresetId::Standard,
            PityTrigger::None,
        )
    }

    #[test]
    fn best_outcome_prefers_lowest_weight_then_earliest() {
        let batch = vec![
            outcome("common", 0.6, 1),
            outcome("epic", 0.035, 2),
            outcome("rare", 0.1, 3),
            outcome("epic", 0.035, 4),
        ];
        let best = best_outcome(&batch).unwrap();
        assert_eq!(best.tier_id, "epic");
        assert_eq!(best.index, 2);
        assert!(best_outcome(&[]).is_none());
    }

    #[test]
    fn history_serializes_as_plain_array() {
        let mut history = History::new();
        history.extend(vec![outcome("common", 0.6, 1)]);
        let json = serde_json::to_string(&history).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"item_label\":\"common Item\""));
        let back: History = serde_json::from_str(&json).unwrap();
        assert_eq!(back, history);
    }

    #[test]
    fn legacy_records_without_optional_fields_load() {
        let json = r#"[{"tier_id":"rare","tier_name":"Rare","weight":0.1,"index":1,"timestamp":5}]"#;
        let history: History = serde_json::from_str(json).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history.outcomes()[0].preset, PresetId::Standard);
        assert_eq!(history.outcomes()[0].pity, PityTrigger::None);
    }
}
