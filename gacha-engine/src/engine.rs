//! The draw engine: hard pity, weighted selection, soft pity, streak update.
use hmac::{Hmac, Mac};
use log::{debug, info};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::{DEFAULT_COST_PER_PULL, DRAW_STREAM_TAG};
use crate::error::{GachaError, Result};
use crate::history::{DrawOutcome, History, PityTrigger};
use crate::pity::{PityConfig, PityCounter};
use crate::presets::{PresetCatalog, PresetId};
use crate::tiers::{Tier, TierTable};

/// Per-engine configuration. Each engine owns its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub preset: PresetId,
    #[serde(default)]
    pub pity: PityConfig,
    #[serde(default = "EngineConfig::default_cost_per_pull")]
    pub cost_per_pull: f64,
}

impl EngineConfig {
    const fn default_cost_per_pull() -> f64 {
        DEFAULT_COST_PER_PULL
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preset: PresetId::default(),
            pity: PityConfig::default(),
            cost_per_pull: Self::default_cost_per_pull(),
        }
    }
}

/// Persistable portion of engine state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub pull_count: u64,
    pub pity_counter: PityCounter,
    pub history: History,
}

/// Pick the tier covering `roll`, walking tiers rarest first.
///
/// A roll past the cumulative weight (tables summing below 1) falls back to
/// the table's common tier.
#[must_use]
pub fn select_tier(table: &TierTable, roll: f64) -> &Tier {
    let mut cumulative = 0.0_f64;
    for tier in table.ranked() {
        cumulative += tier.weight;
        if roll < cumulative {
            return tier;
        }
    }
    table.common()
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0_u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Draw engine owning its tier tables, pity state and history.
#[derive(Debug, Clone)]
pub struct DrawEngine<R = SmallRng> {
    catalog: PresetCatalog,
    preset: PresetId,
    table: TierTable,
    pity_config: PityConfig,
    cost_per_pull: f64,
    pity: PityCounter,
    pull_count: u64,
    history: History,
    rng: R,
}

impl DrawEngine<SmallRng> {
    /// Engine over the built-in presets with a reproducible stream derived from `seed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn seeded(config: EngineConfig, seed: u64) -> Result<Self> {
        Self::seeded_with(config, PresetCatalog::builtin(), seed)
    }

    /// Seeded engine over a custom catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the catalog lacks the preset.
    pub fn seeded_with(config: EngineConfig, catalog: PresetCatalog, seed: u64) -> Result<Self> {
        let rng = SmallRng::seed_from_u64(derive_stream_seed(seed, DRAW_STREAM_TAG));
        Self::with_rng(config, catalog, rng)
    }

    /// Engine over the built-in presets seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_entropy(config: EngineConfig) -> Result<Self> {
        Self::with_rng(config, PresetCatalog::builtin(), SmallRng::from_entropy())
    }
}

impl<R: Rng> DrawEngine<R> {
    /// Engine with an explicit catalog and random source.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::InvalidArgument`] for zero pity thresholds or a
    /// negative/non-finite pull cost, and [`GachaError::UnknownPreset`] when the
    /// catalog lacks the configured preset.
    pub fn with_rng(config: EngineConfig, catalog: PresetCatalog, rng: R) -> Result<Self> {
        config.pity.validate()?;
        if !config.cost_per_pull.is_finite() || config.cost_per_pull < 0.0 {
            return Err(GachaError::InvalidArgument(format!(
                "cost per pull must be a non-negative number (got {})",
                config.cost_per_pull
            )));
        }
        let table = catalog.table(config.preset)?.clone();
        Ok(Self {
            catalog,
            preset: config.preset,
            table,
            pity_config: config.pity,
            cost_per_pull: config.cost_per_pull,
            pity: PityCounter::default(),
            pull_count: 0,
            history: History::new(),
            rng,
        })
    }

    /// Draw a single tier, advancing pity state. Does not touch history.
    pub fn roll(&mut self) -> Tier {
        self.roll_traced().0
    }

    fn roll_traced(&mut self) -> (Tier, PityTrigger) {
        if self.pity.hard_pity_due(&self.pity_config) {
            let tier = self.table.legendary_anchor().clone();
            debug!(
                "hard pity after {} misses -> {}",
                self.pity.legendary, tier.id
            );
            self.pity.reset_legendary();
            return (tier, PityTrigger::Hard);
        }

        let roll = self.rng.r#gen::<f64>();
        let mut tier = select_tier(&self.table, roll);
        let mut trigger = PityTrigger::None;

        let epic = self.table.epic_anchor();
        if self.pity.soft_pity_due(&self.pity_config) && tier.weight > epic.weight {
            debug!(
                "soft pity after {} misses: {} -> {}",
                self.pity.epic, tier.id, epic.id
            );
            tier = epic;
            trigger = PityTrigger::Soft;
        }

        let tier = tier.clone();
        self.pity.record(&self.table, &tier.id);
        (tier, trigger)
    }

    /// Perform `amount` sequential draws and append them to history as one batch.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::InvalidArgument`] when `amount` is not positive or
    /// the lifetime pull count would overflow.
    pub fn pull(&mut self, amount: i64) -> Result<Vec<DrawOutcome>> {
        let count = u64::try_from(amount)
            .ok()
            .filter(|count| *count > 0)
            .ok_or_else(|| {
                GachaError::InvalidArgument(format!(
                    "pull amount must be a positive integer (got {amount})"
                ))
            })?;
        let new_total = self.pull_count.checked_add(count).ok_or_else(|| {
            GachaError::InvalidArgument(format!(
                "pull count {} cannot grow by {count}",
                self.pull_count
            ))
        })?;

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut batch = Vec::new();
        for offset in 1..=count {
            let (tier, trigger) = self.roll_traced();
            batch.push(DrawOutcome::new(
                &tier,
                self.pull_count + offset,
                timestamp,
                self.preset,
                trigger,
            ));
        }
        self.pull_count = new_total;
        self.history.extend(batch.iter().cloned());
        Ok(batch)
    }

    /// Clear history, pull count and pity streaks. Configuration is kept.
    pub fn reset(&mut self) {
        info!("resetting draw engine after {} pulls", self.pull_count);
        self.history.clear();
        self.pull_count = 0;
        self.pity.clear();
    }

    /// Swap the table used for future draws. Pity state and history are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::UnknownPreset`] when the catalog lacks the preset.
    pub fn set_preset(&mut self, preset: PresetId) -> Result<()> {
        let table = self.catalog.table(preset)?.clone();
        info!("switching preset {} -> {}", self.preset, preset);
        self.table = table;
        self.preset = preset;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`GachaError::UnknownPreset`] when the name matches no preset.
    pub fn set_preset_by_name(&mut self, name: &str) -> Result<()> {
        self.set_preset(name.parse()?)
    }

    /// # Errors
    ///
    /// Returns [`GachaError::InvalidArgument`] for zero thresholds.
    pub fn set_pity(&mut self, config: PityConfig) -> Result<()> {
        config.validate()?;
        self.pity_config = config;
        Ok(())
    }

    /// Active tiers, rarest first.
    #[must_use]
    pub fn active_tiers(&self) -> Vec<&Tier> {
        self.table.ranked().collect()
    }

    #[must_use]
    pub const fn active_table(&self) -> &TierTable {
        &self.table
    }

    #[must_use]
    pub const fn active_preset(&self) -> PresetId {
        self.preset
    }

    #[must_use]
    pub const fn catalog(&self) -> &PresetCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn pity_config(&self) -> PityConfig {
        self.pity_config
    }

    #[must_use]
    pub const fn cost_per_pull(&self) -> f64 {
        self.cost_per_pull
    }

    #[must_use]
    pub const fn pull_count(&self) -> u64 {
        self.pull_count
    }

    #[must_use]
    pub const fn pity_counter(&self) -> PityCounter {
        self.pity
    }

    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            pull_count: self.pull_count,
            pity_counter: self.pity,
            history: self.history.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: EngineSnapshot) {
        self.pull_count = snapshot.pull_count;
        self.pity = snapshot.pity_counter;
        self.history = snapshot.history;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    /// Source whose every f64 sample is ~0.99999, i.e. always the common tier.
    fn high_rng() -> StepRng {
        StepRng::new(u64::MAX, 0)
    }

    /// Source whose every f64 sample is 0.0, i.e. always the rarest tier.
    fn low_rng() -> StepRng {
        StepRng::new(0, 0)
    }

    fn engine_with(rng: StepRng, pity: PityConfig) -> DrawEngine<StepRng> {
        let config = EngineConfig {
            pity,
            ..EngineConfig::default()
        };
        DrawEngine::with_rng(config, PresetCatalog::builtin(), rng).unwrap()
    }

    #[test]
    fn select_tier_walks_rarest_first() {
        let catalog = PresetCatalog::builtin();
        let table = catalog.table(PresetId::Standard).unwrap();
        assert_eq!(select_tier(table, 0.0).id, "mythic");
        assert_eq!(select_tier(table, 0.0019).id, "mythic");
        assert_eq!(select_tier(table, 0.002).id, "legendary");
        assert_eq!(select_tier(table, 0.014).id, "epic");
        assert_eq!(select_tier(table, 0.05).id, "rare");
        assert_eq!(select_tier(table, 0.2).id, "uncommon");
        assert_eq!(select_tier(table, 0.9).id, "common");
    }

    #[test]
    fn uncovered_roll_falls_back_to_common() {
        let table = TierTable::new(
            vec![
                Tier::new("common", "Common", 0.5, ""),
                Tier::new("epic", "Epic", 0.1, ""),
                Tier::new("legendary", "Legendary", 0.05, ""),
            ],
            "legendary",
            "epic",
        )
        .unwrap();
        assert!(table.total_weight() < 1.0);
        assert_eq!(select_tier(&table, 0.7).id, "common");
        assert_eq!(select_tier(&table, 0.999_999).id, "common");
    }

    #[test]
    fn hard_pity_forces_legendary_regardless_of_roll() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        engine.restore(EngineSnapshot {
            pity_counter: PityCounter::new(3, 89),
            ..EngineSnapshot::default()
        });
        let tier = engine.roll();
        assert_eq!(tier.id, "legendary");
        assert_eq!(engine.pity_counter(), PityCounter::new(3, 0));

        assert_eq!(engine.roll().id, "common");
        assert_eq!(engine.pity_counter(), PityCounter::new(4, 1));
    }

    #[test]
    fn hard_pity_takes_precedence_over_a_mythic_roll() {
        let mut engine = engine_with(low_rng(), PityConfig::default());
        engine.restore(EngineSnapshot {
            pity_counter: PityCounter::new(9, 89),
            ..EngineSnapshot::default()
        });
        assert_eq!(engine.roll().id, "legendary");
    }

    #[test]
    fn soft_pity_upgrades_undershooting_roll() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        engine.restore(EngineSnapshot {
            pity_counter: PityCounter::new(9, 20),
            ..EngineSnapshot::default()
        });
        let outcome = engine.pull(1).unwrap().remove(0);
        assert_eq!(outcome.tier_id, "epic");
        assert_eq!(outcome.pity, PityTrigger::Soft);
        assert_eq!(engine.pity_counter(), PityCounter::new(0, 21));
    }

    #[test]
    fn soft_pity_keeps_better_rolls() {
        let mut engine = engine_with(low_rng(), PityConfig::default());
        engine.restore(EngineSnapshot {
            pity_counter: PityCounter::new(9, 20),
            ..EngineSnapshot::default()
        });
        let outcome = engine.pull(1).unwrap().remove(0);
        assert_eq!(outcome.tier_id, "mythic");
        assert_eq!(outcome.pity, PityTrigger::None);
        assert_eq!(engine.pity_counter(), PityCounter::default());
    }

    #[test]
    fn disabled_pity_never_intervenes() {
        let mut engine = engine_with(high_rng(), PityConfig::disabled());
        let outcomes = engine.pull(200).unwrap();
        assert!(outcomes.iter().all(|o| o.tier_id == "common"));
        assert_eq!(engine.pity_counter(), PityCounter::new(200, 200));
    }

    #[test]
    fn every_tenth_pull_is_epic_on_a_dry_streak() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        let outcomes = engine.pull(30).unwrap();
        let epic_indices: Vec<u64> = outcomes
            .iter()
            .filter(|o| o.tier_id == "epic")
            .map(|o| o.index)
            .collect();
        assert_eq!(epic_indices, vec![10, 20, 30]);
    }

    #[test]
    fn pull_rejects_non_positive_amounts() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        for amount in [0, -1, i64::MIN] {
            let err = engine.pull(amount).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        }
        assert_eq!(engine.pull_count(), 0);
        assert!(engine.history().is_empty());
    }

    #[test]
    fn pull_rejects_overflowing_pull_count() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        engine.restore(EngineSnapshot {
            pull_count: u64::MAX,
            pity_counter: PityCounter::new(4, 40),
            ..EngineSnapshot::default()
        });
        let err = engine.pull(1).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
        assert_eq!(engine.pull_count(), u64::MAX);
        assert_eq!(engine.pity_counter(), PityCounter::new(4, 40));
        assert!(engine.history().is_empty());

        engine.restore(EngineSnapshot {
            pull_count: u64::MAX - 2,
            ..EngineSnapshot::default()
        });
        assert!(engine.pull(3).is_err());
        let last = engine.pull(2).unwrap();
        assert_eq!(last[1].index, u64::MAX);
    }

    #[test]
    fn pull_indices_continue_across_batches() {
        let mut engine = engine_with(high_rng(), PityConfig::disabled());
        engine.pull(3).unwrap();
        let second = engine.pull(2).unwrap();
        assert_eq!(second[0].index, 4);
        assert_eq!(second[1].index, 5);
        assert_eq!(engine.pull_count(), 5);
        assert_eq!(engine.history().len(), 5);
        assert_eq!(second[0].item_label, "Common Item");
    }

    #[test]
    fn preset_switch_keeps_pity_and_history() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        engine.pull(5).unwrap();
        let before = engine.snapshot();
        engine.set_preset(PresetId::Predatory).unwrap();
        assert_eq!(engine.snapshot(), before);
        assert_eq!(engine.active_preset(), PresetId::Predatory);
        assert_eq!(engine.active_tiers()[0].name, "GOD");
        let next = engine.pull(1).unwrap().remove(0);
        assert_eq!(next.preset, PresetId::Predatory);
        assert!((next.weight - 0.80).abs() < f64::EPSILON);
        assert!(engine.history().outcomes()[..5]
            .iter()
            .all(|o| (o.weight - 0.60).abs() < f64::EPSILON));
    }

    #[test]
    fn unknown_preset_name_is_rejected() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        let err = engine.set_preset_by_name("DELUXE").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigurationMissing);
        assert_eq!(engine.active_preset(), PresetId::Standard);
    }

    #[test]
    fn reset_clears_state_but_keeps_configuration() {
        let mut engine = engine_with(high_rng(), PityConfig::default());
        engine.set_preset(PresetId::Generous).unwrap();
        engine.pull(12).unwrap();
        engine.reset();
        assert_eq!(engine.pull_count(), 0);
        assert!(engine.history().is_empty());
        assert_eq!(engine.pity_counter(), PityCounter::default());
        assert_eq!(engine.active_preset(), PresetId::Generous);
    }

    #[test]
    fn seeded_engines_are_reproducible() {
        let mut a = DrawEngine::seeded(EngineConfig::default(), 1337).unwrap();
        let mut b = DrawEngine::seeded(EngineConfig::default(), 1337).unwrap();
        let ids_a: Vec<String> = a.pull(50).unwrap().into_iter().map(|o| o.tier_id).collect();
        let ids_b: Vec<String> = b.pull(50).unwrap().into_iter().map(|o| o.tier_id).collect();
        assert_eq!(ids_a, ids_b);
        assert_ne!(
            derive_stream_seed(1, DRAW_STREAM_TAG),
            derive_stream_seed(2, DRAW_STREAM_TAG)
        );
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = EngineConfig {
            cost_per_pull: -1.0,
            ..EngineConfig::default()
        };
        assert!(DrawEngine::with_rng(config, PresetCatalog::builtin(), high_rng()).is_err());
        let mut engine = engine_with(high_rng(), PityConfig::default());
        let bad = PityConfig {
            legendary_threshold: 0,
            ..PityConfig::default()
        };
        assert!(engine.set_pity(bad).is_err());
        assert_eq!(engine.pity_config(), PityConfig::default());
    }
}
