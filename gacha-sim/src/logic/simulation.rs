//! Batch simulation: many independent in-memory sessions, aggregated per preset.
use anyhow::{Context, Result};
use gacha_engine::numbers::{ratio, u64_to_f64};
use gacha_engine::{
    DrawEngine, EngineConfig, PityConfig, PityTrigger, PresetCatalog, PresetId, TierStats,
    TierTable, chi_square,
};
use log::debug;
use serde::Serialize;

/// Configuration for one simulated preset.
#[derive(Debug, Clone, Copy)]
pub struct SimulationPlan {
    pub preset: PresetId,
    pub pity: PityConfig,
    pub pulls: i64,
    pub sessions: u32,
    pub base_seed: u64,
    pub cost_per_pull: f64,
}

impl SimulationPlan {
    #[must_use]
    pub fn new(preset: PresetId, pulls: i64, sessions: u32, base_seed: u64) -> Self {
        let defaults = EngineConfig::default();
        Self {
            preset,
            pity: defaults.pity,
            pulls,
            sessions,
            base_seed,
            cost_per_pull: defaults.cost_per_pull,
        }
    }

    #[must_use]
    pub const fn with_pity(mut self, pity: PityConfig) -> Self {
        self.pity = pity;
        self
    }

    /// Seed of the `index`-th session.
    #[must_use]
    pub fn session_seed(&self, index: u32) -> u64 {
        self.base_seed.wrapping_add(u64::from(index))
    }

    const fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            preset: self.preset,
            pity: self.pity,
            cost_per_pull: self.cost_per_pull,
        }
    }
}

/// Outcome of a single simulated session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub preset: PresetId,
    pub seed: u64,
    pub pulls: u64,
    /// Draw counts per tier, rarest first.
    pub counts: Vec<u64>,
    pub legendary_hits: u64,
    /// One-based index of the first legendary-or-better draw.
    pub first_legendary: Option<u64>,
    /// Longest run of consecutive draws without a legendary-or-better result.
    pub longest_drought: u64,
    pub hard_pity_hits: u64,
    pub soft_pity_hits: u64,
    pub spend: f64,
}

/// Run one session to completion.
///
/// # Errors
///
/// Returns an error if the engine rejects the configuration or pull count.
pub fn run_session(
    catalog: &PresetCatalog,
    plan: &SimulationPlan,
    seed: u64,
) -> Result<SessionRecord> {
    let mut engine = DrawEngine::seeded_with(plan.engine_config(), catalog.clone(), seed)
        .with_context(|| format!("failed to build engine for {}", plan.preset))?;
    let outcomes = engine
        .pull(plan.pulls)
        .with_context(|| format!("simulation pull of {} rejected", plan.pulls))?;
    let table = engine.active_table();

    let ranked: Vec<&str> = table.ranked().map(|t| t.id.as_str()).collect();
    let mut counts = vec![0_u64; ranked.len()];
    let mut legendary_hits = 0_u64;
    let mut first_legendary = None;
    let mut drought = 0_u64;
    let mut longest_drought = 0_u64;
    let mut hard_pity_hits = 0_u64;
    let mut soft_pity_hits = 0_u64;

    for outcome in &outcomes {
        if let Some(slot) = ranked.iter().position(|id| *id == outcome.tier_id) {
            counts[slot] += 1;
        }
        match outcome.pity {
            PityTrigger::Hard => hard_pity_hits += 1,
            PityTrigger::Soft => soft_pity_hits += 1,
            PityTrigger::None => {}
        }
        if table.is_legendary_or_better(&outcome.tier_id) {
            legendary_hits += 1;
            first_legendary.get_or_insert(outcome.index);
            drought = 0;
        } else {
            drought += 1;
            longest_drought = longest_drought.max(drought);
        }
    }

    debug!(
        "session seed {seed}: {legendary_hits} legendary in {} pulls",
        engine.pull_count()
    );

    Ok(SessionRecord {
        preset: plan.preset,
        seed,
        pulls: engine.pull_count(),
        counts,
        legendary_hits,
        first_legendary,
        longest_drought,
        hard_pity_hits,
        soft_pity_hits,
        spend: u64_to_f64(engine.pull_count()) * plan.cost_per_pull,
    })
}

/// Run every session of the plan.
///
/// # Errors
///
/// Returns the first session failure.
pub fn run_simulation(
    catalog: &PresetCatalog,
    plan: &SimulationPlan,
) -> Result<Vec<SessionRecord>> {
    (0..plan.sessions)
        .map(|index| run_session(catalog, plan, plan.session_seed(index)))
        .collect()
}

/// Observed versus configured figures across all sessions of one preset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationAggregate {
    pub preset: PresetId,
    pub pity_enabled: bool,
    pub sessions: u32,
    pub total_pulls: u64,
    pub tiers: Vec<TierStats>,
    /// Pearson statistic against the configured weights; only meaningful
    /// with pity disabled.
    pub chi_square: f64,
    pub mean_legendary_per_session: f64,
    pub std_legendary_per_session: f64,
    /// Mean over sessions that reached a legendary at all.
    pub mean_pulls_to_first_legendary: Option<f64>,
    pub sessions_without_legendary: u32,
    pub max_legendary_drought: u64,
    pub hard_pity_rate: f64,
    pub soft_pity_rate: f64,
    pub total_spend: f64,
}

/// Fold session records into one aggregate against `table`.
#[must_use]
pub fn aggregate_sessions(
    preset: PresetId,
    pity: PityConfig,
    table: &TierTable,
    records: &[SessionRecord],
) -> SimulationAggregate {
    let mut builder = AggregateBuilder::new(table);
    for record in records {
        builder.ingest(record);
    }
    builder.finish(preset, pity, table)
}

struct AggregateBuilder {
    counts: Vec<u64>,
    sessions: u32,
    total_pulls: u64,
    legendary: RunningStats,
    first_legendary: RunningStats,
    sessions_without_legendary: u32,
    max_drought: u64,
    hard_pity: u64,
    soft_pity: u64,
    spend: f64,
}

impl AggregateBuilder {
    fn new(table: &TierTable) -> Self {
        Self {
            counts: vec![0; table.tiers().len()],
            sessions: 0,
            total_pulls: 0,
            legendary: RunningStats::default(),
            first_legendary: RunningStats::default(),
            sessions_without_legendary: 0,
            max_drought: 0,
            hard_pity: 0,
            soft_pity: 0,
            spend: 0.0,
        }
    }

    fn ingest(&mut self, record: &SessionRecord) {
        self.sessions += 1;
        self.total_pulls = self.total_pulls.saturating_add(record.pulls);
        for (total, count) in self.counts.iter_mut().zip(&record.counts) {
            *total += count;
        }
        self.legendary.add(u64_to_f64(record.legendary_hits));
        match record.first_legendary {
            Some(index) => self.first_legendary.add(u64_to_f64(index)),
            None => self.sessions_without_legendary += 1,
        }
        self.max_drought = self.max_drought.max(record.longest_drought);
        self.hard_pity += record.hard_pity_hits;
        self.soft_pity += record.soft_pity_hits;
        self.spend += record.spend;
    }

    fn finish(self, preset: PresetId, pity: PityConfig, table: &TierTable) -> SimulationAggregate {
        let tiers: Vec<TierStats> = table
            .ranked()
            .zip(&self.counts)
            .map(|(tier, &count)| TierStats {
                tier_id: tier.id.clone(),
                name: tier.name.clone(),
                color: tier.color.clone(),
                count,
                actual_rate: ratio(count, self.total_pulls),
                expected_rate: tier.weight,
            })
            .collect();
        let weights: Vec<f64> = tiers.iter().map(|t| t.expected_rate).collect();

        SimulationAggregate {
            preset,
            pity_enabled: pity.enabled,
            sessions: self.sessions,
            total_pulls: self.total_pulls,
            chi_square: chi_square(&self.counts, &weights, self.total_pulls),
            tiers,
            mean_legendary_per_session: self.legendary.mean(),
            std_legendary_per_session: self.legendary.std_dev(),
            mean_pulls_to_first_legendary: (self.first_legendary.count > 0)
                .then(|| self.first_legendary.mean()),
            sessions_without_legendary: self.sessions_without_legendary,
            max_legendary_drought: self.max_drought,
            hard_pity_rate: ratio(self.hard_pity, self.total_pulls),
            soft_pity_rate: ratio(self.soft_pity, self.total_pulls),
            total_spend: self.spend,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn add(&mut self, value: f64) {
        self.count += 1;
        let count = u64_to_f64(self.count);
        let delta = value - self.mean;
        self.mean += delta / count;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    const fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.mean }
    }

    fn std_dev(&self) -> f64 {
        if self.count > 1 {
            (self.m2 / u64_to_f64(self.count - 1)).sqrt()
        } else {
            0.0
        }
    }
}
