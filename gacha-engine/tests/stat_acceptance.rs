use gacha_engine::{
    DrawEngine, EngineConfig, PityConfig, PresetCatalog, PresetId, chi_square, tier_breakdown,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand_chacha::ChaCha8Rng;

const SAMPLE_SIZE: i64 = 100_000;
const TOLERANCE: f64 = 0.01;
/// Chi-square critical value for 5 degrees of freedom at p = 0.001.
const CHI_SQUARE_CRITICAL_DF5: f64 = 20.515;

fn pity_free(preset: PresetId) -> EngineConfig {
    EngineConfig {
        preset,
        pity: PityConfig::disabled(),
        ..EngineConfig::default()
    }
}

#[test]
fn pity_free_distribution_tracks_configured_weights() {
    for preset in PresetId::ALL {
        let rng = ChaCha8Rng::seed_from_u64(0xACED);
        let mut engine =
            DrawEngine::with_rng(pity_free(preset), PresetCatalog::builtin(), rng).unwrap();
        engine.pull(SAMPLE_SIZE).unwrap();

        let breakdown = tier_breakdown(engine.history(), engine.active_table());
        for stats in &breakdown.tiers {
            assert!(
                (stats.actual_rate - stats.expected_rate).abs() <= TOLERANCE,
                "{preset} {} drifted: observed {:.4} expected {:.4}",
                stats.tier_id,
                stats.actual_rate,
                stats.expected_rate
            );
        }

        let observed: Vec<u64> = breakdown.tiers.iter().map(|t| t.count).collect();
        let expected: Vec<f64> = engine.active_tiers().iter().map(|t| t.weight).collect();
        let total = u64::try_from(SAMPLE_SIZE).expect("sample size fits");
        let statistic = chi_square(&observed, &expected, total);
        assert!(
            statistic < CHI_SQUARE_CRITICAL_DF5,
            "{preset} chi-square {statistic:.2} exceeds {CHI_SQUARE_CRITICAL_DF5}"
        );
    }
}

#[test]
fn pity_bounds_worst_case_droughts() {
    let mut engine = DrawEngine::with_rng(
        EngineConfig {
            preset: PresetId::Predatory,
            ..EngineConfig::default()
        },
        PresetCatalog::builtin(),
        SmallRng::seed_from_u64(0x00C0_FFEE),
    )
    .unwrap();
    let outcomes = engine.pull(20_000).unwrap();
    let table = engine.active_table().clone();

    let mut legendary_gap = 0_u32;
    let mut epic_gap = 0_u32;
    for outcome in &outcomes {
        if table.is_legendary_or_better(&outcome.tier_id) {
            legendary_gap = 0;
            epic_gap = 0;
        } else {
            legendary_gap += 1;
            if table.is_epic_or_better(&outcome.tier_id) {
                epic_gap = 0;
            } else {
                epic_gap += 1;
            }
        }
        assert!(legendary_gap < 90, "legendary drought reached {legendary_gap}");
        assert!(epic_gap < 10, "epic drought reached {epic_gap}");
    }
}

#[test]
fn pity_raises_effective_legendary_rate() {
    let run = |pity: PityConfig| {
        let config = EngineConfig {
            preset: PresetId::Predatory,
            pity,
            ..EngineConfig::default()
        };
        let mut engine = DrawEngine::seeded(config, 42).unwrap();
        engine.pull(50_000).unwrap();
        engine
            .history()
            .iter()
            .filter(|o| o.tier_id == "legendary")
            .count()
    };
    let with_pity = run(PityConfig::default());
    let without = run(PityConfig::disabled());
    assert!(
        with_pity > without * 2,
        "pity legendary count {with_pity} vs pity-free {without}"
    );
}
