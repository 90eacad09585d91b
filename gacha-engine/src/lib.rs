//! Gacha Draw Engine
//!
//! Platform-agnostic core of the loot-box simulator: tier tables, the pity
//! streak state machine, weighted draws, history and statistics.
//! Rendering, audio and concrete storage are left to the embedding layer,
//! which plugs in through [`StoragePort`].

pub mod constants;
pub mod engine;
pub mod error;
pub mod history;
pub mod numbers;
pub mod persistence;
pub mod pity;
pub mod presets;
pub mod session;
pub mod stats;
pub mod tiers;

// Re-export commonly used types
pub use engine::{DrawEngine, EngineConfig, EngineSnapshot, select_tier};
pub use error::{ErrorKind, GachaError, Result};
pub use history::{DrawOutcome, History, PityTrigger, best_outcome};
pub use persistence::{
    MemoryStorage, SessionSummary, StoragePort, clear_snapshot, load_snapshot, save_snapshot,
};
pub use pity::{PityConfig, PityCounter};
pub use presets::{PresetCatalog, PresetId};
pub use session::GachaSession;
pub use stats::{
    Breakdown, PullEstimate, StatsSummary, TierStats, chi_square, estimate_for_tier,
    pulls_for_probability, summarize, tier_breakdown,
};
pub use tiers::{Tier, TierTable, TierTableSpec};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_creates_and_roundtrips_state() {
        let storage = MemoryStorage::new();
        let config = EngineConfig {
            preset: PresetId::Generous,
            ..EngineConfig::default()
        };
        let mut session = GachaSession::open_seeded(config, 0xABCD, storage.clone()).unwrap();
        let batch = session.pull(10).unwrap();
        assert_eq!(batch.len(), 10);
        assert!(best_outcome(&batch).is_some());

        let loaded = load_snapshot(&storage).unwrap();
        assert_eq!(loaded.pull_count, 10);
        assert_eq!(loaded.history.len(), 10);
        assert!(loaded.history.iter().all(|o| o.preset == PresetId::Generous));
    }
}
