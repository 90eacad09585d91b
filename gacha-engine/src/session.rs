use log::{debug, warn};
use rand::Rng;
use rand::rngs::SmallRng;

use crate::engine::{DrawEngine, EngineConfig};
use crate::error::{GachaError, Result};
use crate::history::DrawOutcome;
use crate::persistence::{StoragePort, clear_snapshot, load_snapshot, save_snapshot};
use crate::presets::PresetId;
use crate::stats::{StatsSummary, summarize};

/// High-level session wrapper binding one draw engine to one storage port.
#[derive(Debug)]
pub struct GachaSession<S, R = SmallRng> {
    engine: DrawEngine<R>,
    storage: S,
    last_persistence_error: Option<GachaError>,
}

impl<S: StoragePort> GachaSession<S, SmallRng> {
    /// Open a seeded session, restoring whatever the storage holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or stored state is unreadable.
    pub fn open_seeded(config: EngineConfig, seed: u64, storage: S) -> Result<Self> {
        Self::open(DrawEngine::seeded(config, seed)?, storage)
    }
}

impl<S: StoragePort, R: Rng> GachaSession<S, R> {
    /// Wrap an engine, restoring persisted state into it. Absent keys leave a
    /// fresh engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored blobs cannot be read or parsed.
    pub fn open(mut engine: DrawEngine<R>, storage: S) -> Result<Self> {
        let snapshot = load_snapshot(&storage)?;
        debug!(
            "restored session: {} pulls, {} history entries",
            snapshot.pull_count,
            snapshot.history.len()
        );
        engine.restore(snapshot);
        Ok(Self {
            engine,
            storage,
            last_persistence_error: None,
        })
    }

    /// Draw `amount` times and persist. A failed save is logged and kept in
    /// [`Self::last_persistence_error`]; the outcomes are returned regardless.
    ///
    /// # Errors
    ///
    /// Returns [`GachaError::InvalidArgument`] when `amount` is not positive or
    /// the pull count would overflow.
    pub fn pull(&mut self, amount: i64) -> Result<Vec<DrawOutcome>> {
        let outcomes = self.engine.pull(amount)?;
        self.persist();
        Ok(outcomes)
    }

    fn persist(&mut self) {
        match save_snapshot(&self.storage, &self.engine.snapshot()) {
            Ok(()) => self.last_persistence_error = None,
            Err(err) => {
                warn!("session state not fully persisted: {err}");
                self.last_persistence_error = Some(err);
            }
        }
    }

    /// Clear in-memory state and remove the stored blobs.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the stored blobs cannot be removed; the
    /// in-memory state is cleared either way.
    pub fn reset(&mut self) -> Result<()> {
        self.engine.reset();
        self.last_persistence_error = None;
        clear_snapshot(&self.storage)
    }

    /// # Errors
    ///
    /// Returns [`GachaError::UnknownPreset`] when the preset is not in the catalog.
    pub fn set_preset(&mut self, preset: PresetId) -> Result<()> {
        self.engine.set_preset(preset)
    }

    /// Statistics of the whole history against the active table.
    #[must_use]
    pub fn stats(&self) -> StatsSummary {
        summarize(
            self.engine.pull_count(),
            self.engine.pity_counter(),
            self.engine.history(),
            self.engine.active_table(),
            self.engine.cost_per_pull(),
        )
    }

    #[must_use]
    pub const fn engine(&self) -> &DrawEngine<R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut DrawEngine<R> {
        &mut self.engine
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn last_persistence_error(&self) -> Option<&GachaError> {
        self.last_persistence_error.as_ref()
    }

    /// Release the engine, e.g. to keep drawing without persistence.
    #[must_use]
    pub fn into_engine(self) -> DrawEngine<R> {
        self.engine
    }
}
