//! Storage port and the two-blob persistence layout.
//!
//! Session summary and history are stored under separate keys so an oversized
//! history can fail to save without losing the summary.
use log::warn;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use crate::constants::{HISTORY_KEY, STATE_KEY};
use crate::engine::EngineSnapshot;
use crate::error::{GachaError, Result};
use crate::history::History;
use crate::pity::PityCounter;

/// Key-value storage the engine persists through.
/// Platform-specific implementations should provide this
pub trait StoragePort {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read a value; `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the value cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the key cannot be removed.
    fn remove(&self, key: &str) -> Result<(), Self::Error>;
}

/// In-process storage; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl StoragePort for MemoryStorage {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Blob stored under the state key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(default)]
    pub pull_count: u64,
    #[serde(default)]
    pub pity_counter: PityCounter,
}

/// Write summary then history.
///
/// The history write is attempted even after a failed summary write, and a
/// failed history write never undoes the summary. The first failure is
/// returned after both attempts.
///
/// # Errors
///
/// Returns [`GachaError::Persistence`] or [`GachaError::Serialization`] for
/// the first blob that could not be written.
pub fn save_snapshot<S: StoragePort>(storage: &S, snapshot: &EngineSnapshot) -> Result<()> {
    let summary = SessionSummary {
        pull_count: snapshot.pull_count,
        pity_counter: snapshot.pity_counter,
    };
    let summary_result = write_json(storage, STATE_KEY, &summary);
    let history_result = write_json(storage, HISTORY_KEY, &snapshot.history);
    if let Err(err) = &history_result {
        warn!(
            "history ({} draws) not persisted: {err}",
            snapshot.history.len()
        );
    }
    summary_result.and(history_result)
}

fn write_json<S: StoragePort, T: Serialize>(storage: &S, key: &str, value: &T) -> Result<()> {
    let payload = serde_json::to_string(value)?;
    storage
        .set(key, &payload)
        .map_err(|err| GachaError::persistence(key, &err))
}

/// Load both blobs; absent keys yield the zero state.
///
/// # Errors
///
/// Returns an error if the store cannot be read or a blob is not valid JSON.
pub fn load_snapshot<S: StoragePort>(storage: &S) -> Result<EngineSnapshot> {
    let summary: SessionSummary = read_json(storage, STATE_KEY)?.unwrap_or_default();
    let history: History = read_json(storage, HISTORY_KEY)?.unwrap_or_default();
    Ok(EngineSnapshot {
        pull_count: summary.pull_count,
        pity_counter: summary.pity_counter,
        history,
    })
}

fn read_json<S: StoragePort, T: for<'de> Deserialize<'de>>(
    storage: &S,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = storage
        .get(key)
        .map_err(|err| GachaError::persistence(key, &err))?
    else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Remove both blobs.
///
/// # Errors
///
/// Returns the first removal failure; the second key is still attempted.
pub fn clear_snapshot<S: StoragePort>(storage: &S) -> Result<()> {
    let state = storage
        .remove(STATE_KEY)
        .map_err(|err| GachaError::persistence(STATE_KEY, &err));
    let history = storage
        .remove(HISTORY_KEY)
        .map_err(|err| GachaError::persistence(HISTORY_KEY, &err));
    state.and(history)
}
