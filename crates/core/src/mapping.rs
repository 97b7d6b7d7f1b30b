//! Learned controller mappings and their persistence seam.
//!
//! "Learn mode" pairs a raw controller message (channel + code) with a
//! [`ControlId`]. The resulting map is persisted through an injected
//! [`MappingStore`] so the engine never owns a global mutable mapping
//! table; tests inject [`MemoryMappingStore`], the application a
//! [`JsonFileMappingStore`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controls::ControlId;

/// A raw controller message identity: channel plus controller/note code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ControlBinding {
    pub channel: u8,
    pub code: u8,
}

impl ControlBinding {
    pub fn new(channel: u8, code: u8) -> Self {
        Self { channel, code }
    }
}

/// One learned pairing, as persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlMapping {
    pub binding: ControlBinding,
    pub control: ControlId,
}

/// The full set of learned mappings.
///
/// A binding maps to at most one control, and a control is bound by at
/// most one binding; learning either side again replaces the old pairing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlMap {
    bindings: BTreeMap<ControlBinding, ControlId>,
}

impl ControlMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a learned pairing, replacing any previous binding for the
    /// same control or the same raw message.
    pub fn learn(&mut self, binding: ControlBinding, control: ControlId) {
        self.bindings.retain(|_, bound| *bound != control);
        self.bindings.insert(binding, control);
        log::debug!("learned {:?} -> {:?}", binding, control);
    }

    /// Resolve a raw controller message to its learned control.
    pub fn resolve(&self, binding: ControlBinding) -> Option<ControlId> {
        self.bindings.get(&binding).copied()
    }

    /// Forget whatever binding is attached to a control.
    pub fn clear(&mut self, control: ControlId) {
        self.bindings.retain(|_, bound| *bound != control);
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterate over the learned pairings in binding order.
    pub fn iter(&self) -> impl Iterator<Item = ControlMapping> + '_ {
        self.bindings.iter().map(|(binding, control)| ControlMapping {
            binding: *binding,
            control: *control,
        })
    }

    fn to_entries(&self) -> Vec<ControlMapping> {
        self.iter().collect()
    }

    fn from_entries(entries: Vec<ControlMapping>) -> Self {
        let mut map = Self::new();
        for entry in entries {
            map.learn(entry.binding, entry.control);
        }
        map
    }
}

/// Errors from a mapping store.
#[derive(Debug, Error)]
pub enum MappingStoreError {
    #[error("failed to read mappings: {0}")]
    Read(#[source] std::io::Error),
    #[error("failed to write mappings: {0}")]
    Write(#[source] std::io::Error),
    #[error("failed to parse mappings: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize mappings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Persistence seam for learned mappings.
pub trait MappingStore: Send + Sync {
    /// Load the persisted map. A store with nothing saved yet returns an
    /// empty map, not an error.
    fn load(&self) -> Result<ControlMap, MappingStoreError>;

    /// Persist the full map, replacing whatever was stored before.
    fn save(&self, map: &ControlMap) -> Result<(), MappingStoreError>;
}

/// Persisted file format.
#[derive(Debug, Serialize, Deserialize)]
struct MappingFile {
    version: String,
    saved_at: String,
    mappings: Vec<ControlMapping>,
}

/// JSON-file-backed mapping store.
pub struct JsonFileMappingStore {
    path: PathBuf,
}

impl JsonFileMappingStore {
    /// Create a store at the given path, or at `~/.segue/mappings.json`
    /// when none is provided.
    pub fn new(path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".segue")
                .join("mappings.json")
        });
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MappingStore for JsonFileMappingStore {
    fn load(&self) -> Result<ControlMap, MappingStoreError> {
        if !self.path.exists() {
            return Ok(ControlMap::new());
        }
        let content = fs::read_to_string(&self.path).map_err(MappingStoreError::Read)?;
        let file: MappingFile =
            serde_json::from_str(&content).map_err(MappingStoreError::Parse)?;
        Ok(ControlMap::from_entries(file.mappings))
    }

    fn save(&self, map: &ControlMap) -> Result<(), MappingStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(MappingStoreError::Write)?;
        }
        let file = MappingFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            mappings: map.to_entries(),
        };
        let content =
            serde_json::to_string_pretty(&file).map_err(MappingStoreError::Serialize)?;
        fs::write(&self.path, content).map_err(MappingStoreError::Write)?;
        log::info!("saved {} control mappings to {:?}", map.len(), self.path);
        Ok(())
    }
}

/// In-memory mapping store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryMappingStore {
    map: Arc<Mutex<ControlMap>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryMappingStore {
    fn load(&self) -> Result<ControlMap, MappingStoreError> {
        Ok(self.map.lock().clone())
    }

    fn save(&self, map: &ControlMap) -> Result<(), MappingStoreError> {
        *self.map.lock() = map.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::deck::DeckId;

    #[test]
    fn learn_replaces_both_sides_of_a_pairing() {
        let mut map = ControlMap::new();
        map.learn(ControlBinding::new(0, 20), ControlId::Crossfader);
        map.learn(ControlBinding::new(0, 21), ControlId::PlayPause(DeckId::A));
        assert_eq!(map.len(), 2);

        // Re-learning the control moves it to the new binding.
        map.learn(ControlBinding::new(0, 30), ControlId::Crossfader);
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve(ControlBinding::new(0, 20)), None);
        assert_eq!(
            map.resolve(ControlBinding::new(0, 30)),
            Some(ControlId::Crossfader)
        );

        // Re-learning the binding replaces its control.
        map.learn(ControlBinding::new(0, 30), ControlId::LoadNext);
        assert_eq!(map.resolve(ControlBinding::new(0, 30)), Some(ControlId::LoadNext));
        assert!(!map.iter().any(|m| m.control == ControlId::Crossfader));
    }

    #[test]
    fn clear_removes_a_control() {
        let mut map = ControlMap::new();
        map.learn(ControlBinding::new(1, 5), ControlId::ToggleAutoMix);
        map.clear(ControlId::ToggleAutoMix);
        assert!(map.is_empty());
    }

    #[test]
    fn json_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileMappingStore::new(Some(dir.path().join("mappings.json")));

        let mut map = ControlMap::new();
        map.learn(ControlBinding::new(0, 7), ControlId::TempoFader(DeckId::B));
        map.learn(ControlBinding::new(0, 8), ControlId::Crossfader);
        store.save(&map).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, map);
    }

    #[test]
    fn json_store_missing_file_is_empty_map() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileMappingStore::new(Some(dir.path().join("absent.json")));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryMappingStore::new();
        let mut map = ControlMap::new();
        map.learn(ControlBinding::new(2, 64), ControlId::CuePoint(DeckId::A));
        store.save(&map).unwrap();
        assert_eq!(store.load().unwrap(), map);
    }
}
