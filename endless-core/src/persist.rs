//! Save slot and settings persistence.
//!
//! There is exactly one save slot holding
//! `{ settings, story: { episode_id, node_id }, player }`, plus a settings
//! slot that is written whenever the language changes. Writes are
//! synchronous and last-write-wins. A record that cannot be parsed, or whose
//! player fails basic shape checks, is reported as [`PersistError::Corrupt`]
//! and callers treat it as "no save".

use crate::i18n::Settings;
use crate::player::PlayerState;
use crate::story::StoryPointer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt save: {0}")]
    Corrupt(String),
}

/// The two storage slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Save,
    Settings,
}

impl Slot {
    pub fn file_name(&self) -> &'static str {
        match self {
            Slot::Save => "save.json",
            Slot::Settings => "settings.json",
        }
    }
}

/// Local key-value storage for the save and settings slots.
pub trait SaveStore: Send {
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistError>;
    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), PersistError>;
    fn remove(&mut self, slot: Slot) -> Result<(), PersistError>;
}

/// Stores each slot as a JSON file in a directory.
#[derive(Debug, Clone)]
pub struct FileSaveStore {
    dir: PathBuf,
}

impl FileSaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }
}

impl SaveStore for FileSaveStore {
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path(slot)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(slot), contents)?;
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<(), PersistError> {
        match fs::remove_file(self.path(slot)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Slots kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySaveStore {
    slots: HashMap<Slot, String>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, slot: Slot, contents: impl Into<String>) -> Self {
        self.slots.insert(slot, contents.into());
        self
    }

    pub fn raw(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }
}

impl SaveStore for MemorySaveStore {
    fn read(&self, slot: Slot) -> Result<Option<String>, PersistError> {
        Ok(self.slots.get(&slot).cloned())
    }

    fn write(&mut self, slot: Slot, contents: &str) -> Result<(), PersistError> {
        self.slots.insert(slot, contents.to_string());
        Ok(())
    }

    fn remove(&mut self, slot: Slot) -> Result<(), PersistError> {
        self.slots.remove(&slot);
        Ok(())
    }
}

// ============================================================================
// Save record
// ============================================================================

/// Everything needed to resume play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub settings: Settings,
    pub story: StoryPointer,
    pub player: Option<PlayerState>,
}

impl SaveRecord {
    pub fn new(settings: Settings, story: StoryPointer, player: Option<PlayerState>) -> Self {
        Self {
            settings,
            story,
            player,
        }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and shape-check a stored record.
    pub fn from_json(raw: &str) -> Result<Self, PersistError> {
        let record: Self =
            serde_json::from_str(raw).map_err(|e| PersistError::Corrupt(e.to_string()))?;
        if let Some(player) = &record.player {
            if !player.is_valid() {
                return Err(PersistError::Corrupt(
                    "player stats or inventory out of range".to_string(),
                ));
            }
        }
        if record.story.episode_id.is_empty() || record.story.node_id.is_empty() {
            return Err(PersistError::Corrupt("empty story pointer".to_string()));
        }
        Ok(record)
    }
}

/// Read the save slot. `Ok(None)` means there is no save.
pub fn load_record(store: &dyn SaveStore) -> Result<Option<SaveRecord>, PersistError> {
    match store.read(Slot::Save)? {
        Some(raw) => SaveRecord::from_json(&raw).map(Some),
        None => Ok(None),
    }
}

pub fn write_record(store: &mut dyn SaveStore, record: &SaveRecord) -> Result<(), PersistError> {
    store.write(Slot::Save, &record.to_json()?)?;
    tracing::debug!(
        episode = %record.story.episode_id,
        node = %record.story.node_id,
        "game saved"
    );
    Ok(())
}

pub fn delete_record(store: &mut dyn SaveStore) -> Result<(), PersistError> {
    store.remove(Slot::Save)?;
    tracing::info!("save deleted");
    Ok(())
}

pub fn has_save(store: &dyn SaveStore) -> bool {
    matches!(store.read(Slot::Save), Ok(Some(_)))
}

/// Read the settings slot. Absent or unreadable settings give `None`.
pub fn load_settings(store: &dyn SaveStore) -> Option<Settings> {
    match store.read(Slot::Settings) {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(e) => {
                tracing::warn!("ignoring unreadable settings: {e}");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("could not read settings: {e}");
            None
        }
    }
}

pub fn write_settings(store: &mut dyn SaveStore, settings: &Settings) -> Result<(), PersistError> {
    store.write(Slot::Settings, &serde_json::to_string(settings)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;

    fn record() -> SaveRecord {
        let mut player = PlayerState::new("Hero");
        player.gold = 42;
        player.inventory.adjust("potion", 3);
        SaveRecord::new(
            Settings::new(Lang::En),
            StoryPointer::new("ep1", "crossroads"),
            Some(player),
        )
    }

    #[test]
    fn test_record_roundtrip_memory() {
        let mut store = MemorySaveStore::new();
        assert!(load_record(&store).unwrap().is_none());
        assert!(!has_save(&store));

        write_record(&mut store, &record()).unwrap();
        assert!(has_save(&store));
        assert_eq!(load_record(&store).unwrap(), Some(record()));

        delete_record(&mut store).unwrap();
        assert!(load_record(&store).unwrap().is_none());
    }

    #[test]
    fn test_record_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSaveStore::new(dir.path().join("nested"));
        assert!(load_record(&store).unwrap().is_none());

        write_record(&mut store, &record()).unwrap();
        assert!(store.path(Slot::Save).exists());
        assert_eq!(load_record(&store).unwrap(), Some(record()));

        delete_record(&mut store).unwrap();
        // Deleting twice is fine
        delete_record(&mut store).unwrap();
        assert!(!has_save(&store));
    }

    #[test]
    fn test_record_shape() {
        let json: serde_json::Value = serde_json::from_str(&record().to_json().unwrap()).unwrap();
        assert_eq!(json["settings"]["lang"], "en");
        assert_eq!(json["story"]["episodeId"], "ep1");
        assert_eq!(json["story"]["nodeId"], "crossroads");
        assert!(json["story"].get("episode_id").is_none());
        assert_eq!(json["player"]["gold"], 42);
    }

    #[test]
    fn test_corrupt_records() {
        let store = MemorySaveStore::new().with(Slot::Save, "{ definitely not json");
        assert!(matches!(load_record(&store), Err(PersistError::Corrupt(_))));

        let mut bad = record();
        if let Some(player) = bad.player.as_mut() {
            player.stats.hp = player.stats.max_hp + 10;
        }
        let raw = serde_json::to_string(&bad).unwrap();
        assert!(matches!(SaveRecord::from_json(&raw), Err(PersistError::Corrupt(_))));

        let raw = r#"{"settings":{"lang":"id"},"story":{"episodeId":"","nodeId":"x"},"player":null}"#;
        assert!(matches!(SaveRecord::from_json(raw), Err(PersistError::Corrupt(_))));
    }

    #[test]
    fn test_settings_slot() {
        let mut store = MemorySaveStore::new();
        assert_eq!(load_settings(&store), None);

        write_settings(&mut store, &Settings::new(Lang::En)).unwrap();
        assert_eq!(load_settings(&store), Some(Settings::new(Lang::En)));

        let store = MemorySaveStore::new().with(Slot::Settings, "garbage");
        assert_eq!(load_settings(&store), None);
    }
}
