/// Board-scoped view state on top of a `KeyValueStore`.
///
/// Layout of the value stored under each board id:
/// ```text
/// boardId
/// +-- panel name (or the board-global pseudo panel)
///     +-- setting key -> JSON value
/// ```
/// The namespace is read once when a board becomes active and rewritten as
/// a whole on every change.
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use super::{KeyValueStore, StorageError};
use crate::config::Settings;

/// Pseudo panel holding board-wide settings such as compact mode.
pub const GLOBAL_BOARD_SETTINGS: &str = "trello-folds-board-settings";

/// Store key of the user options.
pub const SETTINGS_KEY: &str = "settings";

pub type Namespace = BTreeMap<String, BTreeMap<String, Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Collapsed,
    SuperListCollapsed,
    Sections,
    CompactMode,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Collapsed => "collapsed",
            SettingKey::SuperListCollapsed => "super-list-collapsed",
            SettingKey::Sections => "sections",
            SettingKey::CompactMode => "compactMode",
        }
    }
}

pub struct ViewStateStore {
    store: Rc<dyn KeyValueStore>,
    board_id: Option<String>,
    namespace: Namespace,
}

impl ViewStateStore {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            board_id: None,
            namespace: Namespace::new(),
        }
    }

    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Switch to `board_id` and read its namespace together with the user
    /// options. A failed read leaves an empty namespace and no options.
    pub fn load(&mut self, board_id: &str) -> Option<Settings> {
        self.board_id = Some(board_id.to_string());
        self.namespace.clear();

        let mut values = match self.store.get(&[SETTINGS_KEY, board_id]) {
            Ok(values) => values,
            Err(e) => {
                log::error!(
                    "[foldboard.storage.load] Failed to read view state for {}: {}",
                    board_id,
                    e
                );
                return None;
            }
        };

        if let Some(value) = values.remove(board_id) {
            match serde_json::from_value::<Namespace>(value) {
                Ok(namespace) => self.namespace = namespace,
                Err(e) => log::warn!(
                    "[foldboard.storage.load] Ignoring malformed view state for {}: {}",
                    board_id,
                    e
                ),
            }
        }

        let settings = values.remove(SETTINGS_KEY)?;
        match Settings::from_value(settings) {
            Ok(settings) => Some(settings),
            Err(e) => {
                log::warn!("[foldboard.storage.load] Ignoring malformed settings: {}", e);
                None
            }
        }
    }

    pub fn retrieve(&self, panel: &str, key: SettingKey) -> Option<&Value> {
        self.namespace.get(panel)?.get(key.as_str())
    }

    /// `true` only for a stored boolean `true`.
    pub fn retrieve_flag(&self, panel: &str, key: SettingKey) -> bool {
        self.retrieve(panel, key).and_then(Value::as_bool) == Some(true)
    }

    /// Update one setting and write the board's namespace back.
    pub fn store(&mut self, panel: &str, key: SettingKey, value: Value) -> Result<(), StorageError> {
        if self.board_id.is_none() {
            return Err(StorageError::BoardNotSet);
        }
        self.namespace
            .entry(panel.to_string())
            .or_default()
            .insert(key.as_str().to_string(), value);
        self.flush()
    }

    /// Remove one setting of a panel and write the namespace back.
    pub fn forget(&mut self, panel: &str, key: SettingKey) -> Result<(), StorageError> {
        if self.board_id.is_none() {
            return Err(StorageError::BoardNotSet);
        }
        if let Some(settings) = self.namespace.get_mut(panel) {
            settings.remove(key.as_str());
            if settings.is_empty() {
                self.namespace.remove(panel);
            }
        }
        self.flush()
    }

    pub fn retrieve_global(&self, key: SettingKey) -> Option<&Value> {
        self.retrieve(GLOBAL_BOARD_SETTINGS, key)
    }

    pub fn store_global(&mut self, key: SettingKey, value: Value) -> Result<(), StorageError> {
        self.store(GLOBAL_BOARD_SETTINGS, key, value)
    }

    /// Drop `key` from every panel. Returns whether anything was removed;
    /// nothing is written.
    pub fn forget_key(&mut self, key: SettingKey) -> bool {
        let mut changed = false;
        for settings in self.namespace.values_mut() {
            changed |= settings.remove(key.as_str()).is_some();
        }
        self.namespace.retain(|_, settings| !settings.is_empty());
        changed
    }

    /// Write the cached namespace as the board's value.
    pub fn flush(&self) -> Result<(), StorageError> {
        let board_id = self.board_id.as_deref().ok_or(StorageError::BoardNotSet)?;
        let value = serde_json::to_value(&self.namespace)?;
        self.store.set(board_id, value)
    }

    /// Remove the board's persisted view state.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        let board_id = self.board_id.as_deref().ok_or(StorageError::BoardNotSet)?;
        self.namespace.clear();
        self.store.remove(board_id)
    }
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("board_id", &self.board_id)
            .field("namespace", &self.namespace)
            .finish()
    }
}
