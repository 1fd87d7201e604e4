/// Persistence of per-board view preferences.
///
/// `KeyValueStore` is the external key-value collaborator (top-level keys
/// are board ids plus `settings`). `ViewStateStore` namespaces it as
/// board -> panel name -> setting.
pub mod local;
pub mod memory;
pub mod view_state;

use std::collections::BTreeMap;

use serde_json::Value;

pub use local::JsonFileStore;
pub use memory::MemoryStore;
pub use view_state::{SettingKey, ViewStateStore, GLOBAL_BOARD_SETTINGS, SETTINGS_KEY};

pub trait KeyValueStore {
    /// Values of the requested keys; absent keys are left out.
    fn get(&self, keys: &[&str]) -> Result<BTreeMap<String, Value>, StorageError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Board ID not set")]
    BoardNotSet,

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
