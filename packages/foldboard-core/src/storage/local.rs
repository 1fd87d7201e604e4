/// Key-value store kept as one JSON object on disk.
///
/// Every write rewrites the whole document atomically (write to .tmp,
/// fsync, rename, fsync directory). A missing file reads as empty.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::{KeyValueStore, StorageError};

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, StorageError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => {
                log::warn!(
                    "[foldboard.storage.read] {} holds {} instead of an object, starting empty",
                    self.path.display(),
                    kind_of(&other)
                );
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, map: Map<String, Value>) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        atomic_write(&self.path, &content)?;
        log::debug!("[foldboard.storage.write] Wrote {}", self.path.display());
        Ok(())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("foldboard.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> Result<BTreeMap<String, Value>, StorageError> {
        let map = self.read_all()?;
        Ok(keys
            .iter()
            .filter_map(|k| map.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut map = self.read_all()?;
        map.insert(key.to_string(), value);
        self.write_all(map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.read_all()?;
        if map.remove(key).is_some() {
            self.write_all(map)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.get(&["b1"]).unwrap().is_empty());
        store.remove("b1").unwrap();
        assert!(!store.path().exists());
    }

    #[test]
    fn test_set_get_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::new(&path);
        store.set("settings", json!({"alwaysCount": true})).unwrap();
        store.set("b1", json!({"Todo": {"collapsed": true}})).unwrap();

        let reopened = JsonFileStore::new(&path);
        let got = reopened.get(&["b1", "settings"]).unwrap();
        assert_eq!(got["b1"], json!({"Todo": {"collapsed": true}}));
        assert_eq!(got["settings"]["alwaysCount"], json!(true));

        reopened.remove("b1").unwrap();
        assert_eq!(store.get(&["b1"]).unwrap().len(), 0);
        assert!(!dir.path().join("state.foldboard.tmp").exists());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get(&["b1"]), Err(StorageError::Json(_))));
    }

    #[test]
    fn test_non_object_document_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "[1, 2]").unwrap();
        let store = JsonFileStore::new(&path);
        store.set("b1", json!({})).unwrap();
        assert_eq!(store.get(&["b1"]).unwrap().len(), 1);
    }
}
