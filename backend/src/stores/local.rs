use super::{KeyValueStore, StoreResult, poisoned};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::warn;

/// Key-value store kept in a single JSON file, rewritten on every change.
pub struct LocalStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl LocalStore {
    pub fn load(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    let backup = sibling(&path, "bak");
                    std::fs::copy(&path, &backup)?;
                    warn!(
                        "Unreadable store file {} copied to {}, starting empty: {}",
                        path.display(),
                        backup.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(entries)?;
        // Rename is atomic, so a crash never leaves a half-written store file
        let tmp = sibling(&self.path, "tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// `store.json` -> `store.json.<suffix>` in the same directory.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

#[async_trait]
impl KeyValueStore for LocalStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.insert(key.to_string(), value);
        self.save(&entries)
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::load(&path).unwrap();
        store.set("wallpaper", "sakura".to_string()).await.unwrap();
        store.set("ringtone", "chime".to_string()).await.unwrap();
        store.remove("ringtone").await.unwrap();

        let reloaded = LocalStore::load(&path).unwrap();
        assert_eq!(
            reloaded.get("wallpaper").await.unwrap().as_deref(),
            Some("sakura")
        );
        assert_eq!(reloaded.get("ringtone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_file_is_backed_up_before_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LocalStore::load(&path).unwrap();
        assert_eq!(store.get("anything").await.unwrap(), None);
        store.set("wallpaper", "sakura".to_string()).await.unwrap();

        let backup = dir.path().join("store.json.bak");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{not json");
        let reloaded = LocalStore::load(&path).unwrap();
        assert_eq!(
            reloaded.get("wallpaper").await.unwrap().as_deref(),
            Some("sakura")
        );
    }

    #[tokio::test]
    async fn save_leaves_no_temporary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = LocalStore::load(&path).unwrap();
        store.set("ringtone", "chime".to_string()).await.unwrap();

        assert!(path.exists());
        assert!(!dir.path().join("store.json.tmp").exists());
    }
}
