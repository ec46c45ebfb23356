//! Persistence adapter: remembers which wallet to reconnect after a reload
//!
//! - `MemoryStore`: ephemeral (tests)
//! - `FileStore`: JSON file under the data directory (native)
//! - `LocalStorage`: `window.localStorage` (browser, see `wasm`)

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StorageError;

pub type StorageResult<T> = Result<T, StorageError>;

/// Durable string map surviving page reloads.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove(&self, key: &str) -> StorageResult<()>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// The rdns of the last connected wallet. A reconnection hint, never proof of a session.
#[derive(Clone)]
pub struct ConnectionHint {
    store: Rc<dyn KeyValueStore>,
    key: String,
}

impl ConnectionHint {
    pub fn new(store: Rc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn load(&self) -> StorageResult<Option<String>> {
        Ok(self.store.get(&self.key)?.filter(|rdns| !rdns.is_empty()))
    }

    pub fn save(&self, rdns: &str) -> StorageResult<()> {
        self.store.set(&self.key, rdns)
    }

    pub fn clear(&self) -> StorageResult<()> {
        self.store.remove(&self.key)
    }

    /// True when `rdns` is the wallet recorded by the last successful connect.
    pub fn matches(&self, rdns: &str) -> bool {
        matches!(self.load(), Ok(Some(saved)) if saved == rdns)
    }
}

// =============================================================================
// FILE STORE (native)
// =============================================================================

#[cfg(feature = "native")]
pub use file::{FileStore, ROOT_ENV};

#[cfg(feature = "native")]
mod file {
    use super::{KeyValueStore, StorageResult};
    use crate::error::StorageError;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};

    /// Overrides the data directory root (tests, sandboxes).
    pub const ROOT_ENV: &str = "WALLET_SELECTOR_ROOT";
    const FILE_NAME: &str = "connection.json";

    /// JSON object on disk, rewritten on every mutation.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        path: PathBuf,
    }

    impl FileStore {
        /// Open `<root>/<app>/connection.json`, root from `WALLET_SELECTOR_ROOT` or the
        /// platform data directory.
        pub fn open(app: &str) -> StorageResult<Self> {
            let root = match std::env::var(ROOT_ENV) {
                Ok(root) if !root.is_empty() => PathBuf::from(root),
                _ => dirs::data_dir()
                    .ok_or_else(|| StorageError::Unavailable("no data directory".into()))?,
            };
            Self::at(root.join(app).join(FILE_NAME))
        }

        pub fn at(path: impl Into<PathBuf>) -> StorageResult<Self> {
            let path = path.into();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Ok(Self { path })
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        fn load(&self) -> StorageResult<BTreeMap<String, String>> {
            match std::fs::read_to_string(&self.path) {
                Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
                Ok(raw) => Ok(serde_json::from_str(&raw)?),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
                Err(e) => Err(e.into()),
            }
        }

        fn save(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
            let raw = serde_json::to_string_pretty(entries)?;
            let tmp = self.path.with_extension("json.tmp");
            std::fs::write(&tmp, raw)?;
            std::fs::rename(&tmp, &self.path)?;
            Ok(())
        }
    }

    impl KeyValueStore for FileStore {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            Ok(self.load()?.get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            let mut entries = self.load()?;
            entries.insert(key.to_string(), value.to_string());
            self.save(&entries)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            let mut entries = self.load()?;
            if entries.remove(key).is_some() {
                self.save(&entries)?;
            }
            Ok(())
        }
    }
}
