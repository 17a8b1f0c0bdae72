// Key/value persistence for the tracker collections

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use dirs_next as dirs;

use crate::error::StoreError;

/// Environment variable overriding the data directory of [`JsonStore`].
pub const DATA_DIR_ENV: &str = "IRON_TRACKER_DATA_DIR";
const APP_DIR: &str = "iron_workout_tracker";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Settings,
    Profile,
    Exercises,
    Plans,
    Workouts,
    Timeline,
}

pub const ALL_COLLECTIONS: [Collection; 6] = [
    Collection::Settings,
    Collection::Profile,
    Collection::Exercises,
    Collection::Plans,
    Collection::Workouts,
    Collection::Timeline,
];

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::Profile => "profile",
            Collection::Exercises => "exercises",
            Collection::Plans => "plans",
            Collection::Workouts => "workouts",
            Collection::Timeline => "timeline",
        }
    }
}

/// A value stored in exactly one collection under its own key.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn key(&self) -> String;
}

/// Raw collection access. `get_all` returns records in key order.
pub trait Store {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;
    fn put(&mut self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError>;
    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;
    fn delete(&mut self, collection: Collection, key: &str) -> Result<(), StoreError>;
    fn clear(&mut self, collection: Collection) -> Result<(), StoreError>;

    fn fetch<T: Record>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        Self: Sized,
    {
        match self.get(T::COLLECTION, key)? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    /// Load every record of a collection, skipping ones that no longer parse.
    fn fetch_all<T: Record>(&self) -> Result<Vec<T>, StoreError>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        for v in self.get_all(T::COLLECTION)? {
            match serde_json::from_value(v) {
                Ok(r) => out.push(r),
                Err(e) => log::warn!("Skipping malformed {} record: {e}", T::COLLECTION.name()),
            }
        }
        Ok(out)
    }

    fn save<T: Record>(&mut self, record: &T) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        let value = serde_json::to_value(record)?;
        self.put(T::COLLECTION, &record.key(), value)
    }
}

/// In-memory backend used for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: HashMap<Collection, BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.data.get(&collection).and_then(|c| c.get(key)).cloned())
    }

    fn put(&mut self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        self.data
            .entry(collection)
            .or_default()
            .insert(key.to_string(), record);
        Ok(())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .data
            .get(&collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    fn delete(&mut self, collection: Collection, key: &str) -> Result<(), StoreError> {
        if let Some(c) = self.data.get_mut(&collection) {
            c.remove(key);
        }
        Ok(())
    }

    fn clear(&mut self, collection: Collection) -> Result<(), StoreError> {
        self.data.remove(&collection);
        Ok(())
    }
}

/// One pretty-printed JSON object per collection inside a data directory.
///
/// Every write rewrites the whole collection file, which keeps each `put`
/// atomic from the caller's point of view.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Resolve the data directory: explicit path, then
    /// [`DATA_DIR_ENV`], then the user's config directory.
    pub fn resolve_dir(explicit: Option<&Path>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
            .or_else(|| dirs::config_dir().map(|p| p.join(APP_DIR)))
    }

    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        log::debug!("Opened store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }

    fn load(&self, collection: Collection) -> Result<BTreeMap<String, Value>, StoreError> {
        let path = self.path(collection);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn write(
        &self,
        collection: Collection,
        map: &BTreeMap<String, Value>,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(map)?;
        let path = self.path(collection);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }
}

impl Store for JsonStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.load(collection)?.remove(key))
    }

    fn put(&mut self, collection: Collection, key: &str, record: Value) -> Result<(), StoreError> {
        let mut map = self.load(collection)?;
        map.insert(key.to_string(), record);
        self.write(collection, &map)
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        Ok(self.load(collection)?.into_values().collect())
    }

    fn delete(&mut self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let mut map = self.load(collection)?;
        if map.remove(key).is_some() {
            self.write(collection, &map)?;
        }
        Ok(())
    }

    fn clear(&mut self, collection: Collection) -> Result<(), StoreError> {
        let path = self.path(collection);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}
