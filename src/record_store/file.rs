//! A JSON file-backed implementation of the [`RecordStore`][super::RecordStore] trait.
//!
//! Wraps a [`InMemoryRecordStore`][super::memory::InMemoryRecordStore] instance, persisting
//! removals to a JSON file on disk that can be reloaded across restarts.
use crate::error::Error;
use crate::persist;
use crate::record_store::memory::InMemoryRecordStore;
use crate::record_store::{Record, RecordStore};
use std::path::{Path, PathBuf};

/// A file-backed record store. The file holds a JSON array of [`Record`]s. After each removal the
/// file is atomically rewritten with the remaining records.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileRecordStore {
    record_store: InMemoryRecordStore,
    path: PathBuf,
}

impl FileRecordStore {
    /// Save the records as JSON to the store's configured path, or return an Error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if a record can't be serialized to JSON.
    ///
    /// Returns [`Error::IO`] if the serialized records can't be written to the backing path.
    pub async fn save(&self) -> Result<(), Error> {
        persist::save_json(&self.path, &self.record_store).await
    }

    /// Load a [`FileRecordStore`] from the JSON record list located at the given path, or return
    /// an Error. A missing file is created holding an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened, read or created.
    pub async fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let path = p.as_ref().to_path_buf();
        let record_store = match persist::load_json(&path).await? {
            Some(records) => InMemoryRecordStore::new(records),
            None => {
                let store = Self {
                    record_store: InMemoryRecordStore::default(),
                    path,
                };
                store.save().await?;
                return Ok(store);
            }
        };
        Ok(Self { record_store, path })
    }
}

#[async_trait::async_trait]
impl RecordStore for FileRecordStore {
    async fn all_records(&self) -> Result<Vec<Record>, Error> {
        self.record_store.all_records().await
    }

    async fn remove_records(&mut self, ids: &[String]) -> Result<usize, Error> {
        let removed = self.record_store.remove_records(ids).await?;
        if removed > 0 {
            self.save().await?;
        }
        Ok(removed)
    }
}
