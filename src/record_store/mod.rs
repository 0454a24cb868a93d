//! Registered record storage.
//!
//! The registrar owns the collection of [`Record`]s that Dingle crawls. This module provides a
//! generic interface for listing every record, and for removing records by identifier once the
//! crawler has flagged them in a prune list.
//!
//! Three implementations are provided. [`memory::InMemoryRecordStore`] is not durable across
//! restarts. [`file::FileRecordStore`] keeps its records in a JSON file on disk and rewrites it
//! after each removal. [`http::HttpRecordStore`] lists records from the registrar's HTTP API and
//! does not support removal.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub mod http;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileRecordStore;
#[allow(clippy::module_name_repetitions)]
pub use http::HttpRecordStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryRecordStore;

/// A registered domain and the network address it points at.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// The registrar's persisted identifier, if known.
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub tld: String,
    #[serde(alias = "ip")]
    pub address: String,
}

impl Record {
    pub fn new(name: impl Into<String>, tld: impl Into<String>, address: impl Into<String>) -> Self {
        Record {
            id: None,
            name: name.into(),
            tld: tld.into(),
            address: address.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// The registered domain, e.g. `example.dev`.
    pub fn domain(&self) -> String {
        format!("{}.{}", self.name, self.tld)
    }
}

/// `DynRecordStore` is a type alias for a [`RecordStore`] that can be used by multiple read/write
/// consumers that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`RecordStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynRecordStore = Arc<RwLock<dyn RecordStore + Send + Sync>>;

/// An async trait describing the registrar's record collection, as consumed by the
/// [crawl pipeline][crate::crawl] and the purge utility.
#[async_trait::async_trait]
pub trait RecordStore {
    /// List every record, in the order the backend returns them.
    async fn all_records(&self) -> Result<Vec<Record>, Error>;

    /// Remove the records with the given identifiers, returning how many were removed.
    async fn remove_records(&mut self, ids: &[String]) -> Result<usize, Error>;
}
