//! The persisted document snapshot used to warm-start the [`ActiveIndex`][super::ActiveIndex].
//!
//! The snapshot is the complete [`Document`] list of the last successful pass, as a JSON array.
//! It is overwritten wholesale after every pass and read once at startup.
use crate::crawl::Document;
use crate::error::Error;
use crate::persist;
use std::path::Path;

/// Load the snapshot at `path`, or `None` if there isn't one yet.
///
/// # Errors
///
/// Returns [`Error::InvalidJSON`] if the snapshot is not a valid document list.
///
/// Returns [`Error::IO`] if the snapshot exists but can't be read.
pub async fn load(path: impl AsRef<Path>) -> Result<Option<Vec<Document>>, Error> {
    persist::load_json(path).await
}

/// Replace the snapshot at `path` with `documents`.
///
/// # Errors
///
/// Returns [`Error::IO`] if the snapshot can't be written.
pub async fn save(path: impl AsRef<Path>, documents: &[Document]) -> Result<(), Error> {
    persist::save_json(path, documents).await
}
