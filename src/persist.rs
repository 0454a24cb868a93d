//! JSON state files on disk.
//!
//! Every state file Dingle owns (the document snapshot, the prune list and the file-backed
//! record store) is written through [`save_json`], which writes a sibling temporary file and
//! renames it over the destination. A crash mid-write leaves either the previous or the new
//! complete file in place, never a torn one.
use crate::error::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Serialize `value` as pretty JSON and atomically replace the file at `path` with it.
///
/// # Errors
///
/// Returns [`Error::InvalidJSON`] if `value` can't be serialized.
///
/// Returns [`Error::IO`] if the temporary file can't be written or renamed into place.
pub async fn save_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<(), Error> {
    let path = path.as_ref();
    let data = serde_json::to_vec_pretty(value)?;
    let tmp_path = tmp_path(path);

    let mut output_file = File::create(&tmp_path).await?;
    output_file.write_all(&data).await?;
    output_file.flush().await?;
    output_file.sync_all().await?;
    drop(output_file);

    if let Err(err) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(Error::IO(err));
    }
    Ok(())
}

/// Load and deserialize the JSON file at `path`, returning `None` if it doesn't exist.
///
/// # Errors
///
/// Returns [`Error::InvalidJSON`] if the file content isn't valid JSON for `T`.
///
/// Returns [`Error::IO`] if the file exists but can't be read.
pub async fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Option<T>, Error> {
    let contents = match File::open(path.as_ref()).await {
        Ok(mut f) => {
            let mut buf = vec![];
            f.read_to_end(&mut buf).await?;
            buf
        }
        Err(err) => match err.kind() {
            ErrorKind::NotFound => return Ok(None),
            _ => return Err(Error::IO(err)),
        },
    };
    Ok(Some(serde_json::from_slice(&contents)?))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from("state"), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}
