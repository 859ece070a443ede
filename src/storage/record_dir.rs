//! One-JSON-document-per-record directory backed by `cap-std`.

use super::{StorageError, StorageResult};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, warn};

const RECORD_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".json.tmp";

/// A directory holding one JSON document per record key.
///
/// Cloning is cheap; clones share the directory handle. The type performs
/// single-record atomic writes only; callers that need read-modify-write
/// serialise access themselves.
#[derive(Debug, Clone)]
pub struct JsonRecordDir {
    dir: Arc<Dir>,
    root: Utf8PathBuf,
}

impl JsonRecordDir {
    /// Opens `path`, creating it and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: &Utf8Path) -> StorageResult<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|err| StorageError::io(path.as_str(), err))?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|err| StorageError::io(path.as_str(), err))?;
        Ok(Self {
            dir: Arc::new(dir),
            root: path.to_owned(),
        })
    }

    /// Returns the directory path this store was opened at.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes `value` under `key`, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the key is invalid, the value cannot be
    /// encoded, or the write or rename fails.
    pub async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let file_name = record_file(key)?;
        let temp_name = format!("{key}{TEMP_SUFFIX}");
        let bytes =
            serde_json::to_vec_pretty(value).map_err(|err| StorageError::serialization(key, err))?;
        let dir = Arc::clone(&self.dir);
        let owned_key = key.to_owned();
        run_blocking(move || {
            dir.write(&temp_name, &bytes)
                .map_err(|err| StorageError::io(&owned_key, err))?;
            dir.rename(&temp_name, &dir, &file_name)
                .map_err(|err| StorageError::io(&owned_key, err))
        })
        .await?;
        debug!(key, root = %self.root, "record written");
        Ok(())
    }

    /// Reads the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the key is invalid, the file cannot be
    /// read, or its contents do not decode as `T`.
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        let file_name = record_file(key)?;
        let dir = Arc::clone(&self.dir);
        let owned_key = key.to_owned();
        let contents = run_blocking(move || match dir.read_to_string(&file_name) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::io(&owned_key, err)),
        })
        .await?;
        contents
            .map(|text| {
                serde_json::from_str(&text).map_err(|err| StorageError::serialization(key, err))
            })
            .transpose()
    }

    /// Removes the document stored under `key`.
    ///
    /// Returns `true` when a document existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the key is invalid or removal fails.
    pub async fn remove(&self, key: &str) -> StorageResult<bool> {
        let file_name = record_file(key)?;
        let dir = Arc::clone(&self.dir);
        let owned_key = key.to_owned();
        run_blocking(move || match dir.remove_file(&file_name) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(&owned_key, err)),
        })
        .await
    }

    /// Reads every record in the directory.
    ///
    /// Leftover temporary files and documents that fail to decode are
    /// skipped with a warning so that one damaged record cannot hide the
    /// rest.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] when the directory cannot be listed.
    pub async fn read_all<T: DeserializeOwned>(&self) -> StorageResult<Vec<T>> {
        let dir = Arc::clone(&self.dir);
        let root = self.root.to_string();
        let documents = run_blocking(move || read_documents(&dir, &root)).await?;
        Ok(documents
            .into_iter()
            .filter_map(|(key, text)| match serde_json::from_str(&text) {
                Ok(value) => Some(value),
                Err(err) => {
                    warn!(key, error = %err, "skipping undecodable record");
                    None
                }
            })
            .collect())
    }
}

fn record_file(key: &str) -> StorageResult<String> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(format!("{key}{RECORD_SUFFIX}"))
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}

fn read_documents(dir: &Dir, root: &str) -> StorageResult<Vec<(String, String)>> {
    let mut documents = Vec::new();
    for entry in dir.entries().map_err(|err| StorageError::io(root, err))? {
        let name = entry
            .and_then(|found| found.file_name())
            .map_err(|err| StorageError::io(root, err))?;
        if name.ends_with(TEMP_SUFFIX) {
            continue;
        }
        let Some(key) = name.strip_suffix(RECORD_SUFFIX) else {
            continue;
        };
        match dir.read_to_string(&name) {
            Ok(text) => documents.push((key.to_owned(), text)),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::io(key, err)),
        }
    }
    Ok(documents)
}

async fn run_blocking<F, T>(f: F) -> StorageResult<T>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| StorageError::Join(err.to_string()))?
}
