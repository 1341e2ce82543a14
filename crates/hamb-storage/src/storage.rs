//! Versioned JSON files, one per storage key

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed storage file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no storage file for key {key}")]
    NotFound { key: String },

    #[error("storage file {key} has version {found}, this build reads version {expected}")]
    UnsupportedVersion {
        key: String,
        expected: u32,
        found: u32,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Envelope written for every key
///
/// ```json
/// {
///   "version": 1,
///   "minor_version": 1,
///   "key": "hamb.bridges",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageFile<T> {
    /// Major version; a mismatch refuses to load
    pub version: u32,
    /// Minor version; older files load with a warning
    pub minor_version: u32,
    pub key: String,
    pub data: T,
}

impl<T> StorageFile<T> {
    pub fn new(key: impl Into<String>, data: T, version: u32, minor_version: u32) -> Self {
        Self {
            key: key.into(),
            version,
            minor_version,
            data,
        }
    }
}

/// Directory of storage files
#[derive(Debug, Clone)]
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Location of the file backing `key`
    pub fn file_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    pub async fn exists(&self, key: &str) -> bool {
        fs::try_exists(self.file_path(key)).await.unwrap_or(false)
    }

    /// Raw file content; `None` when nothing is stored under `key`
    async fn read(&self, key: &str) -> StorageResult<Option<String>> {
        match fs::read_to_string(self.file_path(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(key, "Nothing stored");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load a file; `None` when it does not exist
    pub async fn load<T>(&self, key: &str) -> StorageResult<Option<StorageFile<T>>>
    where
        T: DeserializeOwned,
    {
        let Some(content) = self.read(key).await? else {
            return Ok(None);
        };
        let file: StorageFile<T> = serde_json::from_str(&content)?;
        debug!(key, version = file.version, minor = file.minor_version, "Loaded");
        Ok(Some(file))
    }

    pub async fn load_required<T>(&self, key: &str) -> StorageResult<StorageFile<T>>
    where
        T: DeserializeOwned,
    {
        match self.load(key).await? {
            Some(file) => Ok(file),
            None => Err(StorageError::NotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Write a file atomically (temp file, then rename)
    pub async fn save<T>(&self, file: &StorageFile<T>) -> StorageResult<()>
    where
        T: Serialize,
    {
        self.ensure_dir().await?;

        let content = serde_json::to_string_pretty(file)?;
        let target = self.file_path(&file.key);
        let staging = target.with_extension("tmp");
        fs::write(&staging, content).await?;
        fs::rename(&staging, &target).await?;

        debug!(key = %file.key, version = file.version, "Saved");
        Ok(())
    }

    /// Delete a file; missing files are not an error
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        match fs::remove_file(self.file_path(key)).await {
            Ok(()) => {
                debug!(key, "Deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A type persisted under a fixed key
pub trait Storable: Serialize + DeserializeOwned {
    const KEY: &'static str;
    const VERSION: u32;
    const MINOR_VERSION: u32;

    fn to_storage_file(&self) -> StorageFile<Self>
    where
        Self: Clone,
    {
        StorageFile::new(Self::KEY, self.clone(), Self::VERSION, Self::MINOR_VERSION)
    }
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    minor_version: u32,
}

/// Load a [`Storable`], checking the envelope version before the payload
pub async fn load_versioned<T>(storage: &Storage) -> StorageResult<Option<T>>
where
    T: Storable,
{
    let Some(content) = storage.read(T::KEY).await? else {
        return Ok(None);
    };

    let envelope: Envelope = serde_json::from_str(&content)?;
    if envelope.version != T::VERSION {
        return Err(StorageError::UnsupportedVersion {
            key: T::KEY.to_string(),
            expected: T::VERSION,
            found: envelope.version,
        });
    }
    if envelope.minor_version < T::MINOR_VERSION {
        warn!(
            key = T::KEY,
            "Stored minor version {} is older than {}", envelope.minor_version, T::MINOR_VERSION
        );
    }

    let file: StorageFile<T> = serde_json::from_str(&content)?;
    Ok(Some(file.data))
}
