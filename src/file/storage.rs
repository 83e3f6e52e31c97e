//! Blob storage for uploaded files.
//!
//! Every object lives directly under the storage root, named exactly by its
//! key:
//! ```text
//! {root}/
//! ├── baogao_202410181530_k3x9qa.docx
//! ├── notes_202410181532_p0v7zz.txt
//! └── .upload-<uuid>.part        (in-flight)
//! ```
//!
//! Uploads are written to a part file and published under their key only
//! once complete, so a partial object is never visible under a key.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::pin;

use futures::{Stream, StreamExt};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::key::StorageKey;
use crate::{Result, ShareError};

/// Maximum key length in bytes (common filesystem NAME_MAX).
const MAX_KEY_LENGTH: usize = 255;

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key the object is stored under.
    pub key: StorageKey,
    /// Location on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Lower-cased extension, without the dot.
    pub extension: Option<String>,
}

/// An object opened for reading.
#[derive(Debug)]
pub struct LoadedObject {
    /// Object metadata.
    pub object: StoredObject,
    /// Open handle positioned at the start of the content.
    pub file: File,
}

/// Local-directory blob store.
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Storage root (the namespace).
    root: PathBuf,
    /// Fail with [`ShareError::Conflict`] instead of overwriting existing keys.
    strict: bool,
}

impl BlobStore {
    /// Create a store rooted at `root` without touching the filesystem.
    ///
    /// Strict mode is on by default.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            strict: true,
        }
    }

    /// Create a store and make sure its root directory exists.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(root);
        store.ensure_namespace().await?;
        Ok(store)
    }

    /// Enable or disable strict (create-if-absent) writes.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Get the storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether saves refuse to overwrite existing keys.
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Create the storage root if it does not exist.
    ///
    /// Safe to call repeatedly and from concurrent tasks.
    pub async fn ensure_namespace(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve `key` to a path directly inside the storage root.
    ///
    /// Rejects keys that are empty, too long, hidden, contain separators,
    /// control characters or `..`.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        let invalid = key.is_empty()
            || key.len() > MAX_KEY_LENGTH
            || key.starts_with('.')
            || key.contains("..")
            || key.chars().any(|c| c == '/' || c == '\\' || c.is_control());

        if invalid {
            return Err(ShareError::PathTraversalRejected(key.to_string()));
        }
        Ok(self.root.join(key))
    }

    /// Write `stream` to storage under `key`.
    ///
    /// Fails with:
    /// - [`ShareError::SizeExceeded`] once more than `size_limit` bytes arrive
    /// - [`ShareError::EmptyUpload`] if the stream yields no bytes
    /// - [`ShareError::Conflict`] in strict mode if `key` is taken
    /// - [`ShareError::WriteFailure`] on storage I/O errors
    /// - whatever the stream's own error converts into if the stream fails
    ///
    /// The body is written to a part file and only published under `key`
    /// once complete. On failure, or if the returned future is dropped, the
    /// part file is removed.
    pub async fn save<S, B, E>(
        &self,
        key: &StorageKey,
        stream: S,
        size_limit: u64,
    ) -> Result<StoredObject>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<ShareError>,
    {
        let path = self.resolve(key.as_str())?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| write_failure(key, e))?;

        // Report a taken key before consuming the body
        if self.strict {
            let taken = fs::try_exists(&path)
                .await
                .map_err(|e| write_failure(key, e))?;
            if taken {
                return Err(ShareError::Conflict(key.to_string()));
            }
        }

        let part = PartFile::new(self.root.join(format!(".upload-{}.part", Uuid::new_v4())));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(part.path())
            .await
            .map_err(|e| write_failure(key, e))?;

        let size_bytes = match write_stream(&mut file, stream, size_limit, key).await {
            Ok(0) => Err(ShareError::EmptyUpload),
            other => other,
        }?;
        drop(file);

        self.publish(part, &path, key).await?;

        Ok(StoredObject {
            key: key.clone(),
            path,
            size_bytes,
            extension: key.extension(),
        })
    }

    /// Move a finished part file to `path`.
    ///
    /// Strict mode links without replacing, so a key taken while the body
    /// was streaming still yields [`ShareError::Conflict`].
    async fn publish(&self, mut part: PartFile, path: &Path, key: &StorageKey) -> Result<()> {
        if !self.strict {
            fs::rename(part.path(), path)
                .await
                .map_err(|e| write_failure(key, e))?;
            part.disarm();
            return Ok(());
        }

        match fs::hard_link(part.path(), path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(ShareError::Conflict(key.to_string()));
            }
            Err(e) => return Err(write_failure(key, e)),
        }
        if let Err(e) = fs::remove_file(part.path()).await {
            tracing::warn!(
                path = %part.path().display(),
                error = %e,
                "Failed to remove part file"
            );
        }
        part.disarm();
        Ok(())
    }

    /// Get metadata of the object stored under `key`.
    pub async fn stat(&self, key: &str) -> Result<StoredObject> {
        let path = self.resolve(key)?;
        let metadata = match fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(ShareError::NotFound(key.to_string())),
            Err(e) => return Err(read_error(key, e)),
        };
        Ok(object_at(key, path, metadata.len()))
    }

    /// Open the object stored under `key` for reading.
    pub async fn load(&self, key: &str) -> Result<LoadedObject> {
        let path = self.resolve(key)?;
        let file = File::open(&path).await.map_err(|e| read_error(key, e))?;
        let metadata = file.metadata().await.map_err(|e| read_error(key, e))?;
        if !metadata.is_file() {
            return Err(ShareError::NotFound(key.to_string()));
        }

        Ok(LoadedObject {
            object: object_at(key, path, metadata.len()),
            file,
        })
    }

    /// Delete the object stored under `key`.
    ///
    /// Returns `true` if the object was deleted, `false` if it didn't exist.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the whole object stored under `key`.
    ///
    /// A failure after the object was opened is reported as
    /// [`ShareError::ReadFailure`] (or NotFound if it vanished).
    pub async fn read_all(&self, key: &str) -> Result<Vec<u8>> {
        let LoadedObject { object, mut file } = self.load(key).await?;
        let capacity = usize::try_from(object.size_bytes).unwrap_or(0);
        let mut content = Vec::with_capacity(capacity);
        file.read_to_end(&mut content)
            .await
            .map_err(|e| read_error(key, e))?;
        Ok(content)
    }
}

/// In-flight upload file, removed on drop unless disarmed.
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to remove partial upload"
                );
            }
        }
    }
}

async fn write_stream<S, B, E>(
    file: &mut File,
    stream: S,
    size_limit: u64,
    key: &StorageKey,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ShareError>,
{
    let mut stream = pin!(stream);
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        let chunk = chunk.as_ref();

        written += chunk.len() as u64;
        if written > size_limit {
            return Err(ShareError::SizeExceeded { limit: size_limit });
        }
        file.write_all(chunk)
            .await
            .map_err(|e| write_failure(key, e))?;
    }

    file.flush().await.map_err(|e| write_failure(key, e))?;
    Ok(written)
}

fn object_at(key: &str, path: PathBuf, size_bytes: u64) -> StoredObject {
    let key = StorageKey::from(key);
    StoredObject {
        extension: key.extension(),
        key,
        path,
        size_bytes,
    }
}

fn write_failure(key: &StorageKey, source: io::Error) -> ShareError {
    ShareError::WriteFailure {
        key: key.to_string(),
        source,
    }
}

fn read_error(key: &str, source: io::Error) -> ShareError {
    if source.kind() == io::ErrorKind::NotFound {
        ShareError::NotFound(key.to_string())
    } else {
        ShareError::ReadFailure {
            key: key.to_string(),
            source,
        }
    }
}
