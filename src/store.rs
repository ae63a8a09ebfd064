//! # Blob storage
//! Durable key → bytes storage used by the dashboard document and the
//! freshness caches.
//!
//! Writes go through a temporary sibling file followed by `rename`, so a
//! reader sees either the previous blob or the new one, never a torn write.
//! `MemoryStore` backs tests and ephemeral deployments.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use thiserror::Error;

/// Errors produced by [`BlobStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`. A missing blob is `Ok(None)`.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the blob under `key` as a single atomic step.
    fn write_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// One JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key.replace(['/', '\\'], "__")))
    }

    fn tmp_path_for(&self, key: &str) -> PathBuf {
        // Unique per process and per call: several workers may share `dir`.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self.path_for(key);
        path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq))
    }
}

impl BlobStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = self.tmp_path_for(key);

        let written = (|| -> io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a blob directly (fixtures, corrupt-data tests).
    pub fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        let mut g = self.blobs.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(key.to_string(), bytes.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        let g = self.blobs.lock().unwrap_or_else(|p| p.into_inner());
        g.contains_key(key)
    }
}

impl BlobStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let g = self.blobs.lock().unwrap_or_else(|p| p.into_inner());
        Ok(g.get(key).cloned())
    }

    fn write_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut g = self.blobs.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
