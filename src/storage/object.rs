//! Object storage backends and bucket bindings.
//!
//! # Responsibilities
//! - Abstract get/head by key over an external object store
//! - Provide in-memory and filesystem backends
//! - Map bucket names to backends
//!
//! # Design Decisions
//! - Bodies are streams; no backend buffers a whole object for a reader
//! - Absent objects are `Ok(None)`, not errors
//! - Keys arrive already validated by the key guard

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use axum::body::Bytes;
use dashmap::DashMap;
use futures_util::stream::{self, BoxStream, StreamExt};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Chunk size used when streaming object bodies.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A stream of object bytes.
pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// Metadata reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    /// MIME type recorded at upload, if any.
    pub content_type: Option<String>,
    /// Opaque entity tag, unquoted.
    pub etag: String,
}

/// An object opened for reading.
pub struct StoredObject {
    pub meta: ObjectMeta,
    pub body: ByteStream,
}

impl std::fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObject")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Errors from object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Read access to an object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Open an object for streaming.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Fetch metadata only.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError>;
}

/// Object store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, (Bytes, ObjectMeta)>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object.
    pub fn put(&self, key: &str, body: impl Into<Bytes>, content_type: Option<&str>) {
        let body = body.into();
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        let meta = ObjectMeta {
            key: key.to_string(),
            size: body.len() as u64,
            content_type: content_type.map(str::to_string),
            etag: format!("{:016x}", hasher.finish()),
        };
        self.objects.insert(key.to_string(), (body, meta));
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let Some((body, meta)) = self.objects.get(key).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        let chunks: Vec<Result<Bytes, io::Error>> = (0..body.len())
            .step_by(CHUNK_SIZE)
            .map(|start| Ok(body.slice(start..(start + CHUNK_SIZE).min(body.len()))))
            .collect();
        Ok(Some(StoredObject {
            meta,
            body: stream::iter(chunks).boxed(),
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        Ok(self.objects.get(key).map(|entry| entry.value().1.clone()))
    }
}

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key under the root, refusing anything but plain segments.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(segment) => path.push(segment),
                _ => return None,
            }
        }
        Some(path)
    }

    async fn metadata(&self, key: &str) -> Result<Option<(PathBuf, ObjectMeta)>, StorageError> {
        let Some(path) = self.resolve(key) else {
            return Ok(None);
        };
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let meta = ObjectMeta {
            key: key.to_string(),
            size: metadata.len(),
            content_type: None,
            etag: format!("{:x}-{:x}", metadata.len(), modified),
        };
        Ok(Some((path, meta)))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let Some((path, meta)) = self.metadata(key).await? else {
            return Ok(None);
        };
        let file = match File::open(&path).await {
            Ok(f) => f,
            // Removed between stat and open.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(StoredObject {
            meta,
            body: file_stream(file),
        }))
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
        Ok(self.metadata(key).await?.map(|(_, meta)| meta))
    }
}

fn file_stream(file: File) -> ByteStream {
    stream::unfold(Some(file), |state| async move {
        let mut file = state?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        match file.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(file)))
            }
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}

/// Bucket name → backend bindings.
#[derive(Clone, Default)]
pub struct Buckets {
    bindings: HashMap<String, Arc<dyn ObjectStore>>,
}

impl Buckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding, replacing any existing one with the same name.
    pub fn bind(mut self, name: impl Into<String>, store: Arc<dyn ObjectStore>) -> Self {
        self.bindings.insert(name.into(), store);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ObjectStore>> {
        self.bindings.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(stream: ByteStream) -> Vec<u8> {
        stream
            .map(|chunk| chunk.unwrap())
            .fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                acc
            })
            .await
    }

    #[tokio::test]
    async fn test_memory_store_streams_in_chunks() {
        let store = InMemoryObjectStore::new();
        let body = vec![7u8; CHUNK_SIZE * 2 + 10];
        store.put("big.bin", body.clone(), None);

        let object = store.get("big.bin").await.unwrap().unwrap();
        assert_eq!(object.meta.size, body.len() as u64);
        let chunks: Vec<_> = object.body.collect().await;
        assert_eq!(chunks.len(), 3);

        let object = store.get("big.bin").await.unwrap().unwrap();
        assert_eq!(collect(object.body).await, body);
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_head_matches_get() {
        let store = InMemoryObjectStore::new();
        store.put("a.txt", "hello", Some("text/plain"));
        let head = store.head("a.txt").await.unwrap().unwrap();
        let get = store.get("a.txt").await.unwrap().unwrap();
        assert_eq!(head, get.meta);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_fs_store_reads_files_under_root() {
        let root = std::env::temp_dir().join(format!("edge-router-fs-{}", uuid::Uuid::new_v4()));
        tokio::fs::create_dir_all(root.join("media")).await.unwrap();
        tokio::fs::write(root.join("media/file.txt"), b"file body").await.unwrap();

        let store = FsObjectStore::new(&root);
        let object = store.get("media/file.txt").await.unwrap().unwrap();
        assert_eq!(object.meta.size, 9);
        assert_eq!(collect(object.body).await, b"file body");

        assert!(store.get("media").await.unwrap().is_none());
        assert!(store.get("media/absent.txt").await.unwrap().is_none());
        assert!(store.get("../outside").await.unwrap().is_none());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
