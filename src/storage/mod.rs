//! Object storage, edge cache and stream utilities used by object serving.

pub mod cache;
pub mod mime;
pub mod object;
pub mod tee;

pub use cache::{CacheError, CacheKey, CachedResponse, EdgeCache, MemoryEdgeCache};
pub use object::{
    Buckets, ByteStream, FsObjectStore, InMemoryObjectStore, ObjectMeta, ObjectStore,
    StorageError, StoredObject,
};
pub use tee::{tee, TeeBranch};
