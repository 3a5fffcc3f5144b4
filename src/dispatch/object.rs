//! Object-serve handler.
//!
//! # Responsibilities
//! - Validate the object key before touching any backend
//! - Serve from the edge cache when possible
//! - Stream objects from their bucket and populate the cache in the background
//!
//! # Design Decisions
//! - Cache-aside: lookup first, populate on miss, never block on the write
//! - HEAD goes straight to the store's metadata and skips the cache
//! - Objects larger than the cache limit are streamed without a tee

use std::sync::Arc;

use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::Response;

use crate::error::RouterError;
use crate::lifecycle::DetachedTasks;
use crate::observability::metrics;
use crate::routing::{ObjectOptions, ResolvedRoute};
use crate::security::validate_object_key;
use crate::storage::cache::collect_body;
use crate::storage::mime;
use crate::storage::{
    tee, Buckets, CacheError, CacheKey, CachedResponse, EdgeCache, ObjectMeta, TeeBranch,
};

/// Header reporting whether the edge cache answered.
pub const X_CACHE_STATUS: HeaderName = HeaderName::from_static("x-cache-status");

/// Serves stored objects.
#[derive(Clone)]
pub struct ObjectHandler {
    buckets: Buckets,
    cache: Arc<dyn EdgeCache>,
    tasks: DetachedTasks,
    default_bucket: String,
    default_cache_control: String,
    max_cache_bytes: usize,
}

impl ObjectHandler {
    pub fn new(buckets: Buckets, cache: Arc<dyn EdgeCache>, tasks: DetachedTasks) -> Self {
        Self {
            buckets,
            cache,
            tasks,
            default_bucket: "files".to_string(),
            default_cache_control: "public, max-age=3600".to_string(),
            max_cache_bytes: 8 * 1024 * 1024,
        }
    }

    pub fn with_default_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.default_bucket = bucket.into();
        self
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.default_cache_control = cache_control.into();
        self
    }

    pub fn with_max_cache_bytes(mut self, limit: usize) -> Self {
        self.max_cache_bytes = limit;
        self
    }

    /// Serve the object named by the route target.
    pub async fn handle(
        &self,
        route: &ResolvedRoute,
        opts: &ObjectOptions,
        domain: &str,
        parts: &Parts,
    ) -> Result<Response, RouterError> {
        let key = validate_object_key(&route.record.target)?;

        let bucket = opts.bucket.as_deref().unwrap_or(&self.default_bucket);
        let store = self
            .buckets
            .get(bucket)
            .ok_or_else(|| RouterError::MissingBucket(bucket.to_string()))?;

        if parts.method == Method::HEAD {
            let meta = store
                .head(&key)
                .await?
                .ok_or_else(|| RouterError::ObjectNotFound { key: key.clone() })?;
            let mut response = Response::new(Body::empty());
            *response.headers_mut() = self.object_headers(&meta, &key, opts);
            return Ok(response);
        }

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let cache_key = CacheKey::new(domain, path_and_query);

        match self.cache.get(&cache_key).await {
            Ok(Some(hit)) => {
                metrics::record_cache_lookup("hit");
                tracing::debug!(key = %cache_key, "Edge cache hit");
                let mut response = hit.to_response();
                response
                    .headers_mut()
                    .insert(X_CACHE_STATUS, HeaderValue::from_static("HIT"));
                return Ok(response);
            }
            Ok(None) => metrics::record_cache_lookup("miss"),
            Err(e) => {
                metrics::record_cache_lookup("error");
                tracing::warn!(key = %cache_key, error = %e, "Edge cache lookup failed");
            }
        }

        let object = store
            .get(&key)
            .await?
            .ok_or_else(|| RouterError::ObjectNotFound { key: key.clone() })?;
        let headers = self.object_headers(&object.meta, &key, opts);

        let body = if object.meta.size <= self.max_cache_bytes as u64 {
            let (live, shadow) = tee(object.body);
            self.populate(cache_key, headers.clone(), shadow);
            live.boxed()
        } else {
            tracing::debug!(key = %key, size = object.meta.size, "Object too large to cache");
            object.body
        };

        let mut response = Response::new(Body::from_stream(body));
        *response.headers_mut() = headers;
        response
            .headers_mut()
            .insert(X_CACHE_STATUS, HeaderValue::from_static("MISS"));
        Ok(response)
    }

    /// Buffer the shadow branch and store it, detached from the response.
    fn populate(&self, key: CacheKey, headers: HeaderMap, shadow: TeeBranch) {
        let cache = self.cache.clone();
        let limit = self.max_cache_bytes;
        self.tasks.spawn("cache_write", async move {
            let body = collect_body(shadow, limit).await?;
            cache
                .put(
                    key,
                    CachedResponse {
                        status: StatusCode::OK,
                        headers,
                        body,
                    },
                )
                .await?;
            Ok::<(), CacheError>(())
        });
    }

    fn object_headers(&self, meta: &ObjectMeta, key: &str, opts: &ObjectOptions) -> HeaderMap {
        let mut headers = HeaderMap::new();

        let content_type = mime::resolve_content_type(meta.content_type.as_deref(), key);
        let content_type_value = HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static(mime::DEFAULT_CONTENT_TYPE));
        headers.insert(header::CONTENT_TYPE, content_type_value);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(meta.size));

        if let Ok(etag) = HeaderValue::from_str(&format!("\"{}\"", meta.etag)) {
            headers.insert(header::ETAG, etag);
        }

        let cache_control = opts
            .cache_control
            .as_deref()
            .and_then(|cc| HeaderValue::from_str(cc).ok())
            .or_else(|| HeaderValue::from_str(&self.default_cache_control).ok());
        if let Some(value) = cache_control {
            headers.insert(header::CACHE_CONTROL, value);
        }

        let attachment = opts
            .force_download
            .unwrap_or_else(|| mime::downloads_by_default(&content_type));
        if attachment {
            let disposition = mime::attachment_disposition(key);
            if let Ok(value) = HeaderValue::from_bytes(disposition.as_bytes()) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{RouteKey, RouteKind, RouteRecord};
    use crate::storage::{InMemoryObjectStore, MemoryEdgeCache, ObjectStore, StorageError, StoredObject};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts body reads against the wrapped store.
    #[derive(Default)]
    struct CountingStore {
        inner: InMemoryObjectStore,
        gets: AtomicUsize,
    }

    #[async_trait]
    impl ObjectStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn head(&self, key: &str) -> Result<Option<ObjectMeta>, StorageError> {
            self.inner.head(key).await
        }
    }

    /// Always misses and refuses every write.
    struct RejectingCache {
        puts: AtomicUsize,
    }

    #[async_trait]
    impl EdgeCache for RejectingCache {
        async fn get(&self, _key: &CacheKey) -> Result<Option<CachedResponse>, CacheError> {
            Ok(None)
        }

        async fn put(&self, _key: CacheKey, _response: CachedResponse) -> Result<(), CacheError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::Unavailable("cache offline".into()))
        }
    }

    const DOMAIN: &str = "files.example.com";

    fn route(target: &str, opts: ObjectOptions) -> ResolvedRoute {
        ResolvedRoute {
            key: RouteKey::new(DOMAIN, "/dl/*"),
            record: RouteRecord::new("/dl/*", target, RouteKind::ObjectServe(opts)),
            request_path: "/dl/thing".into(),
        }
    }

    fn parts(method: Method, uri: &str) -> Parts {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    fn setup() -> (ObjectHandler, Arc<InMemoryObjectStore>, Arc<MemoryEdgeCache>, DetachedTasks) {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("media/file.zip", "zip-bytes", None);
        store.put("media/photo.png", "png-bytes", None);
        let cache = Arc::new(MemoryEdgeCache::new(16, 1024));
        let tasks = DetachedTasks::new();
        let handler = ObjectHandler::new(
            Buckets::new().bind("files", store.clone()),
            cache.clone(),
            tasks.clone(),
        );
        (handler, store, cache, tasks)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (handler, _store, cache, tasks) = setup();
        let r = route("media/file.zip", ObjectOptions::default());
        let req = parts(Method::GET, "/dl/thing?v=1");

        let response = handler.handle(&r, &ObjectOptions::default(), DOMAIN, &req).await.unwrap();
        assert_eq!(response.headers()[&X_CACHE_STATUS], "MISS");
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"file.zip\""
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "public, max-age=3600");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "zip-bytes");

        assert!(tasks.drain(Duration::from_secs(2)).await);
        assert_eq!(cache.len(), 1);

        let response = handler.handle(&r, &ObjectOptions::default(), DOMAIN, &req).await.unwrap();
        assert_eq!(response.headers()[&X_CACHE_STATUS], "HIT");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "zip-bytes");
    }

    #[tokio::test]
    async fn test_inline_image_and_route_overrides() {
        let (handler, _store, _cache, _tasks) = setup();
        let opts = ObjectOptions {
            cache_control: Some("no-cache".into()),
            ..Default::default()
        };
        let r = route("media/photo.png", opts.clone());
        let response = handler
            .handle(&r, &opts, DOMAIN, &parts(Method::GET, "/dl/thing"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_none());
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let forced = ObjectOptions {
            force_download: Some(true),
            ..Default::default()
        };
        let r = route("media/photo.png", forced.clone());
        let response = handler
            .handle(&r, &forced, DOMAIN, &parts(Method::GET, "/dl/other"))
            .await
            .unwrap();
        assert!(response.headers().get(header::CONTENT_DISPOSITION).is_some());
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_backend() {
        let (handler, _store, cache, _tasks) = setup();
        let r = route("../etc/passwd", ObjectOptions::default());
        let err = handler
            .handle(&r, &ObjectOptions::default(), DOMAIN, &parts(Method::GET, "/dl/x"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_missing_object_and_bucket() {
        let (handler, _store, _cache, _tasks) = setup();
        let r = route("media/absent.txt", ObjectOptions::default());
        let err = handler
            .handle(&r, &ObjectOptions::default(), DOMAIN, &parts(Method::GET, "/dl/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ObjectNotFound { ref key } if key == "media/absent.txt"));

        let opts = ObjectOptions {
            bucket: Some("archive".into()),
            ..Default::default()
        };
        let r = route("media/file.zip", opts.clone());
        let err = handler
            .handle(&r, &opts, DOMAIN, &parts(Method::GET, "/dl/x"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_type(), "configuration_error");
    }

    #[tokio::test]
    async fn test_head_skips_cache() {
        let (handler, _store, cache, tasks) = setup();
        let r = route("media/file.zip", ObjectOptions::default());
        let response = handler
            .handle(&r, &ObjectOptions::default(), DOMAIN, &parts(Method::HEAD, "/dl/thing"))
            .await
            .unwrap();
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "9");
        assert!(response.headers().get(&X_CACHE_STATUS).is_none());
        assert!(tasks.drain(Duration::from_secs(1)).await);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_object_is_served_but_not_cached() {
        let (handler, store, cache, tasks) = setup();
        store.put("media/big.bin", vec![1u8; 4096], None);
        let r = route("media/big.bin", ObjectOptions::default());
        let response = handler
            .handle(&r, &ObjectOptions::default(), DOMAIN, &parts(Method::GET, "/dl/big"))
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.len(), 4096);
        assert!(tasks.drain(Duration::from_secs(1)).await);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_backend_read_once_on_miss_and_never_on_hit() {
        let store = Arc::new(CountingStore::default());
        store.inner.put("media/file.zip", "zip-bytes", None);
        let tasks = DetachedTasks::new();
        let cache = Arc::new(MemoryEdgeCache::new(16, 1024));
        let handler = ObjectHandler::new(
            Buckets::new().bind("files", store.clone()),
            cache.clone(),
            tasks.clone(),
        );
        let r = route("media/file.zip", ObjectOptions::default());
        let req = parts(Method::GET, "/dl/thing");

        let response = handler.handle(&r, &ObjectOptions::default(), DOMAIN, &req).await.unwrap();
        assert_eq!(response.headers()[&X_CACHE_STATUS], "MISS");
        to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(tasks.drain(Duration::from_secs(2)).await);
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        let response = handler.handle(&r, &ObjectOptions::default(), DOMAIN, &req).await.unwrap();
        assert_eq!(response.headers()[&X_CACHE_STATUS], "HIT");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "zip-bytes");
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_keeps_body_intact() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.put("media/file.zip", "zip-bytes", None);
        let cache = Arc::new(RejectingCache {
            puts: AtomicUsize::new(0),
        });
        let tasks = DetachedTasks::new();
        let handler = ObjectHandler::new(
            Buckets::new().bind("files", store),
            cache.clone(),
            tasks.clone(),
        );
        let r = route("media/file.zip", ObjectOptions::default());

        let response = handler
            .handle(&r, &ObjectOptions::default(), DOMAIN, &parts(Method::GET, "/dl/thing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&X_CACHE_STATUS], "MISS");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, "zip-bytes");

        assert!(tasks.drain(Duration::from_secs(2)).await);
        assert_eq!(cache.puts.load(Ordering::SeqCst), 1);
    }
}
