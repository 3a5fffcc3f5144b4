//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route store from seed routes
//! - Bind buckets, the edge cache and the outbound client
//! - Assemble the dispatcher from validated configuration
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::sync::Arc;

use thiserror::Error;

use crate::config::schema::{BucketConfig, RouterConfig};
use crate::dispatch::{Dispatcher, ObjectHandler, ProxyHandler};
use crate::lifecycle::tasks::DetachedTasks;
use crate::observability::usage::LogUsageRecorder;
use crate::routing::{InMemoryRouteStore, RouteResolver};
use crate::storage::{Buckets, FsObjectStore, InMemoryObjectStore, MemoryEdgeCache, ObjectStore};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to encode seed route {domain}:{path}: {source}")]
    SeedRoute {
        domain: String,
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Route store holding the configured seed routes.
pub fn seed_route_store(config: &RouterConfig) -> Result<InMemoryRouteStore, StartupError> {
    let store = InMemoryRouteStore::new();
    for seed in &config.routes {
        store
            .insert(&seed.domain, &seed.record)
            .map_err(|source| StartupError::SeedRoute {
                domain: seed.domain.clone(),
                path: seed.record.path.clone(),
                source,
            })?;
    }
    Ok(store)
}

/// Bucket bindings described by the configuration.
pub fn build_buckets(config: &RouterConfig) -> Buckets {
    config
        .buckets
        .iter()
        .fold(Buckets::new(), |buckets, (name, bucket)| {
            let store: Arc<dyn ObjectStore> = match bucket {
                BucketConfig::Memory => {
                    tracing::warn!(
                        bucket = %name,
                        "Memory bucket starts empty; its objectServe routes answer 404"
                    );
                    Arc::new(InMemoryObjectStore::new())
                }
                BucketConfig::Filesystem { root } => Arc::new(FsObjectStore::new(root)),
            };
            buckets.bind(name.clone(), store)
        })
}

/// Wire every subsystem into a dispatcher.
pub fn build_dispatcher(
    config: &RouterConfig,
    tasks: DetachedTasks,
) -> Result<Dispatcher, StartupError> {
    let store = seed_route_store(config)?;
    tracing::info!(
        routes = store.len(),
        domains = config.domains.len(),
        "Route store seeded"
    );
    let resolver = RouteResolver::new(Arc::new(store), config.domains.iter().cloned());

    let proxy = ProxyHandler::from_config(&config.proxy)?;
    if config.proxy.allow_private_targets {
        tracing::warn!("Private proxy targets are allowed; do not use this setting in production");
    }

    let cache = Arc::new(MemoryEdgeCache::new(
        config.objects.cache_max_entries,
        config.objects.cache_max_object_bytes,
    ));
    let objects = ObjectHandler::new(build_buckets(config), cache, tasks.clone())
        .with_default_bucket(config.objects.default_bucket.clone())
        .with_cache_control(config.objects.cache_control.clone())
        .with_max_cache_bytes(config.objects.cache_max_object_bytes);

    Ok(Dispatcher::new(
        resolver,
        proxy,
        objects,
        Arc::new(LogUsageRecorder),
        tasks,
    ))
}
