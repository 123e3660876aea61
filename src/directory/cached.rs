//! TTL cache in front of a directory backend.
//!
//! # Responsibilities
//! - Serve repeated lookups without touching the backend
//! - Expire entries a fixed time after insertion
//! - Bound the number of cached users
//!
//! # Design Decisions
//! - Only successful lookups are cached; `UserNotFound` and outages always
//!   reach the backend again
//! - The key is the identity exactly as received unless `normalize_keys` is
//!   set, in which case equivalent DNs share one entry

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;

use crate::config::UserCacheConfig;
use crate::directory::dn;
use crate::directory::{DirectoryError, ResolvedUser, UserDirectory};
use crate::observability::metrics;

/// Name of the cache in logs and metrics.
pub const USERS_CACHE: &str = "users";

/// Caching decorator over any [`UserDirectory`].
pub struct CachedDirectory {
    inner: Arc<dyn UserDirectory>,
    cache: Cache<String, ResolvedUser>,
    normalize_keys: bool,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn UserDirectory>, config: &UserCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        tracing::info!(
            backend = inner.name(),
            ttl = ?config.ttl,
            max_capacity = config.max_capacity,
            normalize_keys = config.normalize_keys,
            "User cache configured"
        );

        Self {
            inner,
            cache,
            normalize_keys: config.normalize_keys,
        }
    }

    fn cache_key(&self, identity: &str) -> String {
        if self.normalize_keys {
            dn::normalize(identity).unwrap_or_else(|| identity.to_string())
        } else {
            identity.to_string()
        }
    }
}

#[async_trait]
impl UserDirectory for CachedDirectory {
    async fn lookup(&self, identity: &str) -> Result<ResolvedUser, DirectoryError> {
        if identity.trim().is_empty() {
            return Err(DirectoryError::UserNotFound(String::new()));
        }

        let key = self.cache_key(identity);
        if let Some(user) = self.cache.get(&key).await {
            tracing::debug!(cache = USERS_CACHE, key = %key, "Cache HIT");
            metrics::record_cache_lookup(USERS_CACHE, true);
            return Ok(user);
        }

        tracing::debug!(
            cache = USERS_CACHE,
            key = %key,
            entries = self.cache.entry_count(),
            "Cache MISS"
        );
        metrics::record_cache_lookup(USERS_CACHE, false);

        let user = self.inner.lookup(identity).await?;
        self.cache.insert(key, user.clone()).await;
        Ok(user)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
