//! Hostname registry lookups
//!
//! Every request that reaches identification ends in `find_by_fqdn`. Hits can
//! be kept in a bounded moka cache; the cache is off unless configured and is
//! kept fresh by `watch_changes`. Misses are never cached: a hostname added
//! to the registry must become routable on the very next request.

use crate::error::Result;
use moka::future::Cache;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use std::time::Duration;
use tenancy_models::hostname::normalize_fqdn;
use tenancy_models::{Customer, Hostname, Website};
use uuid::Uuid;

/// Channel the registry notifies with the changed fqdn as payload. An empty
/// payload drops every cached hostname.
pub const HOSTNAME_CHANGES_CHANNEL: &str = "tenancy_hostname_changed";

const HOSTNAME_COLUMNS: &str = "id, fqdn, redirect_to, force_https, under_maintenance_since, \
     website_id, customer_id, created_at, updated_at";

/// Cache settings for hostname lookups
#[derive(Debug, Clone)]
pub struct HostnameCacheConfig {
    /// Cache hits at all; off by default
    pub enabled: bool,
    /// Maximum number of hostnames kept in memory
    pub max_capacity: u64,
    /// Upper bound on staleness when a change notification is missed
    pub time_to_live: Duration,
}

impl Default for HostnameCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 10_000,
            time_to_live: Duration::from_secs(30),
        }
    }
}

impl HostnameCacheConfig {
    /// Reads `HOSTNAME_CACHE_ENABLED`, `HOSTNAME_CACHE_MAX_CAPACITY` and
    /// `HOSTNAME_CACHE_TTL_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("HOSTNAME_CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enabled),
            max_capacity: std::env::var("HOSTNAME_CACHE_MAX_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_capacity),
            time_to_live: std::env::var("HOSTNAME_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.time_to_live),
        }
    }
}

#[derive(Clone)]
pub struct HostnameRepository {
    pool: PgPool,
    cache: Option<Cache<String, Hostname>>,
}

impl HostnameRepository {
    pub fn new(pool: PgPool, config: HostnameCacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(config.time_to_live)
                .build()
        });

        Self { pool, cache }
    }

    /// Find a hostname by its fully qualified domain name (already normalized)
    pub async fn find_by_fqdn(&self, fqdn: &str) -> Result<Option<Hostname>> {
        if let Some(hostname) = self.cached(fqdn).await {
            tracing::trace!(fqdn, "Hostname cache hit");
            return Ok(Some(hostname));
        }

        let hostname = sqlx::query_as::<_, Hostname>(&format!(
            "SELECT {} FROM hostnames WHERE fqdn = $1",
            HOSTNAME_COLUMNS
        ))
        .bind(fqdn)
        .fetch_optional(&self.pool)
        .await?;

        match &hostname {
            Some(found) => {
                tracing::debug!(fqdn, hostname_id = %found.id, "Hostname loaded from registry");
                self.remember(fqdn, found).await;
            }
            None => tracing::debug!(fqdn, "Hostname not registered"),
        }

        Ok(hostname)
    }

    pub async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>(
            "SELECT id, name, email, created_at, updated_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn find_website(&self, id: Uuid) -> Result<Option<Website>> {
        Ok(sqlx::query_as::<_, Website>(
            "SELECT id, uuid, customer_id, created_at, updated_at FROM websites WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Drop a cached hostname after it was changed in the registry
    pub async fn invalidate(&self, fqdn: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(fqdn).await;
        }
    }

    /// Evict cached hostnames as the registry announces changes on
    /// `HOSTNAME_CHANGES_CHANNEL`. Only returns on a listener error.
    pub async fn watch_changes(&self) -> Result<()> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(HOSTNAME_CHANGES_CHANNEL).await?;
        tracing::debug!(channel = HOSTNAME_CHANGES_CHANNEL, "Watching hostname changes");

        loop {
            let notification = listener.recv().await?;
            let fqdn = normalize_fqdn(notification.payload());
            if fqdn.is_empty() {
                tracing::debug!("Hostname registry reloaded, dropping cache");
                if let Some(cache) = &self.cache {
                    cache.invalidate_all();
                }
            } else {
                tracing::debug!(fqdn = %fqdn, "Hostname changed in registry");
                self.invalidate(&fqdn).await;
            }
        }
    }

    async fn cached(&self, fqdn: &str) -> Option<Hostname> {
        match &self.cache {
            Some(cache) => cache.get(fqdn).await,
            None => None,
        }
    }

    async fn remember(&self, fqdn: &str, hostname: &Hostname) {
        if let Some(cache) = &self.cache {
            cache.insert(fqdn.to_string(), hostname.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    /// Repository over a pool that never connects; only the cache is exercised
    fn offline_repository(config: HostnameCacheConfig) -> HostnameRepository {
        let pool = PgPoolOptions::new()
            .min_connections(0)
            .connect_lazy("postgresql://tenancy@localhost/tenancy")
            .unwrap();
        HostnameRepository::new(pool, config)
    }

    fn enabled() -> HostnameCacheConfig {
        HostnameCacheConfig {
            enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = HostnameCacheConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.max_capacity, 10_000);
        assert_eq!(config.time_to_live, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_disabled_cache_keeps_nothing() {
        let repo = offline_repository(HostnameCacheConfig::default());
        repo.remember("shop.example.com", &Hostname::new("shop.example.com"))
            .await;
        assert!(repo.cached("shop.example.com").await.is_none());
    }

    #[tokio::test]
    async fn test_invalidate_drops_stale_hostname() {
        let repo = offline_repository(enabled());
        let mut hostname = Hostname::new("shop.example.com");
        repo.remember("shop.example.com", &hostname).await;

        // Registry flips the hostname into maintenance
        hostname.under_maintenance_since = Some(chrono::Utc::now());
        repo.invalidate("shop.example.com").await;
        assert!(repo.cached("shop.example.com").await.is_none());

        repo.remember("shop.example.com", &hostname).await;
        let cached = repo.cached("shop.example.com").await.unwrap();
        assert!(cached.under_maintenance_since.is_some());
    }

    #[tokio::test]
    async fn test_cached_hostname_expires() {
        let repo = offline_repository(HostnameCacheConfig {
            time_to_live: Duration::from_millis(50),
            ..enabled()
        });
        repo.remember("shop.example.com", &Hostname::new("shop.example.com"))
            .await;
        assert!(repo.cached("shop.example.com").await.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(repo.cached("shop.example.com").await.is_none());
    }

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_unknown_hostname_is_none() {
        let db = crate::Database::new(crate::DatabaseConfig::from_env())
            .await
            .expect("Failed to connect to database");
        let repo = HostnameRepository::new(db.pool().clone(), enabled());
        let found = repo
            .find_by_fqdn("does-not-exist.invalid")
            .await
            .expect("Query failed");
        assert!(found.is_none());
        assert!(repo.cached("does-not-exist.invalid").await.is_none());
    }
}
