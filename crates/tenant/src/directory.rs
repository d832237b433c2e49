//! Lookup seam between tenant identification and the hostname registry

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tenancy_database::HostnameRepository;
use tenancy_models::{Customer, Hostname, Website};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Read access to hostnames and the entities they point at.
///
/// Implementations:
/// - `HostnameRepository`: Postgres registry (cached)
/// - `MemoryDirectory`: in-process map for tests and local runs
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Find a hostname by normalized fqdn
    async fn find_hostname(&self, fqdn: &str) -> Result<Option<Hostname>>;

    /// Customer the hostname belongs to; `None` when unset or dangling
    async fn customer(&self, hostname: &Hostname) -> Result<Option<Customer>>;

    /// Website the hostname serves; `None` when unset or dangling
    async fn website(&self, hostname: &Hostname) -> Result<Option<Website>>;
}

#[async_trait]
impl TenantDirectory for HostnameRepository {
    async fn find_hostname(&self, fqdn: &str) -> Result<Option<Hostname>> {
        Ok(self.find_by_fqdn(fqdn).await?)
    }

    async fn customer(&self, hostname: &Hostname) -> Result<Option<Customer>> {
        match hostname.customer_id {
            Some(id) => Ok(self.find_customer(id).await?),
            None => Ok(None),
        }
    }

    async fn website(&self, hostname: &Hostname) -> Result<Option<Website>> {
        match hostname.website_id {
            Some(id) => Ok(self.find_website(id).await?),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    hostnames: HashMap<String, Hostname>,
    customers: HashMap<Uuid, Customer>,
    websites: HashMap<Uuid, Website>,
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    registry: RwLock<Registry>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_hostname(&self, hostname: Hostname) {
        let mut registry = self.registry.write().await;
        registry.hostnames.insert(hostname.fqdn.clone(), hostname);
    }

    pub async fn insert_customer(&self, customer: Customer) {
        let mut registry = self.registry.write().await;
        registry.customers.insert(customer.id, customer);
    }

    pub async fn insert_website(&self, website: Website) {
        let mut registry = self.registry.write().await;
        registry.websites.insert(website.id, website);
    }
}

#[async_trait]
impl TenantDirectory for MemoryDirectory {
    async fn find_hostname(&self, fqdn: &str) -> Result<Option<Hostname>> {
        Ok(self.registry.read().await.hostnames.get(fqdn).cloned())
    }

    async fn customer(&self, hostname: &Hostname) -> Result<Option<Customer>> {
        let registry = self.registry.read().await;
        Ok(hostname
            .customer_id
            .and_then(|id| registry.customers.get(&id).cloned()))
    }

    async fn website(&self, hostname: &Hostname) -> Result<Option<Website>> {
        let registry = self.registry.read().await;
        Ok(hostname
            .website_id
            .and_then(|id| registry.websites.get(&id).cloned()))
    }
}
