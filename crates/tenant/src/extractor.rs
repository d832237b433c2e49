// Hostname identification strategies
// Resolve the request to a registered hostname by exact host, wildcard or header

use crate::config::{IdentificationStrategy, TenancyConfig};
use crate::directory::TenantDirectory;
use crate::error::Result;
use crate::events::{EventDispatcher, TenancyEvent};
use crate::request::RequestHost;
use async_trait::async_trait;
use std::sync::Arc;
use tenancy_models::hostname::normalize_fqdn;
use tenancy_models::Hostname;

/// Resolves the inbound request to a hostname, or `None` when nothing in the
/// registry matches. Errors come from the directory and are never retried.
#[async_trait]
pub trait HostnameIdentification: Send + Sync {
    async fn identify(&self, request: &RequestHost) -> Result<Option<Hostname>>;
}

/// Build the strategy selected by `config.identification`
pub fn from_config(
    config: &TenancyConfig,
    directory: Arc<dyn TenantDirectory>,
    dispatcher: Arc<dyn EventDispatcher>,
) -> Arc<dyn HostnameIdentification> {
    let exact = ExactHostnameIdentification::new(directory, dispatcher)
        .with_default(config.default_hostname.clone());

    match config.identification {
        IdentificationStrategy::Exact => Arc::new(exact),
        IdentificationStrategy::Wildcard => Arc::new(WildcardHostnameIdentification::new(exact)),
        IdentificationStrategy::Header => Arc::new(HeaderHostnameIdentification::new(
            exact,
            config.identification_header.clone(),
        )),
    }
}

/// Request host must equal a registered fqdn; falls back to the configured
/// default hostname.
#[derive(Clone)]
pub struct ExactHostnameIdentification {
    directory: Arc<dyn TenantDirectory>,
    dispatcher: Arc<dyn EventDispatcher>,
    default_hostname: Option<String>,
}

impl ExactHostnameIdentification {
    pub fn new(directory: Arc<dyn TenantDirectory>, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        Self {
            directory,
            dispatcher,
            default_hostname: None,
        }
    }

    pub fn with_default(mut self, default_hostname: Option<String>) -> Self {
        self.default_hostname = default_hostname.map(|fqdn| normalize_fqdn(&fqdn));
        self
    }

    /// Try each candidate in order, then the default hostname. Announces the
    /// outcome for `host` exactly once.
    async fn lookup(&self, host: &str, candidates: &[String]) -> Result<Option<Hostname>> {
        let mut found = None;
        for fqdn in candidates {
            if let Some(hostname) = self.directory.find_hostname(fqdn).await? {
                found = Some(hostname);
                break;
            }
        }

        if found.is_none() {
            if let Some(default) = &self.default_hostname {
                found = self.directory.find_hostname(default).await?;
            }
        }

        match &found {
            Some(hostname) => {
                tracing::debug!(host, fqdn = %hostname.fqdn, "Identified hostname");
                self.dispatcher.dispatch(TenancyEvent::Identified {
                    hostname: hostname.clone(),
                });
            }
            None => {
                tracing::debug!(host, "No hostname matches request");
                self.dispatcher.dispatch(TenancyEvent::NoneFound {
                    host: host.to_string(),
                });
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl HostnameIdentification for ExactHostnameIdentification {
    async fn identify(&self, request: &RequestHost) -> Result<Option<Hostname>> {
        let host = request.host();
        self.lookup(host, &[host.to_string()]).await
    }
}

/// Exact match first, then `*.parent` records walking up the label chain.
/// `a.b.example.com` tries `a.b.example.com`, `*.b.example.com`,
/// `*.example.com`. A bare `*.tld` is never tried.
#[derive(Clone)]
pub struct WildcardHostnameIdentification {
    inner: ExactHostnameIdentification,
}

impl WildcardHostnameIdentification {
    pub fn new(inner: ExactHostnameIdentification) -> Self {
        Self { inner }
    }

    pub fn candidates(host: &str) -> Vec<String> {
        let mut candidates = vec![host.to_string()];
        let labels: Vec<&str> = host.split('.').collect();
        for start in 1..labels.len().saturating_sub(1) {
            candidates.push(format!("*.{}", labels[start..].join(".")));
        }
        candidates
    }
}

#[async_trait]
impl HostnameIdentification for WildcardHostnameIdentification {
    async fn identify(&self, request: &RequestHost) -> Result<Option<Hostname>> {
        let host = request.host();
        self.inner.lookup(host, &Self::candidates(host)).await
    }
}

/// Takes the hostname from a request header (e.g. set by an edge proxy);
/// requests without the header are matched on their own host.
#[derive(Clone)]
pub struct HeaderHostnameIdentification {
    inner: ExactHostnameIdentification,
    header: String,
}

impl HeaderHostnameIdentification {
    pub fn new(inner: ExactHostnameIdentification, header: impl Into<String>) -> Self {
        Self {
            inner,
            header: header.into(),
        }
    }
}

#[async_trait]
impl HostnameIdentification for HeaderHostnameIdentification {
    async fn identify(&self, request: &RequestHost) -> Result<Option<Hostname>> {
        let host = request
            .header(&self.header)
            .map(normalize_fqdn)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| request.host().to_string());
        self.inner.lookup(&host, &[host.clone()]).await
    }
}
