//! Tenant environment
//!
//! `Tenancy` is built once at startup and shared; it produces one
//! `Environment` per request. The environment owns that request's current
//! hostname binding, so two requests can never observe each other's tenant.
//!
//! ```text
//!   Tenancy (shared)                       Environment (per request)
//!   ┌──────────────────────────┐  boot    ┌──────────────────────────────┐
//!   │ config / installation    │ ───────▶ │ request host                 │
//!   │ directory / dispatcher   │          │ CurrentHostname binding      │
//!   │ identification strategy  │          │ hostname / customer / website│
//!   └──────────────────────────┘          └──────────────────────────────┘
//! ```

use crate::config::TenancyConfig;
use crate::context::{BindingSource, CurrentHostname};
use crate::directory::TenantDirectory;
use crate::error::Result;
use crate::events::EventDispatcher;
use crate::extractor::{self, HostnameIdentification};
use crate::installation::Installation;
use crate::request::RequestHost;
use std::sync::Arc;
use tenancy_models::{Customer, Hostname, Website};

/// Process-wide tenancy services
#[derive(Clone)]
pub struct Tenancy {
    config: Arc<TenancyConfig>,
    installation: Installation,
    directory: Arc<dyn TenantDirectory>,
    dispatcher: Arc<dyn EventDispatcher>,
    identification: Arc<dyn HostnameIdentification>,
}

impl Tenancy {
    /// Wire services; the identification strategy follows `config.identification`
    pub fn new(
        config: TenancyConfig,
        directory: Arc<dyn TenantDirectory>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        let identification =
            extractor::from_config(&config, Arc::clone(&directory), Arc::clone(&dispatcher));
        Self {
            installation: Installation::new(config.base_path.clone()),
            config: Arc::new(config),
            directory,
            dispatcher,
            identification,
        }
    }

    /// Replace the configured identification strategy
    pub fn with_identification(mut self, identification: Arc<dyn HostnameIdentification>) -> Self {
        self.identification = identification;
        self
    }

    pub fn config(&self) -> &TenancyConfig {
        &self.config
    }

    pub fn installed(&self) -> bool {
        self.installation.installed()
    }

    pub fn dispatcher(&self) -> &Arc<dyn EventDispatcher> {
        &self.dispatcher
    }

    /// Build the environment for one request. See [`Environment::boot`].
    pub async fn environment(&self, request: RequestHost) -> Result<Environment> {
        Environment::boot(self.clone(), request).await
    }
}

/// Tenant context of a single request
pub struct Environment {
    tenancy: Tenancy,
    request: RequestHost,
    current: CurrentHostname,
}

impl Environment {
    /// Construct the environment and, when tenancy is installed and
    /// auto-identification is on, resolve the hostname right away so later
    /// readers find it bound. An identification error fails the boot.
    pub async fn boot(tenancy: Tenancy, request: RequestHost) -> Result<Self> {
        let environment = Self {
            tenancy,
            request,
            current: CurrentHostname::new(),
        };

        if environment.installed() && environment.tenancy.config.auto_identification {
            environment.identify_hostname().await;
            environment.hostname().await?;
        }

        Ok(environment)
    }

    pub fn installed(&self) -> bool {
        self.tenancy.installed()
    }

    pub fn request(&self) -> &RequestHost {
        &self.request
    }

    /// Register the configured strategy; it runs on the next `hostname()`
    /// read. Returns `false` when the binding is already resolved and the
    /// registration was ignored.
    pub async fn identify_hostname(&self) -> bool {
        let strategy = Arc::clone(&self.tenancy.identification);
        self.current.register(strategy).await
    }

    /// Like [`Environment::identify_hostname`] with a one-off strategy
    pub async fn identify_hostname_with(&self, strategy: Arc<dyn HostnameIdentification>) -> bool {
        self.current.register(strategy).await
    }

    /// Current hostname, resolving lazily on first read
    pub async fn hostname(&self) -> Result<Option<Hostname>> {
        self.current.resolve(&self.request).await
    }

    /// Make `hostname` current for the rest of this request and emit
    /// `Switched`.
    pub async fn switch_hostname(&self, hostname: Hostname) -> Hostname {
        self.current
            .switch(hostname, self.tenancy.dispatcher.as_ref())
            .await
    }

    pub async fn customer(&self) -> Result<Option<Customer>> {
        match self.hostname().await? {
            Some(hostname) => self.tenancy.directory.customer(&hostname).await,
            None => Ok(None),
        }
    }

    pub async fn website(&self) -> Result<Option<Website>> {
        match self.hostname().await? {
            Some(hostname) => self.tenancy.directory.website(&hostname).await,
            None => Ok(None),
        }
    }

    /// Whether a value (possibly "no hostname") is bound
    pub async fn is_resolved(&self) -> bool {
        self.current.is_resolved().await
    }

    pub async fn binding_source(&self) -> Option<BindingSource> {
        self.current.source().await
    }
}
