use anyhow::Context;
use std::path::Path;
use tenancy_database::{DatabaseConfig, HostnameCacheConfig};
use tenancy_tenant::TenancyConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database: DatabaseConfig,
    pub hostname_cache: HostnameCacheConfig,
    pub tenancy: TenancyConfig,
}

impl Config {
    /// Server and database settings come from the environment; tenancy
    /// settings are layered from `tenancy_file` and `TENANCY_*` variables.
    pub fn load(tenancy_file: &Path) -> anyhow::Result<Self> {
        let tenancy = TenancyConfig::load(tenancy_file)
            .with_context(|| format!("Failed to load tenancy config from {:?}", tenancy_file))?;

        Ok(Self {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database: DatabaseConfig::from_env(),
            hostname_cache: HostnameCacheConfig::from_env(),
            tenancy,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
