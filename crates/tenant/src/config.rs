use crate::error::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// How the current request is matched against the hostname registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentificationStrategy {
    /// Request host must equal a registered fqdn
    #[default]
    Exact,
    /// Exact match first, then `*.parent` records up the label chain
    Wildcard,
    /// Hostname supplied by a request header, request host as fallback
    Header,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Application root; `tenancy.json` is looked up here
    pub base_path: PathBuf,
    /// Resolve the hostname while the environment is being built
    pub auto_identification: bool,
    /// Hostname used when nothing in the registry matches the request
    pub default_hostname: Option<String>,
    pub identification: IdentificationStrategy,
    /// Header read by the `header` strategy
    pub identification_header: String,
    /// Honour `x-forwarded-proto` when deciding whether a request is https.
    /// Only enable behind a proxy that overwrites the header.
    pub trust_forwarded_proto: bool,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            auto_identification: true,
            default_hostname: None,
            identification: IdentificationStrategy::Exact,
            identification_header: "x-tenant-hostname".to_string(),
            trust_forwarded_proto: false,
        }
    }
}

impl TenancyConfig {
    /// Layered load: defaults, then the optional TOML file at `path`, then
    /// `TENANCY_*` environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(
                ::config::File::from(path.as_ref())
                    .format(::config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(::config::Environment::with_prefix("TENANCY").try_parsing(true))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
