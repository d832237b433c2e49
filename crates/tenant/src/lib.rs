// Hostname-based tenant identification and the per-request tenant environment

pub mod config;
pub mod context;
pub mod directory;
pub mod environment;
pub mod error;
pub mod events;
pub mod extractor;
pub mod installation;
pub mod request;

pub use self::config::{IdentificationStrategy, TenancyConfig};
pub use context::{BindingSource, CurrentHostname};
pub use directory::{MemoryDirectory, TenantDirectory};
pub use environment::{Environment, Tenancy};
pub use error::{Result, TenancyError};
pub use events::{BroadcastDispatcher, EventDispatcher, NullDispatcher, TenancyEvent};
pub use extractor::{
    ExactHostnameIdentification, HeaderHostnameIdentification, HostnameIdentification,
    WildcardHostnameIdentification,
};
pub use installation::{Installation, MARKER_FILE};
pub use request::RequestHost;
