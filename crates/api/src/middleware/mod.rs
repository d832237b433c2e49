pub mod tenant;

pub use tenant::{hostname_actions, resolve_environment};
