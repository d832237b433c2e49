// Core modules
pub mod customer;
pub mod hostname;
pub mod website;

// Re-export commonly used types
pub use customer::Customer;
pub use hostname::Hostname;
pub use website::Website;
