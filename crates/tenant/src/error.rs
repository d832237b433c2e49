use tenancy_database::DatabaseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TenancyError>;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("Hostname identification failed: {0}")]
    Identification(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<::config::ConfigError> for TenancyError {
    fn from(err: ::config::ConfigError) -> Self {
        TenancyError::Config(err.to_string())
    }
}
