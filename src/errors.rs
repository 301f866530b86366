//! Error types for the pool

use thiserror::Error;

/// Boxed error returned by caller-supplied factory, close and health-check behaviors
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Pool is closed")]
    Closed,

    #[error("Resource is nil")]
    InvalidResource,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to create resource: {0}")]
    Factory(#[source] BoxError),

    #[error("Failed to close resource: {0}")]
    Destroy(#[source] BoxError),

    #[error("Operation was cancelled")]
    Cancelled,
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_factory_error_keeps_source() {
        let err = PoolError::Factory("connection refused".into());

        assert_eq!(err.to_string(), "Failed to create resource: connection refused");
        assert_eq!(err.source().unwrap().to_string(), "connection refused");
    }

    #[test]
    fn test_invalid_config_message() {
        let err = PoolError::InvalidConfig("init_cap must be greater than 0".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid pool configuration: init_cap must be greater than 0"
        );
    }
}
