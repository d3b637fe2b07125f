//! Error types for the translation configuration store.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by [`ConfigStore`](crate::ConfigStore) operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Service not found: {service} (config {profile})")]
    ServiceNotFound { service: String, profile: String },

    #[error("Config not found: {profile} for service {service}")]
    ProfileNotFound { service: String, profile: String },

    #[error(
        "Invalid max concurrent requests {value:?}: must be an integer between {min} and {max}"
    )]
    InvalidConcurrency { value: String, min: u32, max: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn service_not_found(service: impl Into<String>, profile: impl Into<String>) -> Self {
        Self::ServiceNotFound {
            service: service.into(),
            profile: profile.into(),
        }
    }

    pub fn profile_not_found(service: impl Into<String>, profile: impl Into<String>) -> Self {
        Self::ProfileNotFound {
            service: service.into(),
            profile: profile.into(),
        }
    }

    /// Whether the error means the addressed service or profile is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ServiceNotFound { .. } | Self::ProfileNotFound { .. }
        )
    }
}
