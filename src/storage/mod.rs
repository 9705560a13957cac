//! Image storage for gallery uploads and item pictures.
//!
//! Production talks to a Cloudinary-compatible REST API; development and tests use
//! the in-memory store.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

use crate::config::AppConfig;
use crate::errors::ServiceError;

mod cloudinary;
mod memory;

pub use cloudinary::{sign_params, CloudinaryConfig, CloudinaryStore};
pub use memory::InMemoryImageStore;

/// Location of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("image storage is not configured")]
    NotConfigured,

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("unexpected storage response: {0}")]
    InvalidResponse(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured => ServiceError::ServiceUnavailable(err.to_string()),
            other => ServiceError::ExternalServiceError(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<StoredImage, StorageError>;

    /// Removing an image that no longer exists is not an error.
    async fn destroy(&self, public_id: &str) -> Result<(), StorageError>;

    fn name(&self) -> &'static str;
}

/// Cloudinary when credentials are configured, otherwise in memory.
/// Production without credentials is rejected earlier by config validation.
pub fn store_from_config(config: &AppConfig) -> Result<Arc<dyn ImageStore>, StorageError> {
    match CloudinaryConfig::from_app_config(config) {
        Some(cloudinary) => Ok(Arc::new(CloudinaryStore::new(cloudinary)?)),
        None if config.is_production() => Err(StorageError::NotConfigured),
        None => Ok(Arc::new(InMemoryImageStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn storage_errors_map_to_gateway_statuses() {
        let upstream: ServiceError = StorageError::Upstream {
            status: 500,
            message: "boom".into(),
        }
        .into();
        assert_eq!(upstream.status_code(), StatusCode::BAD_GATEWAY);

        let missing: ServiceError = StorageError::NotConfigured.into();
        assert_eq!(missing.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn development_falls_back_to_memory() {
        let config = AppConfig::new(
            "sqlite::memory:".into(),
            "t3st-s1gning-k3y-".repeat(5),
            "development".into(),
        );
        let store = store_from_config(&config).unwrap();
        assert_eq!(store.name(), "memory");
    }
}
