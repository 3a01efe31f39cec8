/// Object storage helper
///
/// Task images and submission screenshots live in an external object store
/// with a Supabase-storage-style HTTP API. Objects are keyed by path string
/// within a bucket.
///
/// Two operations matter here:
///
/// - **Public URL derivation** is a pure string computation — no network call.
/// - **Deletion** is an authenticated HTTP DELETE. Callers treat a failed
///   delete as non-fatal: the sweeper logs it and still removes the database
///   rows.

use reqwest::StatusCode;
use thiserror::Error;

/// Object storage errors
///
/// Non-fatal by policy: a storage failure never blocks the dependent row
/// mutation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP transport failure
    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Storage service returned a non-success status
    #[error("storage returned {status} for '{path}'")]
    Unexpected { status: StatusCode, path: String },
}

/// Storage client configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Base URL of the storage service (e.g. "https://xyz.supabase.co")
    pub base_url: String,

    /// Bucket holding task media
    pub bucket: String,

    /// Service key sent as a Bearer token on mutating calls
    pub service_key: String,
}

/// Client for the object storage service
#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
    config: StorageConfig,
}

impl StorageClient {
    /// Creates a storage client
    pub fn new(config: StorageConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Derives the public URL for a stored object
    ///
    /// Pure derivation from base URL, bucket and path; no network call.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    /// Deletes a stored object by path
    ///
    /// # Errors
    ///
    /// Returns a `StorageError` on transport failure or a non-success status.
    /// A missing object (404) is treated as already deleted.
    pub async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.bucket,
            path.trim_start_matches('/')
        );

        let response = self
            .http
            .delete(&url)
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StorageError::Unexpected {
                status,
                path: path.to_string(),
            })
        }
    }
}
