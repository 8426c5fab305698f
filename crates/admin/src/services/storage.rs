//! Object storage client for catalog images.
//!
//! Talks to a Supabase-style storage REST API:
//!
//! - `POST   {url}/object/{bucket}/{path}` uploads an object
//! - `DELETE {url}/object/{bucket}` with `{"prefixes": [...]}` removes objects
//! - `{url}/object/public/{bucket}/{path}` is the public read URL

use std::fmt;
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Errors that can occur when talking to the storage service.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Storage API returned an error response.
    #[error("storage error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Upload content type is not an accepted image format.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// Upload is empty or larger than [`MAX_UPLOAD_BYTES`].
    #[error("image must be between 1 byte and 5 MiB, got {0} bytes")]
    InvalidSize(usize),

    /// Client could not be configured.
    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// Folder an upload is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFolder {
    Products,
    Kits,
    Highlights,
}

impl UploadFolder {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Kits => "kits",
            Self::Highlights => "highlights",
        }
    }
}

impl std::str::FromStr for UploadFolder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "products" => Ok(Self::Products),
            "kits" => Ok(Self::Kits),
            "highlights" => Ok(Self::Highlights),
            other => Err(format!("unknown upload folder: {other}")),
        }
    }
}

impl fmt::Display for UploadFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an accepted image content type to its file extension.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Public URL to put in `<img src>`.
    pub url: String,
    /// Object path inside the bucket.
    pub path: String,
}

#[derive(Serialize)]
struct DeleteRequest<'a> {
    prefixes: &'a [String],
}

/// Storage API client.
#[derive(Clone)]
pub struct StorageClient {
    inner: Arc<StorageClientInner>,
}

struct StorageClientInner {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
}

impl StorageClient {
    /// Create a new storage client.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` if the key is not a valid header value,
    /// or `StorageError::Http` if the HTTP client fails to build.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let key = config.service_key.expose_secret();
        let header = |value: String| {
            HeaderValue::from_str(&value)
                .map(|mut v| {
                    v.set_sensitive(true);
                    v
                })
                .map_err(|e| StorageError::Config(format!("invalid service key: {e}")))
        };

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header(format!("Bearer {key}"))?);
        headers.insert("apikey", header(key.to_string())?);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: Arc::new(StorageClientInner {
                client,
                base_url: config.url.clone(),
                bucket: config.bucket.clone(),
            }),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}object/{}/{path}",
            self.inner.base_url, self.inner.bucket
        )
    }

    /// Public URL for an object path.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}object/public/{}/{path}",
            self.inner.base_url, self.inner.bucket
        )
    }

    /// Recover the object path from a public URL produced by this client.
    ///
    /// Returns `None` for images hosted elsewhere.
    #[must_use]
    pub fn path_from_url(&self, url: &str) -> Option<String> {
        let prefix = self.public_url("");
        url.strip_prefix(&prefix)
            .filter(|path| !path.is_empty())
            .map(ToString::to_string)
    }

    /// Upload an image under `folder` with a random name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnsupportedType` or `StorageError::InvalidSize`
    /// before any request is made, and `StorageError::Api` if the upload is
    /// refused.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(
        &self,
        folder: UploadFolder,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let extension = extension_for(content_type)
            .ok_or_else(|| StorageError::UnsupportedType(content_type.to_string()))?;
        if bytes.is_empty() || bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::InvalidSize(bytes.len()));
        }

        let path = format!("{folder}/{}.{extension}", Uuid::new_v4());
        let response = self
            .inner
            .client
            .post(self.object_url(&path))
            .header(CONTENT_TYPE, content_type)
            .header("cache-control", "max-age=31536000")
            .body(bytes)
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!(path = %path, "Image uploaded");

        Ok(StoredObject {
            url: self.public_url(&path),
            path,
        })
    }

    /// Remove objects by path.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Api` if the storage service refuses the request.
    #[instrument(skip(self), fields(count = paths.len()))]
    pub async fn delete(&self, paths: &[String]) -> Result<(), StorageError> {
        if paths.is_empty() {
            return Ok(());
        }

        let url = format!("{}object/{}", self.inner.base_url, self.inner.bucket);
        let response = self
            .inner
            .client
            .delete(url)
            .json(&DeleteRequest { prefixes: paths })
            .send()
            .await?;

        check_status(response).await?;
        tracing::info!("Images deleted");
        Ok(())
    }

    /// Remove the stored copies of `urls`, logging instead of failing.
    ///
    /// URLs that do not point into the bucket are skipped.
    pub async fn delete_urls_best_effort<'a>(&self, urls: impl IntoIterator<Item = &'a str>) {
        let paths: Vec<String> = urls
            .into_iter()
            .filter_map(|url| self.path_from_url(url))
            .collect();

        if let Err(e) = self.delete(&paths).await {
            tracing::warn!(error = %e, count = paths.len(), "Failed to delete images");
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let message = response.text().await.unwrap_or_default();
    Err(StorageError::Api {
        status: status.as_u16(),
        message,
    })
}
