//! # Album Art Content Provider
//!
//! Maps remote artwork URIs to opaque `content://` references and serves them
//! from a local disk cache.
//!
//! ## Overview
//!
//! Consumers of the catalog never address artwork by its remote URI. During
//! catalog parsing every image is passed through [`AlbumArtContentProvider::map_uri`],
//! which records a 1:1 mapping and hands back a content reference. Opening that
//! reference later downloads the image on first use and returns the cached file.
//!
//! The mapping lives in memory for the lifetime of the provider. Anything that
//! must survive a restart (the Recent slot) stores a `file://` reference to the
//! cached copy instead, see [`AlbumArtContentProvider::local_reference`].
//!
//! ## Reference format
//!
//! ```text
//! https://host/uamp/Wake_Up/art.jpg
//!   -> content://{authority}/uamp:Wake_Up:art.jpg
//!   -> {cache_dir}/uamp:Wake_Up:art.jpg
//! ```

use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::storage::FileSystemAccess;
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use core_runtime::logging;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::error::{LibraryError, Result};

pub struct AlbumArtContentProvider {
    authority: String,
    http_client: Arc<dyn HttpClient>,
    file_system: Arc<dyn FileSystemAccess>,
    timeout: Duration,
    /// content reference -> remote URI
    uri_map: RwLock<HashMap<String, String>>,
}

impl AlbumArtContentProvider {
    pub fn new(
        authority: impl Into<String>,
        http_client: Arc<dyn HttpClient>,
        file_system: Arc<dyn FileSystemAccess>,
        timeout: Duration,
    ) -> Self {
        Self {
            authority: authority.into(),
            http_client,
            file_system,
            timeout,
            uri_map: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            config.content_authority.clone(),
            Arc::clone(&config.http_client),
            Arc::clone(&config.file_system),
            config.artwork_timeout,
        )
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Map a remote artwork URI to its content reference and remember it.
    ///
    /// Returns an empty reference when the URI has no path.
    pub fn map_uri(&self, remote: &str) -> String {
        let path = match Url::parse(remote) {
            Ok(url) => {
                let path = url.path();
                path.strip_prefix('/').unwrap_or(path).replace('/', ":")
            }
            Err(e) => {
                warn!(
                    uri = %logging::redact_url(remote),
                    error = %e,
                    "Artwork URI is not absolute"
                );
                String::new()
            }
        };
        if path.is_empty() {
            return String::new();
        }

        let content_ref = format!("content://{}/{}", self.authority, path);
        self.uri_map
            .write()
            .insert(content_ref.clone(), remote.to_string());
        content_ref
    }

    /// Remote URI behind a content reference, if it was mapped.
    pub fn remote_uri(&self, content_ref: &str) -> Option<String> {
        self.uri_map.read().get(content_ref).cloned()
    }

    /// Resolve a content reference to a cached local file, downloading it
    /// on first access.
    #[instrument(skip(self), fields(authority = %self.authority))]
    pub async fn open(&self, content_ref: &str) -> Result<PathBuf> {
        let remote = self
            .remote_uri(content_ref)
            .ok_or_else(|| LibraryError::ArtworkNotFound(content_ref.to_string()))?;
        let file_name = self.file_name(content_ref)?;

        let cache_dir = self.file_system.get_cache_directory().await?;
        let path = cache_dir.join(file_name);

        if self.file_system.exists(&path).await? {
            debug!(file = %logging::file_name(&path), "Artwork served from cache");
            return Ok(path);
        }

        let data = self.download(&remote).await?;
        self.file_system.create_dir_all(&cache_dir).await?;
        self.file_system.write_file(&path, data).await?;

        debug!(
            file = %logging::file_name(&path),
            remote = %logging::redact_url(&remote),
            "Artwork cached"
        );
        Ok(path)
    }

    /// `file://` reference for a cached artwork file.
    pub fn local_reference(path: &Path) -> String {
        Url::from_file_path(path)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("file://{}", path.display()))
    }

    fn file_name<'a>(&self, content_ref: &'a str) -> Result<&'a str> {
        content_ref
            .strip_prefix("content://")
            .and_then(|rest| rest.strip_prefix(self.authority.as_str()))
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LibraryError::ArtworkNotFound(content_ref.to_string()))
    }

    async fn download(&self, remote: &str) -> Result<Bytes> {
        let request = HttpRequest::get(remote).timeout(self.timeout);

        let response = tokio::time::timeout(self.timeout, self.http_client.execute(request))
            .await
            .map_err(|_| LibraryError::Timeout(remote.to_string()))?
            .map_err(|e| LibraryError::ArtworkUnavailable {
                uri: remote.to_string(),
                reason: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(LibraryError::ArtworkUnavailable {
                uri: remote.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        Ok(response.body)
    }
}

impl std::fmt::Debug for AlbumArtContentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlbumArtContentProvider")
            .field("authority", &self.authority)
            .field("timeout", &self.timeout)
            .field("mapped", &self.uri_map.read().len())
            .finish()
    }
}
