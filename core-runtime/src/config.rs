//! # Core Configuration Module
//!
//! Provides configuration management for the media browser core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host bridges and the tunables the core needs. It
//! enforces fail-fast validation so that a misconfigured host learns about it
//! at startup instead of on the first browse request.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Catalog and artwork downloads
//! - `FileSystemAccess` - Artwork cache
//! - `SettingsStore` - The persisted "recent song" slot
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults
//! (`ReqwestHttpClient`, `TokioFileSystem`, `SqliteSettingsStore`) are injected
//! automatically for any bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .catalog_url("https://example.com/music/catalog.json")
//!     .http_client(Arc::new(MyHttpClient))
//!     .file_system(Arc::new(MyFileSystem))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{FileSystemAccess, HttpClient, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Remote catalog descriptor fetched when no other location is configured.
pub const DEFAULT_CATALOG_URL: &str = "https://storage.googleapis.com/uamp/catalog.json";

/// Preferences namespace holding the recent-song slot.
pub const DEFAULT_PREFERENCES_NAME: &str = "uamp";

/// Authority used for opaque artwork content references.
pub const DEFAULT_CONTENT_AUTHORITY: &str = "com.example.android.uamp";

/// Artwork download timeout.
pub const DEFAULT_ARTWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// How often the now-playing screen samples the playback position.
pub const DEFAULT_POSITION_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Core configuration for the media browser core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Location of the remote catalog descriptor
    pub catalog_url: Url,

    /// Settings namespace for persisted playback state
    pub preferences_name: String,

    /// Authority of the `content://` references handed out for artwork
    pub content_authority: String,

    /// Timeout applied to a single artwork download
    pub artwork_timeout: Duration,

    /// Polling interval for the now-playing position
    pub position_update_interval: Duration,

    /// Per-subscriber buffer of the event bus
    pub event_buffer_size: usize,

    /// HTTP client for the catalog and artwork
    pub http_client: Arc<dyn HttpClient>,

    /// File system access for the artwork cache
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Key-value store for the recent-song slot
    pub settings_store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("catalog_url", &self.catalog_url.as_str())
            .field("preferences_name", &self.preferences_name)
            .field("content_authority", &self.content_authority)
            .field("artwork_timeout", &self.artwork_timeout)
            .field("position_update_interval", &self.position_update_interval)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The catalog URL can serve as a base for relative entries
    /// - The preferences name is not empty
    /// - Timeouts, intervals and buffer sizes are non-zero
    pub fn validate(&self) -> Result<()> {
        if self.catalog_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Catalog URL '{}' cannot resolve relative media paths. \
                 Use an absolute URL such as '{}'.",
                self.catalog_url, DEFAULT_CATALOG_URL
            )));
        }

        if self.preferences_name.trim().is_empty() {
            return Err(Error::Config(
                "Preferences name cannot be empty".to_string(),
            ));
        }

        if self.content_authority.trim().is_empty() {
            return Err(Error::Config(
                "Content authority cannot be empty".to_string(),
            ));
        }

        if self.artwork_timeout.is_zero() {
            return Err(Error::Config(
                "Artwork timeout must be greater than 0".to_string(),
            ));
        }

        if self.position_update_interval.is_zero() {
            return Err(Error::Config(
                "Position update interval must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str, desktop_default: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{capability} implementation is required for {purpose}. \
             Desktop: enable the 'desktop-shims' feature to use the default {desktop_default}. \
             Mobile: inject the platform-native implementation."
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new()?);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "catalog and artwork downloads",
        "ReqwestHttpClient",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(capability_missing(
        "FileSystemAccess",
        "the artwork cache",
        "TokioFileSystem",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(
    data_dir: Option<PathBuf>,
    preferences_name: &str,
) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::{SqliteSettingsStore, TokioFileSystem};
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let data_dir = data_dir.unwrap_or_else(|| TokioFileSystem::new().data_dir().to_path_buf());
    let candidate = data_dir.join("settings.db");
    let namespace = preferences_name.to_string();

    let init_store = |path: PathBuf, namespace: String| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path, namespace))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // A runtime cannot be blocked on from inside another one.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(candidate, namespace))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(candidate, namespace)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(
    _data_dir: Option<PathBuf>,
    _preferences_name: &str,
) -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing(
        "SettingsStore",
        "the persisted recent song",
        "SqliteSettingsStore",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Unset values fall back to the `DEFAULT_*` constants of this module. Call
/// [`build()`](CoreConfigBuilder::build) to validate and create the config.
#[derive(Default)]
pub struct CoreConfigBuilder {
    catalog_url: Option<String>,
    preferences_name: Option<String>,
    content_authority: Option<String>,
    artwork_timeout: Option<Duration>,
    position_update_interval: Option<Duration>,
    event_buffer_size: Option<usize>,
    data_dir: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
}

impl CoreConfigBuilder {
    /// Sets the location of the remote catalog descriptor.
    ///
    /// Relative `source` and `image` entries are resolved against it.
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = Some(url.into());
        self
    }

    /// Sets the settings namespace for persisted playback state.
    ///
    /// Default: `"uamp"`
    pub fn preferences_name(mut self, name: impl Into<String>) -> Self {
        self.preferences_name = Some(name.into());
        self
    }

    /// Sets the authority of artwork content references.
    pub fn content_authority(mut self, authority: impl Into<String>) -> Self {
        self.content_authority = Some(authority.into());
        self
    }

    /// Sets the artwork download timeout.
    ///
    /// Default: 30 seconds
    pub fn artwork_timeout(mut self, timeout: Duration) -> Self {
        self.artwork_timeout = Some(timeout);
        self
    }

    /// Sets the now-playing position polling interval.
    ///
    /// Default: 100 milliseconds
    pub fn position_update_interval(mut self, interval: Duration) -> Self {
        self.position_update_interval = Some(interval);
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the directory of the default settings database.
    ///
    /// Only consulted when no `SettingsStore` is injected and the
    /// `desktop-shims` feature provides one.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the HTTP client implementation.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the settings store implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The catalog URL does not parse as an absolute URL
    /// - A required bridge is missing and no desktop default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let raw_url = self
            .catalog_url
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
        let catalog_url = Url::parse(&raw_url).map_err(|e| {
            Error::Config(format!(
                "Catalog URL '{}' is not an absolute URL ({}). Use .catalog_url() with a full \
                 scheme://host/path location.",
                raw_url, e
            ))
        })?;

        let preferences_name = self
            .preferences_name
            .unwrap_or_else(|| DEFAULT_PREFERENCES_NAME.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.data_dir, &preferences_name)?,
        };

        let config = CoreConfig {
            catalog_url,
            preferences_name,
            content_authority: self
                .content_authority
                .unwrap_or_else(|| DEFAULT_CONTENT_AUTHORITY.to_string()),
            artwork_timeout: self.artwork_timeout.unwrap_or(DEFAULT_ARTWORK_TIMEOUT),
            position_update_interval: self
                .position_update_interval
                .unwrap_or(DEFAULT_POSITION_UPDATE_INTERVAL),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            file_system,
            settings_store,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HttpRequest, HttpResponse, SettingsTransaction};
    use bytes::Bytes;
    use std::path::Path;

    struct StubHttpClient;

    #[async_trait]
    impl HttpClient for StubHttpClient {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse {
                status: 200,
                headers: Default::default(),
                body: Bytes::new(),
            })
        }
    }

    struct StubFileSystem;

    #[async_trait]
    impl FileSystemAccess for StubFileSystem {
        async fn get_cache_directory(&self) -> BridgeResult<PathBuf> {
            Ok(PathBuf::from("/cache"))
        }

        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }

        async fn read_file(&self, _path: &Path) -> BridgeResult<Bytes> {
            Ok(Bytes::new())
        }

        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }

        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct StubSettingsStore;

    #[async_trait]
    impl SettingsStore for StubSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_i64(&self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_i64(&self, _key: &str) -> BridgeResult<Option<i64>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn has_key(&self, _key: &str) -> BridgeResult<bool> {
            Ok(false)
        }

        async fn begin_transaction(&self) -> BridgeResult<Box<dyn SettingsTransaction + Send>> {
            Ok(Box::new(StubTransaction))
        }
    }

    struct StubTransaction;

    #[async_trait]
    impl SettingsTransaction for StubTransaction {
        async fn set_string(&mut self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn set_i64(&mut self, _key: &str, _value: i64) -> BridgeResult<()> {
            Ok(())
        }

        async fn commit(self: Box<Self>) -> BridgeResult<()> {
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn with_stub_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(StubHttpClient))
            .file_system(Arc::new(StubFileSystem))
            .settings_store(Arc::new(StubSettingsStore))
    }

    #[test]
    fn test_builder_defaults() {
        let config = with_stub_bridges().build().unwrap();

        assert_eq!(config.catalog_url.as_str(), DEFAULT_CATALOG_URL);
        assert_eq!(config.preferences_name, "uamp");
        assert_eq!(config.content_authority, "com.example.android.uamp");
        assert_eq!(config.artwork_timeout, Duration::from_secs(30));
        assert_eq!(config.position_update_interval, Duration::from_millis(100));
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn test_builder_overrides() {
        let config = with_stub_bridges()
            .catalog_url("https://example.com/music/catalog.json")
            .preferences_name("player")
            .artwork_timeout(Duration::from_secs(5))
            .position_update_interval(Duration::from_millis(250))
            .event_buffer_size(16)
            .build()
            .unwrap();

        assert_eq!(
            config.catalog_url.as_str(),
            "https://example.com/music/catalog.json"
        );
        assert_eq!(config.preferences_name, "player");
        assert_eq!(config.artwork_timeout, Duration::from_secs(5));
        assert_eq!(config.position_update_interval, Duration::from_millis(250));
        assert_eq!(config.event_buffer_size, 16);
    }

    #[test]
    fn test_relative_catalog_url_rejected() {
        let err = with_stub_bridges()
            .catalog_url("music/catalog.json")
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("not an absolute URL"));
    }

    #[test]
    fn test_non_base_catalog_url_rejected() {
        let err = with_stub_bridges()
            .catalog_url("mailto:someone@example.com")
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("cannot resolve relative media paths"));
    }

    #[test]
    fn test_empty_preferences_name_rejected() {
        let err = with_stub_bridges()
            .preferences_name("  ")
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("Preferences name cannot be empty"));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let err = with_stub_bridges()
            .artwork_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Artwork timeout"));

        let err = with_stub_bridges()
            .position_update_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Position update interval"));

        let err = with_stub_bridges().event_buffer_size(0).build().unwrap_err();
        assert!(err.to_string().contains("Event buffer size"));
    }

    #[test]
    fn test_debug_hides_bridges() {
        let config = with_stub_bridges().build().unwrap();
        let debug = format!("{:?}", config);

        assert!(debug.contains("catalog_url"));
        assert!(debug.contains("SettingsStore { ... }"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_bridges_are_reported() {
        let err = CoreConfig::builder()
            .file_system(Arc::new(StubFileSystem))
            .settings_store(Arc::new(StubSettingsStore))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { ref capability, .. } if capability == "HttpClient"));

        let err = CoreConfig::builder()
            .http_client(Arc::new(StubHttpClient))
            .file_system(Arc::new(StubFileSystem))
            .build()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("SettingsStore"));
        assert!(message.contains("desktop-shims"));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = CoreConfig::builder()
            .data_dir(dir.path())
            .build()
            .expect("desktop defaults should succeed");

        let settings = config.settings_store.clone();
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            settings.set_string("recent_song_title", "Intro").await.unwrap();
            let value = settings.get_string("recent_song_title").await.unwrap();
            assert_eq!(value.as_deref(), Some("Intro"));
        });

        assert!(dir.path().join("settings.db").exists());
    }
}
