//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the media browser core and the host
//! it runs in. Each trait represents a capability the core requires but does not
//! own: moving bytes over the network, touching the disk, persisting preferences,
//! driving the audio engine, and rendering the playback notification.
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP requests for the catalog and artwork
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache directory and file I/O
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Playback Integration
//! - [`MediaPlayer`](player::MediaPlayer) - The external player engine (black box)
//! - [`NotificationPresenter`](notification::NotificationPresenter) - Now-playing notification surface
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for consistent
//! error handling. Platform implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (e.g., file paths, URLs)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks. Implementations must ensure thread safety.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod logging;
pub mod notification;
pub mod player;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use notification::{NotificationContent, NotificationPresenter};
pub use player::{
    MediaPlayer, PlayerError, PlayerErrorCode, PlayerEvent, PlayerMediaItem, PlayerStatus,
};
pub use storage::{FileSystemAccess, SettingsStore, SettingsTransaction};
