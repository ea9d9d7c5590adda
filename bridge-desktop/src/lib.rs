//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides implementations of the storage and network bridges
//! using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SettingsStore` using a SQLite-backed, namespaced key-value table
//!
//! The player engine and notification bridges are host specific and have no
//! desktop default.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let settings = SqliteSettingsStore::new(fs.data_dir().join("settings.db"), "uamp").await?;
//!
//!     // Use in core configuration
//! }
//! ```

mod filesystem;
mod http;
mod settings;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;
