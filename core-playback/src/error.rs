//! # Playback Error Types
//!
//! Error types for playlist preparation, transport and Recent slot persistence.

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The requested media id is not in the catalog.
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// The catalog failed to load, so nothing can be prepared.
    #[error("Catalog unavailable")]
    CatalogUnavailable,

    // ========================================================================
    // Downstream Errors
    // ========================================================================
    /// The player engine or settings store failed.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

impl PlaybackError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::CatalogUnavailable => true,
            PlaybackError::Bridge(BridgeError::Timeout(_)) => true,
            PlaybackError::Library(e) => e.is_network_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
