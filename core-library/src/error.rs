use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Artwork not found: {0}")]
    ArtworkNotFound(String),

    #[error("Artwork unavailable: {uri} - {reason}")]
    ArtworkUnavailable { uri: String, reason: String },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },
}

impl LibraryError {
    /// Whether the failure came from the network rather than from bad data.
    pub fn is_network_error(&self) -> bool {
        matches!(
            self,
            LibraryError::CatalogUnavailable(_)
                | LibraryError::ArtworkUnavailable { .. }
                | LibraryError::Timeout(_)
                | LibraryError::Bridge(BridgeError::Timeout(_))
        )
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
