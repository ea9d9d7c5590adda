//! Player engine bridge.
//!
//! The audio engine that decodes and renders media is owned by the host. The core
//! only hands it an ordered list of items, issues transport commands, and reacts
//! to the events it reports. Implementations wrap whatever native player the
//! platform offers and translate its callbacks into [`PlayerEvent`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;

/// A single entry handed to the player engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerMediaItem {
    /// Stable media identifier used by the browse surface.
    pub media_id: String,
    /// Playable stream location.
    pub uri: String,
    /// Display title.
    pub title: String,
    /// Display artist.
    pub artist: String,
    /// Album name.
    pub album: String,
    /// Opaque local artwork reference.
    pub artwork_uri: String,
}

/// Coarse engine status, mirroring the usual idle/buffering/ready/ended cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Nothing loaded, or stopped.
    Idle,
    /// Loading media; cannot render yet.
    Buffering,
    /// Media can be rendered immediately. Whether it does depends on play-when-ready.
    Ready,
    /// The end of the playlist was reached.
    Ended,
}

/// Engine error codes the core distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerErrorCode {
    /// The server answered with a non-2xx status.
    IoBadHttpStatus,
    /// The media file does not exist.
    IoFileNotFound,
    /// The connection could not be established.
    IoNetworkConnectionFailed,
    /// The media could not be decoded.
    DecodingFailed,
    /// Anything the engine could not classify.
    Unspecified,
}

impl PlayerErrorCode {
    /// Engine-style constant name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IoBadHttpStatus => "ERROR_CODE_IO_BAD_HTTP_STATUS",
            Self::IoFileNotFound => "ERROR_CODE_IO_FILE_NOT_FOUND",
            Self::IoNetworkConnectionFailed => "ERROR_CODE_IO_NETWORK_CONNECTION_FAILED",
            Self::DecodingFailed => "ERROR_CODE_DECODING_FAILED",
            Self::Unspecified => "ERROR_CODE_UNSPECIFIED",
        }
    }
}

/// Error reported by the engine while playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerError {
    pub code: PlayerErrorCode,
    pub message: String,
}

impl PlayerError {
    pub fn new(code: PlayerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Status or play-when-ready changed.
    StateChanged {
        play_when_ready: bool,
        status: PlayerStatus,
    },
    /// Play-when-ready flipped without a status change.
    PlayWhenReadyChanged { play_when_ready: bool },
    /// The position jumped (seek, skip, auto-advance).
    PositionDiscontinuity,
    /// The current item changed.
    MediaItemTransition,
    /// Playback failed for the current item.
    Error(PlayerError),
}

impl PlayerEvent {
    /// Whether this event may have moved the engine to a different playlist index.
    pub fn affects_current_index(&self) -> bool {
        matches!(
            self,
            PlayerEvent::PositionDiscontinuity
                | PlayerEvent::MediaItemTransition
                | PlayerEvent::PlayWhenReadyChanged { .. }
                | PlayerEvent::StateChanged { .. }
        )
    }
}

/// Trait for the host player engine.
///
/// Exactly one consumer drives a player instance: all transport commands are
/// issued by the playback coordinator and all events are consumed by the media
/// service that owns it.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::player::{MediaPlayer, PlayerMediaItem};
///
/// async fn start(player: &dyn MediaPlayer, items: Vec<PlayerMediaItem>) -> Result<()> {
///     player.stop().await?;
///     player.set_media_items(items, 0, None).await?;
///     player.prepare().await
/// }
/// ```
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    /// Replace the playlist. `start_position_ms` of `None` starts at the default position.
    async fn set_media_items(
        &self,
        items: Vec<PlayerMediaItem>,
        start_index: usize,
        start_position_ms: Option<u64>,
    ) -> Result<()>;

    /// Begin loading the current playlist.
    async fn prepare(&self) -> Result<()>;

    /// Set whether playback should start as soon as the engine is ready.
    async fn set_play_when_ready(&self, play_when_ready: bool) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Stop playback. The playlist is kept but the engine returns to idle.
    async fn stop(&self) -> Result<()>;

    async fn seek_to_next(&self) -> Result<()>;

    async fn seek_to_previous(&self) -> Result<()>;

    /// Index of the current item as reported by the engine.
    ///
    /// May be transiently out of range while the engine transitions.
    fn current_media_item_index(&self) -> i64;

    /// Current position within the current item, in milliseconds.
    fn current_position_ms(&self) -> u64;

    fn play_when_ready(&self) -> bool;

    fn status(&self) -> PlayerStatus;

    /// Subscribe to engine events. Dropping the receiver deregisters it.
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_affecting_events() {
        assert!(PlayerEvent::PositionDiscontinuity.affects_current_index());
        assert!(PlayerEvent::MediaItemTransition.affects_current_index());
        assert!(PlayerEvent::PlayWhenReadyChanged {
            play_when_ready: true
        }
        .affects_current_index());
        assert!(PlayerEvent::StateChanged {
            play_when_ready: true,
            status: PlayerStatus::Ready
        }
        .affects_current_index());
        assert!(!PlayerEvent::Error(PlayerError::new(PlayerErrorCode::Unspecified, "x"))
            .affects_current_index());
    }

    #[test]
    fn error_code_names() {
        assert_eq!(
            PlayerErrorCode::IoBadHttpStatus.name(),
            "ERROR_CODE_IO_BAD_HTTP_STATUS"
        );
        assert_eq!(
            PlayerErrorCode::IoFileNotFound.name(),
            "ERROR_CODE_IO_FILE_NOT_FOUND"
        );
    }
}
