//! # Playback State
//!
//! Snapshots of the session's playback state and now-playing metadata, as
//! published to observers.

use bridge_traits::player::PlayerStatus;
use core_library::TrackRecord;
use serde::{Deserialize, Serialize};

// ============================================================================
// Playback State
// ============================================================================

/// Coarse session playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Nothing has been prepared.
    None,
    Stopped,
    Paused,
    Playing,
    Buffering,
    Error,
}

impl PlaybackState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Playing => "playing",
            Self::Buffering => "buffering",
            Self::Error => "error",
        }
    }
}

/// Playback state plus the transport actions currently available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStateSnapshot {
    pub state: PlaybackState,
    pub position_ms: u64,
    pub play_enabled: bool,
    pub pause_enabled: bool,
}

impl PlaybackStateSnapshot {
    /// State before anything was ever prepared.
    pub const EMPTY: Self = Self {
        state: PlaybackState::None,
        position_ms: 0,
        play_enabled: false,
        pause_enabled: false,
    };

    /// Derive the session state from the engine's status.
    pub fn from_player(
        status: PlayerStatus,
        play_when_ready: bool,
        position_ms: u64,
        has_items: bool,
    ) -> Self {
        if !has_items {
            return Self {
                position_ms,
                ..Self::EMPTY
            };
        }

        let state = match status {
            PlayerStatus::Idle => PlaybackState::None,
            PlayerStatus::Ended => PlaybackState::Stopped,
            PlayerStatus::Buffering if play_when_ready => PlaybackState::Buffering,
            PlayerStatus::Ready if play_when_ready => PlaybackState::Playing,
            PlayerStatus::Buffering | PlayerStatus::Ready => PlaybackState::Paused,
        };

        Self {
            state,
            position_ms,
            play_enabled: true,
            pause_enabled: true,
        }
    }

    /// Same snapshot, marked as failed.
    pub fn with_error(self) -> Self {
        Self {
            state: PlaybackState::Error,
            ..self
        }
    }

    /// Media is loaded and either playing or ready to play.
    pub fn is_prepared(&self) -> bool {
        matches!(
            self.state,
            PlaybackState::Buffering | PlaybackState::Playing | PlaybackState::Paused
        )
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Buffering | PlaybackState::Playing)
    }

    pub fn is_play_enabled(&self) -> bool {
        self.play_enabled
    }

    pub fn is_pause_enabled(&self) -> bool {
        self.pause_enabled
    }
}

impl Default for PlaybackStateSnapshot {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ============================================================================
// Now Playing
// ============================================================================

/// Metadata for the item the session is on.
///
/// `media_id` is `None` when the engine has nothing loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub media_id: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub album_art_uri: String,
    /// Milliseconds, negative when unknown
    pub duration_ms: i64,
}

/// Placeholder observers see while nothing is playing.
pub const NOTHING_PLAYING: NowPlaying = NowPlaying {
    media_id: Some(String::new()),
    title: String::new(),
    subtitle: String::new(),
    album_art_uri: String::new(),
    duration_ms: 0,
};

impl NowPlaying {
    /// Metadata with no media id, as reported once the engine stops.
    pub fn empty() -> Self {
        Self {
            media_id: None,
            ..NOTHING_PLAYING
        }
    }

    pub fn from_track(track: &TrackRecord) -> Self {
        Self {
            media_id: Some(track.id.clone()),
            title: track.display_title.clone(),
            subtitle: track.display_subtitle.clone(),
            album_art_uri: track.artwork_uri.clone(),
            duration_ms: track.duration_ms,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.media_id.as_deref()
    }
}
