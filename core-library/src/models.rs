//! Domain models for the media catalog
//!
//! [`TrackRecord`] is the immutable description of one playable track as parsed
//! from the remote catalog. [`MediaEntry`] is what the browse surface hands out:
//! either a browsable node (root category, album) or a playable track.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Extras key carrying the position playback should start from.
pub const EXTRA_PLAYBACK_START_POSITION_MS: &str = "playback_start_position_ms";

/// Integer extras attached to entries and transport requests.
pub type Extras = HashMap<String, i64>;

/// Duration used when the catalog does not state one.
pub const UNKNOWN_DURATION_MS: i64 = -1;

// =============================================================================
// Track Record
// =============================================================================

/// One playable track from the catalog.
///
/// Created by catalog parsing and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Unique media identifier
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    /// Duration in milliseconds, [`UNKNOWN_DURATION_MS`] when not known
    pub duration_ms: i64,
    /// Absolute stream location
    pub source_uri: String,
    /// Opaque artwork content reference
    pub artwork_uri: String,
    /// Resolved remote artwork location, kept for casting and diagnostics
    pub original_artwork_uri: String,
    /// Position on the album (1-based)
    pub track_number: i64,
    pub total_track_count: i64,

    // Display properties
    pub display_title: String,
    pub display_subtitle: String,
    pub display_description: String,
    pub display_icon_uri: String,
}

impl TrackRecord {
    /// Whether this is the first track of its album.
    pub fn is_album_opener(&self) -> bool {
        self.track_number == 1
    }
}

// =============================================================================
// Media Entries
// =============================================================================

/// Whether an entry has children or can be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaFlag {
    /// A folder-like node with children
    Browsable,
    /// A leaf representing one audio track
    Playable,
}

/// Metadata record handed out by the browse surface.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaEntry {
    pub media_id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    /// Artwork reference (content, file or resource URI)
    pub icon_uri: String,
    /// Stream location; empty for browsable entries
    pub media_uri: String,
    pub flag: Option<MediaFlag>,
    pub track_number: i64,
    pub duration_ms: i64,
    pub extras: Extras,
}

impl MediaEntry {
    /// Build a browsable node.
    pub fn browsable(
        media_id: impl Into<String>,
        title: impl Into<String>,
        icon_uri: impl Into<String>,
    ) -> Self {
        Self {
            media_id: media_id.into(),
            title: title.into(),
            icon_uri: icon_uri.into(),
            flag: Some(MediaFlag::Browsable),
            ..Self::default()
        }
    }

    pub fn is_browsable(&self) -> bool {
        self.flag == Some(MediaFlag::Browsable)
    }

    pub fn is_playable(&self) -> bool {
        self.flag == Some(MediaFlag::Playable)
    }

    /// Attach an extra, builder style.
    pub fn with_extra(mut self, key: impl Into<String>, value: i64) -> Self {
        self.extras.insert(key.into(), value);
        self
    }

    /// Position carried in [`EXTRA_PLAYBACK_START_POSITION_MS`], if any.
    pub fn start_position_ms(&self) -> Option<u64> {
        start_position_ms(&self.extras)
    }
}

impl From<&TrackRecord> for MediaEntry {
    fn from(track: &TrackRecord) -> Self {
        Self {
            media_id: track.id.clone(),
            title: track.display_title.clone(),
            subtitle: track.display_subtitle.clone(),
            description: track.display_description.clone(),
            icon_uri: track.display_icon_uri.clone(),
            media_uri: track.source_uri.clone(),
            flag: Some(MediaFlag::Playable),
            track_number: track.track_number,
            duration_ms: track.duration_ms,
            extras: Extras::new(),
        }
    }
}

/// Read [`EXTRA_PLAYBACK_START_POSITION_MS`] from a set of extras.
///
/// Negative values are treated as absent.
pub fn start_position_ms(extras: &Extras) -> Option<u64> {
    extras
        .get(EXTRA_PLAYBACK_START_POSITION_MS)
        .and_then(|position| u64::try_from(*position).ok())
}
