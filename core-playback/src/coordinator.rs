//! # Playback Coordinator
//!
//! Owns the active playlist and drives the single [`MediaPlayer`] instance.
//!
//! ## Overview
//!
//! - [`PlaybackCoordinator::prepare`] rebuilds the playlist around an anchor
//!   track (its whole album, ordered by track number) and hands it to the engine.
//! - Transport calls are passed straight through to the engine.
//! - [`PlaybackCoordinator::sync_index`] keeps the current index in range while
//!   the engine reports transitions.
//! - [`resolve_click_action`] decides what a tap on a list item means.
//!
//! Only the coordinator issues transport commands. Playlist state is guarded by
//! a short-lived lock that is never held across an engine call.

use bridge_traits::player::{MediaPlayer, PlayerMediaItem};
use core_library::{MediaEntry, MusicSource, TrackRecord};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{PlaybackError, Result};
use crate::state::{NowPlaying, PlaybackStateSnapshot};

/// Playlist and position within it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSession {
    pub playlist: Vec<TrackRecord>,
    /// Valid only while `playlist` is non-empty.
    pub current_index: usize,
}

impl PlaybackSession {
    pub fn current(&self) -> Option<&TrackRecord> {
        self.playlist.get(self.current_index)
    }
}

pub struct PlaybackCoordinator {
    player: Arc<dyn MediaPlayer>,
    source: Arc<dyn MusicSource>,
    session: Mutex<PlaybackSession>,
}

impl PlaybackCoordinator {
    pub fn new(player: Arc<dyn MediaPlayer>, source: Arc<dyn MusicSource>) -> Self {
        Self {
            player,
            source,
            session: Mutex::new(PlaybackSession::default()),
        }
    }

    pub fn player(&self) -> &Arc<dyn MediaPlayer> {
        &self.player
    }

    pub fn source(&self) -> &Arc<dyn MusicSource> {
        &self.source
    }

    /// Load the album of `anchor_id` and start at the anchor.
    ///
    /// Returns [`PlaybackError::TrackNotFound`] without touching the engine when
    /// the id is not in the catalog.
    #[instrument(skip(self))]
    pub async fn prepare(
        &self,
        anchor_id: &str,
        play_when_ready: bool,
        start_position_ms: Option<u64>,
    ) -> Result<()> {
        let Some(anchor) = self.source.find(anchor_id) else {
            warn!(media_id = %anchor_id, "Content not found");
            return Err(PlaybackError::TrackNotFound(anchor_id.to_string()));
        };

        let playlist = self.build_playlist(&anchor);
        let start_index = playlist
            .iter()
            .position(|track| track.id == anchor.id)
            .unwrap_or(0);
        let items = playlist.iter().map(to_player_item).collect::<Vec<_>>();

        {
            let mut session = self.session.lock();
            session.playlist = playlist;
            session.current_index = start_index;
        }

        info!(
            media_id = %anchor_id,
            album = %anchor.album,
            tracks = items.len(),
            start_index,
            "Preparing playlist"
        );

        self.player.set_play_when_ready(play_when_ready).await?;
        self.player.stop().await?;
        self.player
            .set_media_items(items, start_index, start_position_ms)
            .await?;
        self.player.prepare().await?;
        Ok(())
    }

    /// All catalog tracks sharing the anchor's album, by ascending track number.
    pub fn build_playlist(&self, anchor: &TrackRecord) -> Vec<TrackRecord> {
        let mut playlist: Vec<TrackRecord> = self
            .source
            .tracks()
            .iter()
            .filter(|track| track.album == anchor.album)
            .cloned()
            .collect();
        playlist.sort_by_key(|track| track.track_number);
        playlist
    }

    pub async fn play(&self) -> Result<()> {
        Ok(self.player.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.player.pause().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        Ok(self.player.stop().await?)
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        Ok(self.player.seek_to_next().await?)
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        Ok(self.player.seek_to_previous().await?)
    }

    /// Re-read the engine's index, clamped into the playlist.
    pub fn sync_index(&self) -> usize {
        let reported = self.player.current_media_item_index();
        let mut session = self.session.lock();

        let index = match session.playlist.len() {
            0 => 0,
            len => reported.clamp(0, len as i64 - 1) as usize,
        };
        if index != session.current_index {
            debug!(reported, index, "Current index changed");
        }
        session.current_index = index;
        index
    }

    pub fn current_index(&self) -> usize {
        self.session.lock().current_index
    }

    pub fn current_track(&self) -> Option<TrackRecord> {
        self.session.lock().current().cloned()
    }

    pub fn has_playlist(&self) -> bool {
        !self.session.lock().playlist.is_empty()
    }

    pub fn session(&self) -> PlaybackSession {
        self.session.lock().clone()
    }

    /// Description of the playlist item at `index`; empty when out of range.
    pub fn queue_description(&self, index: usize) -> MediaEntry {
        self.session
            .lock()
            .playlist
            .get(index)
            .map(MediaEntry::from)
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.session.lock();
        f.debug_struct("PlaybackCoordinator")
            .field("playlist", &session.playlist.len())
            .field("current_index", &session.current_index)
            .finish()
    }
}

fn to_player_item(track: &TrackRecord) -> PlayerMediaItem {
    PlayerMediaItem {
        media_id: track.id.clone(),
        uri: track.source_uri.clone(),
        title: track.title.clone(),
        artist: track.artist.clone(),
        album: track.album.clone(),
        artwork_uri: track.artwork_uri.clone(),
    }
}

// ============================================================================
// Click Resolution
// ============================================================================

/// What a tap on a list item should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Open the browsable node.
    BrowseTo(String),
    Play,
    Pause,
    /// Build a playlist around this id and play it.
    PlayFromMediaId(String),
    /// Leave playback as it is.
    Ignore,
}

/// Decide the action for a tap on `media_id`.
///
/// Tapping the active, prepared item toggles playback; `pause_allowed = false`
/// turns a tap on the playing item into a no-op.
pub fn resolve_click_action(
    media_id: &str,
    browsable: bool,
    pause_allowed: bool,
    state: &PlaybackStateSnapshot,
    now_playing: &NowPlaying,
) -> ClickAction {
    if browsable {
        return ClickAction::BrowseTo(media_id.to_string());
    }

    let is_active = now_playing.id() == Some(media_id);
    if !(state.is_prepared() && is_active) {
        return ClickAction::PlayFromMediaId(media_id.to_string());
    }

    if state.is_playing() {
        if pause_allowed {
            ClickAction::Pause
        } else {
            ClickAction::Ignore
        }
    } else if state.is_play_enabled() {
        ClickAction::Play
    } else {
        warn!(
            media_id = %media_id,
            "Playable item clicked but neither play nor pause are enabled"
        );
        ClickAction::Ignore
    }
}
