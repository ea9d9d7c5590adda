//! # Now Playing Model
//!
//! Backs a now-playing screen: formatted metadata for the current item, the
//! play/pause button glyph and a polled playback position.

use core_playback::{NowPlaying, PlaybackStateSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::connection::MusicServiceConnection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlayingMetadata {
    pub id: String,
    pub album_art_uri: String,
    pub title: String,
    pub subtitle: String,
    /// Formatted as `M:SS`
    pub duration: String,
}

impl NowPlayingMetadata {
    /// Format a millisecond timestamp as `M:SS`; negative values are unknown.
    pub fn timestamp_to_mss(position_ms: i64) -> String {
        if position_ms < 0 {
            return "unknown".to_string();
        }
        let total_seconds = position_ms / 1000;
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;
        format!("{minutes}:{seconds:02}")
    }

    fn from_now_playing(now_playing: &NowPlaying) -> Option<Self> {
        let id = now_playing.media_id.as_ref()?;
        if now_playing.duration_ms == 0 {
            return None;
        }

        Some(Self {
            id: id.clone(),
            album_art_uri: now_playing.album_art_uri.clone(),
            title: now_playing.title.trim().to_string(),
            subtitle: now_playing.subtitle.trim().to_string(),
            duration: Self::timestamp_to_mss(now_playing.duration_ms),
        })
    }
}

/// Glyph on the main media button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaButtonGlyph {
    #[default]
    Album,
    Play,
    Pause,
}

pub struct NowPlayingModel {
    metadata: watch::Receiver<Option<NowPlayingMetadata>>,
    button: watch::Receiver<MediaButtonGlyph>,
    position: watch::Receiver<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl NowPlayingModel {
    pub fn new(connection: Arc<MusicServiceConnection>, position_update_interval: Duration) -> Self {
        let (metadata_tx, metadata) = watch::channel(None);
        let (button_tx, button) = watch::channel(MediaButtonGlyph::Album);
        let (position_tx, position) = watch::channel(0);

        let mut state_rx = connection.playback_state();
        let mut now_rx = connection.now_playing();
        let observer = tokio::spawn(async move {
            loop {
                let state = *state_rx.borrow_and_update();
                let now_playing = now_rx.borrow_and_update().clone();
                update_state(&metadata_tx, &button_tx, &state, &now_playing);

                tokio::select! {
                    changed = state_rx.changed() => if changed.is_err() { break },
                    changed = now_rx.changed() => if changed.is_err() { break },
                }
            }
        });

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(position_update_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let current = connection.current_position_ms();
                position_tx.send_if_modified(|position| {
                    if *position == current {
                        false
                    } else {
                        *position = current;
                        true
                    }
                });
            }
        });

        Self {
            metadata,
            button,
            position,
            tasks: vec![observer, poller],
        }
    }

    pub fn metadata(&self) -> watch::Receiver<Option<NowPlayingMetadata>> {
        self.metadata.clone()
    }

    pub fn button(&self) -> watch::Receiver<MediaButtonGlyph> {
        self.button.clone()
    }

    pub fn position(&self) -> watch::Receiver<u64> {
        self.position.clone()
    }
}

impl Drop for NowPlayingModel {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl std::fmt::Debug for NowPlayingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NowPlayingModel")
            .field("button", &*self.button.borrow())
            .field("position", &*self.position.borrow())
            .finish()
    }
}

fn update_state(
    metadata: &watch::Sender<Option<NowPlayingMetadata>>,
    button: &watch::Sender<MediaButtonGlyph>,
    state: &PlaybackStateSnapshot,
    now_playing: &NowPlaying,
) {
    if let Some(formatted) = NowPlayingMetadata::from_now_playing(now_playing) {
        metadata.send_replace(Some(formatted));
    }

    button.send_replace(if state.is_playing() {
        MediaButtonGlyph::Pause
    } else {
        MediaButtonGlyph::Play
    });
}
