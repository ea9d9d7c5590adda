//! # Media Item List Model
//!
//! Per-list fan-out: one model per browsed parent, mapping its children to
//! renderable [`MediaItemData`] and keeping each item's playback glyph in step
//! with the session.

use core_library::models::MediaEntry;
use core_playback::{NowPlaying, PlaybackStateSnapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::connection::MusicServiceConnection;

/// Playback indicator drawn next to a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackGlyph {
    #[default]
    None,
    Play,
    Pause,
}

/// Renderable list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItemData {
    pub media_id: String,
    pub title: String,
    pub subtitle: String,
    pub album_art_uri: String,
    pub browsable: bool,
    pub glyph: PlaybackGlyph,
}

impl MediaItemData {
    pub fn from_entry(entry: &MediaEntry, glyph: PlaybackGlyph) -> Self {
        Self {
            media_id: entry.media_id.clone(),
            title: entry.title.clone(),
            subtitle: entry.subtitle.clone(),
            album_art_uri: entry.icon_uri.clone(),
            browsable: entry.is_browsable(),
            glyph,
        }
    }

    pub fn is_same_item(&self, other: &Self) -> bool {
        self.media_id == other.media_id
    }

    /// Only the id and glyph can change for an item already on screen.
    pub fn is_same_content(&self, other: &Self) -> bool {
        self.media_id == other.media_id && self.glyph == other.glyph
    }
}

/// Partial-update marker for list adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePayload {
    PlaybackGlyphChanged,
}

/// What changed between two versions of the same item, if it was only the glyph.
pub fn diff(old: &MediaItemData, new: &MediaItemData) -> Option<ChangePayload> {
    (old.glyph != new.glyph).then_some(ChangePayload::PlaybackGlyphChanged)
}

/// Glyph for `media_id` given the session state.
pub fn glyph_for(
    media_id: &str,
    state: &PlaybackStateSnapshot,
    now_playing: &NowPlaying,
) -> PlaybackGlyph {
    if now_playing.id() != Some(media_id) {
        PlaybackGlyph::None
    } else if state.is_playing() {
        PlaybackGlyph::Pause
    } else {
        PlaybackGlyph::Play
    }
}

// ============================================================================
// List Model
// ============================================================================

pub struct MediaItemListModel {
    parent_id: String,
    items: watch::Receiver<Vec<MediaItemData>>,
    network_failure: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl MediaItemListModel {
    pub fn new(parent_id: &str, connection: &MusicServiceConnection) -> Self {
        let mut subscription = connection.subscribe(parent_id);
        let mut state_rx = connection.playback_state();
        let mut now_rx = connection.now_playing();
        let (items_tx, items) = watch::channel(Vec::new());

        let task = tokio::spawn(async move {
            let mut subscribed = true;
            loop {
                tokio::select! {
                    children = subscription.next(), if subscribed => match children {
                        Some(children) => {
                            let state = *state_rx.borrow();
                            let now_playing = now_rx.borrow().clone();
                            let data = children
                                .iter()
                                .map(|entry| {
                                    let glyph = glyph_for(&entry.media_id, &state, &now_playing);
                                    MediaItemData::from_entry(entry, glyph)
                                })
                                .collect::<Vec<_>>();
                            debug!(parent_id = %subscription.parent_id(), items = data.len(), "Children loaded");
                            items_tx.send_replace(data);
                        }
                        None => subscribed = false,
                    },
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = *state_rx.borrow_and_update();
                        let now_playing = now_rx.borrow().clone();
                        update_glyphs(&items_tx, &state, &now_playing);
                    }
                    changed = now_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = *state_rx.borrow();
                        let now_playing = now_rx.borrow_and_update().clone();
                        update_glyphs(&items_tx, &state, &now_playing);
                    }
                }
            }
        });

        Self {
            parent_id: parent_id.to_string(),
            items,
            network_failure: connection.network_failure(),
            task,
        }
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn items(&self) -> watch::Receiver<Vec<MediaItemData>> {
        self.items.clone()
    }

    pub fn current_items(&self) -> Vec<MediaItemData> {
        self.items.borrow().clone()
    }

    pub fn network_failure(&self) -> watch::Receiver<bool> {
        self.network_failure.clone()
    }
}

impl Drop for MediaItemListModel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for MediaItemListModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaItemListModel")
            .field("parent_id", &self.parent_id)
            .field("items", &self.items.borrow().len())
            .finish()
    }
}

/// Recompute glyphs; skipped while the session reports no or an empty media id.
fn update_glyphs(
    items: &watch::Sender<Vec<MediaItemData>>,
    state: &PlaybackStateSnapshot,
    now_playing: &NowPlaying,
) {
    if now_playing.id().map_or(true, str::is_empty) {
        return;
    }

    items.send_if_modified(|items| {
        let mut modified = false;
        for item in items.iter_mut() {
            let glyph = glyph_for(&item.media_id, state, now_playing);
            if item.glyph != glyph {
                item.glyph = glyph;
                modified = true;
            }
        }
        modified
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_playback::{PlaybackState, NOTHING_PLAYING};

    fn item(media_id: &str, glyph: PlaybackGlyph) -> MediaItemData {
        MediaItemData {
            media_id: media_id.to_string(),
            title: "Title".to_string(),
            subtitle: "Artist".to_string(),
            album_art_uri: String::new(),
            browsable: false,
            glyph,
        }
    }

    fn now_playing(media_id: &str) -> NowPlaying {
        NowPlaying {
            media_id: Some(media_id.to_string()),
            ..NOTHING_PLAYING
        }
    }

    fn snapshot(state: PlaybackState) -> PlaybackStateSnapshot {
        PlaybackStateSnapshot {
            state,
            ..PlaybackStateSnapshot::EMPTY
        }
    }

    #[test]
    fn test_glyph_for_active_item() {
        let playing = snapshot(PlaybackState::Playing);
        let paused = snapshot(PlaybackState::Paused);

        assert_eq!(glyph_for("a", &playing, &now_playing("a")), PlaybackGlyph::Pause);
        assert_eq!(glyph_for("a", &paused, &now_playing("a")), PlaybackGlyph::Play);
        assert_eq!(glyph_for("b", &playing, &now_playing("a")), PlaybackGlyph::None);
    }

    #[test]
    fn test_diff_reports_glyph_only_changes() {
        let before = item("a", PlaybackGlyph::Play);
        let after = item("a", PlaybackGlyph::Pause);

        assert!(before.is_same_item(&after));
        assert!(!before.is_same_content(&after));
        assert_eq!(diff(&before, &after), Some(ChangePayload::PlaybackGlyphChanged));
        assert_eq!(diff(&before, &before.clone()), None);
    }

    #[test]
    fn test_update_glyphs_skips_absent_id() {
        let (tx, rx) = watch::channel(vec![item("a", PlaybackGlyph::Play)]);

        update_glyphs(&tx, &snapshot(PlaybackState::Playing), &NowPlaying::empty());
        assert_eq!(rx.borrow()[0].glyph, PlaybackGlyph::Play);

        update_glyphs(&tx, &snapshot(PlaybackState::None), &NOTHING_PLAYING);
        assert_eq!(rx.borrow()[0].glyph, PlaybackGlyph::Play);

        update_glyphs(&tx, &snapshot(PlaybackState::Playing), &now_playing("a"));
        assert_eq!(rx.borrow()[0].glyph, PlaybackGlyph::Pause);

        update_glyphs(&tx, &snapshot(PlaybackState::Playing), &now_playing("other"));
        assert_eq!(rx.borrow()[0].glyph, PlaybackGlyph::None);
    }
}
