//! # Recent Slot Persistence
//!
//! Stores the most recently played item so playback can be resumed after a
//! restart. The slot is a single record spread over five settings keys and is
//! overwritten wholesale on every save.
//!
//! Artwork is cached locally at save time and the slot keeps a `file://`
//! reference to the cached copy, so rendering the resume entry never needs the
//! network.
//!
//! Saves are ordered by a [`SaveTicket`] reserved when the save is requested.
//! Commits are serialized and a ticket superseded by a later reservation is
//! skipped, so the slot always ends on the most recently requested item.

use bridge_traits::storage::SettingsStore;
use core_library::models::{MediaEntry, MediaFlag, EXTRA_PLAYBACK_START_POSITION_MS};
use core_library::AlbumArtContentProvider;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::error::Result;

pub const RECENT_SONG_MEDIA_ID_KEY: &str = "recent_song_media_id";
pub const RECENT_SONG_TITLE_KEY: &str = "recent_song_title";
pub const RECENT_SONG_SUBTITLE_KEY: &str = "recent_song_subtitle";
pub const RECENT_SONG_ICON_URI_KEY: &str = "recent_song_icon_uri";
pub const RECENT_SONG_POSITION_KEY: &str = "recent_song_position";

/// Position of a save request in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SaveTicket(u64);

pub struct PersistentStorage {
    settings: Arc<dyn SettingsStore>,
    artwork: Arc<AlbumArtContentProvider>,
    event_bus: Option<EventBus>,
    latest_ticket: AtomicU64,
    write_lock: Mutex<()>,
}

impl PersistentStorage {
    pub fn new(settings: Arc<dyn SettingsStore>, artwork: Arc<AlbumArtContentProvider>) -> Self {
        Self {
            settings,
            artwork,
            event_bus: None,
            latest_ticket: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    /// Publish [`PlaybackEvent::RecentSaved`] after each save.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Reserve the next save slot. Reserving supersedes every earlier ticket.
    pub fn reserve_save(&self) -> SaveTicket {
        SaveTicket(self.latest_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn is_superseded(&self, ticket: SaveTicket) -> bool {
        self.latest_ticket.load(Ordering::SeqCst) != ticket.0
    }

    /// Overwrite the Recent slot with `entry` at `position_ms`.
    pub async fn save_recent_song(&self, entry: &MediaEntry, position_ms: u64) -> Result<()> {
        let ticket = self.reserve_save();
        self.commit_recent_song(ticket, entry, position_ms)
            .await
            .map(|_| ())
    }

    /// Overwrite the Recent slot unless a later ticket has been reserved.
    ///
    /// Returns `false` when the save was skipped as superseded.
    #[instrument(skip(self, entry), fields(media_id = %entry.media_id))]
    pub async fn commit_recent_song(
        &self,
        ticket: SaveTicket,
        entry: &MediaEntry,
        position_ms: u64,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.is_superseded(ticket) {
            debug!(?ticket, "Skipping superseded recent song save");
            return Ok(false);
        }

        let icon_uri = match self.artwork.open(&entry.icon_uri).await {
            Ok(path) => AlbumArtContentProvider::local_reference(&path),
            Err(e) => {
                warn!(icon_uri = %entry.icon_uri, error = %e, "Could not cache artwork for recent song");
                String::new()
            }
        };

        if self.is_superseded(ticket) {
            debug!(?ticket, "Skipping superseded recent song save");
            return Ok(false);
        }

        let mut tx = self.settings.begin_transaction().await?;
        tx.set_string(RECENT_SONG_MEDIA_ID_KEY, &entry.media_id)
            .await?;
        tx.set_string(RECENT_SONG_TITLE_KEY, &entry.title).await?;
        tx.set_string(RECENT_SONG_SUBTITLE_KEY, &entry.subtitle)
            .await?;
        tx.set_string(RECENT_SONG_ICON_URI_KEY, &icon_uri).await?;
        tx.set_i64(
            RECENT_SONG_POSITION_KEY,
            i64::try_from(position_ms).unwrap_or(i64::MAX),
        )
        .await?;
        tx.commit().await?;

        debug!(position_ms, "Saved recent song");
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Playback(PlaybackEvent::RecentSaved {
                media_id: entry.media_id.clone(),
                position_ms,
            }));
        }
        Ok(true)
    }

    /// Read the Recent slot as a playable entry.
    ///
    /// The stored position is carried in the entry's extras.
    pub async fn load_recent_song(&self) -> Result<Option<MediaEntry>> {
        let Some(media_id) = self.settings.get_string(RECENT_SONG_MEDIA_ID_KEY).await? else {
            return Ok(None);
        };

        let title = self.get_string_or_empty(RECENT_SONG_TITLE_KEY).await?;
        let subtitle = self.get_string_or_empty(RECENT_SONG_SUBTITLE_KEY).await?;
        let icon_uri = self.get_string_or_empty(RECENT_SONG_ICON_URI_KEY).await?;
        let position = self
            .settings
            .get_i64(RECENT_SONG_POSITION_KEY)
            .await?
            .unwrap_or(0);

        let entry = MediaEntry {
            media_id,
            title,
            subtitle,
            icon_uri,
            flag: Some(MediaFlag::Playable),
            ..MediaEntry::default()
        }
        .with_extra(EXTRA_PLAYBACK_START_POSITION_MS, position);

        Ok(Some(entry))
    }

    /// Id stored in the Recent slot, if any.
    pub async fn recent_media_id(&self) -> Result<Option<String>> {
        Ok(self.settings.get_string(RECENT_SONG_MEDIA_ID_KEY).await?)
    }

    async fn get_string_or_empty(&self, key: &str) -> Result<String> {
        Ok(self.settings.get_string(key).await?.unwrap_or_default())
    }
}

impl std::fmt::Debug for PersistentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStorage")
            .field("artwork", &self.artwork)
            .finish()
    }
}
