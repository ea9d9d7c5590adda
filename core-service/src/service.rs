//! # Music Service
//!
//! The long-lived media browser service: answers browse queries, accepts
//! transport commands and reacts to events from the host player.
//!
//! ## Overview
//!
//! - Browse queries for `__RECENT__` are served from persistence. Every other
//!   key waits on the source's readiness gate and is answered from a
//!   [`BrowseTree`] built lazily and rebuilt whenever the catalog reloads.
//! - Transport commands go through the [`PlaybackCoordinator`].
//! - A listener task consumes [`PlayerEvent`]s, keeps the notification in step
//!   with the player, saves the Recent slot and publishes playback state and
//!   now-playing metadata over `watch` channels.
//!
//! Background tasks hold only weak references to the service, so work that
//! completes after [`MusicService::shutdown`] is dropped.

use bridge_traits::notification::{NotificationContent, NotificationPresenter};
use bridge_traits::player::{MediaPlayer, PlayerError, PlayerErrorCode, PlayerEvent, PlayerStatus};
use core_library::browse::{BrowseTree, BROWSABLE_ROOT, RECENT_ROOT};
use core_library::models::{start_position_ms, Extras, MediaEntry};
use core_library::{AlbumArtContentProvider, JsonSource, MusicSource, TrackRecord};
use core_playback::{
    NowPlaying, PersistentStorage, PlaybackCoordinator, PlaybackError, PlaybackStateSnapshot,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, SessionEvent};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;

// ============================================================================
// Browse Surface Types
// ============================================================================

/// How a host should lay out a list of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStyle {
    List = 1,
    Grid = 2,
}

/// Capabilities advertised alongside the browse root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootExtras {
    pub search_supported: bool,
    pub content_style_supported: bool,
    pub browsable_hint: ContentStyle,
    pub playable_hint: ContentStyle,
}

impl Default for RootExtras {
    fn default() -> Self {
        Self {
            search_supported: true,
            content_style_supported: true,
            browsable_hint: ContentStyle::Grid,
            playable_hint: ContentStyle::List,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserRoot {
    pub root_id: String,
    pub extras: RootExtras,
}

/// Answer to a browse query.
///
/// `Detached` means the catalog was still loading; the receiver yields the
/// answer once the readiness gate opens. A dropped sender (service shut down)
/// resolves to `None`.
#[derive(Debug)]
pub enum ChildrenResult {
    Ready(Option<Vec<MediaEntry>>),
    Detached(oneshot::Receiver<Option<Vec<MediaEntry>>>),
}

impl ChildrenResult {
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached(_))
    }

    pub async fn resolve(self) -> Option<Vec<MediaEntry>> {
        match self {
            Self::Ready(children) => children,
            Self::Detached(receiver) => receiver.await.ok().flatten(),
        }
    }
}

/// User-facing notice derived from a player error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerNotice {
    MediaNotFound,
    Generic,
}

impl PlayerNotice {
    pub fn from_code(code: PlayerErrorCode) -> Self {
        match code {
            PlayerErrorCode::IoBadHttpStatus | PlayerErrorCode::IoFileNotFound => {
                Self::MediaNotFound
            }
            _ => Self::Generic,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MediaNotFound => "media_not_found",
            Self::Generic => "generic_error",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MediaNotFound => "Media not found",
            Self::Generic => "Something went wrong",
        }
    }
}

// ============================================================================
// Music Service
// ============================================================================

/// Browse tree together with the catalog snapshot it was built from.
struct CachedTree {
    tracks: Arc<[TrackRecord]>,
    tree: Arc<BrowseTree>,
}

pub struct MusicService {
    source: Arc<dyn MusicSource>,
    coordinator: PlaybackCoordinator,
    storage: Arc<PersistentStorage>,
    notifications: Arc<dyn NotificationPresenter>,
    event_bus: EventBus,
    browse_tree: tokio::sync::Mutex<Option<CachedTree>>,
    playback_state: watch::Sender<PlaybackStateSnapshot>,
    now_playing: watch::Sender<NowPlaying>,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl MusicService {
    pub fn new(
        source: Arc<dyn MusicSource>,
        storage: PersistentStorage,
        player: Arc<dyn MediaPlayer>,
        notifications: Arc<dyn NotificationPresenter>,
        event_bus: EventBus,
    ) -> Arc<Self> {
        let (playback_state, _) = watch::channel(PlaybackStateSnapshot::EMPTY);
        let (now_playing, _) = watch::channel(NowPlaying::empty());

        Arc::new(Self {
            coordinator: PlaybackCoordinator::new(player, Arc::clone(&source)),
            source,
            storage: Arc::new(storage),
            notifications,
            event_bus,
            browse_tree: tokio::sync::Mutex::new(None),
            playback_state,
            now_playing,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Wire the JSON catalog source, artwork provider and Recent slot from `config`.
    pub fn from_config(
        config: &CoreConfig,
        player: Arc<dyn MediaPlayer>,
        notifications: Arc<dyn NotificationPresenter>,
        event_bus: EventBus,
    ) -> Arc<Self> {
        let artwork = Arc::new(AlbumArtContentProvider::from_config(config));
        let source: Arc<dyn MusicSource> = Arc::new(
            JsonSource::from_config(config, Arc::clone(&artwork)).with_event_bus(event_bus.clone()),
        );
        let storage = PersistentStorage::new(Arc::clone(&config.settings_store), artwork)
            .with_event_bus(event_bus.clone());

        Self::new(source, storage, player, notifications, event_bus)
    }

    /// Start loading the catalog and listening to the player.
    pub fn start(self: &Arc<Self>) {
        if self.shutdown.is_cancelled() {
            warn!("Music service already shut down, not starting");
            return;
        }

        let events = self.coordinator.player().subscribe();
        let listener = tokio::spawn(listen(Arc::downgrade(self), events, self.shutdown.clone()));

        let source = Arc::clone(&self.source);
        let loader = tokio::spawn(async move {
            if let Err(e) = source.load().await {
                warn!(error = %e, "Catalog load failed");
            }
        });

        self.tasks.lock().extend([listener, loader]);
        info!("Music service started");
    }

    /// Stop the player, cancel background work and drop queued browse callbacks.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();

        if let Err(e) = self.coordinator.stop().await {
            warn!(error = %e, "Failed to stop player during shutdown");
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.source.gate().clear_pending();
        info!("Music service shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn source(&self) -> &Arc<dyn MusicSource> {
        &self.source
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator {
        &self.coordinator
    }

    pub fn playback_state(&self) -> watch::Receiver<PlaybackStateSnapshot> {
        self.playback_state.subscribe()
    }

    pub fn now_playing(&self) -> watch::Receiver<NowPlaying> {
        self.now_playing.subscribe()
    }

    pub fn current_position_ms(&self) -> u64 {
        self.coordinator.player().current_position_ms()
    }

    // ------------------------------------------------------------------------
    // Browse
    // ------------------------------------------------------------------------

    pub fn get_root(&self, recent_hint: bool) -> BrowserRoot {
        let root_id = if recent_hint {
            RECENT_ROOT
        } else {
            BROWSABLE_ROOT
        };

        BrowserRoot {
            root_id: root_id.to_string(),
            extras: RootExtras::default(),
        }
    }

    /// Children of `parent_id`.
    ///
    /// The Recent root is answered immediately from persistence. Other keys
    /// are answered once the catalog has loaded; a failed load publishes
    /// [`SessionEvent::NetworkFailure`] and answers `None`.
    #[instrument(skip(self))]
    pub async fn get_children(self: &Arc<Self>, parent_id: &str) -> ChildrenResult {
        if self.is_shut_down() {
            return ChildrenResult::Ready(None);
        }

        if parent_id == RECENT_ROOT {
            let recent = match self.storage.load_recent_song().await {
                Ok(entry) => entry.map(|entry| vec![entry]),
                Err(e) => {
                    warn!(error = %e, "Failed to read recent song");
                    None
                }
            };
            return ChildrenResult::Ready(recent);
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let immediate = self.source.when_ready(Box::new(move |success| {
            let _ = ready_tx.send(success);
        }));

        if immediate {
            let success = ready_rx.await.unwrap_or(false);
            return ChildrenResult::Ready(self.children_after_load(success, parent_id).await);
        }

        debug!("Catalog not ready, detaching result");
        let (result_tx, result_rx) = oneshot::channel();
        let service = Arc::downgrade(self);
        let parent_id = parent_id.to_string();
        tokio::spawn(async move {
            // Dropped callbacks mean the service shut down.
            let Ok(success) = ready_rx.await else {
                return;
            };
            let Some(service) = service.upgrade() else {
                return;
            };
            let children = service.children_after_load(success, &parent_id).await;
            let _ = result_tx.send(children);
        });

        ChildrenResult::Detached(result_rx)
    }

    async fn children_after_load(&self, success: bool, parent_id: &str) -> Option<Vec<MediaEntry>> {
        if !success {
            warn!(parent_id, "Catalog unavailable");
            let _ = self
                .event_bus
                .emit(CoreEvent::Session(SessionEvent::NetworkFailure));
            return None;
        }

        let tree = self.browse_tree().await;
        tree.get(parent_id).map(<[MediaEntry]>::to_vec)
    }

    /// Tree for the current catalog snapshot, rebuilt after every reload.
    async fn browse_tree(&self) -> Arc<BrowseTree> {
        let tracks = self.source.tracks();
        let mut cached = self.browse_tree.lock().await;
        if let Some(cached) = cached.as_ref() {
            if Arc::ptr_eq(&cached.tracks, &tracks) {
                return Arc::clone(&cached.tree);
            }
        }

        let recent = self.storage.recent_media_id().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read recent media id");
            None
        });
        let tree = Arc::new(BrowseTree::build(&tracks, recent.as_deref()));
        debug!(nodes = tree.len(), "Built browse tree");

        *cached = Some(CachedTree {
            tracks,
            tree: Arc::clone(&tree),
        });
        tree
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    pub async fn play(&self) -> Result<()> {
        Ok(self.coordinator.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.coordinator.pause().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        Ok(self.coordinator.stop().await?)
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        Ok(self.coordinator.skip_to_next().await?)
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        Ok(self.coordinator.skip_to_previous().await?)
    }

    pub async fn play_from_media_id(&self, media_id: &str, extras: &Extras) -> Result<()> {
        self.prepare_from_media_id(media_id, true, extras).await
    }

    /// Build the album playlist around `media_id` once the catalog is ready.
    ///
    /// Unknown ids are logged and dropped.
    #[instrument(skip(self, extras))]
    pub async fn prepare_from_media_id(
        &self,
        media_id: &str,
        play_when_ready: bool,
        extras: &Extras,
    ) -> Result<()> {
        if self.is_shut_down() {
            warn!("Music service shut down, dropping prepare request");
            return Ok(());
        }
        if !self.source.ready().await {
            warn!("Catalog unavailable, dropping prepare request");
            return Ok(());
        }

        let start = start_position_ms(extras);
        match self
            .coordinator
            .prepare(media_id, play_when_ready, start)
            .await
        {
            Ok(()) => {
                self.publish_session(false);
                Ok(())
            }
            Err(PlaybackError::TrackNotFound(id)) => {
                warn!(media_id = %id, "Ignoring prepare for unknown media id");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resume the item stored in the Recent slot at its stored position.
    pub async fn prepare(&self, play_when_ready: bool) -> Result<()> {
        let Some(recent) = self.storage.load_recent_song().await? else {
            debug!("No recent song to resume");
            return Ok(());
        };
        self.prepare_from_media_id(&recent.media_id, play_when_ready, &recent.extras)
            .await
    }

    pub fn queue_description(&self, index: usize) -> MediaEntry {
        self.coordinator.queue_description(index)
    }

    // ------------------------------------------------------------------------
    // Player Events
    // ------------------------------------------------------------------------

    pub(crate) async fn handle_player_event(&self, event: PlayerEvent) {
        if event.affects_current_index() {
            self.coordinator.sync_index();
        }

        let errored = match &event {
            PlayerEvent::StateChanged {
                play_when_ready,
                status,
            } => {
                self.on_state_changed(*play_when_ready, *status).await;
                false
            }
            PlayerEvent::Error(e) => {
                self.on_player_error(e);
                true
            }
            _ => false,
        };

        self.publish_session(errored);
    }

    async fn on_state_changed(&self, play_when_ready: bool, status: PlayerStatus) {
        match status {
            PlayerStatus::Buffering | PlayerStatus::Ready => {
                if let Some(content) = self.notification_content() {
                    if let Err(e) = self.notifications.show(content).await {
                        warn!(error = %e, "Failed to show notification");
                    }
                }

                if status == PlayerStatus::Ready {
                    self.save_recent_song();

                    if !play_when_ready {
                        if let Err(e) = self.notifications.set_ongoing(false).await {
                            warn!(error = %e, "Failed to make notification dismissible");
                        }
                    }
                }
            }
            PlayerStatus::Idle | PlayerStatus::Ended => {
                if let Err(e) = self.notifications.hide().await {
                    warn!(error = %e, "Failed to hide notification");
                }
            }
        }
    }

    fn on_player_error(&self, player_error: &PlayerError) {
        let notice = PlayerNotice::from_code(player_error.code);
        error!(
            code = player_error.code.name(),
            message = %player_error.message,
            "Player error"
        );
        let _ = self
            .event_bus
            .emit(CoreEvent::Session(SessionEvent::PlayerError {
                kind: notice.kind().to_string(),
                message: notice.message().to_string(),
            }));
    }

    fn notification_content(&self) -> Option<NotificationContent> {
        self.coordinator
            .current_track()
            .map(|track| NotificationContent {
                media_id: track.id,
                title: track.display_title,
                subtitle: track.display_subtitle,
                icon_uri: track.display_icon_uri,
            })
    }

    fn save_recent_song(&self) {
        if !self.coordinator.has_playlist() {
            return;
        }

        let entry = self
            .coordinator
            .queue_description(self.coordinator.current_index());
        let position_ms = self.current_position_ms();
        let storage = Arc::clone(&self.storage);
        let ticket = storage.reserve_save();

        // Not tracked: a save in flight must finish even during shutdown.
        tokio::spawn(async move {
            match storage.commit_recent_song(ticket, &entry, position_ms).await {
                Ok(true) => {}
                Ok(false) => debug!(media_id = %entry.media_id, "Recent song save superseded"),
                Err(e) => {
                    warn!(error = %e, media_id = %entry.media_id, "Failed to save recent song")
                }
            }
        });
    }

    fn publish_session(&self, errored: bool) {
        let player = self.coordinator.player();
        let mut snapshot = PlaybackStateSnapshot::from_player(
            player.status(),
            player.play_when_ready(),
            player.current_position_ms(),
            self.coordinator.has_playlist(),
        );
        if errored {
            snapshot = snapshot.with_error();
        }

        let previous = self.playback_state.send_replace(snapshot);
        if previous.state != snapshot.state {
            let _ = self
                .event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::StateChanged {
                    state: snapshot.state.name().to_string(),
                }));
        }

        let metadata = self
            .coordinator
            .current_track()
            .map(|track| NowPlaying::from_track(&track))
            .unwrap_or_else(NowPlaying::empty);
        let media_id = metadata.id().unwrap_or_default().to_string();
        let changed = self.now_playing.send_if_modified(|current| {
            if *current == metadata {
                false
            } else {
                *current = metadata;
                true
            }
        });
        if changed {
            let _ = self
                .event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::NowPlayingChanged { media_id }));
        }
    }
}

impl std::fmt::Debug for MusicService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicService")
            .field("source_state", &self.source.state())
            .field("coordinator", &self.coordinator)
            .field("shut_down", &self.shutdown.is_cancelled())
            .finish()
    }
}

async fn listen(
    service: Weak<MusicService>,
    mut events: tokio::sync::broadcast::Receiver<PlayerEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => {
                    let Some(service) = service.upgrade() else {
                        break;
                    };
                    service.handle_player_event(event).await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Player event listener lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("Player event listener stopped");
}
