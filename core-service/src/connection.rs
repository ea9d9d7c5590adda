//! # Service Connection
//!
//! Client-side handle to a [`MusicService`]. Observers read connection state,
//! playback state and now-playing metadata from `watch` channels and open
//! scoped children subscriptions.
//!
//! A connection is constructed explicitly and shared through an `Arc`; there
//! is no process-wide instance.

use core_library::models::{Extras, MediaEntry};
use core_playback::{NowPlaying, PlaybackStateSnapshot, NOTHING_PLAYING};
use core_runtime::events::{CoreEvent, EventStream, SessionEvent};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::service::{BrowserRoot, MusicService};

pub struct MusicServiceConnection {
    service: Arc<MusicService>,
    root: BrowserRoot,
    is_connected: watch::Sender<bool>,
    network_failure: watch::Sender<bool>,
    playback_state: watch::Sender<PlaybackStateSnapshot>,
    now_playing: watch::Sender<NowPlaying>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl MusicServiceConnection {
    /// Connect to `service` and start mirroring its state.
    pub fn connect(service: Arc<MusicService>, recent_hint: bool) -> Arc<Self> {
        let root = service.get_root(recent_hint);
        let (is_connected, _) = watch::channel(!service.is_shut_down());
        let (network_failure, _) = watch::channel(false);
        let (playback_state, _) = watch::channel(PlaybackStateSnapshot::EMPTY);
        let (now_playing, _) = watch::channel(NOTHING_PLAYING);

        let connection = Arc::new(Self {
            service,
            root,
            is_connected,
            network_failure,
            playback_state,
            now_playing,
            forwarder: Mutex::new(None),
        });

        // Subscribe before spawning so no session event is missed.
        let sessions = EventStream::new(connection.service.event_bus().subscribe())
            .filter(|event| matches!(event, CoreEvent::Session(_)));
        let forwarder = tokio::spawn(forward(
            Arc::downgrade(&connection),
            Arc::clone(&connection.service),
            sessions,
        ));
        *connection.forwarder.lock() = Some(forwarder);

        info!(root = %connection.root.root_id, "Connected to music service");
        connection
    }

    pub fn is_connected(&self) -> watch::Receiver<bool> {
        self.is_connected.subscribe()
    }

    pub fn network_failure(&self) -> watch::Receiver<bool> {
        self.network_failure.subscribe()
    }

    pub fn playback_state(&self) -> watch::Receiver<PlaybackStateSnapshot> {
        self.playback_state.subscribe()
    }

    pub fn now_playing(&self) -> watch::Receiver<NowPlaying> {
        self.now_playing.subscribe()
    }

    pub fn current_playback_state(&self) -> PlaybackStateSnapshot {
        *self.playback_state.borrow()
    }

    pub fn current_now_playing(&self) -> NowPlaying {
        self.now_playing.borrow().clone()
    }

    fn connected(&self) -> bool {
        *self.is_connected.borrow()
    }

    /// The service's browse root, while connected.
    pub fn root_media_id(&self) -> Option<&str> {
        self.connected().then_some(self.root.root_id.as_str())
    }

    pub fn root(&self) -> &BrowserRoot {
        &self.root
    }

    /// Subscribe to the children of `parent_id`.
    ///
    /// The subscription is released when the returned guard is dropped.
    pub fn subscribe(&self, parent_id: &str) -> ChildrenSubscription {
        let (sender, receiver) = mpsc::channel(1);
        let service = Arc::clone(&self.service);
        let parent = parent_id.to_string();

        let task = tokio::spawn(async move {
            let result = service.get_children(&parent).await;
            match result.resolve().await {
                Some(children) => {
                    let _ = sender.send(children).await;
                }
                None => debug!(parent_id = %parent, "No children delivered"),
            }
        });

        debug!(parent_id, "Subscribed");
        ChildrenSubscription {
            parent_id: parent_id.to_string(),
            receiver,
            task,
        }
    }

    pub fn transport_controls(&self) -> TransportControls {
        TransportControls {
            service: Arc::clone(&self.service),
        }
    }

    /// Send a custom session command. Returns `false` when not connected.
    ///
    /// The service defines no custom commands, so a connected send is only
    /// logged.
    pub fn send_command(&self, command: &str, parameters: &Extras) -> bool {
        if !self.connected() {
            warn!(command, "Dropping command, not connected");
            return false;
        }
        debug!(command, parameters = parameters.len(), "Sent session command");
        true
    }

    pub fn current_position_ms(&self) -> u64 {
        self.service.current_position_ms()
    }

    pub fn disconnect(&self) {
        if let Some(forwarder) = self.forwarder.lock().take() {
            forwarder.abort();
        }
        self.is_connected.send_replace(false);
        info!("Disconnected from music service");
    }
}

impl Drop for MusicServiceConnection {
    fn drop(&mut self) {
        if let Some(forwarder) = self.forwarder.get_mut().take() {
            forwarder.abort();
        }
    }
}

impl std::fmt::Debug for MusicServiceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicServiceConnection")
            .field("root", &self.root.root_id)
            .field("is_connected", &self.connected())
            .finish()
    }
}

/// Mirror service state into the connection until either side goes away.
async fn forward(
    connection: Weak<MusicServiceConnection>,
    service: Arc<MusicService>,
    mut sessions: EventStream,
) {
    let mut state_rx = service.playback_state();
    let mut now_rx = service.now_playing();
    let shutdown = service.shutdown_token();
    drop(service);

    {
        let snapshot = *state_rx.borrow_and_update();
        let metadata = metadata_or_placeholder(now_rx.borrow_and_update().clone());
        let Some(connection) = connection.upgrade() else {
            return;
        };
        connection.playback_state.send_replace(snapshot);
        connection.now_playing.send_replace(metadata);
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                if let Some(connection) = connection.upgrade() {
                    connection.is_connected.send_replace(false);
                }
                break;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *state_rx.borrow_and_update();
                let Some(connection) = connection.upgrade() else {
                    break;
                };
                connection.playback_state.send_replace(snapshot);
            }
            changed = now_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let metadata = metadata_or_placeholder(now_rx.borrow_and_update().clone());
                let Some(connection) = connection.upgrade() else {
                    break;
                };
                connection.now_playing.send_replace(metadata);
            }
            event = sessions.recv() => match event {
                Ok(CoreEvent::Session(SessionEvent::NetworkFailure)) => {
                    let Some(connection) = connection.upgrade() else {
                        break;
                    };
                    connection.network_failure.send_replace(true);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event forwarder lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    debug!("Connection forwarder stopped");
}

/// Observers never see an absent id.
fn metadata_or_placeholder(metadata: NowPlaying) -> NowPlaying {
    if metadata.media_id.is_none() {
        NOTHING_PLAYING
    } else {
        metadata
    }
}

// ============================================================================
// Children Subscription
// ============================================================================

/// Scoped subscription to a browse node's children.
pub struct ChildrenSubscription {
    parent_id: String,
    receiver: mpsc::Receiver<Vec<MediaEntry>>,
    task: JoinHandle<()>,
}

impl ChildrenSubscription {
    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    /// Next delivery, or `None` once the subscription has nothing more to say.
    pub async fn next(&mut self) -> Option<Vec<MediaEntry>> {
        self.receiver.recv().await
    }
}

impl Drop for ChildrenSubscription {
    fn drop(&mut self) {
        self.task.abort();
        debug!(parent_id = %self.parent_id, "Unsubscribed");
    }
}

impl std::fmt::Debug for ChildrenSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildrenSubscription")
            .field("parent_id", &self.parent_id)
            .finish()
    }
}

// ============================================================================
// Transport Controls
// ============================================================================

/// Transport commands routed to the connected service.
#[derive(Clone)]
pub struct TransportControls {
    service: Arc<MusicService>,
}

impl TransportControls {
    fn service(&self) -> Result<&MusicService> {
        if self.service.is_shut_down() {
            return Err(CoreError::NotConnected);
        }
        Ok(&self.service)
    }

    pub async fn play(&self) -> Result<()> {
        self.service()?.play().await
    }

    pub async fn pause(&self) -> Result<()> {
        self.service()?.pause().await
    }

    pub async fn stop(&self) -> Result<()> {
        self.service()?.stop().await
    }

    pub async fn skip_to_next(&self) -> Result<()> {
        self.service()?.skip_to_next().await
    }

    pub async fn skip_to_previous(&self) -> Result<()> {
        self.service()?.skip_to_previous().await
    }

    pub async fn play_from_media_id(&self, media_id: &str, extras: &Extras) -> Result<()> {
        self.service()?.play_from_media_id(media_id, extras).await
    }

    pub async fn prepare_from_media_id(
        &self,
        media_id: &str,
        play_when_ready: bool,
        extras: &Extras,
    ) -> Result<()> {
        self.service()?
            .prepare_from_media_id(media_id, play_when_ready, extras)
            .await
    }

    pub async fn prepare(&self, play_when_ready: bool) -> Result<()> {
        self.service()?.prepare(play_when_ready).await
    }
}

impl std::fmt::Debug for TransportControls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportControls").finish()
    }
}
