//! Shared fixtures: a scripted player, a catalog server and a recording
//! notification presenter wired into a [`CoreService`].

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::{SqliteSettingsStore, TokioFileSystem};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::notification::{NotificationContent, NotificationPresenter};
use bridge_traits::player::{
    MediaPlayer, PlayerError, PlayerErrorCode, PlayerEvent, PlayerMediaItem, PlayerStatus,
};
use bytes::Bytes;
use core_runtime::config::CoreConfig;
use core_runtime::events::CoreEvent;
use core_service::CoreService;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{broadcast, watch};

pub const CATALOG_URL: &str = "https://storage.googleapis.com/uamp/catalog.json";
pub const ART_URL: &str = "https://storage.googleapis.com/uamp/Wake_Up/art.jpg";
pub const WAKE_UP_ALBUM_KEY: &str = "Wake%20Up";

/// Track 2 is listed before track 1 so playlist ordering is exercised.
pub const CATALOG_JSON: &str = r#"{
  "music": [
    {
      "id": "wake_up_02",
      "title": "Geisha",
      "album": "Wake Up",
      "artist": "The Kyoto Connection",
      "genre": "Electronic",
      "source": "Wake_Up/02_-_Geisha.mp3",
      "image": "Wake_Up/art.jpg",
      "trackNumber": 2,
      "totalTrackCount": 13,
      "duration": 267
    },
    {
      "id": "wake_up_01",
      "title": "Intro - The Way Of Waking Up",
      "album": "Wake Up",
      "artist": "The Kyoto Connection",
      "genre": "Electronic",
      "source": "Wake_Up/01_-_Intro_-_The_Way_Of_Waking_Up.mp3",
      "image": "Wake_Up/art.jpg",
      "trackNumber": 1,
      "totalTrackCount": 13,
      "duration": 90
    },
    {
      "id": "spatial_01",
      "title": "Spatial Intro",
      "album": "Spatial Audio",
      "artist": "Kwon",
      "genre": "Ambient",
      "source": "spatial/01.mp3",
      "image": "spatial/art.jpg",
      "trackNumber": 1,
      "totalTrackCount": 1
    }
  ]
}"#;

// ============================================================================
// HTTP
// ============================================================================

/// Serves canned responses; unknown URLs answer 404. While held, every
/// request waits for [`CatalogServer::release`].
pub struct CatalogServer {
    responses: Mutex<HashMap<String, (u16, Bytes)>>,
    delays: Mutex<HashMap<String, Duration>>,
    released: watch::Sender<bool>,
}

impl CatalogServer {
    pub fn new() -> Arc<Self> {
        Self::with_release(true)
    }

    pub fn held() -> Arc<Self> {
        Self::with_release(false)
    }

    fn with_release(released: bool) -> Arc<Self> {
        let server = Self {
            responses: Mutex::new(HashMap::new()),
            delays: Mutex::new(HashMap::new()),
            released: watch::channel(released).0,
        };
        server.respond(CATALOG_URL, 200, CATALOG_JSON);
        server.respond(ART_URL, 200, &b"\xff\xd8jpeg"[..]);
        Arc::new(server)
    }

    /// A server whose catalog is missing.
    pub fn failing() -> Arc<Self> {
        let server = Self::new();
        server.responses.lock().remove(CATALOG_URL);
        server
    }

    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) {
        self.responses
            .lock()
            .insert(url.to_string(), (status, body.into()));
    }

    /// Answer requests for `url` only after `delay`.
    pub fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().insert(url.to_string(), delay);
    }

    pub fn release(&self) {
        self.released.send_replace(true);
    }
}

#[async_trait]
impl HttpClient for CatalogServer {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let mut released = self.released.subscribe();
        let _ = released.wait_for(|released| *released).await;

        let delay = self.delays.lock().get(&request.url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let (status, body) = self
            .responses
            .lock()
            .get(&request.url)
            .cloned()
            .unwrap_or((404, Bytes::new()));
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body,
        })
    }
}

// ============================================================================
// Player
// ============================================================================

struct PlayerState {
    items: Vec<PlayerMediaItem>,
    index: i64,
    start_position_ms: Option<u64>,
    position_ms: u64,
    play_when_ready: bool,
    status: PlayerStatus,
    commands: Vec<&'static str>,
}

/// Records commands; tests drive status changes explicitly.
pub struct FakePlayer {
    state: Mutex<PlayerState>,
    events: broadcast::Sender<PlayerEvent>,
}

impl FakePlayer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PlayerState {
                items: Vec::new(),
                index: 0,
                start_position_ms: None,
                position_ms: 0,
                play_when_ready: false,
                status: PlayerStatus::Idle,
                commands: Vec::new(),
            }),
            events: broadcast::channel(64).0,
        })
    }

    pub fn commands(&self) -> Vec<&'static str> {
        self.state.lock().commands.clone()
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .items
            .iter()
            .map(|item| item.media_id.clone())
            .collect()
    }

    pub fn start_position_ms(&self) -> Option<u64> {
        self.state.lock().start_position_ms
    }

    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().position_ms = position_ms;
    }

    /// Move to `status` and announce it.
    pub fn transition(&self, status: PlayerStatus, play_when_ready: bool) {
        {
            let mut state = self.state.lock();
            state.status = status;
            state.play_when_ready = play_when_ready;
        }
        let _ = self.events.send(PlayerEvent::StateChanged {
            play_when_ready,
            status,
        });
    }

    /// Change the current index without announcing it.
    pub fn set_index(&self, index: i64) {
        self.state.lock().index = index;
    }

    pub fn move_to(&self, index: i64) {
        self.state.lock().index = index;
        let _ = self.events.send(PlayerEvent::MediaItemTransition);
    }

    pub fn fail(&self, code: PlayerErrorCode) {
        self.state.lock().status = PlayerStatus::Idle;
        let _ = self
            .events
            .send(PlayerEvent::Error(PlayerError::new(code, "source error")));
    }

    fn record(&self, command: &'static str) {
        self.state.lock().commands.push(command);
    }
}

#[async_trait]
impl MediaPlayer for FakePlayer {
    async fn set_media_items(
        &self,
        items: Vec<PlayerMediaItem>,
        start_index: usize,
        start_position_ms: Option<u64>,
    ) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.commands.push("set_media_items");
        state.items = items;
        state.index = start_index as i64;
        state.start_position_ms = start_position_ms;
        state.position_ms = start_position_ms.unwrap_or(0);
        Ok(())
    }

    async fn prepare(&self) -> BridgeResult<()> {
        self.record("prepare");
        Ok(())
    }

    async fn set_play_when_ready(&self, play_when_ready: bool) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.commands.push("set_play_when_ready");
        state.play_when_ready = play_when_ready;
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record("play");
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record("pause");
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        let mut state = self.state.lock();
        state.commands.push("stop");
        state.status = PlayerStatus::Idle;
        Ok(())
    }

    async fn seek_to_next(&self) -> BridgeResult<()> {
        self.record("seek_to_next");
        Ok(())
    }

    async fn seek_to_previous(&self) -> BridgeResult<()> {
        self.record("seek_to_previous");
        Ok(())
    }

    fn current_media_item_index(&self) -> i64 {
        self.state.lock().index
    }

    fn current_position_ms(&self) -> u64 {
        self.state.lock().position_ms
    }

    fn play_when_ready(&self) -> bool {
        self.state.lock().play_when_ready
    }

    fn status(&self) -> PlayerStatus {
        self.state.lock().status
    }

    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCall {
    Show(String),
    Ongoing(bool),
    Hide,
}

#[derive(Default)]
pub struct RecordingPresenter {
    calls: Mutex<Vec<NotificationCall>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<NotificationCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl NotificationPresenter for RecordingPresenter {
    async fn show(&self, content: NotificationContent) -> BridgeResult<()> {
        self.calls
            .lock()
            .push(NotificationCall::Show(content.media_id));
        Ok(())
    }

    async fn set_ongoing(&self, ongoing: bool) -> BridgeResult<()> {
        self.calls.lock().push(NotificationCall::Ongoing(ongoing));
        Ok(())
    }

    async fn hide(&self) -> BridgeResult<()> {
        self.calls.lock().push(NotificationCall::Hide);
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    _dir: TempDir,
    pub http: Arc<CatalogServer>,
    pub player: Arc<FakePlayer>,
    pub notifications: Arc<RecordingPresenter>,
    pub settings: Arc<SqliteSettingsStore>,
    pub core: CoreService,
}

/// A core wired to fakes; call `core.start()` to begin loading.
pub async fn harness(http: Arc<CatalogServer>) -> Harness {
    let dir = TempDir::new().unwrap();
    let file_system = Arc::new(TokioFileSystem::with_directories(
        dir.path().join("cache"),
        dir.path().join("data"),
    ));
    let settings = Arc::new(SqliteSettingsStore::in_memory("uamp").await.unwrap());
    let player = FakePlayer::new();
    let notifications = Arc::new(RecordingPresenter::default());

    let config = CoreConfig::builder()
        .catalog_url(CATALOG_URL)
        .http_client(http.clone())
        .file_system(file_system)
        .settings_store(settings.clone())
        .position_update_interval(Duration::from_millis(10))
        .build()
        .unwrap();
    let core = CoreService::new(config, player.clone(), notifications.clone());

    Harness {
        _dir: dir,
        http,
        player,
        notifications,
        settings,
        core,
    }
}

const WAIT: Duration = Duration::from_secs(5);

/// Wait for the first event matching `predicate`.
pub async fn next_event(
    events: &mut broadcast::Receiver<CoreEvent>,
    predicate: impl Fn(&CoreEvent) -> bool,
) -> CoreEvent {
    tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(event) if predicate(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Wait until the watched value satisfies `predicate`.
pub async fn wait_until<T>(receiver: &mut watch::Receiver<T>, predicate: impl FnMut(&T) -> bool) {
    tokio::time::timeout(WAIT, receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for value")
        .expect("sender dropped");
}
