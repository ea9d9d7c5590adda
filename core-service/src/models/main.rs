//! Top-level model: item clicks, play/pause toggling and navigation.

use core_library::models::Extras;
use core_playback::{resolve_click_action, ClickAction};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::MusicServiceConnection;
use crate::error::Result;
use crate::models::media_items::MediaItemData;

/// Navigation requested by the model; each command is delivered once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationCommand {
    BrowseTo(String),
    ShowNowPlaying,
}

pub struct MainModel {
    connection: Arc<MusicServiceConnection>,
    navigation: mpsc::UnboundedSender<NavigationCommand>,
}

impl MainModel {
    pub fn new(
        connection: Arc<MusicServiceConnection>,
    ) -> (Self, mpsc::UnboundedReceiver<NavigationCommand>) {
        let (navigation, commands) = mpsc::unbounded_channel();
        (
            Self {
                connection,
                navigation,
            },
            commands,
        )
    }

    /// Root to browse first; `None` until connected.
    pub fn root_media_id(&self) -> Option<String> {
        self.connection.root_media_id().map(str::to_string)
    }

    /// Browse into a browsable item, otherwise play it and show now playing.
    pub async fn media_item_clicked(&self, item: &MediaItemData) -> Result<()> {
        if item.browsable {
            self.navigate(NavigationCommand::BrowseTo(item.media_id.clone()));
            return Ok(());
        }

        self.play_media(item, false).await?;
        self.navigate(NavigationCommand::ShowNowPlaying);
        Ok(())
    }

    pub async fn play_media(&self, item: &MediaItemData, pause_allowed: bool) -> Result<()> {
        self.toggle_or_play(&item.media_id, pause_allowed).await
    }

    pub async fn play_media_id(&self, media_id: &str) -> Result<()> {
        self.toggle_or_play(media_id, true).await
    }

    pub async fn next_media(&self) -> Result<()> {
        self.connection.transport_controls().skip_to_next().await
    }

    pub async fn prev_media(&self) -> Result<()> {
        self.connection.transport_controls().skip_to_previous().await
    }

    async fn toggle_or_play(&self, media_id: &str, pause_allowed: bool) -> Result<()> {
        let state = self.connection.current_playback_state();
        let now_playing = self.connection.current_now_playing();
        let controls = self.connection.transport_controls();

        match resolve_click_action(media_id, false, pause_allowed, &state, &now_playing) {
            ClickAction::Play => controls.play().await,
            ClickAction::Pause => controls.pause().await,
            ClickAction::PlayFromMediaId(id) => {
                controls.play_from_media_id(&id, &Extras::new()).await
            }
            ClickAction::BrowseTo(_) | ClickAction::Ignore => Ok(()),
        }
    }

    fn navigate(&self, command: NavigationCommand) {
        debug!(?command, "Navigation requested");
        // A closed receiver means nobody is navigating any more.
        let _ = self.navigation.send(command);
    }
}

impl std::fmt::Debug for MainModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainModel")
            .field("connection", &self.connection)
            .finish()
    }
}
