//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, filesystem, settings, the
//! player engine and the notification presenter) into the media browser core.
//! Desktop apps typically enable the `desktop-shims` feature so that
//! [`CoreConfig`] falls back to the adapters from `bridge-desktop`; mobile
//! hosts inject their native implementations.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use bridge_traits::{MediaPlayer, NotificationPresenter};
//! # async fn example(
//! #     config: core_runtime::config::CoreConfig,
//! #     player: Arc<dyn MediaPlayer>,
//! #     notifications: Arc<dyn NotificationPresenter>,
//! # ) -> core_service::Result<()> {
//! use core_service::bootstrap;
//! use core_service::models::MediaItemListModel;
//!
//! let core = bootstrap(config, player, notifications)?;
//! let connection = core.connect(false);
//! let albums = MediaItemListModel::new("__ALBUMS__", &connection);
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod service;

pub use connection::{ChildrenSubscription, MusicServiceConnection, TransportControls};
pub use error::{CoreError, Result};
pub use service::{BrowserRoot, ChildrenResult, ContentStyle, MusicService, PlayerNotice, RootExtras};

use std::sync::Arc;

use bridge_traits::{notification::NotificationPresenter, player::MediaPlayer};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventBus;
use tracing::info;

use crate::models::NowPlayingModel;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    event_bus: EventBus,
    service: Arc<MusicService>,
}

impl CoreService {
    /// Create the service from a validated configuration. Nothing runs until
    /// [`CoreService::start`].
    pub fn new(
        config: CoreConfig,
        player: Arc<dyn MediaPlayer>,
        notifications: Arc<dyn NotificationPresenter>,
    ) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let service = MusicService::from_config(&config, player, notifications, event_bus.clone());

        Self {
            config: Arc::new(config),
            event_bus,
            service,
        }
    }

    pub fn start(&self) {
        self.service.start();
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn music_service(&self) -> Arc<MusicService> {
        Arc::clone(&self.service)
    }

    /// Open a new connection; `recent_hint` asks for the Recent root.
    pub fn connect(&self, recent_hint: bool) -> Arc<MusicServiceConnection> {
        MusicServiceConnection::connect(Arc::clone(&self.service), recent_hint)
    }

    /// Now-playing model polling at the configured position interval.
    pub fn now_playing_model(&self, connection: Arc<MusicServiceConnection>) -> NowPlayingModel {
        NowPlayingModel::new(connection, self.config.position_update_interval)
    }

    pub async fn shutdown(&self) {
        self.service.shutdown().await;
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("catalog_url", &self.config.catalog_url.as_str())
            .field("service", &self.service)
            .finish()
    }
}

/// Validate `config`, build the service and start it.
///
/// Must be called from within a Tokio runtime.
pub fn bootstrap(
    config: CoreConfig,
    player: Arc<dyn MediaPlayer>,
    notifications: Arc<dyn NotificationPresenter>,
) -> Result<CoreService> {
    config.validate()?;
    let core = CoreService::new(config, player, notifications);
    core.start();
    info!(catalog_url = %core.config.catalog_url, "Core service bootstrapped");
    Ok(core)
}

/// Bootstrap with the default configuration and the desktop bridges.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    player: Arc<dyn MediaPlayer>,
    notifications: Arc<dyn NotificationPresenter>,
) -> Result<CoreService> {
    let config = CoreConfig::builder()
        .build()
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;
    bootstrap(config, player, notifications)
}
