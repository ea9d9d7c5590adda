//! Now-playing notification surface.
//!
//! The host renders the notification and lock-screen controls. The core only
//! decides when it is shown, what it shows, and whether it may be dismissed.

use async_trait::async_trait;

use crate::error::Result;

/// Content rendered in the now-playing notification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationContent {
    pub media_id: String,
    pub title: String,
    pub subtitle: String,
    /// Opaque artwork reference; resolved by the host through the content provider.
    pub icon_uri: String,
}

/// Trait for hosts that present the playback notification.
#[async_trait]
pub trait NotificationPresenter: Send + Sync {
    /// Show (or refresh) the notification for the given content.
    async fn show(&self, content: NotificationContent) -> Result<()>;

    /// Mark the notification as ongoing (not dismissible) or dismissible.
    async fn set_ongoing(&self, ongoing: bool) -> Result<()>;

    /// Remove the notification.
    async fn hide(&self) -> Result<()>;
}
