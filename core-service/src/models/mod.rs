//! Observer models for UI layers.
//!
//! Each model owns its subscriptions and watcher tasks; dropping the model
//! releases them.

pub mod main;
pub mod media_items;
pub mod now_playing;

pub use main::{MainModel, NavigationCommand};
pub use media_items::{diff, ChangePayload, MediaItemData, MediaItemListModel, PlaybackGlyph};
pub use now_playing::{MediaButtonGlyph, NowPlayingMetadata, NowPlayingModel};
