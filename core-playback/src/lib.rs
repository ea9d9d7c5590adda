//! # Playback Module
//!
//! Drives the host player engine for the media browser core.
//!
//! ## Overview
//!
//! This module handles:
//! - The active playlist and transport pass-through ([`coordinator`])
//! - Session playback state and now-playing snapshots ([`state`])
//! - The persisted Recent slot used for resumption ([`storage`])

pub mod coordinator;
pub mod error;
pub mod state;
pub mod storage;

pub use coordinator::{resolve_click_action, ClickAction, PlaybackCoordinator, PlaybackSession};
pub use error::{PlaybackError, Result};
pub use state::{NowPlaying, PlaybackState, PlaybackStateSnapshot, NOTHING_PLAYING};
pub use storage::{PersistentStorage, SaveTicket};
