//! Workspace umbrella crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates so
//! host applications can depend on `media-browser-workspace` and get the
//! desktop-wired media browser core without listing each crate.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "desktop-shims")]
pub use core_service::{bootstrap, bootstrap_desktop, CoreService, MusicServiceConnection};
