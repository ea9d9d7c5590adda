//! # Media Library Module
//!
//! Owns the music catalog and everything derived from it.
//!
//! ## Overview
//!
//! This module manages:
//! - Fetching and parsing the remote JSON catalog ([`source::JsonSource`])
//! - The readiness gate consumers wait on before touching the catalog
//! - The browse tree (root, recommended, albums, recent)
//! - Opaque artwork references and their local disk cache

pub mod artwork;
pub mod browse;
pub mod catalog;
pub mod error;
pub mod gate;
pub mod models;
pub mod source;

#[cfg(test)]
mod test_support;

pub use artwork::AlbumArtContentProvider;
pub use browse::BrowseTree;
pub use error::{LibraryError, Result};
pub use gate::{ReadinessGate, ReadyCallback, SourceState};
pub use models::{MediaEntry, MediaFlag, TrackRecord};
pub use source::{JsonSource, MusicSource};
