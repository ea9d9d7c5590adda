//! Remote catalog descriptor
//!
//! Wire format of the JSON document served at the catalog URL, and the rules
//! that turn one of its records into a [`TrackRecord`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{LibraryError, Result};
use crate::models::{TrackRecord, UNKNOWN_DURATION_MS};

/// Top-level catalog document: `{ "music": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonCatalog {
    pub music: Vec<JsonMusic>,
}

/// One entry of the catalog's `music` array.
///
/// Missing strings decode as empty and missing numbers as zero. A missing
/// `duration` stays `None` so it can be told apart from a zero-length track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JsonMusic {
    pub id: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub source: String,
    pub image: String,
    pub track_number: i64,
    pub total_track_count: i64,
    /// Seconds
    pub duration: Option<i64>,
    pub site: String,
}

impl JsonCatalog {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| LibraryError::InvalidCatalog(e.to_string()))
    }
}

/// Resolves relative locations against the catalog's own location.
#[derive(Debug, Clone)]
pub struct CatalogResolver {
    scheme: String,
    base_uri: String,
}

impl CatalogResolver {
    pub fn new(catalog_url: &Url) -> Self {
        let full = catalog_url.as_str();
        let last_segment = catalog_url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("");
        let base_uri = full.strip_suffix(last_segment).unwrap_or(full).to_string();

        Self {
            scheme: catalog_url.scheme().to_string(),
            base_uri,
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Prefix `location` with the base URI unless it already carries the
    /// catalog's scheme.
    pub fn resolve(&self, location: &str) -> String {
        if location.starts_with(&self.scheme) {
            location.to_string()
        } else {
            format!("{}{}", self.base_uri, location)
        }
    }
}

impl JsonMusic {
    /// Build a [`TrackRecord`].
    ///
    /// `image` must already be resolved; `artwork_ref` is the opaque reference
    /// consumers use in its place.
    pub fn into_track(self, source_uri: String, image: String, artwork_ref: String) -> TrackRecord {
        let duration_ms = self
            .duration
            .map(|seconds| seconds.saturating_mul(1000))
            .unwrap_or(UNKNOWN_DURATION_MS);

        TrackRecord {
            display_title: self.title.clone(),
            display_subtitle: self.artist.clone(),
            display_description: self.album.clone(),
            display_icon_uri: artwork_ref.clone(),
            id: self.id,
            title: self.title,
            artist: self.artist,
            album: self.album,
            genre: self.genre,
            duration_ms,
            source_uri,
            artwork_uri: artwork_ref,
            original_artwork_uri: image,
            track_number: self.track_number,
            total_track_count: self.total_track_count,
        }
    }
}
