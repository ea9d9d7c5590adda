//! # Browse Tree
//!
//! Indexes the flat catalog into a mapping from a parent key to its ordered
//! children:
//!
//! ```text
//! /                      -> [Recommended, Albums]
//! __RECOMMENDED__        -> first track of every album, catalog order
//! __ALBUMS__             -> one browsable entry per album, first-seen order
//! {urlencoded album}     -> that album's tracks, catalog order
//! __RECENT__             -> the most recently played track, if in the catalog
//! ```
//!
//! The tree is built once from a catalog snapshot. A catalog change requires a
//! full rebuild.

use std::collections::HashMap;
use tracing::debug;

use crate::models::{MediaEntry, TrackRecord};

/// Key of the browsable root.
pub const BROWSABLE_ROOT: &str = "/";
pub const RECOMMENDED_ROOT: &str = "__RECOMMENDED__";
pub const ALBUMS_ROOT: &str = "__ALBUMS__";
/// Root handed out when the caller asks for recently played items.
pub const RECENT_ROOT: &str = "__RECENT__";

/// Prefix for bundled drawable resources used as root artwork.
pub const RESOURCE_ROOT_URI: &str = "android.resource://com.example.android.uamp.next/drawable/";

#[derive(Debug, Clone, Default)]
pub struct BrowseTree {
    children: HashMap<String, Vec<MediaEntry>>,
}

impl BrowseTree {
    /// Build the tree from `tracks`, seeding the Recent node with
    /// `recent_media_id` when that id is in the catalog.
    pub fn build(tracks: &[TrackRecord], recent_media_id: Option<&str>) -> Self {
        let mut children: HashMap<String, Vec<MediaEntry>> = HashMap::new();

        children.insert(
            BROWSABLE_ROOT.to_string(),
            vec![
                MediaEntry::browsable(
                    RECOMMENDED_ROOT,
                    "Recommended",
                    format!("{RESOURCE_ROOT_URI}ic_recommended"),
                ),
                MediaEntry::browsable(
                    ALBUMS_ROOT,
                    "Albums",
                    format!("{RESOURCE_ROOT_URI}ic_album"),
                ),
            ],
        );
        children.insert(RECOMMENDED_ROOT.to_string(), Vec::new());
        children.insert(ALBUMS_ROOT.to_string(), Vec::new());

        for track in tracks {
            let album_key = album_key(&track.album);

            if !children.contains_key(&album_key) {
                let mut album = MediaEntry::browsable(
                    album_key.clone(),
                    track.album.clone(),
                    track.artwork_uri.clone(),
                );
                album.subtitle = track.artist.clone();

                children
                    .entry(ALBUMS_ROOT.to_string())
                    .or_default()
                    .push(album);
                children.insert(album_key.clone(), Vec::new());
            }

            let entry = MediaEntry::from(track);
            if track.is_album_opener() {
                children
                    .entry(RECOMMENDED_ROOT.to_string())
                    .or_default()
                    .push(entry.clone());
            }
            if recent_media_id == Some(track.id.as_str()) {
                children.insert(RECENT_ROOT.to_string(), vec![entry.clone()]);
            }
            children.entry(album_key).or_default().push(entry);
        }

        debug!(
            tracks = tracks.len(),
            albums = children.get(ALBUMS_ROOT).map_or(0, Vec::len),
            "Built browse tree"
        );
        Self { children }
    }

    /// Children of `key`, or `None` if the key is unknown.
    pub fn get(&self, key: &str) -> Option<&[MediaEntry]> {
        self.children.get(key).map(Vec::as_slice)
    }

    /// Number of keys in the tree.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// URL-safe key for an album name.
pub fn album_key(album: &str) -> String {
    urlencoding::encode(album).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str, album: &str, track_number: i64) -> TrackRecord {
        TrackRecord {
            id: id.to_string(),
            title: format!("Title {id}"),
            artist: format!("Artist of {album}"),
            album: album.to_string(),
            genre: "Rock".to_string(),
            duration_ms: 180_000,
            source_uri: format!("https://example.com/{id}.mp3"),
            artwork_uri: format!("content://auth/{album}:art.jpg"),
            original_artwork_uri: format!("https://example.com/{album}/art.jpg"),
            track_number,
            total_track_count: 2,
            display_title: format!("Title {id}"),
            display_subtitle: format!("Artist of {album}"),
            display_description: album.to_string(),
            display_icon_uri: format!("content://auth/{album}:art.jpg"),
        }
    }

    fn ids(entries: Option<&[MediaEntry]>) -> Vec<&str> {
        entries
            .unwrap_or_default()
            .iter()
            .map(|entry| entry.media_id.as_str())
            .collect()
    }

    #[test]
    fn test_small_catalog_layout() {
        let tracks = vec![track("a1", "Al", 1), track("a2", "Al", 2), track("b1", "Bl", 1)];
        let tree = BrowseTree::build(&tracks, None);

        assert_eq!(ids(tree.get(ALBUMS_ROOT)), vec!["Al", "Bl"]);
        assert_eq!(ids(tree.get(RECOMMENDED_ROOT)), vec!["a1", "b1"]);
        assert_eq!(ids(tree.get("Al")), vec!["a1", "a2"]);
        assert_eq!(ids(tree.get("Bl")), vec!["b1"]);
        assert!(tree.get(RECENT_ROOT).is_none());
        assert!(tree.get("nope").is_none());
    }

    #[test]
    fn test_root_entries() {
        let tree = BrowseTree::build(&[], None);
        let root = tree.get(BROWSABLE_ROOT).unwrap();

        assert_eq!(root.len(), 2);
        assert_eq!(root[0].media_id, RECOMMENDED_ROOT);
        assert_eq!(root[0].title, "Recommended");
        assert_eq!(
            root[0].icon_uri,
            "android.resource://com.example.android.uamp.next/drawable/ic_recommended"
        );
        assert_eq!(root[1].media_id, ALBUMS_ROOT);
        assert_eq!(root[1].title, "Albums");
        assert!(root.iter().all(MediaEntry::is_browsable));

        assert_eq!(tree.get(ALBUMS_ROOT).map(<[_]>::len), Some(0));
    }

    #[test]
    fn test_album_entry_copies_first_track() {
        let tracks = vec![track("x2", "Wake Up", 2), track("x1", "Wake Up", 1)];
        let tree = BrowseTree::build(&tracks, None);

        let albums = tree.get(ALBUMS_ROOT).unwrap();
        assert_eq!(albums.len(), 1);
        let album = &albums[0];
        assert_eq!(album.media_id, "Wake%20Up");
        assert_eq!(album.title, "Wake Up");
        assert_eq!(album.subtitle, "Artist of Wake Up");
        assert_eq!(album.icon_uri, "content://auth/Wake Up:art.jpg");
        assert!(album.is_browsable());

        // Album children keep catalog order, not track order.
        assert_eq!(ids(tree.get("Wake%20Up")), vec!["x2", "x1"]);
    }

    #[test]
    fn test_album_counts_match_catalog() {
        let mut tracks = Vec::new();
        for album in ["A", "B", "C"] {
            for n in 1..=4 {
                tracks.push(track(&format!("{album}{n}"), album, n));
            }
        }
        let tree = BrowseTree::build(&tracks, None);

        assert_eq!(tree.get(ALBUMS_ROOT).unwrap().len(), 3);
        for album in ["A", "B", "C"] {
            assert_eq!(tree.get(album).unwrap().len(), 4);
        }
        assert_eq!(tree.get(RECOMMENDED_ROOT).unwrap().len(), 3);
    }

    #[test]
    fn test_recent_seeded_only_when_present() {
        let tracks = vec![track("a1", "Al", 1), track("a2", "Al", 2)];

        let tree = BrowseTree::build(&tracks, Some("a2"));
        assert_eq!(ids(tree.get(RECENT_ROOT)), vec!["a2"]);
        assert!(tree.get(RECENT_ROOT).unwrap()[0].is_playable());

        let tree = BrowseTree::build(&tracks, Some("gone"));
        assert!(tree.get(RECENT_ROOT).is_none());
    }

    #[test]
    fn test_album_key_is_url_safe() {
        assert_eq!(album_key("Al"), "Al");
        assert_eq!(album_key("Drop & Roll"), "Drop%20%26%20Roll");
    }
}
