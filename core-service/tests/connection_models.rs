//! Service connection and the observer models built on it.

mod common;

use bridge_traits::player::PlayerStatus;
use common::{harness, wait_until, CatalogServer, WAKE_UP_ALBUM_KEY};
use core_library::models::Extras;
use core_playback::{PlaybackState, PlaybackStateSnapshot, NOTHING_PLAYING};
use core_service::models::{
    MainModel, MediaButtonGlyph, MediaItemData, MediaItemListModel, NavigationCommand,
    PlaybackGlyph,
};
use core_service::CoreError;

fn glyph_of(items: &[MediaItemData], media_id: &str) -> Option<PlaybackGlyph> {
    items
        .iter()
        .find(|item| item.media_id == media_id)
        .map(|item| item.glyph)
}

#[tokio::test]
async fn test_connection_mirrors_session_state() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(false);

    assert_eq!(connection.root_media_id(), Some("/"));
    assert!(*connection.is_connected().borrow());
    assert_eq!(connection.current_now_playing(), NOTHING_PLAYING);
    assert_eq!(
        connection.current_playback_state(),
        PlaybackStateSnapshot::EMPTY
    );

    h.core.start();
    connection
        .transport_controls()
        .play_from_media_id("wake_up_01", &Extras::new())
        .await
        .unwrap();
    h.player.transition(PlayerStatus::Ready, true);

    let mut state = connection.playback_state();
    wait_until(&mut state, |s| s.state == PlaybackState::Playing).await;
    let mut now_playing = connection.now_playing();
    wait_until(&mut now_playing, |n| n.id() == Some("wake_up_01")).await;
    assert!(connection.send_command("refresh", &Extras::new()));

    h.core.shutdown().await;
    let mut connected = connection.is_connected();
    wait_until(&mut connected, |connected| !*connected).await;
    assert_eq!(connection.root_media_id(), None);
    assert!(!connection.send_command("refresh", &Extras::new()));
    assert!(matches!(
        connection.transport_controls().play().await,
        Err(CoreError::NotConnected)
    ));
}

#[tokio::test]
async fn test_connection_reports_network_failure() {
    let h = harness(CatalogServer::failing()).await;
    let connection = h.core.connect(false);
    h.core.start();

    let mut root = connection.subscribe("/");
    assert_eq!(root.parent_id(), "/");
    assert!(root.next().await.is_none());

    let mut failure = connection.network_failure();
    wait_until(&mut failure, |failed| *failed).await;
}

#[tokio::test]
async fn test_subscription_delivers_children_once() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(false);
    h.core.start();

    let mut albums = connection.subscribe("__ALBUMS__");
    let children = albums.next().await.unwrap();
    assert_eq!(children.len(), 2);
    assert!(albums.next().await.is_none());
}

#[tokio::test]
async fn test_disconnect_stops_mirroring() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(true);
    assert_eq!(connection.root_media_id(), Some("__RECENT__"));

    connection.disconnect();
    assert!(!*connection.is_connected().borrow());
    assert_eq!(connection.root_media_id(), None);
}

#[tokio::test]
async fn test_media_item_list_model_tracks_playback_glyphs() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(false);
    h.core.start();

    let model = MediaItemListModel::new(WAKE_UP_ALBUM_KEY, &connection);
    assert_eq!(model.parent_id(), WAKE_UP_ALBUM_KEY);
    let mut items = model.items();
    wait_until(&mut items, |items| items.len() == 2).await;
    assert!(model
        .current_items()
        .iter()
        .all(|item| item.glyph == PlaybackGlyph::None && !item.browsable));
    assert!(!*model.network_failure().borrow());

    connection
        .transport_controls()
        .play_from_media_id("wake_up_01", &Extras::new())
        .await
        .unwrap();
    h.player.transition(PlayerStatus::Ready, true);
    wait_until(&mut items, |items| {
        glyph_of(items, "wake_up_01") == Some(PlaybackGlyph::Pause)
    })
    .await;
    assert_eq!(
        glyph_of(&model.current_items(), "wake_up_02"),
        Some(PlaybackGlyph::None)
    );

    h.player.transition(PlayerStatus::Ready, false);
    wait_until(&mut items, |items| {
        glyph_of(items, "wake_up_01") == Some(PlaybackGlyph::Play)
    })
    .await;
}

#[tokio::test]
async fn test_now_playing_model_formats_metadata_and_polls_position() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(false);
    h.core.start();
    let model = h.core.now_playing_model(connection.clone());

    connection
        .transport_controls()
        .play_from_media_id("wake_up_01", &Extras::new())
        .await
        .unwrap();
    h.player.transition(PlayerStatus::Ready, true);

    let mut metadata = model.metadata();
    wait_until(&mut metadata, |m| {
        m.as_ref().is_some_and(|m| m.id == "wake_up_01")
    })
    .await;
    let current = model.metadata().borrow().clone().unwrap();
    assert_eq!(current.title, "Intro - The Way Of Waking Up");
    assert_eq!(current.subtitle, "The Kyoto Connection");
    assert_eq!(current.duration, "1:30");

    let mut button = model.button();
    wait_until(&mut button, |glyph| *glyph == MediaButtonGlyph::Pause).await;

    h.player.set_position(3_000);
    let mut position = model.position();
    wait_until(&mut position, |position| *position == 3_000).await;
}

#[tokio::test]
async fn test_main_model_navigates_and_toggles() {
    let h = harness(CatalogServer::new()).await;
    let connection = h.core.connect(false);
    h.core.start();
    let (model, mut navigation) = MainModel::new(connection.clone());
    assert_eq!(model.root_media_id().as_deref(), Some("/"));

    let album = MediaItemData {
        media_id: WAKE_UP_ALBUM_KEY.to_string(),
        title: "Wake Up".to_string(),
        subtitle: "The Kyoto Connection".to_string(),
        album_art_uri: String::new(),
        browsable: true,
        glyph: PlaybackGlyph::None,
    };
    model.media_item_clicked(&album).await.unwrap();
    assert_eq!(
        navigation.recv().await,
        Some(NavigationCommand::BrowseTo(WAKE_UP_ALBUM_KEY.to_string()))
    );

    let track = MediaItemData {
        media_id: "wake_up_01".to_string(),
        browsable: false,
        ..album.clone()
    };
    model.media_item_clicked(&track).await.unwrap();
    assert_eq!(navigation.recv().await, Some(NavigationCommand::ShowNowPlaying));
    assert_eq!(h.player.item_ids(), ["wake_up_01", "wake_up_02"]);

    h.player.transition(PlayerStatus::Ready, true);
    let mut state = connection.playback_state();
    wait_until(&mut state, |s| s.state == PlaybackState::Playing).await;
    let mut now_playing = connection.now_playing();
    wait_until(&mut now_playing, |n| n.id() == Some("wake_up_01")).await;

    // A list tap on the playing item does not pause it.
    model.media_item_clicked(&track).await.unwrap();
    assert!(!h.player.commands().contains(&"pause"));
    assert_eq!(navigation.recv().await, Some(NavigationCommand::ShowNowPlaying));

    model.play_media_id("wake_up_01").await.unwrap();
    assert_eq!(h.player.commands().last(), Some(&"pause"));

    model.next_media().await.unwrap();
    assert_eq!(h.player.commands().last(), Some(&"seek_to_next"));
    model.prev_media().await.unwrap();
    assert_eq!(h.player.commands().last(), Some(&"seek_to_previous"));

    assert!(navigation.try_recv().is_err());
}
