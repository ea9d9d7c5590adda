//! # Music Sources
//!
//! A [`MusicSource`] owns the flat list of [`TrackRecord`]s and the
//! [`ReadinessGate`] that tells consumers when that list can be used.
//!
//! [`JsonSource`] is the production source: it fetches the remote JSON catalog,
//! resolves relative locations, routes artwork through the
//! [`AlbumArtContentProvider`] and publishes [`CatalogEvent`]s on the event bus.
//!
//! ## Load cycle
//!
//! ```text
//! new() ──> Initializing ──load()──┬──> Initialized (catalog replaced)
//!                                  └──> Error       (catalog cleared)
//! ```
//!
//! Failure never leaves stale data behind: a failed load clears the catalog.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use parking_lot::RwLock;
use std::sync::Arc;
use core_runtime::logging::redact_url;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::artwork::AlbumArtContentProvider;
use crate::catalog::{CatalogResolver, JsonCatalog};
use crate::error::{LibraryError, Result};
use crate::gate::{ReadinessGate, ReadyCallback, SourceState};
use crate::models::TrackRecord;

/// A catalog of tracks guarded by a readiness gate.
#[async_trait]
pub trait MusicSource: Send + Sync {
    /// Run one load cycle.
    async fn load(&self) -> Result<()>;

    fn gate(&self) -> &ReadinessGate;

    /// Snapshot of the current catalog, empty until loaded.
    fn tracks(&self) -> Arc<[TrackRecord]>;

    fn state(&self) -> SourceState {
        self.gate().state()
    }

    /// See [`ReadinessGate::when_ready`].
    fn when_ready(&self, callback: ReadyCallback) -> bool {
        self.gate().when_ready(callback)
    }

    async fn ready(&self) -> bool {
        self.gate().ready().await
    }

    fn find(&self, media_id: &str) -> Option<TrackRecord> {
        self.tracks().iter().find(|track| track.id == media_id).cloned()
    }
}

/// Music source backed by a remote JSON catalog.
pub struct JsonSource {
    catalog_url: Url,
    http_client: Arc<dyn HttpClient>,
    artwork: Arc<AlbumArtContentProvider>,
    event_bus: Option<EventBus>,
    catalog: RwLock<Arc<[TrackRecord]>>,
    gate: ReadinessGate,
}

impl JsonSource {
    pub fn new(
        catalog_url: Url,
        http_client: Arc<dyn HttpClient>,
        artwork: Arc<AlbumArtContentProvider>,
    ) -> Self {
        let gate = ReadinessGate::new();
        gate.set_state(SourceState::Initializing);

        Self {
            catalog_url,
            http_client,
            artwork,
            event_bus: None,
            catalog: RwLock::new(Arc::from(Vec::new())),
            gate,
        }
    }

    pub fn from_config(config: &CoreConfig, artwork: Arc<AlbumArtContentProvider>) -> Self {
        Self::new(
            config.catalog_url.clone(),
            Arc::clone(&config.http_client),
            artwork,
        )
    }

    /// Publish catalog events on `event_bus`.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn catalog_url(&self) -> &Url {
        &self.catalog_url
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            // No subscribers is fine.
            let _ = bus.emit(CoreEvent::Catalog(event));
        }
    }

    async fn fetch(&self) -> Result<Vec<TrackRecord>> {
        let request = HttpRequest::get(self.catalog_url.as_str())
            .header("Accept", "application/json");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| LibraryError::CatalogUnavailable(e.to_string()))?;

        if !response.is_success() {
            return Err(LibraryError::CatalogUnavailable(format!(
                "HTTP {}",
                response.status
            )));
        }

        let catalog = JsonCatalog::from_slice(&response.body)?;
        let resolver = CatalogResolver::new(&self.catalog_url);
        debug!(
            base_uri = %redact_url(resolver.base_uri()),
            entries = catalog.music.len(),
            "Parsed catalog"
        );

        Ok(catalog
            .music
            .into_iter()
            .map(|music| {
                let source_uri = resolver.resolve(&music.source);
                let image = resolver.resolve(&music.image);
                let artwork_ref = self.artwork.map_uri(&image);
                music.into_track(source_uri, image, artwork_ref)
            })
            .collect())
    }
}

#[async_trait]
impl MusicSource for JsonSource {
    #[instrument(skip(self), fields(url = %redact_url(self.catalog_url.as_str())))]
    async fn load(&self) -> Result<()> {
        self.gate.set_state(SourceState::Initializing);
        self.emit(CatalogEvent::Loading {
            url: self.catalog_url.to_string(),
        });

        match self.fetch().await {
            Ok(tracks) => {
                let track_count = tracks.len();
                *self.catalog.write() = Arc::from(tracks);
                info!(track_count, "Catalog loaded");

                self.gate.set_state(SourceState::Initialized);
                self.emit(CatalogEvent::Loaded { track_count });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Catalog load failed");
                *self.catalog.write() = Arc::from(Vec::new());

                self.gate.set_state(SourceState::Error);
                self.emit(CatalogEvent::Failed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    fn tracks(&self) -> Arc<[TrackRecord]> {
        Arc::clone(&self.catalog.read())
    }
}

impl std::fmt::Debug for JsonSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSource")
            .field("catalog_url", &self.catalog_url.as_str())
            .field("gate", &self.gate)
            .field("tracks", &self.catalog.read().len())
            .finish()
    }
}
