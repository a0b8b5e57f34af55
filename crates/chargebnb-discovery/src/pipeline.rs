//! Discovery pipeline orchestration.
//!
//! 1. Locate: ask the device for a position, once per pipeline.
//! 2. Query: look up stations near that position.
//! 3. Load-map: load the mapping library (cached per process) and create a
//!    map centered on the position. Runs concurrently with Query; whichever
//!    finishes first is recorded first.
//! 4. Render-markers: once a map and a non-empty station set both exist,
//!    place one marker per station.
//!
//! Each stage records its own failure in [`StageErrors`] and never aborts the
//! others, except that Locate failing leaves nothing for the later stages to
//! work with.

use std::sync::Arc;

use chargebnb_core::{Coordinate, Station};

use crate::client::StationSource;
use crate::error::DiscoveryError;
use crate::location::{LocationError, LocationProvider};
use crate::maps::{MapLibrary, MapLoadError, MapScriptLoader, MapsApi};
use crate::scope::ViewToken;
use crate::stage::{Stage, StageError, StageErrors};
use crate::view::DiscoveryView;

type MapOf<L> = <<L as MapScriptLoader>::Api as MapsApi>::Map;

/// Everything the discovery view renders.
#[derive(Debug, Clone)]
pub struct DiscoveryState<M> {
    pub coordinate: Option<Coordinate>,
    pub stations: Vec<Station>,
    pub map: Option<M>,
    pub markers_placed: usize,
    pub errors: StageErrors,
}

impl<M> Default for DiscoveryState<M> {
    fn default() -> Self {
        Self {
            coordinate: None,
            stations: Vec::new(),
            map: None,
            markers_placed: 0,
            errors: StageErrors::default(),
        }
    }
}

impl<M> DiscoveryState<M> {
    fn apply_query(&mut self, token: &ViewToken, outcome: Result<Vec<Station>, DiscoveryError>) {
        match outcome {
            Ok(stations) => {
                tracing::info!(
                    view = %token.view_id(),
                    count = stations.len(),
                    "stations loaded"
                );
                self.stations = stations;
                self.errors.clear(Stage::Query);
            }
            Err(e) => {
                tracing::warn!(
                    view = %token.view_id(),
                    error = %e,
                    "nearby station query failed"
                );
                self.errors.record(StageError::QueryFailed);
            }
        }
    }

    fn apply_map(&mut self, token: &ViewToken, outcome: Result<M, MapLoadError>) {
        match outcome {
            Ok(map) => {
                self.map = Some(map);
                self.errors.clear(Stage::LoadMap);
            }
            Err(e) => {
                tracing::warn!(view = %token.view_id(), error = %e, "map unavailable");
                self.errors.record(StageError::MapUnavailable);
            }
        }
    }
}

async fn build_map<L: MapScriptLoader>(
    maps: &MapLibrary<L>,
    center: Coordinate,
    zoom: u8,
) -> Result<MapOf<L>, MapLoadError> {
    let api = maps.get().await?;
    Ok(api.create_map(center, zoom))
}

pub struct DiscoveryPipeline<P, S, L: MapScriptLoader> {
    location: P,
    stations: S,
    maps: Arc<MapLibrary<L>>,
    zoom: u8,
    location_requested: bool,
    state: DiscoveryState<MapOf<L>>,
}

impl<P, S, L> DiscoveryPipeline<P, S, L>
where
    P: LocationProvider,
    S: StationSource,
    L: MapScriptLoader,
{
    pub fn new(location: P, stations: S, maps: Arc<MapLibrary<L>>, zoom: u8) -> Self {
        Self {
            location,
            stations,
            maps,
            zoom,
            location_requested: false,
            state: DiscoveryState::default(),
        }
    }

    pub fn state(&self) -> &DiscoveryState<MapOf<L>> {
        &self.state
    }

    pub fn view(&self) -> DiscoveryView<'_, MapOf<L>> {
        DiscoveryView::new(&self.state)
    }

    /// Drives the pipeline as far as it can go.
    ///
    /// The first call requests the device location. Later calls reuse the
    /// captured coordinate and re-run Query, map construction and marker
    /// placement; the library itself is not fetched again once loaded.
    /// Results that arrive after `token` is cancelled are dropped.
    pub async fn run(&mut self, token: &ViewToken) -> &DiscoveryState<MapOf<L>> {
        let Some(at) = self.locate(token).await else {
            return &self.state;
        };

        {
            let query = token.guard(Stage::Query, self.stations.nearby_stations(at));
            let map = token.guard(Stage::LoadMap, build_map(&self.maps, at, self.zoom));
            tokio::pin!(query, map);

            // Outcomes are applied as they arrive so `errors.current()` reflects
            // completion order.
            let (mut query_done, mut map_done) = (false, false);
            while !(query_done && map_done) {
                tokio::select! {
                    outcome = &mut query, if !query_done => {
                        query_done = true;
                        if let Some(outcome) = outcome {
                            self.state.apply_query(token, outcome);
                        }
                    }
                    outcome = &mut map, if !map_done => {
                        map_done = true;
                        if let Some(outcome) = outcome {
                            self.state.apply_map(token, outcome);
                        }
                    }
                }
            }
        }

        if token.is_cancelled() {
            return &self.state;
        }

        self.render_markers(token);
        &self.state
    }

    async fn locate(&mut self, token: &ViewToken) -> Option<Coordinate> {
        if let Some(at) = self.state.coordinate {
            return Some(at);
        }
        if self.location_requested {
            return None;
        }
        self.location_requested = true;

        let outcome = token
            .guard(Stage::Locate, self.location.current_position())
            .await?;
        match outcome {
            Ok(at) => {
                tracing::info!(view = %token.view_id(), %at, "location captured");
                self.state.coordinate = Some(at);
                Some(at)
            }
            Err(LocationError::Unsupported) => {
                tracing::warn!(view = %token.view_id(), "location capability unsupported");
                self.state.errors.record(StageError::LocationUnsupported);
                None
            }
            Err(LocationError::Denied(reason)) => {
                tracing::warn!(view = %token.view_id(), %reason, "location request denied");
                self.state.errors.record(StageError::LocationDenied);
                None
            }
        }
    }

    /// Rebuilds all markers from scratch; no diffing against earlier runs.
    fn render_markers(&mut self, token: &ViewToken) {
        self.state.markers_placed = 0;
        let (Some(map), Some(api)) = (&self.state.map, self.maps.loaded()) else {
            return;
        };
        if self.state.stations.is_empty() {
            return;
        }

        for station in &self.state.stations {
            api.add_marker(map, station.position(), &station.name);
        }
        self.state.markers_placed = self.state.stations.len();
        tracing::debug!(
            view = %token.view_id(),
            stage = %Stage::RenderMarkers,
            markers = self.state.markers_placed,
            "markers placed"
        );
    }
}
