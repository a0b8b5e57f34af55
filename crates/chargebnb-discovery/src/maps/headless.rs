//! Script loader over HTTP and a headless map surface that records what the
//! pipeline asked it to draw.

use std::sync::Arc;
use std::time::Duration;

use chargebnb_core::{AppConfig, Coordinate};
use parking_lot::Mutex;
use reqwest::{Client, Url};

use super::{MapLibrary, MapLoadError, MapScriptLoader, MapsApi};

/// Script URL for the mapping library with `key` appended to whatever query
/// the configured URL already carries.
///
/// # Errors
///
/// Returns [`MapLoadError::InvalidScriptUrl`] if `script_url` does not parse.
pub fn script_src(script_url: &str, api_key: &str) -> Result<Url, MapLoadError> {
    let mut url = Url::parse(script_url).map_err(|e| MapLoadError::InvalidScriptUrl {
        url: script_url.to_string(),
        reason: e.to_string(),
    })?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

/// Loads the library script with a GET request.
///
/// There is no script engine outside the browser, so a successful fetch
/// yields a [`HeadlessMaps`] surface.
#[derive(Debug, Clone)]
pub struct HttpScriptLoader {
    client: Client,
}

impl HttpScriptLoader {
    /// # Errors
    ///
    /// Returns [`MapLoadError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, MapLoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// # Errors
    ///
    /// See [`HttpScriptLoader::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self, MapLoadError> {
        Self::new(config.request_timeout_secs, &config.user_agent)
    }
}

impl MapLibrary<HttpScriptLoader> {
    /// Builds the process-wide library from the configured script URL and key.
    ///
    /// # Errors
    ///
    /// Returns [`MapLoadError::InvalidScriptUrl`] if the configured script URL
    /// does not parse, or [`MapLoadError::Http`] if the client cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, MapLoadError> {
        let src = script_src(&config.maps_script_url, &config.maps_api_key)?;
        Ok(Self::new(HttpScriptLoader::from_config(config)?, src.as_str()))
    }
}

impl MapScriptLoader for HttpScriptLoader {
    type Api = HeadlessMaps;

    async fn load(&self, script_url: &str) -> Result<HeadlessMaps, MapLoadError> {
        let url = Url::parse(script_url).map_err(|e| MapLoadError::InvalidScriptUrl {
            url: script_url.to_string(),
            reason: e.to_string(),
        })?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapLoadError::UnexpectedStatus {
                status: status.as_u16(),
                url: response.url().path().to_string(),
            });
        }
        let script = response.bytes().await?;
        tracing::info!(bytes = script.len(), "map library script loaded");

        Ok(HeadlessMaps::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub position: Coordinate,
    pub title: String,
}

/// Handle to one map created on a [`HeadlessMaps`] surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadlessMap {
    pub id: usize,
    pub center: Coordinate,
    pub zoom: u8,
}

#[derive(Debug, Default)]
struct Surfaces {
    maps: Vec<HeadlessMap>,
    markers: Vec<(usize, Marker)>,
}

/// In-memory map surface. Clones share the same recorded maps and markers.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMaps {
    surfaces: Arc<Mutex<Surfaces>>,
}

impl HeadlessMaps {
    #[must_use]
    pub fn map_count(&self) -> usize {
        self.surfaces.lock().maps.len()
    }

    /// Markers placed on `map`, in placement order.
    #[must_use]
    pub fn markers(&self, map: &HeadlessMap) -> Vec<Marker> {
        self.surfaces
            .lock()
            .markers
            .iter()
            .filter(|(id, _)| *id == map.id)
            .map(|(_, marker)| marker.clone())
            .collect()
    }
}

impl MapsApi for HeadlessMaps {
    type Map = HeadlessMap;

    fn create_map(&self, center: Coordinate, zoom: u8) -> HeadlessMap {
        let mut surfaces = self.surfaces.lock();
        let map = HeadlessMap {
            id: surfaces.maps.len(),
            center,
            zoom,
        };
        surfaces.maps.push(map);
        tracing::debug!(map = map.id, %center, zoom, "map created");
        map
    }

    fn add_marker(&self, map: &HeadlessMap, position: Coordinate, title: &str) {
        tracing::debug!(map = map.id, %position, title, "marker placed");
        self.surfaces.lock().markers.push((
            map.id,
            Marker {
                position,
                title: title.to_string(),
            },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_tracked_per_map() {
        let maps = HeadlessMaps::default();
        let first = maps.create_map(Coordinate::new(1.0, 2.0), 14);
        let second = maps.create_map(Coordinate::new(1.0, 2.0), 14);

        maps.add_marker(&first, Coordinate::new(1.0, 2.0), "Test Station");

        assert_eq!(maps.map_count(), 2);
        assert_eq!(maps.markers(&first).len(), 1);
        assert!(maps.markers(&second).is_empty());
    }

    #[test]
    fn script_src_appends_key_to_existing_query() {
        let url = script_src("https://maps.example/js?v=3", "abc123").unwrap();
        assert_eq!(url.as_str(), "https://maps.example/js?v=3&key=abc123");
    }

    #[test]
    fn script_src_with_empty_key_still_builds() {
        let url = script_src("https://maps.example/js", "").unwrap();
        assert_eq!(url.as_str(), "https://maps.example/js?key=");
    }

    #[test]
    fn script_src_encodes_key() {
        let url = script_src("https://maps.example/js", "a&b c").unwrap();
        assert_eq!(url.query(), Some("key=a%26b+c"));
    }

    #[tokio::test]
    async fn invalid_script_url_is_rejected() {
        let loader = HttpScriptLoader::new(5, "chargebnb-test").unwrap();
        let result = loader.load("::not a url::").await;
        assert!(matches!(result, Err(MapLoadError::InvalidScriptUrl { .. })));
    }
}
