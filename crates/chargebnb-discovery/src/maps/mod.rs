//! External mapping library: script loading and the map/marker calls it
//! exposes once loaded.

pub mod headless;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use chargebnb_core::Coordinate;
use thiserror::Error;
use tokio::sync::OnceCell;

pub use headless::{script_src, HeadlessMap, HeadlessMaps, HttpScriptLoader, Marker};

#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error("HTTP error loading map library: {0}")]
    Http(#[from] reqwest::Error),

    #[error("map library script returned HTTP {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid map library script URL \"{url}\": {reason}")]
    InvalidScriptUrl { url: String, reason: String },

    #[error("map library load task ended without a library: {0}")]
    LoadTask(String),
}

/// Calls exposed by a loaded mapping library. Both are fire-and-forget.
pub trait MapsApi {
    type Map: Clone + fmt::Debug;

    fn create_map(&self, center: Coordinate, zoom: u8) -> Self::Map;

    fn add_marker(&self, map: &Self::Map, position: Coordinate, title: &str);
}

/// Fetches the library script and hands back its API.
///
/// Loads run on their own task, so loaders and their futures must be `Send`.
pub trait MapScriptLoader: Send + Sync + 'static {
    type Api: MapsApi + Send + Sync + 'static;

    fn load(
        &self,
        script_url: &str,
    ) -> impl Future<Output = Result<Self::Api, MapLoadError>> + Send;
}

/// Load-once holder for the mapping library.
///
/// Create one per process and share it (behind an `Arc`) with every
/// pipeline. Concurrent callers of [`MapLibrary::get`] wait on the same load;
/// after a successful load every caller gets the cached API without another
/// fetch. A failed load leaves the cell empty so the next caller retries.
///
/// The fetch itself runs on a spawned task that owns the cell, so a caller
/// that stops waiting (a torn-down view) does not abort a load other callers
/// are queued behind.
pub struct MapLibrary<L: MapScriptLoader> {
    loader: Arc<L>,
    script_url: String,
    api: Arc<OnceCell<L::Api>>,
}

impl<L: MapScriptLoader> MapLibrary<L> {
    pub fn new(loader: L, script_url: impl Into<String>) -> Self {
        Self {
            loader: Arc::new(loader),
            script_url: script_url.into(),
            api: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the library API, loading the script on first use.
    ///
    /// # Errors
    ///
    /// Returns the loader's [`MapLoadError`] if the script could not be
    /// fetched.
    pub async fn get(&self) -> Result<&L::Api, MapLoadError> {
        if let Some(api) = self.api.get() {
            return Ok(api);
        }

        let loader = Arc::clone(&self.loader);
        let cell = Arc::clone(&self.api);
        let script_url = self.script_url.clone();
        let load = tokio::spawn(async move {
            cell.get_or_try_init(|| async {
                tracing::info!(script = %redact_key(&script_url), "loading map library");
                let api = loader.load(&script_url).await;
                if let Err(e) = &api {
                    tracing::warn!(error = %e, "map library load failed");
                }
                api
            })
            .await
            .map(|_| ())
        });

        load.await.map_err(|e| MapLoadError::LoadTask(e.to_string()))??;
        self.api
            .get()
            .ok_or_else(|| MapLoadError::LoadTask("library cell empty after load".to_string()))
    }

    /// The library API if it has already been loaded.
    pub fn loaded(&self) -> Option<&L::Api> {
        self.api.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.api.initialized()
    }
}

impl<L: MapScriptLoader> fmt::Debug for MapLibrary<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapLibrary")
            .field("script_url", &redact_key(&self.script_url))
            .field("loaded", &self.is_loaded())
            .finish_non_exhaustive()
    }
}

/// Strips the `key=` query value from a script URL for logging.
fn redact_key(script_url: &str) -> String {
    match script_url.split_once("key=") {
        Some((head, tail)) => {
            let rest = tail.find('&').map_or("", |i| &tail[i..]);
            format!("{head}key=[redacted]{rest}")
        }
        None => script_url.to_string(),
    }
}
