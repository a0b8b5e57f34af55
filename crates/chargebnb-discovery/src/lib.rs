//! Nearby-station discovery: locate the device, query the backend, load the
//! map library, and place a marker per station.

pub mod client;
pub mod error;
pub mod location;
pub mod maps;
pub mod pipeline;
pub mod scope;
pub mod stage;
pub mod view;

pub use client::{HealthStatus, StationSource, StationsClient};
pub use error::DiscoveryError;
pub use location::{FixedLocation, LocationError, LocationProvider, NoLocation};
pub use maps::{MapLibrary, MapLoadError, MapScriptLoader, MapsApi};
pub use pipeline::{DiscoveryPipeline, DiscoveryState};
pub use scope::{ViewScope, ViewToken};
pub use stage::{Stage, StageError, StageErrors};
pub use view::DiscoveryView;
