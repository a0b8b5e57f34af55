//! Text rendering of the discovery state.

use std::fmt;

use crate::pipeline::DiscoveryState;

pub const HEADING: &str = "Nearby Charging Stations";

/// Borrowed view over a [`DiscoveryState`]; `Display` renders it.
///
/// Layout: heading, one banner per failed stage, map status, then one
/// `name — address` line per station in backend order.
#[derive(Debug)]
pub struct DiscoveryView<'a, M> {
    state: &'a DiscoveryState<M>,
}

impl<'a, M> DiscoveryView<'a, M> {
    #[must_use]
    pub fn new(state: &'a DiscoveryState<M>) -> Self {
        Self { state }
    }
}

impl<M> fmt::Display for DiscoveryView<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state;
        writeln!(f, "{HEADING}")?;

        for error in state.errors.iter() {
            writeln!(f, "! {error}")?;
        }

        match (&state.map, state.coordinate) {
            (Some(_), Some(at)) => writeln!(
                f,
                "Map: {} marker(s) around {at}",
                state.markers_placed
            )?,
            (None, Some(_)) if state.errors.map.is_none() => writeln!(f, "Map: loading")?,
            _ => {}
        }

        for station in &state.stations {
            writeln!(f, "- {} — {}", station.name, station.address)?;
        }
        Ok(())
    }
}
