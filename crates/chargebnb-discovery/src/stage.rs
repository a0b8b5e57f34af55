//! Pipeline stages and the per-stage error record.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Locate,
    Query,
    LoadMap,
    RenderMarkers,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Locate => write!(f, "locate"),
            Stage::Query => write!(f, "query"),
            Stage::LoadMap => write!(f, "load_map"),
            Stage::RenderMarkers => write!(f, "render_markers"),
        }
    }
}

/// User-visible failure of a single stage.
///
/// `Display` yields the banner text shown in the discovery view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageError {
    LocationDenied,
    LocationUnsupported,
    QueryFailed,
    MapUnavailable,
}

impl StageError {
    #[must_use]
    pub fn stage(self) -> Stage {
        match self {
            StageError::LocationDenied | StageError::LocationUnsupported => Stage::Locate,
            StageError::QueryFailed => Stage::Query,
            StageError::MapUnavailable => Stage::LoadMap,
        }
    }

    /// Stable machine-readable tag.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            StageError::LocationDenied => "location_denied",
            StageError::LocationUnsupported => "location_unsupported",
            StageError::QueryFailed => "query_failed",
            StageError::MapUnavailable => "map_unavailable",
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageError::LocationDenied => "Unable to get your location.",
            StageError::LocationUnsupported => "Geolocation is not supported by your browser.",
            StageError::QueryFailed => "Failed to fetch stations.",
            StageError::MapUnavailable => "Map library failed to load.",
        })
    }
}

/// One optional error per stage, plus the most recently written one.
///
/// A stage only ever writes or clears its own slot, so a query failure never
/// hides a location failure and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageErrors {
    pub location: Option<StageError>,
    pub query: Option<StageError>,
    pub map: Option<StageError>,
    latest: Option<StageError>,
}

impl StageErrors {
    pub(crate) fn record(&mut self, error: StageError) {
        *self.slot_mut(error.stage()) = Some(error);
        self.latest = Some(error);
    }

    pub(crate) fn clear(&mut self, stage: Stage) {
        let slot = self.slot_mut(stage);
        if let Some(cleared) = slot.take() {
            if self.latest == Some(cleared) {
                self.latest = self.iter().last();
            }
        }
    }

    fn slot_mut(&mut self, stage: Stage) -> &mut Option<StageError> {
        match stage {
            Stage::Locate => &mut self.location,
            Stage::Query => &mut self.query,
            // Marker placement has no failure path; it shares the map slot.
            Stage::LoadMap | Stage::RenderMarkers => &mut self.map,
        }
    }

    /// Active errors in stage order.
    pub fn iter(&self) -> impl Iterator<Item = StageError> + '_ {
        [self.location, self.query, self.map].into_iter().flatten()
    }

    /// The last error recorded, regardless of stage.
    ///
    /// When the stage holding it is cleared, this falls back to the
    /// latest-stage error still active.
    #[must_use]
    pub fn current(&self) -> Option<StageError> {
        self.latest
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_from_different_stages_coexist() {
        let mut errors = StageErrors::default();
        errors.record(StageError::LocationDenied);
        errors.record(StageError::QueryFailed);

        assert_eq!(
            errors.iter().collect::<Vec<_>>(),
            vec![StageError::LocationDenied, StageError::QueryFailed]
        );
        assert_eq!(errors.current(), Some(StageError::QueryFailed));
    }

    #[test]
    fn clearing_a_stage_leaves_other_stages_alone() {
        let mut errors = StageErrors::default();
        errors.record(StageError::LocationUnsupported);
        errors.record(StageError::QueryFailed);
        errors.clear(Stage::Query);

        assert_eq!(errors.location, Some(StageError::LocationUnsupported));
        assert_eq!(errors.query, None);
        assert_eq!(errors.current(), Some(StageError::LocationUnsupported));
    }

    #[test]
    fn tags_match_wire_names() {
        assert_eq!(StageError::LocationDenied.tag(), "location_denied");
        assert_eq!(
            serde_json::to_value(StageError::QueryFailed).unwrap(),
            serde_json::json!("query_failed")
        );
    }
}
