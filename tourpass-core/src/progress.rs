//! Geofenced check-ins and per-itinerary completion state.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::TourConfig;
use crate::constants::MILESTONE_TIERS;
use crate::data::PointOfInterest;
use crate::error::TourError;
use crate::geo::{Coordinate, distance_m};
use crate::numbers::{percentage, round_f64_to_u32, usize_to_u32};

/// Live position reported by the visitor's device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionReading {
    pub coordinates: Coordinate,
    /// Reported accuracy in meters. Recorded, never used to gate acceptance.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of reconciling a reading against the planned stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckInResult {
    Arrived {
        spot_id: String,
        spot_name: String,
        distance_m: u32,
    },
    OutOfRange {
        nearest_spot_id: String,
        nearest_spot_name: String,
        distance_m: u32,
    },
}

impl CheckInResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Arrived { .. })
    }

    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Arrived { spot_name, .. } => format!("Checked in at {spot_name}!"),
            Self::OutOfRange {
                nearest_spot_name,
                distance_m,
                ..
            } => format!("Not close enough yet: {nearest_spot_name} is {distance_m} m away"),
        }
    }
}

/// Scan stops in itinerary order; the first stop within the radius wins even when a
/// later stop is nearer. Without a match, report the nearest stop.
///
/// # Errors
///
/// Returns [`TourError::Input`] for an empty stop list or invalid coordinates.
pub fn locate_check_in(
    reading: &PositionReading,
    stops: &[PointOfInterest],
    cfg: &TourConfig,
) -> Result<CheckInResult, TourError> {
    if stops.is_empty() {
        return Err(TourError::input("itinerary has no stops to check in at"));
    }
    if !reading.coordinates.is_valid() {
        return Err(TourError::input("position reading has invalid coordinates"));
    }

    let mut nearest: Option<(&PointOfInterest, f64)> = None;
    for spot in stops {
        let distance = distance_m(reading.coordinates, spot.coordinates);
        if distance <= cfg.check_in_radius_m {
            return Ok(CheckInResult::Arrived {
                spot_id: spot.id.clone(),
                spot_name: spot.name.clone(),
                distance_m: round_f64_to_u32(distance),
            });
        }
        if nearest.is_none_or(|(_, best)| distance < best) {
            nearest = Some((spot, distance));
        }
    }

    let Some((spot, distance)) = nearest else {
        return Err(TourError::input("itinerary has no stops to check in at"));
    };
    Ok(CheckInResult::OutOfRange {
        nearest_spot_id: spot.id.clone(),
        nearest_spot_name: spot.name.clone(),
        distance_m: round_f64_to_u32(distance),
    })
}

/// Progress through one accepted itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CompletionState {
    /// Unique spot ids in first-visit order.
    pub visited_spots: Vec<String>,
    pub total_spots: u32,
    pub points: u32,
    #[serde(default)]
    pub milestones_reached: SmallVec<[u8; 4]>,
    /// Spot ids of the accepted itinerary.
    #[serde(default)]
    pub itinerary: Vec<String>,
}

impl CompletionState {
    #[must_use]
    pub fn new(total_spots: u32) -> Self {
        Self {
            visited_spots: Vec::new(),
            total_spots,
            points: 0,
            milestones_reached: SmallVec::new(),
            itinerary: Vec::new(),
        }
    }

    /// Fresh state tracking the given stops.
    #[must_use]
    pub fn for_itinerary(stops: &[PointOfInterest]) -> Self {
        Self {
            itinerary: stops.iter().map(|spot| spot.id.clone()).collect(),
            ..Self::new(usize_to_u32(stops.len()))
        }
    }

    /// True when `stops` is the itinerary this state was started for. States saved
    /// without stop ids only compare the stop count.
    #[must_use]
    pub fn tracks(&self, stops: &[PointOfInterest]) -> bool {
        usize_to_u32(stops.len()) == self.total_spots
            && (self.itinerary.is_empty()
                || stops.iter().all(|spot| self.itinerary.contains(&spot.id)))
    }

    #[must_use]
    pub fn completion_percentage(&self) -> f64 {
        percentage(self.visited_spots.len(), self.total_spots)
    }

    #[must_use]
    pub fn has_visited(&self, spot_id: &str) -> bool {
        self.visited_spots.iter().any(|id| id == spot_id)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_spots > 0 && self.completion_percentage() >= 100.0
    }

    /// Record a visit. Returns `false` when the spot was already visited.
    pub fn apply_check_in(&mut self, spot_id: &str, points_per_visit: u32) -> bool {
        if self.has_visited(spot_id) {
            return false;
        }
        self.visited_spots.push(spot_id.to_string());
        self.points = self.points.saturating_add(points_per_visit);
        true
    }

    /// Start over for a freshly accepted itinerary.
    pub fn reset(&mut self, stops: &[PointOfInterest]) {
        *self = Self::for_itinerary(stops);
    }

    pub(crate) fn record_milestone(&mut self, tier: u8) {
        if !self.milestones_reached.contains(&tier) {
            self.milestones_reached.push(tier);
        }
    }
}

/// First planned stop not yet visited.
#[must_use]
pub fn next_unvisited<'a>(
    stops: &'a [PointOfInterest],
    state: &CompletionState,
) -> Option<&'a PointOfInterest> {
    stops.iter().find(|spot| !state.has_visited(&spot.id))
}

/// Highest milestone tier reached for a completion ratio.
#[must_use]
pub fn milestone_label(ratio: f64) -> Option<String> {
    MILESTONE_TIERS
        .iter()
        .rev()
        .find(|(tier, _)| ratio >= f64::from(*tier))
        .map(|(tier, _)| match tier {
            100 => "Tour complete".to_string(),
            tier => format!("{tier}% milestone"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Area, Category, Difficulty};
    use chrono::TimeZone;

    fn spot(id: &str, lat: f64, lng: f64) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            name: format!("Spot {id}"),
            description: String::new(),
            area: Area::Kamakura,
            category: Category::Temple,
            tags: Vec::new(),
            duration_minutes: 30,
            difficulty: Difficulty::Easy,
            coordinates: Coordinate::new(lat, lng),
            open_hours: String::new(),
            best_visit_time: None,
            entrance_fee: 0,
            tips: Vec::new(),
            rewards: Vec::new(),
        }
    }

    fn reading(lat: f64, lng: f64) -> PositionReading {
        PositionReading {
            coordinates: Coordinate::new(lat, lng),
            accuracy_m: Some(12.0),
            timestamp: Utc.with_ymd_and_hms(2026, 5, 3, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn arrives_within_radius() {
        let stops = vec![spot("a", 35.3167, 139.5358)];
        let result = locate_check_in(&reading(35.3170, 139.5358), &stops, &TourConfig::default())
            .unwrap();
        assert!(result.is_success());
        assert!(result.message().contains("Spot a"));
    }

    #[test]
    fn out_of_range_reports_nearest_rounded() {
        let stops = vec![spot("far", 35.40, 139.60), spot("near", 35.3167, 139.5358)];
        let result = locate_check_in(&reading(35.3187, 139.5358), &stops, &TourConfig::default())
            .unwrap();
        match result {
            CheckInResult::OutOfRange {
                nearest_spot_id,
                distance_m,
                ..
            } => {
                assert_eq!(nearest_spot_id, "near");
                assert!((220..=225).contains(&distance_m), "got {distance_m}");
            }
            CheckInResult::Arrived { .. } => panic!("expected out of range"),
        }
    }

    #[test]
    fn empty_stops_is_input_error() {
        let err = locate_check_in(&reading(35.0, 139.0), &[], &TourConfig::default()).unwrap_err();
        assert!(matches!(err, TourError::Input(_)));
    }

    #[test]
    fn apply_check_in_is_idempotent() {
        let mut state = CompletionState::new(4);
        assert!(state.apply_check_in("a", 100));
        assert!(!state.apply_check_in("a", 100));
        assert_eq!(state.points, 100);
        assert!((state.completion_percentage() - 25.0).abs() < f64::EPSILON);
        assert!(state.apply_check_in("b", 100));
        assert_eq!(state.visited_spots, vec!["a", "b"]);
    }

    #[test]
    fn next_unvisited_follows_plan_order() {
        let stops = vec![spot("a", 0.0, 0.0), spot("b", 0.0, 0.0), spot("c", 0.0, 0.0)];
        let mut state = CompletionState::new(3);
        state.apply_check_in("a", 100);
        state.apply_check_in("c", 100);
        assert_eq!(next_unvisited(&stops, &state).map(|s| s.id.as_str()), Some("b"));
        state.apply_check_in("b", 100);
        assert!(next_unvisited(&stops, &state).is_none());
        assert!(state.is_complete());
    }

    #[test]
    fn tracks_only_the_accepted_stops() {
        let accepted = vec![spot("a", 0.0, 0.0), spot("b", 0.0, 0.0)];
        let mut state = CompletionState::for_itinerary(&accepted);
        assert_eq!(state.total_spots, 2);
        assert!(state.tracks(&[spot("b", 0.0, 0.0), spot("a", 0.0, 0.0)]));
        assert!(!state.tracks(&[spot("a", 0.0, 0.0)]));
        assert!(!state.tracks(&[spot("x", 0.0, 0.0), spot("y", 0.0, 0.0)]));

        state.reset(&[spot("z", 0.0, 0.0)]);
        assert_eq!(state.itinerary, vec!["z"]);
        assert!(state.tracks(&[spot("z", 0.0, 0.0)]));
    }

    #[test]
    fn milestone_labels() {
        assert_eq!(milestone_label(10.0), None);
        assert_eq!(milestone_label(66.7).as_deref(), Some("50% milestone"));
        assert_eq!(milestone_label(100.0).as_deref(), Some("Tour complete"));
    }
}
