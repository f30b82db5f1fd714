//! Time-window ordering and timestamping of an itinerary.
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::TourConfig;
use crate::constants::START_TRAVEL_TABLE;
use crate::data::{Area, PointOfInterest, VisitWindow};
use crate::numbers::usize_to_u32;

/// One stop of a timestamped itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledStop {
    /// 1-based position in the scheduled order.
    pub order: u32,
    pub spot: PointOfInterest,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl ScheduledStop {
    #[must_use]
    pub fn start_label(&self) -> String {
        self.start_time.format("%H:%M").to_string()
    }

    #[must_use]
    pub fn end_label(&self) -> String {
        self.end_time.format("%H:%M").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schedule {
    pub stops: Vec<ScheduledStop>,
    /// Summary duration with a flat allowance per leg.
    pub total_minutes: u32,
}

impl Schedule {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    #[must_use]
    pub fn first_start(&self) -> Option<NaiveDateTime> {
        self.stops.first().map(|stop| stop.start_time)
    }

    #[must_use]
    pub fn last_end(&self) -> Option<NaiveDateTime> {
        self.stops.last().map(|stop| stop.end_time)
    }
}

/// Stable reorder: morning, afternoon, evening, then stops without a preferred window.
#[must_use]
pub fn reorder_by_window(stops: &[PointOfInterest]) -> Vec<PointOfInterest> {
    let mut ordered = stops.to_vec();
    ordered.sort_by_key(|spot| VisitWindow::rank(spot.best_visit_time));
    ordered
}

/// Minutes from a start-location tag to the first stop's area.
#[must_use]
pub fn start_travel_minutes(start_location: &str, area: Area, cfg: &TourConfig) -> u32 {
    START_TRAVEL_TABLE
        .iter()
        .find(|(tag, to, _)| *tag == start_location && *to == area.as_str())
        .map_or(cfg.default_start_travel_minutes, |(_, _, minutes)| *minutes)
}

/// Estimated minutes between two consecutive stops.
#[must_use]
pub const fn leg_minutes(from: Area, to: Area, cfg: &TourConfig) -> u32 {
    if matches!(
        (from, to),
        (Area::Enoshima, Area::Enoshima) | (Area::Kamakura, Area::Kamakura)
    ) {
        cfg.same_area_minutes
    } else {
        cfg.cross_area_minutes
    }
}

/// Sum of visit durations plus a flat allowance for every leg between stops.
#[must_use]
pub fn tour_duration_minutes(stops: &[PointOfInterest], cfg: &TourConfig) -> u32 {
    if stops.is_empty() {
        return 0;
    }
    let visiting = stops
        .iter()
        .fold(0_u32, |total, spot| total.saturating_add(spot.duration_minutes));
    let legs = usize_to_u32(stops.len() - 1);
    visiting.saturating_add(cfg.summary_leg_minutes.saturating_mul(legs))
}

/// Reorder by preferred window and timestamp every stop from `start`.
///
/// The clock first advances by the travel time from `start_location` to the first
/// stop; afterwards each stop occupies its duration and, when another stop follows,
/// the clock advances by the same-area or cross-area leg time.
#[must_use]
pub fn schedule_itinerary(
    stops: &[PointOfInterest],
    start: NaiveDateTime,
    start_location: &str,
    cfg: &TourConfig,
) -> Schedule {
    let ordered = reorder_by_window(stops);
    let Some(first) = ordered.first() else {
        return Schedule::default();
    };

    let mut clock = start
        + Duration::minutes(i64::from(start_travel_minutes(
            start_location,
            first.area,
            cfg,
        )));
    let mut scheduled = Vec::with_capacity(ordered.len());
    for (index, spot) in ordered.iter().enumerate() {
        let start_time = clock;
        clock += Duration::minutes(i64::from(spot.duration_minutes));
        let end_time = clock;
        if let Some(next) = ordered.get(index + 1) {
            clock += Duration::minutes(i64::from(leg_minutes(spot.area, next.area, cfg)));
        }
        scheduled.push(ScheduledStop {
            order: usize_to_u32(index + 1),
            spot: spot.clone(),
            start_time,
            end_time,
        });
    }

    log::debug!(
        "scheduled {} stops from {} via {start_location}",
        scheduled.len(),
        start.format("%H:%M")
    );
    Schedule {
        total_minutes: tour_duration_minutes(&ordered, cfg),
        stops: scheduled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Category, Difficulty};
    use crate::geo::Coordinate;
    use chrono::NaiveDate;

    fn spot(id: &str, area: Area, minutes: u32, window: Option<VisitWindow>) -> PointOfInterest {
        PointOfInterest {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            area,
            category: Category::Culture,
            tags: Vec::new(),
            duration_minutes: minutes,
            difficulty: Difficulty::Easy,
            coordinates: area.centre(),
            open_hours: String::new(),
            best_visit_time: window,
            entrance_fee: 0,
            tips: Vec::new(),
            rewards: Vec::new(),
        }
    }

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 3)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn reorder_is_stable_within_a_window() {
        let stops = vec![
            spot("late", Area::Kamakura, 30, None),
            spot("eve", Area::Kamakura, 30, Some(VisitWindow::Evening)),
            spot("am1", Area::Kamakura, 30, Some(VisitWindow::Morning)),
            spot("am2", Area::Kamakura, 30, Some(VisitWindow::Morning)),
        ];
        let ids: Vec<_> = reorder_by_window(&stops).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["am1", "am2", "eve", "late"]);
    }

    #[test]
    fn start_travel_uses_table_then_default() {
        let cfg = TourConfig::default();
        assert_eq!(start_travel_minutes("kamakura_station", Area::Kamakura, &cfg), 5);
        assert_eq!(start_travel_minutes("fujisawa_station", Area::Enoshima, &cfg), 15);
        assert_eq!(start_travel_minutes("hotel", Area::Enoshima, &cfg), 20);
    }

    #[test]
    fn cross_area_leg_costs_more() {
        let cfg = TourConfig::default();
        let stops = vec![
            spot("a", Area::Enoshima, 60, None),
            spot("b", Area::Kamakura, 45, None),
        ];
        let schedule = schedule_itinerary(&stops, nine_am(), "enoshima_station", &cfg);
        let second = &schedule.stops[1];
        assert_eq!(schedule.stops[0].start_label(), "09:10");
        assert_eq!(second.start_time, nine_am() + Duration::minutes(10 + 60 + 30));
        assert_eq!(second.end_label(), "11:25");
        assert_eq!(schedule.total_minutes, 60 + 45 + 30);
    }

    #[test]
    fn late_start_rolls_past_midnight_monotonically() {
        let cfg = TourConfig::default();
        let late = NaiveDate::from_ymd_opt(2026, 5, 3)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let stops = vec![
            spot("a", Area::Kamakura, 50, None),
            spot("b", Area::Kamakura, 50, None),
        ];
        let schedule = schedule_itinerary(&stops, late, "kamakura_station", &cfg);
        assert!(schedule.stops[1].start_time > schedule.stops[0].end_time);
        assert_eq!(schedule.stops[1].start_label(), "00:10");
    }

    #[test]
    fn empty_itinerary_schedules_nothing() {
        let cfg = TourConfig::default();
        let schedule = schedule_itinerary(&[], nine_am(), "kamakura_station", &cfg);
        assert!(schedule.is_empty());
        assert_eq!(schedule.total_minutes, 0);
        assert_eq!(tour_duration_minutes(&[], &cfg), 0);
    }

    #[test]
    fn duration_saturates_for_huge_visits() {
        let cfg = TourConfig::default();
        let stops = vec![
            spot("long-a", Area::Kamakura, u32::MAX, None),
            spot("long-b", Area::Kamakura, u32::MAX, None),
        ];
        assert_eq!(tour_duration_minutes(&stops, &cfg), u32::MAX);
    }
}
