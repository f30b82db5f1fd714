use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, TimeZone, Utc};
use tourpass_core::{
    Area, AreaPreference, Catalog, Clock, Coordinate, DirectionsProvider, FixedClock, MemoryStore,
    PointOfInterest, PreferenceProfile, ProviderError, RecommendedMethod, RouteLeg, RouteStep,
    TourConfig, TourEngine, TravelMode, TravelStyle, distance_m, tour_duration_minutes,
};

fn fixture_catalog() -> Catalog {
    Catalog::from_json(include_str!("../../assets/data/catalog.json")).unwrap()
}

fn engine() -> TourEngine<MemoryStore, FixedClock> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 3, 7, 45, 0).unwrap());
    TourEngine::new(MemoryStore::new(), clock)
}

fn nine() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn stops(catalog: &Catalog, ids: &[&str]) -> Vec<PointOfInterest> {
    ids.iter()
        .map(|id| catalog.find_by_id(id).unwrap().clone())
        .collect()
}

#[test]
fn second_same_area_stop_starts_after_fifteen_minute_leg() {
    let catalog = fixture_catalog();
    let mut pair = stops(&catalog, &["hasedera-temple", "tsurugaoka-hachimangu"]);
    for spot in &mut pair {
        spot.duration_minutes = 60;
    }
    let engine = engine();

    let from_station = engine.schedule_itinerary(&pair, nine(), "kamakura_station");
    let first = &from_station.stops[0];
    let second = &from_station.stops[1];
    assert_eq!(first.start_label(), "09:05");
    assert_eq!(second.start_label(), "10:20");
    assert_eq!(second.order, 2);
    assert_eq!(
        first.start_time.date(),
        engine.clock().now().date_naive(),
        "anchored on the clock's date"
    );

    let from_hotel = engine.schedule_itinerary(&pair, nine(), "seaside_hotel");
    assert_eq!(from_hotel.stops[1].start_label(), "10:35");
    assert_eq!(from_hotel.total_minutes, 60 + 60 + 30);
}

#[tokio::test]
async fn planned_itineraries_schedule_monotonically() {
    let catalog = fixture_catalog();
    let engine = engine();
    for must_visit in [
        AreaPreference::Enoshima,
        AreaPreference::Kamakura,
        AreaPreference::Both,
    ] {
        for travel_style in [TravelStyle::Relaxed, TravelStyle::Active, TravelStyle::Cultural] {
            let profile = PreferenceProfile {
                must_visit,
                travel_style,
                ..PreferenceProfile::default()
            };
            let plan = engine.plan_itinerary(&catalog, &profile).await.unwrap().stops;
            for start in ["enoshima_station", "kamakura_station", "fujisawa_station", "home"] {
                let schedule = engine.schedule_itinerary(&plan, nine(), start);
                assert_eq!(schedule.stops.len(), plan.len());
                assert_eq!(schedule.total_minutes, tour_duration_minutes(&plan, engine.config()));
                for window in schedule.stops.windows(2) {
                    assert!(window[0].start_time <= window[0].end_time);
                    assert!(window[0].end_time <= window[1].start_time);
                }
            }
        }
    }
}

#[test]
fn morning_spots_are_scheduled_first() {
    let catalog = fixture_catalog();
    let plan = stops(
        &catalog,
        &["komachi-street", "hokokuji-temple", "kamakura-daibutsu"],
    );
    let schedule = engine().schedule_itinerary(&plan, nine(), "kamakura_station");
    let order: Vec<_> = schedule.stops.iter().map(|s| s.spot.id.as_str()).collect();
    assert_eq!(order, vec!["kamakura-daibutsu", "komachi-street", "hokokuji-temple"]);
}

/// Walks at 80 m/min and rides at 400 m/min with a fixed 10 minute wait.
struct GridDirections {
    calls: AtomicUsize,
    fail_walking: bool,
}

fn leg(secs: u32, meters: u32, mode: TravelMode) -> RouteLeg {
    RouteLeg {
        duration_secs: secs,
        duration_text: format!("{} mins", secs / 60),
        distance_m: meters,
        distance_text: format!("{meters} m"),
        fare: (mode == TravelMode::Transit).then(|| "200 yen".to_string()),
        steps: vec![RouteStep {
            instruction: format!("<b>{mode}</b> to the next stop"),
            travel_mode: mode.as_str().to_uppercase(),
            duration_text: format!("{} mins", secs / 60),
            distance_text: format!("{meters} m"),
            transit: None,
        }],
    }
}

#[async_trait]
impl DirectionsProvider for GridDirections {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteLeg, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let meters = tourpass_core::numbers::round_f64_to_u32(distance_m(origin, destination));
        match mode {
            TravelMode::Walking if self.fail_walking => {
                Err(ProviderError::Unavailable("no pedestrian data".to_string()))
            }
            TravelMode::Walking => Ok(leg(meters * 60 / 80, meters, mode)),
            TravelMode::Transit => Ok(leg(600 + meters * 60 / 400, meters, mode)),
        }
    }
}

#[tokio::test]
async fn segments_come_back_in_stop_order_with_recommendations() {
    let catalog = fixture_catalog();
    let plan = stops(
        &catalog,
        &[
            "kamakura-daibutsu",
            "hasedera-temple",
            "komachi-street",
            "enoshima-shrine",
        ],
    );
    let directions = Arc::new(GridDirections {
        calls: AtomicUsize::new(0),
        fail_walking: false,
    });
    let engine = engine().with_directions(directions.clone());

    let segments = engine.route_segments(&plan).await;
    assert_eq!(directions.calls.load(Ordering::SeqCst), 6);
    let pairs: Vec<_> = segments
        .iter()
        .map(|s| (s.from_id.as_str(), s.to_id.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("kamakura-daibutsu", "hasedera-temple"),
            ("hasedera-temple", "komachi-street"),
            ("komachi-street", "enoshima-shrine"),
        ]
    );
    // a few hundred meters: walk
    assert_eq!(segments[0].recommendation.method, RecommendedMethod::Walking);
    // across to the island: ride
    assert_eq!(segments[2].recommendation.method, RecommendedMethod::Transit);
    let steps = &segments[0].walking.as_ref().unwrap().steps;
    assert_eq!(steps[0].instruction, "walking to the next stop");
}

#[tokio::test]
async fn missing_walking_legs_fall_back_to_transit() {
    let catalog = fixture_catalog();
    let plan = stops(&catalog, &["kamakura-daibutsu", "hasedera-temple"]);
    let engine = engine().with_directions(Arc::new(GridDirections {
        calls: AtomicUsize::new(0),
        fail_walking: true,
    }));
    let segments = engine.route_segments(&plan).await;
    assert!(segments[0].walking.is_none());
    assert_eq!(segments[0].recommendation.method, RecommendedMethod::Transit);

    let single = engine
        .route_info(
            plan[0].coordinates,
            plan[1].coordinates,
            TravelMode::Transit,
        )
        .await
        .unwrap();
    assert_eq!(single.fare.as_deref(), Some("200 yen"));
}

struct StalledDirections;

#[async_trait]
impl DirectionsProvider for StalledDirections {
    async fn directions(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
        _mode: TravelMode,
    ) -> Result<RouteLeg, ProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Err(ProviderError::Unavailable("never answers".to_string()))
    }
}

#[tokio::test]
async fn stalled_directions_become_unknown_segments() {
    let catalog = fixture_catalog();
    let plan = stops(&catalog, &["enoshima-shrine", "enoshima-sea-candle", "enoshima-aquarium"]);
    assert!(plan.iter().all(|s| s.area == Area::Enoshima));
    let engine = engine()
        .with_config(TourConfig {
            provider_timeout_ms: 25,
            ..TourConfig::default()
        })
        .unwrap()
        .with_directions(Arc::new(StalledDirections));
    let segments = engine.route_segments(&plan).await;
    assert_eq!(segments.len(), 2);
    assert!(
        segments
            .iter()
            .all(|s| s.recommendation.method == RecommendedMethod::Unknown)
    );
}
