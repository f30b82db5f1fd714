//! Network-free stand-ins for the directions and content services.
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tourpass_core::numbers::round_f64_to_u32;
use tourpass_core::{
    ContentProvider, ContentQuery, Coordinate, DirectionsProvider, ProviderError, RouteLeg,
    RouteStep, TravelMode, distance_m,
};

/// Streets are not straight lines.
const DETOUR_FACTOR: f64 = 1.3;
const WALKING_M_PER_MIN: f64 = 80.0;
const TRANSIT_M_PER_MIN: f64 = 400.0;
const TRANSIT_WAIT_MIN: f64 = 8.0;
const BASE_FARE_YEN: u32 = 200;
const FARE_PER_KM_YEN: f64 = 30.0;

/// Estimates legs from great-circle distance at fixed walking and transit speeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedDirections;

fn duration_text(secs: u32) -> String {
    let mins = secs.div_ceil(60).max(1);
    if mins >= 60 {
        format!("{} hr {} mins", mins / 60, mins % 60)
    } else {
        format!("{mins} mins")
    }
}

fn distance_text(meters: u32) -> String {
    if meters >= 1_000 {
        format!("{:.1} km", f64::from(meters) / 1_000.0)
    } else {
        format!("{meters} m")
    }
}

#[async_trait]
impl DirectionsProvider for EstimatedDirections {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteLeg, ProviderError> {
        if !origin.is_valid() || !destination.is_valid() {
            return Err(ProviderError::Malformed("invalid coordinates".to_string()));
        }
        let route_m = distance_m(origin, destination) * DETOUR_FACTOR;
        let meters = round_f64_to_u32(route_m);
        let (minutes, fare) = match mode {
            TravelMode::Walking => (route_m / WALKING_M_PER_MIN, None),
            TravelMode::Transit => {
                let fare = BASE_FARE_YEN + round_f64_to_u32(route_m / 1_000.0 * FARE_PER_KM_YEN);
                (
                    TRANSIT_WAIT_MIN + route_m / TRANSIT_M_PER_MIN,
                    Some(format!("{fare} yen")),
                )
            }
        };
        let secs = round_f64_to_u32(minutes * 60.0);
        let step = RouteStep {
            instruction: format!("Estimated {mode} route ({})", distance_text(meters)),
            travel_mode: mode.as_str().to_uppercase(),
            duration_text: duration_text(secs),
            distance_text: distance_text(meters),
            transit: None,
        };
        Ok(RouteLeg {
            duration_secs: secs,
            duration_text: duration_text(secs),
            distance_m: meters,
            distance_text: distance_text(meters),
            fare,
            steps: vec![step],
        })
    }
}

/// Replays canned model output from a JSON file keyed by query kind.
///
/// Keys are `named`, `category` and `intent`; a `default` entry answers any kind
/// without its own. String values are returned verbatim, anything else as JSON text.
#[derive(Debug, Clone, Default)]
pub struct FixtureContent {
    responses: HashMap<String, String>,
}

impl FixtureContent {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, Value> =
            serde_json::from_str(json).context("content fixture must be a JSON object")?;
        let responses = raw
            .into_iter()
            .map(|(key, value)| {
                let body = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (key.to_ascii_lowercase(), body)
            })
            .collect();
        Ok(Self { responses })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read content fixture {}", path.display()))?;
        Self::from_json(&json)
    }
}

const fn query_kind(query: &ContentQuery) -> &'static str {
    match query {
        ContentQuery::Named { .. } => "named",
        ContentQuery::Category { .. } => "category",
        ContentQuery::Intent { .. } => "intent",
    }
}

#[async_trait]
impl ContentProvider for FixtureContent {
    async fn generate(&self, query: &ContentQuery) -> Result<String, ProviderError> {
        let kind = query_kind(query);
        self.responses
            .get(kind)
            .or_else(|| self.responses.get("default"))
            .cloned()
            .ok_or_else(|| ProviderError::Unavailable(format!("no fixture for {kind} queries")))
    }
}
