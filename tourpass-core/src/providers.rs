//! Async collaborator seams: directions lookups and generated spot content.
//!
//! Both providers are untrusted. Every call is bounded by the configured timeout and
//! every failure degrades to an empty result with a warning; nothing here returns an
//! error to engine callers.
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::Hasher;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinSet;
use twox_hash::XxHash64;

use crate::constants::{
    CANDIDATE_DEFAULT_HOURS, CANDIDATE_DEFAULT_MINUTES, TAG_CATEGORY_SEARCH, TAG_WEB_SEARCH,
    TAG_WHAT_TO_DO,
};
use crate::data::{Area, Category, Difficulty, PointOfInterest, VisitWindow};
use crate::error::ProviderError;
use crate::geo::Coordinate;
use crate::numbers::round_f64_to_u32;
use crate::route::{RouteLeg, RouteSegment, TravelMode, recommend};

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Result<RouteLeg, ProviderError>;
}

/// What the content provider is asked to describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentQuery {
    /// A specific spot the visitor named.
    Named { name: String, area: Area },
    /// Spots in a category suited to the visitor's preferences.
    Category {
        area: Area,
        category: String,
        preference: String,
    },
    /// Spots matching a free-text intent.
    Intent {
        area: Area,
        intent: String,
        preference: String,
    },
}

impl ContentQuery {
    #[must_use]
    pub const fn area(&self) -> Area {
        match self {
            Self::Named { area, .. } | Self::Category { area, .. } | Self::Intent { area, .. } => {
                *area
            }
        }
    }

    /// Tag appended to every candidate produced by this query.
    #[must_use]
    pub const fn source_tag(&self) -> &'static str {
        match self {
            Self::Named { .. } => TAG_WEB_SEARCH,
            Self::Category { .. } => TAG_CATEGORY_SEARCH,
            Self::Intent { .. } => TAG_WHAT_TO_DO,
        }
    }

    /// Prompt text for generative backends.
    #[must_use]
    pub fn prompt(&self) -> String {
        let shape = "Reply with a JSON array of objects with fields name, description, \
                     category, tags, duration_minutes, difficulty, coordinates {lat, lng}, \
                     open_hours, entrance_fee, tips.";
        match self {
            Self::Named { name, area } => {
                format!("Describe the spot \"{name}\" near {area}, Japan. {shape}")
            }
            Self::Category {
                area,
                category,
                preference,
            } => format!(
                "Recommend up to three {category} spots in {area}, Japan for a visitor \
                 ({preference}). {shape}"
            ),
            Self::Intent {
                area,
                intent,
                preference,
            } => format!(
                "A visitor ({preference}) in {area}, Japan wants to: {intent}. \
                 Recommend up to three spots. {shape}"
            ),
        }
    }
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Raw model text for a query.
    async fn generate(&self, query: &ContentQuery) -> Result<String, ProviderError>;
}

fn fenced_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok())
        .as_ref()
}

fn array_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\[[\s\S]*\]").ok())
        .as_ref()
}

fn object_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{[\s\S]*\}").ok())
        .as_ref()
}

fn trailing_comma_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r",(\s*[}\]])").ok())
        .as_ref()
}

/// Pull the JSON payload out of free-form model text and drop trailing commas.
#[must_use]
pub fn extract_json(raw: &str) -> Option<String> {
    let body = fenced_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str());
    let payload = array_pattern()
        .and_then(|re| re.find(body))
        .or_else(|| object_pattern().and_then(|re| re.find(body)))?
        .as_str();
    let cleaned = trailing_comma_pattern().map_or_else(
        || payload.to_string(),
        |re| re.replace_all(payload, "$1").into_owned(),
    );
    Some(cleaned)
}

#[derive(Debug, Deserialize)]
struct RawCoordinates {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default, alias = "duration")]
    duration_minutes: Option<f64>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    coordinates: Option<RawCoordinates>,
    #[serde(default, alias = "openHours")]
    open_hours: Option<String>,
    #[serde(default, alias = "bestVisitTime")]
    best_visit_time: Option<String>,
    #[serde(default, alias = "entranceFee")]
    entrance_fee: Option<f64>,
    #[serde(default)]
    tips: Vec<String>,
}

fn candidate_id(name: &str) -> String {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(name.trim().to_lowercase().as_bytes());
    format!("generated-{:016x}", hasher.finish())
}

fn parse_window(text: &str) -> Option<VisitWindow> {
    match text.trim().to_ascii_lowercase().as_str() {
        "morning" => Some(VisitWindow::Morning),
        "afternoon" => Some(VisitWindow::Afternoon),
        "evening" => Some(VisitWindow::Evening),
        _ => None,
    }
}

fn validate_candidate(raw: RawCandidate, query: &ContentQuery) -> Result<PointOfInterest, String> {
    let name = raw
        .name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or("missing name")?;
    let category: Category = raw
        .category
        .as_deref()
        .ok_or("missing category")?
        .parse::<Category>()
        .map_err(|()| format!("unknown category for {name}"))?;
    let area = raw
        .area
        .as_deref()
        .and_then(|area| area.parse::<Area>().ok())
        .unwrap_or_else(|| query.area());
    let coordinates = match raw.coordinates {
        Some(RawCoordinates { lat, lng }) => {
            let coordinates = Coordinate::new(lat, lng);
            if !coordinates.is_valid() {
                return Err(format!("invalid coordinates for {name}"));
            }
            coordinates
        }
        None => area.centre(),
    };
    let duration_minutes = raw
        .duration_minutes
        .filter(|minutes| minutes.is_finite() && *minutes > 0.0)
        .map_or(CANDIDATE_DEFAULT_MINUTES, round_f64_to_u32);

    let mut tags: Vec<String> = raw
        .tags
        .into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect();
    if !tags.iter().any(|tag| tag == query.source_tag()) {
        tags.push(query.source_tag().to_string());
    }

    Ok(PointOfInterest {
        id: candidate_id(&name),
        description: raw.description.unwrap_or_default(),
        area,
        category,
        tags,
        duration_minutes,
        difficulty: raw
            .difficulty
            .as_deref()
            .and_then(|d| d.parse().ok())
            .unwrap_or(Difficulty::Easy),
        coordinates,
        open_hours: raw
            .open_hours
            .filter(|hours| !hours.trim().is_empty())
            .unwrap_or_else(|| CANDIDATE_DEFAULT_HOURS.to_string()),
        best_visit_time: raw.best_visit_time.as_deref().and_then(parse_window),
        entrance_fee: raw.entrance_fee.map_or(0, round_f64_to_u32),
        tips: raw.tips,
        rewards: Vec::new(),
        name,
    })
}

/// Parse provider text into validated candidates. Invalid records are dropped.
///
/// # Errors
///
/// Returns [`ProviderError::Malformed`] when no JSON payload can be recovered.
pub fn parse_candidates(
    raw: &str,
    query: &ContentQuery,
) -> Result<Vec<PointOfInterest>, ProviderError> {
    let payload = extract_json(raw)
        .ok_or_else(|| ProviderError::Malformed("no JSON payload in response".to_string()))?;
    let value: Value =
        serde_json::from_str(&payload).map_err(|err| ProviderError::Malformed(err.to_string()))?;
    let records = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(ProviderError::Malformed(
                "payload is neither an array nor an object".to_string(),
            ));
        }
    };

    let mut candidates = Vec::with_capacity(records.len());
    for record in records {
        let checked = serde_json::from_value::<RawCandidate>(record)
            .map_err(|err| err.to_string())
            .and_then(|raw| validate_candidate(raw, query));
        match checked {
            Ok(candidate) => candidates.push(candidate),
            Err(reason) => log::debug!("discarding generated candidate: {reason}"),
        }
    }
    Ok(candidates)
}

/// Ask the content provider and return at most `cap` validated candidates.
pub(crate) async fn fetch_candidates(
    provider: &dyn ContentProvider,
    query: &ContentQuery,
    timeout: Duration,
    cap: usize,
) -> Vec<PointOfInterest> {
    let outcome = match tokio::time::timeout(timeout, provider.generate(query)).await {
        Ok(result) => result.and_then(|raw| parse_candidates(&raw, query)),
        Err(_) => Err(ProviderError::Timeout(
            u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        )),
    };
    match outcome {
        Ok(mut candidates) => {
            candidates.truncate(cap);
            candidates
        }
        Err(err) => {
            log::warn!("content lookup {:?} degraded: {err}", query.source_tag());
            Vec::new()
        }
    }
}

/// One directions lookup, `None` on error or timeout.
pub(crate) async fn fetch_leg(
    provider: &dyn DirectionsProvider,
    origin: Coordinate,
    destination: Coordinate,
    mode: TravelMode,
    timeout: Duration,
) -> Option<RouteLeg> {
    match tokio::time::timeout(timeout, provider.directions(origin, destination, mode)).await {
        Ok(Ok(leg)) => Some(leg.sanitized()),
        Ok(Err(err)) => {
            log::warn!("{mode} directions degraded: {err}");
            None
        }
        Err(_) => {
            log::warn!("{mode} directions timed out after {} ms", timeout.as_millis());
            None
        }
    }
}

/// Segments between consecutive stops, looked up concurrently and returned in order.
pub(crate) async fn lookup_segments(
    provider: Arc<dyn DirectionsProvider>,
    stops: &[PointOfInterest],
    timeout: Duration,
    walking_max_secs: u32,
) -> Vec<RouteSegment> {
    let mut tasks = JoinSet::new();
    for (index, pair) in stops.windows(2).enumerate() {
        let provider = Arc::clone(&provider);
        let (from, to) = (pair[0].clone(), pair[1].clone());
        tasks.spawn(async move {
            let (transit, walking) = tokio::join!(
                fetch_leg(
                    provider.as_ref(),
                    from.coordinates,
                    to.coordinates,
                    TravelMode::Transit,
                    timeout
                ),
                fetch_leg(
                    provider.as_ref(),
                    from.coordinates,
                    to.coordinates,
                    TravelMode::Walking,
                    timeout
                ),
            );
            let recommendation = recommend(transit.as_ref(), walking.as_ref(), walking_max_secs);
            (
                index,
                RouteSegment {
                    from_id: from.id,
                    to_id: to.id,
                    transit,
                    walking,
                    recommendation,
                },
            )
        });
    }

    let mut segments = Vec::with_capacity(stops.len().saturating_sub(1));
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(segment) => segments.push(segment),
            Err(err) => log::warn!("route segment task failed: {err}"),
        }
    }
    segments.sort_by_key(|(index, _)| *index);
    segments.into_iter().map(|(_, segment)| segment).collect()
}
