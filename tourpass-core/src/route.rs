//! Route legs between consecutive stops and the recommended way to travel them.
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Transit,
    Walking,
}

impl TravelMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transit => "transit",
            Self::Walking => "walking",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transit" => Ok(Self::Transit),
            "walking" | "walk" => Ok(Self::Walking),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitDetails {
    pub line_name: String,
    pub departure_stop: String,
    pub arrival_stop: String,
    #[serde(default)]
    pub num_stops: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStep {
    pub instruction: String,
    pub travel_mode: String,
    pub duration_text: String,
    pub distance_text: String,
    #[serde(default)]
    pub transit: Option<TransitDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub duration_secs: u32,
    pub duration_text: String,
    pub distance_m: u32,
    pub distance_text: String,
    #[serde(default)]
    pub fare: Option<String>,
    #[serde(default)]
    pub steps: Vec<RouteStep>,
}

impl RouteLeg {
    /// Strip any markup a provider left in step instructions.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        for step in &mut self.steps {
            step.instruction = strip_markup(&step.instruction);
        }
        self
    }
}

fn markup_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").ok()).as_ref()
}

/// Remove HTML-style tags and collapse the whitespace left behind.
#[must_use]
pub fn strip_markup(text: &str) -> String {
    let stripped = markup_pattern().map_or_else(
        || text.to_string(),
        |re| re.replace_all(text, " ").into_owned(),
    );
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedMethod {
    Transit,
    Walking,
    Unknown,
}

impl RecommendedMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transit => "transit",
            Self::Walking => "walking",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecommendedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub method: RecommendedMethod,
    pub reason: String,
}

/// Directions between two consecutive stops of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub from_id: String,
    pub to_id: String,
    pub transit: Option<RouteLeg>,
    pub walking: Option<RouteLeg>,
    pub recommendation: Recommendation,
}

/// Pick a travel method from whichever legs the provider returned.
#[must_use]
pub fn recommend(
    transit: Option<&RouteLeg>,
    walking: Option<&RouteLeg>,
    walking_max_secs: u32,
) -> Recommendation {
    let (method, reason) = match (transit, walking) {
        (Some(transit), Some(walking)) if transit.duration_secs < walking.duration_secs => (
            RecommendedMethod::Transit,
            format!(
                "transit is faster ({} vs {} on foot)",
                transit.duration_text, walking.duration_text
            ),
        ),
        (Some(_), Some(walking)) if walking.duration_secs < walking_max_secs => (
            RecommendedMethod::Walking,
            format!("short enough to walk ({})", walking.duration_text),
        ),
        (Some(transit), Some(_)) => (
            RecommendedMethod::Transit,
            format!("too far to walk comfortably, transit takes {}", transit.duration_text),
        ),
        (Some(transit), None) => (
            RecommendedMethod::Transit,
            format!("only transit directions available ({})", transit.duration_text),
        ),
        (None, Some(walking)) => (
            RecommendedMethod::Walking,
            format!("only walking directions available ({})", walking.duration_text),
        ),
        (None, None) => (
            RecommendedMethod::Unknown,
            "no directions available".to_string(),
        ),
    };
    Recommendation { method, reason }
}
