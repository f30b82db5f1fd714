//! Catalog records: points of interest and the reward templates attached to them.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Enoshima,
    Kamakura,
}

impl Area {
    pub const ALL: &'static [Self] = &[Self::Enoshima, Self::Kamakura];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enoshima => "enoshima",
            Self::Kamakura => "kamakura",
        }
    }

    /// Rough centre of the area, used when a provider omits coordinates.
    #[must_use]
    pub const fn centre(self) -> Coordinate {
        let (lat, lng) = match self {
            Self::Enoshima => crate::constants::ENOSHIMA_CENTRE,
            Self::Kamakura => crate::constants::KAMAKURA_CENTRE,
        };
        Coordinate { lat, lng }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enoshima" => Ok(Self::Enoshima),
            "kamakura" => Ok(Self::Kamakura),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Shrine,
    Temple,
    Nature,
    Culture,
    Food,
    Shopping,
    Activity,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shrine => "shrine",
            Self::Temple => "temple",
            Self::Nature => "nature",
            Self::Culture => "culture",
            Self::Food => "food",
            Self::Shopping => "shopping",
            Self::Activity => "activity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shrine" => Ok(Self::Shrine),
            "temple" => Ok(Self::Temple),
            "nature" => Ok(Self::Nature),
            "culture" => Ok(Self::Culture),
            "food" => Ok(Self::Food),
            "shopping" => Ok(Self::Shopping),
            "activity" => Ok(Self::Activity),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Moderate,
    Hard,
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "moderate" => Ok(Self::Moderate),
            "hard" => Ok(Self::Hard),
            _ => Err(()),
        }
    }
}

/// Preferred part of the day to visit a spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitWindow {
    Morning,
    Afternoon,
    Evening,
}

impl VisitWindow {
    /// Sort rank used by the scheduler; unspecified windows sort after every named one.
    #[must_use]
    pub const fn rank(window: Option<Self>) -> u8 {
        match window {
            Some(Self::Morning) => 0,
            Some(Self::Afternoon) => 1,
            Some(Self::Evening) => 2,
            None => 99,
        }
    }
}

/// Static reward definition attached to a spot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub valid_until: NaiveDate,
    pub spot_id: String,
}

/// A visitable place in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub area: Area,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    pub duration_minutes: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub coordinates: Coordinate,
    #[serde(default)]
    pub open_hours: String,
    #[serde(default)]
    pub best_visit_time: Option<VisitWindow>,
    #[serde(default)]
    pub entrance_fee: u32,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub rewards: Vec<RewardTemplate>,
}

impl PointOfInterest {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|tag| self.has_tag(tag))
    }
}

/// Ordered snapshot of the external catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    pub spots: Vec<PointOfInterest>,
}

impl Catalog {
    #[must_use]
    pub fn empty() -> Self {
        Self { spots: Vec::new() }
    }

    #[must_use]
    pub fn from_spots(spots: Vec<PointOfInterest>) -> Self {
        Self { spots }
    }

    /// Load a catalog snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into catalog records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&PointOfInterest> {
        self.spots.iter().find(|spot| spot.id == id)
    }

    /// Case-insensitive exact name match first, then the first name containing the query.
    #[must_use]
    pub fn find_by_name(&self, query: &str) -> Option<&PointOfInterest> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.spots
            .iter()
            .find(|spot| spot.name.to_lowercase() == needle)
            .or_else(|| {
                self.spots
                    .iter()
                    .find(|spot| spot.name.to_lowercase().contains(&needle))
            })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointOfInterest> {
        self.spots.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.spots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a PointOfInterest;
    type IntoIter = std::slice::Iter<'a, PointOfInterest>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
