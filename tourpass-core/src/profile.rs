//! Visitor preference profile collected once per planning session.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::Area;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    #[default]
    Relaxed,
    Active,
    Cultural,
    Gourmet,
}

impl TravelStyle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relaxed => "relaxed",
            Self::Active => "active",
            Self::Cultural => "cultural",
            Self::Gourmet => "gourmet",
        }
    }

    /// Category query sent to the content provider for this style, if any.
    #[must_use]
    pub const fn supplemental_query(self) -> Option<&'static str> {
        match self {
            Self::Relaxed => None,
            Self::Active => Some("activities"),
            Self::Cultural => Some("culture & history"),
            Self::Gourmet => Some("gourmet & cafes"),
        }
    }
}

impl fmt::Display for TravelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TravelStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relaxed" => Ok(Self::Relaxed),
            "active" => Ok(Self::Active),
            "cultural" => Ok(Self::Cultural),
            "gourmet" => Ok(Self::Gourmet),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AgeBand {
    #[serde(rename = "10s")]
    Teens,
    #[serde(rename = "20s")]
    Twenties,
    #[serde(rename = "30s")]
    Thirties,
    #[serde(rename = "40s")]
    Forties,
    #[serde(rename = "50s")]
    Fifties,
    #[default]
    #[serde(rename = "other")]
    Other,
}

impl AgeBand {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teens => "10s",
            Self::Twenties => "20s",
            Self::Thirties => "30s",
            Self::Forties => "40s",
            Self::Fifties => "50s",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for AgeBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeBand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "10s" => Ok(Self::Teens),
            "20s" => Ok(Self::Twenties),
            "30s" => Ok(Self::Thirties),
            "40s" => Ok(Self::Forties),
            "50s" => Ok(Self::Fifties),
            "other" | "60s" | "70s" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

impl Gender {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Female => "female",
            Self::Male => "male",
            Self::Unspecified => "unspecified",
        }
    }
}

impl FromStr for Gender {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "female" => Ok(Self::Female),
            "male" => Ok(Self::Male),
            "unspecified" | "other" | "" => Ok(Self::Unspecified),
            _ => Err(()),
        }
    }
}

/// Area constraint chosen by the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AreaPreference {
    Enoshima,
    Kamakura,
    Both,
    #[default]
    Undecided,
}

impl AreaPreference {
    /// The single area this preference restricts the catalog to, if any.
    #[must_use]
    pub const fn restricts_to(self) -> Option<Area> {
        match self {
            Self::Enoshima => Some(Area::Enoshima),
            Self::Kamakura => Some(Area::Kamakura),
            Self::Both | Self::Undecided => None,
        }
    }

    /// Area used for supplemental provider searches.
    #[must_use]
    pub const fn search_area(self) -> Area {
        match self {
            Self::Enoshima => Area::Enoshima,
            Self::Kamakura | Self::Both | Self::Undecided => Area::Kamakura,
        }
    }

    /// Area used when looking up a named spot the catalog does not know.
    #[must_use]
    pub const fn named_lookup_area(self) -> Area {
        match self {
            Self::Kamakura => Area::Kamakura,
            Self::Enoshima | Self::Both | Self::Undecided => Area::Enoshima,
        }
    }
}

impl FromStr for AreaPreference {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enoshima" => Ok(Self::Enoshima),
            "kamakura" => Ok(Self::Kamakura),
            "both" => Ok(Self::Both),
            "undecided" => Ok(Self::Undecided),
            _ => Err(()),
        }
    }
}

/// Visitor-supplied planning signals. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PreferenceProfile {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age: AgeBand,
    #[serde(default)]
    pub travel_style: TravelStyle,
    #[serde(default)]
    pub must_visit: AreaPreference,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub what_to_do: Option<String>,
    #[serde(default)]
    pub custom_spot: Option<String>,
}

impl PreferenceProfile {
    /// Short preference text forwarded to the content provider.
    #[must_use]
    pub fn preference_text(&self) -> String {
        format!(
            "{}, {}, {}",
            self.gender.as_str(),
            self.age,
            self.travel_style
        )
    }

    /// Named spot, if one was supplied with visible characters.
    #[must_use]
    pub fn custom_spot(&self) -> Option<&str> {
        self.custom_spot
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Free-text intent, if one was supplied with visible characters.
    #[must_use]
    pub fn what_to_do(&self) -> Option<&str> {
        self.what_to_do
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}
