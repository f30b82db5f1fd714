//! Engine tuning loaded from JSON, every field defaulting to `constants.rs`.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants;

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive (got {value:.2})")]
    NonPositive { field: &'static str, value: f64 },
    #[error("max_stops must be at least {min} (got {value})")]
    PlanTooShort { min: usize, value: usize },
    #[error("provider timeout must be non-zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourConfig {
    #[serde(default = "TourConfig::default_check_in_radius_m")]
    pub check_in_radius_m: f64,
    #[serde(default = "TourConfig::default_points_per_visit")]
    pub points_per_visit: u32,
    #[serde(default = "TourConfig::default_same_area_minutes")]
    pub same_area_minutes: u32,
    #[serde(default = "TourConfig::default_cross_area_minutes")]
    pub cross_area_minutes: u32,
    #[serde(default = "TourConfig::default_start_travel_minutes")]
    pub default_start_travel_minutes: u32,
    /// Flat per-leg allowance used for the total tour duration summary.
    #[serde(default = "TourConfig::default_summary_leg_minutes")]
    pub summary_leg_minutes: u32,
    #[serde(default = "TourConfig::default_walking_preferred_max_secs")]
    pub walking_preferred_max_secs: u32,
    #[serde(default = "TourConfig::default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "TourConfig::default_max_stops")]
    pub max_stops: usize,
    #[serde(default = "TourConfig::default_style_search_cap")]
    pub style_search_cap: usize,
    #[serde(default = "TourConfig::default_interest_search_cap")]
    pub interest_search_cap: usize,
    #[serde(default = "TourConfig::default_intent_search_cap")]
    pub intent_search_cap: usize,
}

impl TourConfig {
    const fn default_check_in_radius_m() -> f64 {
        constants::CHECK_IN_RADIUS_M
    }

    const fn default_points_per_visit() -> u32 {
        constants::POINTS_PER_VISIT
    }

    const fn default_same_area_minutes() -> u32 {
        constants::SAME_AREA_TRAVEL_MINUTES
    }

    const fn default_cross_area_minutes() -> u32 {
        constants::CROSS_AREA_TRAVEL_MINUTES
    }

    const fn default_start_travel_minutes() -> u32 {
        constants::DEFAULT_START_TRAVEL_MINUTES
    }

    const fn default_summary_leg_minutes() -> u32 {
        constants::SUMMARY_LEG_MINUTES
    }

    const fn default_walking_preferred_max_secs() -> u32 {
        constants::WALKING_PREFERRED_MAX_SECS
    }

    const fn default_provider_timeout_ms() -> u64 {
        constants::PROVIDER_TIMEOUT_MS
    }

    const fn default_max_stops() -> usize {
        constants::MAX_PLAN_STOPS
    }

    const fn default_style_search_cap() -> usize {
        constants::STYLE_SEARCH_CAP
    }

    const fn default_interest_search_cap() -> usize {
        constants::INTEREST_SEARCH_CAP
    }

    const fn default_intent_search_cap() -> usize {
        constants::INTENT_SEARCH_CAP
    }

    /// Load configuration from a JSON string, validating it.
    ///
    /// # Errors
    ///
    /// Returns an error when the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.check_in_radius_m.is_finite() && self.check_in_radius_m > 0.0) {
            return Err(ConfigError::NonPositive {
                field: "check_in_radius_m",
                value: self.check_in_radius_m,
            });
        }
        if self.provider_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.max_stops < constants::UNCONDITIONAL_PICKS {
            return Err(ConfigError::PlanTooShort {
                min: constants::UNCONDITIONAL_PICKS,
                value: self.max_stops,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            check_in_radius_m: Self::default_check_in_radius_m(),
            points_per_visit: Self::default_points_per_visit(),
            same_area_minutes: Self::default_same_area_minutes(),
            cross_area_minutes: Self::default_cross_area_minutes(),
            default_start_travel_minutes: Self::default_start_travel_minutes(),
            summary_leg_minutes: Self::default_summary_leg_minutes(),
            walking_preferred_max_secs: Self::default_walking_preferred_max_secs(),
            provider_timeout_ms: Self::default_provider_timeout_ms(),
            max_stops: Self::default_max_stops(),
            style_search_cap: Self::default_style_search_cap(),
            interest_search_cap: Self::default_interest_search_cap(),
            intent_search_cap: Self::default_intent_search_cap(),
        }
    }
}
