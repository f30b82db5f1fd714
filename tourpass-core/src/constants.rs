//! Centralized tuning constants for tourpass itinerary logic.
//!
//! These values define the deterministic math for selection, scheduling,
//! check-ins and rewards. `TourConfig` defaults are read from here so the
//! numbers only change through reviewed code.

// Check-in ------------------------------------------------------------------
pub(crate) const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub(crate) const CHECK_IN_RADIUS_M: f64 = 100.0;
pub(crate) const POINTS_PER_VISIT: u32 = 100;

// Scheduling ----------------------------------------------------------------
pub(crate) const SAME_AREA_TRAVEL_MINUTES: u32 = 15;
pub(crate) const CROSS_AREA_TRAVEL_MINUTES: u32 = 30;
pub(crate) const DEFAULT_START_TRAVEL_MINUTES: u32 = 20;
pub(crate) const SUMMARY_LEG_MINUTES: u32 = 30;
pub(crate) const WALKING_PREFERRED_MAX_SECS: u32 = 1_800;

/// Minutes from a named start location to the first stop's area.
pub(crate) const START_TRAVEL_TABLE: &[(&str, &str, u32)] = &[
    ("enoshima_station", "enoshima", 10),
    ("enoshima_station", "kamakura", 25),
    ("kamakura_station", "enoshima", 25),
    ("kamakura_station", "kamakura", 5),
    ("fujisawa_station", "enoshima", 15),
    ("fujisawa_station", "kamakura", 20),
];

// Selection -----------------------------------------------------------------
pub(crate) const HEAD_SLICE_BOTH: usize = 5;
pub(crate) const HEAD_SLICE_SINGLE: usize = 4;
pub(crate) const UNCONDITIONAL_PICKS: usize = 3;
pub(crate) const BASE_PLAN_MAX: usize = 4;
pub(crate) const MAX_PLAN_STOPS: usize = 8;
pub(crate) const STYLE_SEARCH_CAP: usize = 2;
pub(crate) const INTEREST_SEARCH_CAP: usize = 1;
pub(crate) const INTENT_SEARCH_CAP: usize = 2;

pub(crate) const STYLE_TAG_BONUS: i32 = 3;
pub(crate) const STYLE_TRAIT_BONUS: i32 = 2;
pub(crate) const STYLE_DURATION_BONUS: i32 = 1;
pub(crate) const AGE_TAG_BONUS: i32 = 2;
pub(crate) const GENDER_TAG_BONUS: i32 = 1;
pub(crate) const RELAXED_MAX_MINUTES: u32 = 60;
pub(crate) const ACTIVE_MIN_MINUTES: u32 = 90;

pub(crate) const RELAXED_TAGS: &[&str] = &["healing", "garden", "tranquil"];
pub(crate) const ACTIVE_TAGS: &[&str] = &["active", "marine-sports", "outdoor"];
pub(crate) const CULTURAL_TAGS: &[&str] = &["history", "cultural-property", "samurai"];
pub(crate) const GOURMET_TAGS: &[&str] = &["gourmet", "street-food"];
pub(crate) const YOUNG_TAGS: &[&str] = &["youth", "instagrammable", "photogenic"];
pub(crate) const COUPLE_TAGS: &[&str] = &["couples", "date"];
pub(crate) const MATURE_TAGS: &[&str] = &["mature", "tranquil", "history"];
pub(crate) const FEMALE_TAGS: &[&str] = &["popular-with-women", "matchmaking", "flowers"];

// Provider-sourced candidates ------------------------------------------------
pub(crate) const PROVIDER_TIMEOUT_MS: u64 = 10_000;
pub(crate) const CANDIDATE_DEFAULT_MINUTES: u32 = 60;
pub(crate) const CANDIDATE_DEFAULT_HOURS: &str = "to be confirmed";
pub(crate) const TAG_WEB_SEARCH: &str = "web-search";
pub(crate) const TAG_CATEGORY_SEARCH: &str = "category-search";
pub(crate) const TAG_WHAT_TO_DO: &str = "what-to-do";
pub(crate) const ENOSHIMA_CENTRE: (f64, f64) = (35.2993, 139.4804);
pub(crate) const KAMAKURA_CENTRE: (f64, f64) = (35.3167, 139.5358);

// Rewards -------------------------------------------------------------------
pub const GENERAL_SCOPE: &str = "general";
pub(crate) const MILESTONE_TIERS: &[(u8, usize)] = &[(25, 1), (50, 2), (75, 3), (100, 5)];
pub(crate) const INSTANT_MIN_STOPS: usize = 3;
pub(crate) const REWARD_ID_PREFIX: &str = "reward";
pub(crate) const REWARD_ID_SUFFIX_LEN: usize = 9;
pub(crate) const REWARD_ID_DOMAIN: &[u8] = b"tourpass-reward-ids";
