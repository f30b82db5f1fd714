//! Reward issuance, validation and redemption.
//!
//! Rewards come from three places: templates attached to a spot (issued on the
//! first check-in there), the milestone tier table (issued when completion crosses
//! a tier) and the instant table (issued when an itinerary is accepted).
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use hmac::{Hmac, Mac};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

use crate::constants::{
    GENERAL_SCOPE, INSTANT_MIN_STOPS, MILESTONE_TIERS, REWARD_ID_DOMAIN, REWARD_ID_PREFIX,
    REWARD_ID_SUFFIX_LEN,
};
use crate::data::{Area, Category, PointOfInterest};
use crate::error::{RewardConflict, TourError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RewardCategory {
    CheckIn,
    Milestone,
    Completion,
    Special,
    Instant,
}

impl RewardCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckIn => "check-in",
            Self::Milestone => "milestone",
            Self::Completion => "completion",
            Self::Special => "special",
            Self::Instant => "instant",
        }
    }
}

impl fmt::Display for RewardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RewardCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check-in" | "checkin" => Ok(Self::CheckIn),
            "milestone" => Ok(Self::Milestone),
            "completion" => Ok(Self::Completion),
            "special" => Ok(Self::Special),
            "instant" => Ok(Self::Instant),
            _ => Err(()),
        }
    }
}

/// A reward owned by one visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedReward {
    pub id: String,
    pub template_id: String,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub valid_until: NaiveDate,
    /// Spot the reward is redeemable at, or `general`.
    pub spot_id: String,
    pub spot_name: String,
    pub used: bool,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    pub category: RewardCategory,
}

impl IssuedReward {
    /// Expired once the calendar day of `now` is past `valid_until`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.date_naive() > self.valid_until
    }

    #[must_use]
    pub fn is_general(&self) -> bool {
        self.spot_id == GENERAL_SCOPE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardValidity {
    pub valid: bool,
    pub message: String,
}

/// Used is reported before expired.
#[must_use]
pub fn validate(reward: &IssuedReward, now: DateTime<Utc>) -> RewardValidity {
    let (valid, message) = if reward.used {
        (false, RewardConflict::AlreadyUsed.to_string())
    } else if reward.is_expired(now) {
        (false, RewardConflict::Expired.to_string())
    } else {
        (true, "reward is valid".to_string())
    };
    RewardValidity { valid, message }
}

/// Mark a reward used.
///
/// # Errors
///
/// `NotFound` for an unknown id, `Conflict` when the reward is already used or expired.
/// The list is left untouched on error.
pub fn redeem(
    rewards: &mut [IssuedReward],
    reward_id: &str,
    now: DateTime<Utc>,
) -> Result<IssuedReward, TourError> {
    let reward = rewards
        .iter_mut()
        .find(|reward| reward.id == reward_id)
        .ok_or_else(|| TourError::reward_not_found(reward_id))?;
    if reward.used {
        return Err(RewardConflict::AlreadyUsed.into());
    }
    if reward.is_expired(now) {
        return Err(RewardConflict::Expired.into());
    }
    reward.used = true;
    reward.used_at = Some(now.max(reward.issued_at));
    Ok(reward.clone())
}

/// Unused rewards, optionally limited to a set of spot scopes.
///
/// An absent or empty filter returns every unused reward. `general` rewards only
/// pass a non-empty filter when it names `general`.
#[must_use]
pub fn available(rewards: &[IssuedReward], filter: Option<&[String]>) -> Vec<IssuedReward> {
    let scopes: Option<HashSet<&str>> = filter
        .filter(|scopes| !scopes.is_empty())
        .map(|scopes| scopes.iter().map(String::as_str).collect());
    rewards
        .iter()
        .filter(|reward| !reward.used)
        .filter(|reward| {
            scopes
                .as_ref()
                .is_none_or(|scopes| scopes.contains(reward.spot_id.as_str()))
        })
        .cloned()
        .collect()
}

#[must_use]
pub fn used(rewards: &[IssuedReward]) -> Vec<IssuedReward> {
    rewards.iter().filter(|reward| reward.used).cloned().collect()
}

#[must_use]
pub fn by_category(rewards: &[IssuedReward], category: RewardCategory) -> Vec<IssuedReward> {
    rewards
        .iter()
        .filter(|reward| reward.category == category)
        .cloned()
        .collect()
}

/// Display name for a reward scope.
#[must_use]
pub fn scope_display_name(spot_id: &str) -> &str {
    match spot_id {
        "enoshima-shrine" => "Enoshima Shrine",
        "enoshima-sea-candle" => "Enoshima Sea Candle",
        "enoshima-aquarium" => "New Enoshima Aquarium",
        "enoshima-spa" => "Enoshima Island Spa",
        "kamakura-daibutsu" => "Great Buddha of Kamakura",
        "hasedera-temple" => "Hasedera Temple",
        "tsurugaoka-hachimangu" => "Tsurugaoka Hachimangu",
        "komachi-street" => "Komachi Street",
        "hokokuji-temple" => "Hokokuji Temple",
        GENERAL_SCOPE => "All participating shops",
        other => other,
    }
}

/// Expiry dates for rewards that carry no calendar date of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// Extra years granted to the special next-visit reward.
    pub special_extra_years: i32,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            special_extra_years: 1,
        }
    }
}

impl RewardPolicy {
    #[must_use]
    pub fn expiry(&self, category: RewardCategory, issued_at: DateTime<Utc>) -> NaiveDate {
        let year = match category {
            RewardCategory::Special => issued_at.year() + self.special_extra_years,
            _ => issued_at.year(),
        };
        NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
    }
}

fn derive_stream_seed(user_seed: u64, domain_tag: &[u8]) -> u64 {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(&user_seed.to_le_bytes()) else {
        return user_seed;
    };
    mac.update(domain_tag);
    let digest = mac.finalize().into_bytes();
    let mut seed_bytes = [0u8; 8];
    seed_bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed_bytes)
}

/// Mints `reward_<millis>_<suffix>` ids from a seeded ChaCha stream.
#[derive(Debug)]
pub struct RewardIdMinter {
    rng: Mutex<ChaCha20Rng>,
}

impl RewardIdMinter {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(derive_stream_seed(
                seed,
                REWARD_ID_DOMAIN,
            ))),
        }
    }

    pub fn mint(&self, now: DateTime<Utc>) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let suffix: String = (0..REWARD_ID_SUFFIX_LEN)
            .filter_map(|_| char::from_digit(rng.gen_range(0..36), 36))
            .collect();
        format!("{REWARD_ID_PREFIX}_{}_{suffix}", now.timestamp_millis())
    }
}

struct TierTemplate {
    key: &'static str,
    title: &'static str,
    description: &'static str,
    discount: &'static str,
    spot_id: &'static str,
    min_tier: u8,
}

const TIER_TEMPLATES: &[TierTemplate] = &[
    TierTemplate {
        key: "food",
        title: "Food voucher",
        description: "10% off at participating restaurants",
        discount: "10%OFF",
        spot_id: GENERAL_SCOPE,
        min_tier: 0,
    },
    TierTemplate {
        key: "souvenir",
        title: "Souvenir voucher",
        description: "500 yen off souvenirs on Komachi Street",
        discount: "500 yen OFF",
        spot_id: "komachi-street",
        min_tier: 0,
    },
    TierTemplate {
        key: "transport",
        title: "Transport voucher",
        description: "Free Enoden day pass",
        discount: "Free",
        spot_id: GENERAL_SCOPE,
        min_tier: 50,
    },
    TierTemplate {
        key: "activity",
        title: "Activity voucher",
        description: "20% off at Enoshima Island Spa",
        discount: "20%OFF",
        spot_id: "enoshima-spa",
        min_tier: 75,
    },
    TierTemplate {
        key: "next-visit",
        title: "Next-visit special",
        description: "30% off anywhere on your next visit",
        discount: "30%OFF",
        spot_id: GENERAL_SCOPE,
        min_tier: 100,
    },
];

/// Tiers crossed by moving from `old_ratio` to `new_ratio`, skipping ones already issued.
#[must_use]
pub fn crossed_tiers(old_ratio: f64, new_ratio: f64, already: &[u8]) -> Vec<(u8, usize)> {
    MILESTONE_TIERS
        .iter()
        .copied()
        .filter(|(tier, _)| {
            let tier_ratio = f64::from(*tier);
            old_ratio < tier_ratio && tier_ratio <= new_ratio && !already.contains(tier)
        })
        .collect()
}

/// Rewards for one milestone tier, sliced from the tier template table.
#[must_use]
pub fn milestone_rewards(
    tier: u8,
    count: usize,
    now: DateTime<Utc>,
    minter: &RewardIdMinter,
    policy: &RewardPolicy,
) -> Vec<IssuedReward> {
    TIER_TEMPLATES
        .iter()
        .filter(|template| template.min_tier <= tier)
        .take(count)
        .map(|template| {
            let category = match (tier, template.min_tier) {
                (_, 100) => RewardCategory::Special,
                (100, _) => RewardCategory::Completion,
                _ => RewardCategory::Milestone,
            };
            IssuedReward {
                id: minter.mint(now),
                template_id: format!("milestone-{tier}-{}", template.key),
                title: template.title.to_string(),
                description: template.description.to_string(),
                discount: template.discount.to_string(),
                valid_until: policy.expiry(category, now),
                spot_id: template.spot_id.to_string(),
                spot_name: scope_display_name(template.spot_id).to_string(),
                used: false,
                issued_at: now,
                used_at: None,
                category,
            }
        })
        .collect()
}

/// One reward per template attached to the spot.
#[must_use]
pub fn check_in_rewards(
    spot: &PointOfInterest,
    now: DateTime<Utc>,
    minter: &RewardIdMinter,
) -> Vec<IssuedReward> {
    spot.rewards
        .iter()
        .map(|template| IssuedReward {
            id: minter.mint(now),
            template_id: template.id.clone(),
            title: template.title.clone(),
            description: template.description.clone(),
            discount: template.discount.clone(),
            valid_until: template.valid_until,
            spot_id: template.spot_id.clone(),
            spot_name: spot.name.clone(),
            used: false,
            issued_at: now,
            used_at: None,
            category: RewardCategory::CheckIn,
        })
        .collect()
}

/// Rewards granted when an itinerary is accepted.
#[must_use]
pub fn instant_rewards(
    stops: &[PointOfInterest],
    now: DateTime<Utc>,
    minter: &RewardIdMinter,
    policy: &RewardPolicy,
) -> Vec<IssuedReward> {
    let visits_both_areas = Area::ALL
        .iter()
        .all(|area| stops.iter().any(|spot| spot.area == *area));
    let has_food = stops.iter().any(|spot| spot.category == Category::Food);

    let earned: [(bool, &str, &str, &str, &str); 3] = [
        (
            stops.len() >= INSTANT_MIN_STOPS,
            "instant-route",
            "Route planner bonus",
            "5% off at any participating shop",
            "5%OFF",
        ),
        (
            visits_both_areas,
            "instant-area",
            "Two-area explorer",
            "Free drink when visiting both Enoshima and Kamakura",
            "1 free drink",
        ),
        (
            has_food,
            "instant-food",
            "Foodie bonus",
            "10% off one meal on your route",
            "10%OFF",
        ),
    ];

    earned
        .into_iter()
        .filter(|(earned, ..)| *earned)
        .map(|(_, template_id, title, description, discount)| IssuedReward {
            id: minter.mint(now),
            template_id: template_id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            discount: discount.to_string(),
            valid_until: policy.expiry(RewardCategory::Instant, now),
            spot_id: GENERAL_SCOPE.to_string(),
            spot_name: scope_display_name(GENERAL_SCOPE).to_string(),
            used: false,
            issued_at: now,
            used_at: None,
            category: RewardCategory::Instant,
        })
        .collect()
}
