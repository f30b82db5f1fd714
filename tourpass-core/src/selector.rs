//! Preference-driven candidate scoring and diversified selection.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{
    ACTIVE_MIN_MINUTES, ACTIVE_TAGS, AGE_TAG_BONUS, BASE_PLAN_MAX, COUPLE_TAGS, CULTURAL_TAGS,
    FEMALE_TAGS, GENDER_TAG_BONUS, GOURMET_TAGS, HEAD_SLICE_BOTH, HEAD_SLICE_SINGLE, MATURE_TAGS,
    RELAXED_MAX_MINUTES, RELAXED_TAGS, STYLE_DURATION_BONUS, STYLE_TAG_BONUS, STYLE_TRAIT_BONUS,
    UNCONDITIONAL_PICKS, YOUNG_TAGS,
};
use crate::data::{Catalog, Category, Difficulty, PointOfInterest};
use crate::profile::{AgeBand, AreaPreference, Gender, PreferenceProfile, TravelStyle};

/// A catalog entry scored for one profile. Recomputed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub spot: PointOfInterest,
    pub score: f64,
}

fn style_bonus(spot: &PointOfInterest, style: TravelStyle) -> i32 {
    let mut score = 0;
    match style {
        TravelStyle::Relaxed => {
            if spot.has_any_tag(RELAXED_TAGS) {
                score += STYLE_TAG_BONUS;
            }
            if spot.difficulty == Difficulty::Easy {
                score += STYLE_TRAIT_BONUS;
            }
            if spot.duration_minutes <= RELAXED_MAX_MINUTES {
                score += STYLE_DURATION_BONUS;
            }
        }
        TravelStyle::Active => {
            if spot.has_any_tag(ACTIVE_TAGS) {
                score += STYLE_TAG_BONUS;
            }
            if matches!(spot.difficulty, Difficulty::Moderate | Difficulty::Hard) {
                score += STYLE_TRAIT_BONUS;
            }
            if spot.duration_minutes >= ACTIVE_MIN_MINUTES {
                score += STYLE_DURATION_BONUS;
            }
        }
        TravelStyle::Cultural => {
            if spot.has_any_tag(CULTURAL_TAGS) {
                score += STYLE_TAG_BONUS;
            }
            if matches!(spot.category, Category::Temple | Category::Shrine) {
                score += STYLE_TRAIT_BONUS;
            }
        }
        TravelStyle::Gourmet => {
            if spot.has_any_tag(GOURMET_TAGS) {
                score += STYLE_TAG_BONUS;
            }
            if matches!(spot.category, Category::Food | Category::Shopping) {
                score += STYLE_TRAIT_BONUS;
            }
        }
    }
    score
}

fn age_bonus(spot: &PointOfInterest, age: AgeBand) -> i32 {
    let tags = match age {
        AgeBand::Teens | AgeBand::Twenties => YOUNG_TAGS,
        AgeBand::Thirties | AgeBand::Forties => COUPLE_TAGS,
        AgeBand::Fifties => MATURE_TAGS,
        AgeBand::Other => return 0,
    };
    if spot.has_any_tag(tags) { AGE_TAG_BONUS } else { 0 }
}

fn gender_bonus(spot: &PointOfInterest, gender: Gender) -> i32 {
    if gender == Gender::Female && spot.has_any_tag(FEMALE_TAGS) {
        GENDER_TAG_BONUS
    } else {
        0
    }
}

/// Score for one spot under one profile.
#[must_use]
pub fn score_spot(spot: &PointOfInterest, profile: &PreferenceProfile) -> i32 {
    style_bonus(spot, profile.travel_style)
        + age_bonus(spot, profile.age)
        + gender_bonus(spot, profile.gender)
}

/// Area-filter the catalog and score what remains, preserving catalog order.
#[must_use]
pub fn score_candidates(catalog: &Catalog, profile: &PreferenceProfile) -> Vec<ScoredCandidate> {
    let area = profile.must_visit.restricts_to();
    catalog
        .iter()
        .filter(|spot| area.is_none_or(|area| spot.area == area))
        .map(|spot| ScoredCandidate {
            spot: spot.clone(),
            score: f64::from(score_spot(spot, profile)),
        })
        .collect()
}

/// Ranked, category-diversified base selection (at most four stops).
///
/// Sorting is stable, so equal scores keep catalog order. The first three picks are
/// accepted unconditionally; after that only categories not yet used are accepted.
#[must_use]
pub fn select_candidates(catalog: &Catalog, profile: &PreferenceProfile) -> Vec<PointOfInterest> {
    let mut scored = score_candidates(catalog, profile);
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    let head = if profile.must_visit == AreaPreference::Both {
        HEAD_SLICE_BOTH
    } else {
        HEAD_SLICE_SINGLE
    };
    scored.truncate(head);

    let mut picked: Vec<PointOfInterest> = Vec::with_capacity(BASE_PLAN_MAX);
    let mut used_categories: HashSet<Category> = HashSet::new();
    for candidate in scored {
        if picked.len() < UNCONDITIONAL_PICKS || !used_categories.contains(&candidate.spot.category)
        {
            used_categories.insert(candidate.spot.category);
            picked.push(candidate.spot);
        }
        if picked.len() >= BASE_PLAN_MAX {
            break;
        }
    }
    picked
}

/// Drop later entries whose name repeats an earlier one, then cap the length.
#[must_use]
pub fn dedupe_by_name(spots: Vec<PointOfInterest>, max_len: usize) -> Vec<PointOfInterest> {
    let mut seen: HashSet<String> = HashSet::new();
    spots
        .into_iter()
        .filter(|spot| seen.insert(spot.name.clone()))
        .take(max_len)
        .collect()
}
