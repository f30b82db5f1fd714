//! Tourpass itinerary engine
//!
//! Platform-agnostic core for recommending, scheduling and tracking a sightseeing
//! itinerary around Enoshima and Kamakura, and for issuing the rewards visitors earn
//! along the way. Storage, time and the directions/content services are injected.

pub mod clock;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod geo;
pub mod numbers;
pub mod profile;
pub mod progress;
pub mod providers;
pub mod rewards;
pub mod route;
pub mod schedule;
pub mod selector;
pub mod store;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, TourConfig};
pub use data::{Area, Catalog, Category, Difficulty, PointOfInterest, RewardTemplate, VisitWindow};
pub use error::{NotFoundKind, ProviderError, RewardConflict, TourError};
pub use geo::{Coordinate, distance_m};
pub use profile::{AgeBand, AreaPreference, Gender, PreferenceProfile, TravelStyle};
pub use progress::{
    CheckInResult, CompletionState, PositionReading, locate_check_in, milestone_label,
    next_unvisited,
};
pub use providers::{ContentProvider, ContentQuery, DirectionsProvider, parse_candidates};
pub use rewards::{IssuedReward, RewardCategory, RewardIdMinter, RewardPolicy, RewardValidity};
pub use route::{
    Recommendation, RecommendedMethod, RouteLeg, RouteSegment, RouteStep, TransitDetails,
    TravelMode,
};
pub use schedule::{Schedule, ScheduledStop, tour_duration_minutes};
pub use selector::{ScoredCandidate, score_candidates, select_candidates};
pub use store::{MemoryStore, RecordKind, VisitorId, VisitorStore};

use providers::{fetch_candidates, fetch_leg, lookup_segments};
use store::{load_record, save_record};

/// Everything that happened as a result of one position reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInReport {
    pub result: CheckInResult,
    pub reading: PositionReading,
    /// True only when this reading recorded a visit not seen before.
    pub newly_visited: bool,
    pub progress: CompletionState,
    pub milestones_crossed: Vec<u8>,
    pub rewards_issued: Vec<IssuedReward>,
}

impl CheckInReport {
    #[must_use]
    pub fn message(&self) -> String {
        if self.result.is_success() && !self.newly_visited {
            format!("{} (already visited)", self.result.message())
        } else {
            self.result.message()
        }
    }
}

/// A planned itinerary plus the named spot the visitor asked for, when it could not
/// be found.
#[derive(Debug)]
pub struct ItineraryPlan {
    pub stops: Vec<PointOfInterest>,
    /// [`TourError::NotFound`] for a requested spot unknown to the catalog and the
    /// content provider. The rest of the plan is still usable.
    pub unresolved: Option<TourError>,
}

type LockTable = Mutex<HashMap<VisitorId, Arc<Mutex<()>>>>;

/// Shared handle on one visitor's lock. The table entry is dropped with the last
/// lease so the table only holds visitors with work in flight.
struct VisitorLease<'a> {
    table: &'a LockTable,
    visitor: &'a VisitorId,
    lock: Arc<Mutex<()>>,
}

impl VisitorLease<'_> {
    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for VisitorLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // One count for the table, one for this lease.
        if Arc::strong_count(&self.lock) == 2
            && locks
                .get(self.visitor)
                .is_some_and(|held| Arc::ptr_eq(held, &self.lock))
        {
            locks.remove(self.visitor);
        }
    }
}

/// Main engine tying selection, scheduling, progress and rewards to visitor state
pub struct TourEngine<S, C>
where
    S: VisitorStore,
    C: Clock,
{
    store: S,
    clock: C,
    config: TourConfig,
    policy: RewardPolicy,
    minter: RewardIdMinter,
    directions: Option<Arc<dyn DirectionsProvider>>,
    content: Option<Arc<dyn ContentProvider>>,
    locks: LockTable,
}

impl<S, C> TourEngine<S, C>
where
    S: VisitorStore,
    C: Clock,
{
    /// Create an engine with default configuration and no external providers.
    pub fn new(store: S, clock: C) -> Self {
        let seed = clock.now().timestamp_millis().unsigned_abs();
        Self {
            store,
            clock,
            config: TourConfig::default(),
            policy: RewardPolicy::default(),
            minter: RewardIdMinter::new(seed),
            directions: None,
            content: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated configuration invariant.
    pub fn with_config(mut self, config: TourConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RewardPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Seed reward ids explicitly, for reproducible runs.
    #[must_use]
    pub fn with_id_seed(mut self, seed: u64) -> Self {
        self.minter = RewardIdMinter::new(seed);
        self
    }

    #[must_use]
    pub fn with_directions(mut self, provider: Arc<dyn DirectionsProvider>) -> Self {
        self.directions = Some(provider);
        self
    }

    #[must_use]
    pub fn with_content(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.content = Some(provider);
        self
    }

    pub const fn config(&self) -> &TourConfig {
        &self.config
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }

    fn visitor_lock<'a>(&'a self, visitor: &'a VisitorId) -> VisitorLease<'a> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        VisitorLease {
            table: &self.locks,
            visitor,
            lock: Arc::clone(locks.entry(visitor.clone()).or_default()),
        }
    }

    /// Build a candidate itinerary for a profile.
    ///
    /// Content-provider failures only shrink the result; they never fail the plan. A
    /// named spot nobody can resolve is reported in [`ItineraryPlan::unresolved`].
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Input`] when the catalog is empty and no content provider
    /// is configured.
    pub async fn plan_itinerary(
        &self,
        catalog: &Catalog,
        profile: &PreferenceProfile,
    ) -> Result<ItineraryPlan, TourError> {
        if catalog.is_empty() && self.content.is_none() {
            return Err(TourError::input(
                "catalog is empty and no content provider is configured",
            ));
        }
        let timeout = self.config.provider_timeout();
        let base = select_candidates(catalog, profile);
        let mut plan: Vec<PointOfInterest> = Vec::new();
        let mut unresolved = None;

        if let Some(name) = profile.custom_spot() {
            let named = if let Some(known) = catalog.find_by_name(name) {
                vec![known.clone()]
            } else if let Some(content) = &self.content {
                let query = ContentQuery::Named {
                    name: name.to_string(),
                    area: profile.must_visit.named_lookup_area(),
                };
                fetch_candidates(content.as_ref(), &query, timeout, 1).await
            } else {
                Vec::new()
            };
            if named.is_empty() {
                log::debug!("custom spot {name:?} could not be resolved");
                unresolved = Some(TourError::spot_not_found(name));
            }
            // Only spots missing from the base selection move to the front.
            plan.extend(named.into_iter().filter(|spot| {
                !base.iter().any(|picked| {
                    picked.id == spot.id || picked.name.eq_ignore_ascii_case(&spot.name)
                })
            }));
        }

        plan.extend(base);

        if let Some(content) = &self.content {
            let area = profile.must_visit.search_area();
            let preference = profile.preference_text();
            if let Some(category) = profile.travel_style.supplemental_query() {
                let query = ContentQuery::Category {
                    area,
                    category: category.to_string(),
                    preference: preference.clone(),
                };
                plan.extend(
                    fetch_candidates(
                        content.as_ref(),
                        &query,
                        timeout,
                        self.config.style_search_cap,
                    )
                    .await,
                );
            }
            for interest in profile
                .interests
                .iter()
                .map(|interest| interest.trim())
                .filter(|interest| !interest.is_empty())
            {
                let query = ContentQuery::Category {
                    area,
                    category: interest.to_string(),
                    preference: preference.clone(),
                };
                plan.extend(
                    fetch_candidates(
                        content.as_ref(),
                        &query,
                        timeout,
                        self.config.interest_search_cap,
                    )
                    .await,
                );
            }
            if let Some(intent) = profile.what_to_do() {
                let query = ContentQuery::Intent {
                    area,
                    intent: intent.to_string(),
                    preference,
                };
                plan.extend(
                    fetch_candidates(
                        content.as_ref(),
                        &query,
                        timeout,
                        self.config.intent_search_cap,
                    )
                    .await,
                );
            }
        }

        let stops = selector::dedupe_by_name(plan, self.config.max_stops);
        log::debug!("planned {} stops for {}", stops.len(), profile.preference_text());
        Ok(ItineraryPlan { stops, unresolved })
    }

    /// Timestamp an itinerary starting today at `start`.
    pub fn schedule_itinerary(
        &self,
        stops: &[PointOfInterest],
        start: NaiveTime,
        start_location: &str,
    ) -> Schedule {
        let anchor = self.clock.now().date_naive().and_time(start);
        schedule::schedule_itinerary(stops, anchor, start_location, &self.config)
    }

    /// Transit and walking detail for each consecutive pair of stops.
    ///
    /// Without a directions provider every segment is `unknown`.
    pub async fn route_segments(&self, stops: &[PointOfInterest]) -> Vec<RouteSegment> {
        match &self.directions {
            Some(provider) => {
                lookup_segments(
                    Arc::clone(provider),
                    stops,
                    self.config.provider_timeout(),
                    self.config.walking_preferred_max_secs,
                )
                .await
            }
            None => stops
                .windows(2)
                .map(|pair| RouteSegment {
                    from_id: pair[0].id.clone(),
                    to_id: pair[1].id.clone(),
                    transit: None,
                    walking: None,
                    recommendation: route::recommend(
                        None,
                        None,
                        self.config.walking_preferred_max_secs,
                    ),
                })
                .collect(),
        }
    }

    /// Single directions lookup, `None` when unavailable.
    pub async fn route_info(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        mode: TravelMode,
    ) -> Option<RouteLeg> {
        let provider = self.directions.as_ref()?;
        fetch_leg(
            provider.as_ref(),
            origin,
            destination,
            mode,
            self.config.provider_timeout(),
        )
        .await
    }

    /// Start tracking a new itinerary and grant its instant rewards.
    ///
    /// # Errors
    ///
    /// Rejects an empty itinerary or one listing the same spot twice, and surfaces
    /// storage failures.
    pub fn accept_itinerary(
        &self,
        visitor: &VisitorId,
        stops: &[PointOfInterest],
    ) -> Result<Vec<IssuedReward>, TourError> {
        if stops.is_empty() {
            return Err(TourError::input("itinerary has no stops"));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = stops.iter().find(|spot| !seen.insert(spot.id.as_str())) {
            return Err(TourError::input(format!(
                "spot `{}` appears twice in the itinerary",
                dup.id
            )));
        }

        let lease = self.visitor_lock(visitor);
        let _guard = lease.lock();
        let now = self.clock.now();

        let progress = CompletionState::for_itinerary(stops);
        let mut issued: Vec<IssuedReward> =
            load_record(&self.store, visitor, RecordKind::Rewards)?;
        let instant = rewards::instant_rewards(stops, now, &self.minter, &self.policy);
        issued.extend(instant.iter().cloned());

        save_record(&self.store, visitor, RecordKind::Progress, &progress)?;
        save_record(&self.store, visitor, RecordKind::Rewards, &issued)?;
        log::debug!(
            "{visitor} accepted {} stops, {} instant rewards",
            stops.len(),
            instant.len()
        );
        Ok(instant)
    }

    /// Reconcile a position reading with the itinerary and apply any new visit.
    ///
    /// A reading out of range is an `Ok` report with no state change. Repeating a
    /// check-in is a no-op that issues nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TourError::Input`] for an empty itinerary, an invalid reading or
    /// stops other than the accepted itinerary, and surfaces storage failures.
    pub fn submit_check_in(
        &self,
        visitor: &VisitorId,
        reading: &PositionReading,
        stops: &[PointOfInterest],
    ) -> Result<CheckInReport, TourError> {
        let result = locate_check_in(reading, stops, &self.config)?;

        let lease = self.visitor_lock(visitor);
        let _guard = lease.lock();
        let mut progress: CompletionState =
            load_record(&self.store, visitor, RecordKind::Progress)?;
        if progress.total_spots == 0 {
            progress.reset(stops);
        } else if !progress.tracks(stops) {
            return Err(TourError::input("stops do not match the accepted itinerary"));
        }

        let CheckInResult::Arrived { spot_id, .. } = &result else {
            return Ok(CheckInReport {
                result,
                reading: *reading,
                newly_visited: false,
                progress,
                milestones_crossed: Vec::new(),
                rewards_issued: Vec::new(),
            });
        };

        let old_ratio = progress.completion_percentage();
        let newly_visited = progress.apply_check_in(spot_id, self.config.points_per_visit);
        let mut milestones_crossed = Vec::new();
        let mut rewards_issued = Vec::new();

        if newly_visited {
            let now = self.clock.now();
            if let Some(spot) = stops.iter().find(|spot| &spot.id == spot_id) {
                rewards_issued.extend(rewards::check_in_rewards(spot, now, &self.minter));
            }
            let new_ratio = progress.completion_percentage();
            for (tier, count) in
                rewards::crossed_tiers(old_ratio, new_ratio, &progress.milestones_reached)
            {
                progress.record_milestone(tier);
                milestones_crossed.push(tier);
                rewards_issued.extend(rewards::milestone_rewards(
                    tier,
                    count,
                    now,
                    &self.minter,
                    &self.policy,
                ));
                log::debug!("{visitor} crossed the {tier}% milestone");
            }

            let mut issued: Vec<IssuedReward> =
                load_record(&self.store, visitor, RecordKind::Rewards)?;
            issued.extend(rewards_issued.iter().cloned());
            save_record(&self.store, visitor, RecordKind::Progress, &progress)?;
            save_record(&self.store, visitor, RecordKind::Rewards, &issued)?;
            log::debug!(
                "{visitor} checked in at {spot_id} ({:.1}%)",
                progress.completion_percentage()
            );
        }

        Ok(CheckInReport {
            result,
            reading: *reading,
            newly_visited,
            progress,
            milestones_crossed,
            rewards_issued,
        })
    }

    /// Mark a reward used.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id; `Conflict` when already used or expired.
    pub fn redeem_reward(
        &self,
        visitor: &VisitorId,
        reward_id: &str,
    ) -> Result<IssuedReward, TourError> {
        let lease = self.visitor_lock(visitor);
        let _guard = lease.lock();
        let mut issued: Vec<IssuedReward> =
            load_record(&self.store, visitor, RecordKind::Rewards)?;
        let redeemed = rewards::redeem(&mut issued, reward_id, self.clock.now())?;
        save_record(&self.store, visitor, RecordKind::Rewards, &issued)?;
        log::debug!("{visitor} redeemed {reward_id}");
        Ok(redeemed)
    }

    /// Unused rewards, optionally limited to spot scopes.
    ///
    /// # Errors
    ///
    /// Surfaces storage failures.
    pub fn list_available_rewards(
        &self,
        visitor: &VisitorId,
        filter: Option<&[String]>,
    ) -> Result<Vec<IssuedReward>, TourError> {
        let issued: Vec<IssuedReward> = load_record(&self.store, visitor, RecordKind::Rewards)?;
        Ok(rewards::available(&issued, filter))
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown id; surfaces storage failures.
    pub fn validate_reward(
        &self,
        visitor: &VisitorId,
        reward_id: &str,
    ) -> Result<RewardValidity, TourError> {
        let issued: Vec<IssuedReward> = load_record(&self.store, visitor, RecordKind::Rewards)?;
        let reward = issued
            .iter()
            .find(|reward| reward.id == reward_id)
            .ok_or_else(|| TourError::reward_not_found(reward_id))?;
        Ok(rewards::validate(reward, self.clock.now()))
    }

    /// # Errors
    ///
    /// Surfaces storage failures.
    pub fn progress(&self, visitor: &VisitorId) -> Result<CompletionState, TourError> {
        load_record(&self.store, visitor, RecordKind::Progress)
    }

    /// # Errors
    ///
    /// Surfaces storage failures.
    pub fn used_rewards(&self, visitor: &VisitorId) -> Result<Vec<IssuedReward>, TourError> {
        let issued: Vec<IssuedReward> = load_record(&self.store, visitor, RecordKind::Rewards)?;
        Ok(rewards::used(&issued))
    }

    /// # Errors
    ///
    /// Surfaces storage failures.
    pub fn rewards_by_category(
        &self,
        visitor: &VisitorId,
        category: RewardCategory,
    ) -> Result<Vec<IssuedReward>, TourError> {
        let issued: Vec<IssuedReward> = load_record(&self.store, visitor, RecordKind::Rewards)?;
        Ok(rewards::by_category(&issued, category))
    }
}
