use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tourpass_core::{
    AgeBand, Area, AreaPreference, Catalog, Category, ContentProvider, ContentQuery, Coordinate,
    Difficulty, FixedClock, Gender, MemoryStore, NotFoundKind, PointOfInterest,
    PreferenceProfile, ProviderError, TourConfig, TourEngine, TourError, TravelStyle,
    select_candidates,
};

fn fixture_catalog() -> Catalog {
    Catalog::from_json(include_str!("../../assets/data/catalog.json")).unwrap()
}

fn engine() -> TourEngine<MemoryStore, FixedClock> {
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2026, 5, 3, 8, 30, 0).unwrap());
    TourEngine::new(MemoryStore::new(), clock).with_id_seed(0x00C0_FFEE)
}

fn spot(id: &str, category: Category, tags: &[&str]) -> PointOfInterest {
    PointOfInterest {
        id: id.to_string(),
        name: id.to_string(),
        description: String::new(),
        area: Area::Kamakura,
        category,
        tags: tags.iter().map(ToString::to_string).collect(),
        duration_minutes: 60,
        difficulty: Difficulty::Easy,
        coordinates: Coordinate::new(35.3167, 139.5358),
        open_hours: String::new(),
        best_visit_time: None,
        entrance_fee: 0,
        tips: Vec::new(),
        rewards: Vec::new(),
    }
}

#[test]
fn gourmet_profile_puts_food_first() {
    let catalog = Catalog::from_spots(vec![
        spot("shrine", Category::Shrine, &[]),
        spot("food", Category::Food, &["gourmet"]),
        spot("nature-1", Category::Nature, &[]),
        spot("nature-2", Category::Nature, &[]),
        spot("culture", Category::Culture, &[]),
    ]);
    let profile = PreferenceProfile {
        travel_style: TravelStyle::Gourmet,
        ..PreferenceProfile::default()
    };

    let picked = select_candidates(&catalog, &profile);
    assert_eq!(picked[0].id, "food");

    let mut seen = HashSet::new();
    let repeats_after_three = picked
        .iter()
        .enumerate()
        .filter(|(index, s)| !seen.insert(s.category) && *index >= 3)
        .count();
    assert!(repeats_after_three <= 1);
    assert_eq!(
        picked.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["food", "shrine", "nature-1"]
    );

    let both = PreferenceProfile {
        must_visit: AreaPreference::Both,
        ..profile
    };
    let picked = select_candidates(&catalog, &both);
    assert_eq!(
        picked.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["food", "shrine", "nature-1", "culture"]
    );
}

#[tokio::test]
async fn every_profile_yields_three_to_eight_unique_stops() {
    let catalog = fixture_catalog();
    let engine = engine();
    let styles = [
        TravelStyle::Relaxed,
        TravelStyle::Active,
        TravelStyle::Cultural,
        TravelStyle::Gourmet,
    ];
    let areas = [
        AreaPreference::Enoshima,
        AreaPreference::Kamakura,
        AreaPreference::Both,
        AreaPreference::Undecided,
    ];
    let ages = [
        AgeBand::Teens,
        AgeBand::Twenties,
        AgeBand::Thirties,
        AgeBand::Forties,
        AgeBand::Fifties,
        AgeBand::Other,
    ];
    let genders = [Gender::Female, Gender::Male, Gender::Unspecified];

    for travel_style in styles {
        for must_visit in areas {
            for age in ages {
                for gender in genders {
                    let profile = PreferenceProfile {
                        gender,
                        age,
                        travel_style,
                        must_visit,
                        ..PreferenceProfile::default()
                    };
                    let plan = engine.plan_itinerary(&catalog, &profile).await.unwrap().stops;
                    assert!(
                        (3..=8).contains(&plan.len()),
                        "{profile:?} produced {} stops",
                        plan.len()
                    );
                    let names: HashSet<_> = plan.iter().map(|s| s.name.as_str()).collect();
                    assert_eq!(names.len(), plan.len(), "duplicate names for {profile:?}");
                    if let Some(area) = must_visit.restricts_to() {
                        assert!(plan.iter().all(|s| s.area == area));
                    }
                }
            }
        }
    }
}

#[tokio::test]
async fn named_spot_resolves_from_catalog_first() {
    let engine = engine();
    let profile = PreferenceProfile {
        custom_spot: Some("great buddha".to_string()),
        must_visit: AreaPreference::Enoshima,
        ..PreferenceProfile::default()
    };
    let plan = engine
        .plan_itinerary(&fixture_catalog(), &profile)
        .await
        .unwrap();
    assert!(plan.unresolved.is_none());
    let plan = plan.stops;
    assert_eq!(plan[0].id, "kamakura-daibutsu");
    assert!(plan[1..].iter().all(|s| s.area == Area::Enoshima));
}

#[tokio::test]
async fn named_spot_already_selected_keeps_base_order() {
    let catalog = Catalog::from_spots(vec![
        spot("a", Category::Temple, &[]),
        spot("b", Category::Nature, &[]),
        spot("c", Category::Culture, &[]),
    ]);
    let base: Vec<_> = select_candidates(&catalog, &PreferenceProfile::default())
        .into_iter()
        .map(|s| s.id)
        .collect();
    let profile = PreferenceProfile {
        custom_spot: Some(base[2].to_uppercase()),
        ..PreferenceProfile::default()
    };

    let plan = engine().plan_itinerary(&catalog, &profile).await.unwrap();
    assert!(plan.unresolved.is_none());
    assert_eq!(plan.stops.into_iter().map(|s| s.id).collect::<Vec<_>>(), base);
}

#[tokio::test]
async fn unknown_named_spot_is_reported_alongside_the_plan() {
    let catalog = fixture_catalog();
    let profile = PreferenceProfile {
        custom_spot: Some("Atlantis".to_string()),
        ..PreferenceProfile::default()
    };
    let base: Vec<_> = select_candidates(&catalog, &profile)
        .into_iter()
        .map(|s| s.id)
        .collect();

    let plan = engine().plan_itinerary(&catalog, &profile).await.unwrap();
    assert_eq!(plan.stops.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), base);
    match plan.unresolved {
        Some(TourError::NotFound {
            kind: NotFoundKind::Spot,
            id,
        }) => assert_eq!(id, "Atlantis"),
        other => panic!("expected an unresolved spot, got {other:?}"),
    }

    // A provider that finds nothing leaves the spot unresolved too.
    let broken = engine().with_content(Arc::new(BrokenContent));
    let plan = broken.plan_itinerary(&catalog, &profile).await.unwrap();
    assert!(plan.unresolved.is_some_and(|err| err.is_user_facing()));
}

#[tokio::test]
async fn empty_catalog_without_provider_is_rejected() {
    let err = engine()
        .plan_itinerary(&Catalog::empty(), &PreferenceProfile::default())
        .await
        .unwrap_err();
    assert!(err.is_user_facing());
}

#[derive(Default)]
struct ScriptedContent {
    queries: Mutex<Vec<ContentQuery>>,
}

#[async_trait]
impl ContentProvider for ScriptedContent {
    async fn generate(&self, query: &ContentQuery) -> Result<String, ProviderError> {
        self.queries.lock().unwrap().push(query.clone());
        let body = match query {
            ContentQuery::Named { .. } => {
                r#"[{"name": "Zeniarai Benten", "category": "shrine",
                     "coordinates": {"lat": 35.3236, "lng": 139.5433}}]"#
            }
            ContentQuery::Category { category, .. } if category == "gourmet & cafes" => {
                r#"Here you go:
                [
                  {"name": "Cafe Ethica", "category": "food"},
                  {"name": "Komachi Street", "category": "shopping"},
                  {"name": "Bills Shichirigahama", "category": "food"}
                ]"#
            }
            ContentQuery::Category { .. } => {
                r#"[{"name": "Jomyoji Tea House", "category": "food"},
                    {"name": "Ishigama Garden Terrace", "category": "food"}]"#
            }
            ContentQuery::Intent { .. } => {
                "```json\n[\n{\"name\": \"Shirasu Stand A\", \"category\": \"food\",},\n\
                 {\"name\": \"Shirasu Stand B\", \"category\": \"food\",},\n\
                 {\"name\": \"Shirasu Stand C\", \"category\": \"food\"},\n]\n```"
            }
        };
        Ok(body.to_string())
    }
}

#[tokio::test]
async fn supplemental_searches_are_capped_deduped_and_truncated() {
    let content = Arc::new(ScriptedContent::default());
    let engine = engine().with_content(content.clone());
    let profile = PreferenceProfile {
        gender: Gender::Female,
        age: AgeBand::Twenties,
        travel_style: TravelStyle::Gourmet,
        must_visit: AreaPreference::Both,
        interests: vec!["tea".to_string()],
        what_to_do: Some("eat shirasu".to_string()),
        custom_spot: Some("Zeniarai Benten".to_string()),
    };

    let plan = engine
        .plan_itinerary(&fixture_catalog(), &profile)
        .await
        .unwrap()
        .stops;
    let names: Vec<_> = plan.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Zeniarai Benten",
            "Komachi Street",
            "Enoshima Shirasu Row",
            "Enoshima Shrine",
            "Hasedera Temple",
            "Cafe Ethica",
            "Jomyoji Tea House",
            "Shirasu Stand A",
        ]
    );
    assert_eq!(plan[0].area, Area::Enoshima);
    assert!(plan[0].has_tag("web-search"));
    assert!(plan[5].has_tag("category-search"));
    assert!(plan[7].has_tag("what-to-do"));
    assert_eq!(plan[1].id, "komachi-street", "catalog entry wins the name clash");

    let queries = content.queries.lock().unwrap();
    assert_eq!(queries.len(), 4);
    assert_eq!(queries[0].area(), Area::Enoshima);
    assert!(queries[1..].iter().all(|q| q.area() == Area::Kamakura));
    match &queries[3] {
        ContentQuery::Intent { preference, .. } => {
            assert_eq!(preference, "female, 20s, gourmet");
        }
        other => panic!("unexpected query {other:?}"),
    }
}

struct SlowContent;

#[async_trait]
impl ContentProvider for SlowContent {
    async fn generate(&self, _query: &ContentQuery) -> Result<String, ProviderError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("[]".to_string())
    }
}

struct BrokenContent;

#[async_trait]
impl ContentProvider for BrokenContent {
    async fn generate(&self, query: &ContentQuery) -> Result<String, ProviderError> {
        match query {
            ContentQuery::Intent { .. } => Err(ProviderError::Unavailable("quota".to_string())),
            _ => Ok("I could not find anything, sorry!".to_string()),
        }
    }
}

#[tokio::test]
async fn provider_failures_degrade_to_base_selection() {
    let catalog = fixture_catalog();
    let profile = PreferenceProfile {
        travel_style: TravelStyle::Cultural,
        must_visit: AreaPreference::Kamakura,
        interests: vec!["zen".to_string()],
        what_to_do: Some("see bamboo".to_string()),
        ..PreferenceProfile::default()
    };
    let base: Vec<_> = select_candidates(&catalog, &profile)
        .into_iter()
        .map(|s| s.id)
        .collect();

    let fast_timeout = TourConfig {
        provider_timeout_ms: 20,
        ..TourConfig::default()
    };
    let slow = engine()
        .with_config(fast_timeout)
        .unwrap()
        .with_content(Arc::new(SlowContent));
    let plan = slow.plan_itinerary(&catalog, &profile).await.unwrap().stops;
    assert_eq!(plan.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), base);

    let broken = engine().with_content(Arc::new(BrokenContent));
    let plan = broken.plan_itinerary(&catalog, &profile).await.unwrap().stops;
    assert_eq!(plan.iter().map(|s| s.id.clone()).collect::<Vec<_>>(), base);
}
