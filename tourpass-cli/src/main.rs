mod common;
mod logic;

use anyhow::{Context, Result};
use chrono::{NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use common::{EstimatedDirections, FixtureContent, JsonFileStore};
use logic::{
    AcceptReport, PlanReport, ProgressReport, ReportFormat, RewardList, emit, simulate_tour,
};
use tourpass_core::{
    AgeBand, AreaPreference, Catalog, Clock, FixedClock, Gender, MemoryStore, PointOfInterest,
    PositionReading, PreferenceProfile, RewardCategory, SystemClock, TourConfig, TourEngine,
    TourError, TravelStyle, VisitorId, VisitorStore,
};

const BUILTIN_CATALOG: &str = include_str!("../../assets/data/catalog.json");

#[derive(Debug, Parser)]
#[command(name = "tourpass", version)]
#[command(about = "Plan an Enoshima and Kamakura tour, check in at stops and redeem rewards")]
struct Cli {
    /// JSON file overriding engine tuning
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding per-visitor progress, rewards and itineraries
    #[arg(long, global = true, default_value = ".tourpass")]
    state_dir: PathBuf,

    /// Spot catalog JSON (defaults to the bundled catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Canned content-provider responses keyed by query kind
    #[arg(long, global = true)]
    content_fixture: Option<PathBuf>,

    /// Output report format
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Console)]
    format: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recommend and schedule an itinerary for a profile
    Plan {
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        start: StartArgs,
        /// Write the scheduled stops as JSON for `accept --itinerary`
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Start tracking an itinerary and collect its instant rewards
    Accept {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
        /// Itinerary JSON written by `plan --save`
        #[arg(long, required_unless_present = "spots")]
        itinerary: Option<PathBuf>,
        /// Catalog spot ids, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "itinerary")]
        spots: Vec<String>,
    },
    /// Submit a position reading against the accepted itinerary
    CheckIn {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Reported accuracy in meters
        #[arg(long)]
        accuracy: Option<f64>,
    },
    /// List rewards
    Rewards {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
        /// Only rewards redeemable at these spot ids (`general` for shop-wide ones)
        #[arg(long, value_delimiter = ',')]
        scope: Vec<String>,
        /// Show redeemed rewards instead
        #[arg(long, conflicts_with_all = ["scope", "category"])]
        used: bool,
        #[arg(long, value_parser = parse_choice::<RewardCategory>, conflicts_with = "scope")]
        category: Option<RewardCategory>,
    },
    /// Mark a reward used
    Redeem {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
        #[arg(long)]
        reward: String,
    },
    /// Check whether a reward can still be used
    Validate {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
        #[arg(long)]
        reward: String,
    },
    /// Show completion progress
    Progress {
        #[arg(long, value_parser = parse_visitor)]
        visitor: VisitorId,
    },
    /// Walk a whole planned itinerary in memory and report what it earns
    Simulate {
        #[command(flatten)]
        profile: ProfileArgs,
        #[command(flatten)]
        start: StartArgs,
        /// Seed for reward ids
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Args)]
struct ProfileArgs {
    #[arg(long, value_parser = parse_choice::<Gender>, default_value = "unspecified")]
    gender: Gender,
    /// 10s, 20s, 30s, 40s, 50s or other
    #[arg(long, value_parser = parse_choice::<AgeBand>, default_value = "other")]
    age: AgeBand,
    /// relaxed, active, cultural or gourmet
    #[arg(long, value_parser = parse_choice::<TravelStyle>, default_value = "relaxed")]
    style: TravelStyle,
    /// enoshima, kamakura, both or undecided
    #[arg(long, value_parser = parse_choice::<AreaPreference>, default_value = "undecided")]
    area: AreaPreference,
    /// Extra interests, comma separated
    #[arg(long = "interest", value_delimiter = ',')]
    interests: Vec<String>,
    #[arg(long)]
    what_to_do: Option<String>,
    /// A spot the visitor wants included
    #[arg(long)]
    custom_spot: Option<String>,
}

impl From<ProfileArgs> for PreferenceProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            gender: args.gender,
            age: args.age,
            travel_style: args.style,
            must_visit: args.area,
            interests: args.interests,
            what_to_do: args.what_to_do,
            custom_spot: args.custom_spot,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct StartArgs {
    /// Local start time, HH:MM
    #[arg(long = "start", value_parser = parse_start, default_value = "09:00")]
    time: NaiveTime,
    #[arg(long, default_value = "kamakura_station")]
    start_location: String,
}

fn parse_choice<T: FromStr<Err = ()>>(s: &str) -> Result<T, String> {
    s.parse().map_err(|()| format!("unsupported value `{s}`"))
}

fn parse_visitor(s: &str) -> Result<VisitorId, String> {
    VisitorId::new(s).map_err(|err| err.to_string())
}

fn parse_start(s: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|err| format!("{s}: {err}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    if cli.output.is_some() {
        colored::control::set_override(false);
    }

    let config = load_config(cli.config.as_deref())?;
    let catalog = load_catalog(cli.catalog.as_deref())?;
    let content = cli
        .content_fixture
        .as_deref()
        .map(FixtureContent::load)
        .transpose()?
        .map(Arc::new);

    let mut output_target = OutputTarget::new(cli.output.clone())?;
    run(cli, config, &catalog, content, output_target.writer()).await?;
    output_target.flush_inner()?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<TourConfig> {
    let Some(path) = path else {
        return Ok(TourConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    TourConfig::from_json(&json)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read catalog {}", path.display()))?;
            Catalog::from_json(&json)
                .with_context(|| format!("invalid catalog {}", path.display()))
        }
        None => Catalog::from_json(BUILTIN_CATALOG).context("bundled catalog is invalid"),
    }
}

fn configure<S: VisitorStore, C: Clock>(
    engine: TourEngine<S, C>,
    config: TourConfig,
    content: Option<Arc<FixtureContent>>,
) -> Result<TourEngine<S, C>> {
    let engine = engine
        .with_config(config)?
        .with_directions(Arc::new(EstimatedDirections));
    Ok(match content {
        Some(content) => engine.with_content(content),
        None => engine,
    })
}

fn resolve_spots(catalog: &Catalog, ids: &[String]) -> Result<Vec<PointOfInterest>, TourError> {
    ids.iter()
        .map(|id| {
            catalog
                .find_by_id(id)
                .cloned()
                .ok_or_else(|| TourError::spot_not_found(id.as_str()))
        })
        .collect()
}

fn read_itinerary(path: &Path) -> Result<Vec<PointOfInterest>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read itinerary {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid itinerary {}", path.display()))
}

async fn run(
    cli: Cli,
    config: TourConfig,
    catalog: &Catalog,
    content: Option<Arc<FixtureContent>>,
    out: &mut dyn Write,
) -> Result<()> {
    let format = cli.format;
    let store = JsonFileStore::new(&cli.state_dir);
    let engine = configure(
        TourEngine::new(store.clone(), SystemClock),
        config.clone(),
        content.clone(),
    )?;

    match cli.command {
        Command::Plan {
            profile,
            start,
            save,
        } => {
            let profile = PreferenceProfile::from(profile);
            let plan = engine.plan_itinerary(catalog, &profile).await?;
            let unresolved = plan.unresolved.map(|err| {
                log::warn!("{err}");
                err.to_string()
            });
            let schedule =
                engine.schedule_itinerary(&plan.stops, start.time, &start.start_location);
            let ordered: Vec<PointOfInterest> =
                schedule.stops.iter().map(|stop| stop.spot.clone()).collect();
            let segments = engine.route_segments(&ordered).await;
            if let Some(path) = save {
                let body = serde_json::to_vec_pretty(&ordered)?;
                std::fs::write(&path, body)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                log::info!("saved {} stops to {}", ordered.len(), path.display());
            }
            emit(
                out,
                format,
                &PlanReport {
                    profile,
                    schedule,
                    segments,
                    unresolved,
                },
            )
        }
        Command::Accept {
            visitor,
            itinerary,
            spots,
        } => {
            let stops = match itinerary {
                Some(path) => read_itinerary(&path)?,
                None => resolve_spots(catalog, &spots)?,
            };
            let instant_rewards = engine.accept_itinerary(&visitor, &stops)?;
            store
                .save_itinerary(&visitor, &stops)
                .context("failed to persist itinerary")?;
            emit(
                out,
                format,
                &AcceptReport {
                    visitor: visitor.to_string(),
                    stops,
                    instant_rewards,
                },
            )
        }
        Command::CheckIn {
            visitor,
            lat,
            lng,
            accuracy,
        } => {
            let stops: Vec<PointOfInterest> = store
                .load_itinerary(&visitor)?
                .with_context(|| format!("{visitor} has no accepted itinerary"))?;
            let reading = PositionReading {
                coordinates: tourpass_core::Coordinate::new(lat, lng),
                accuracy_m: accuracy,
                timestamp: engine.clock().now(),
            };
            let report = engine.submit_check_in(&visitor, &reading, &stops)?;
            emit(out, format, &report)
        }
        Command::Rewards {
            visitor,
            scope,
            used,
            category,
        } => {
            let report = if used {
                RewardList {
                    title: "Used rewards".to_string(),
                    rewards: engine.used_rewards(&visitor)?,
                }
            } else if let Some(category) = category {
                RewardList {
                    title: format!("{category} rewards"),
                    rewards: engine.rewards_by_category(&visitor, category)?,
                }
            } else {
                let filter = (!scope.is_empty()).then_some(scope.as_slice());
                RewardList {
                    title: "Available rewards".to_string(),
                    rewards: engine.list_available_rewards(&visitor, filter)?,
                }
            };
            emit(out, format, &report)
        }
        Command::Redeem { visitor, reward } => {
            let redeemed = engine.redeem_reward(&visitor, &reward)?;
            emit(out, format, &redeemed)
        }
        Command::Validate { visitor, reward } => {
            let validity = engine.validate_reward(&visitor, &reward)?;
            emit(out, format, &validity)
        }
        Command::Progress { visitor } => {
            let stops: Vec<PointOfInterest> =
                store.load_itinerary(&visitor)?.unwrap_or_default();
            let progress = engine.progress(&visitor)?;
            emit(out, format, &ProgressReport::new(progress, &stops))
        }
        Command::Simulate {
            profile,
            start,
            seed,
        } => {
            let clock = FixedClock::new(Utc::now());
            let mut engine =
                configure(TourEngine::new(MemoryStore::new(), clock), config, content)?;
            if let Some(seed) = seed {
                engine = engine.with_id_seed(seed);
            }
            let profile = PreferenceProfile::from(profile);
            let report =
                simulate_tour(engine, catalog, &profile, start.time, &start.start_location)
                    .await?;
            emit(out, format, &report)
        }
    }
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}
