use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use relief_core::proximity::rank_nearest;
use relief_core::report::new_disaster_id;
use relief_core::tasking::{heuristic_draft, normalize_urgency, HeuristicInput};
use relief_core::types::ResourceCandidate;
use relief_core::{Coordinates, PipelineConfig};
use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Relief pipeline operator tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the effective pipeline configuration
    Config(ConfigArgs),
    /// Print the geohash cell of a point and a fresh disaster id
    Geohash(GeohashArgs),
    /// Rank resource candidates by distance to a point
    Rank(RankArgs),
    /// Run the keyword fallback on a help request
    Triage(TriageArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// TOML file to load before applying RELIEF_* overrides
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GeohashArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    #[arg(long, default_value_t = relief_core::geo::DISASTER_CELL_PRECISION)]
    precision: usize,
}

#[derive(Args, Debug)]
struct RankArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    /// JSON array of resource candidates
    #[arg(long)]
    resources: PathBuf,
    #[arg(long, default_value_t = 5)]
    top: usize,
}

#[derive(Args, Debug)]
struct TriageArgs {
    #[arg(long)]
    help_text: String,
    #[arg(long, default_value = "medium")]
    urgency: String,
    #[arg(long, default_value = "general emergency")]
    emergency_type: String,
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    lat: f64,
    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    lon: f64,
    /// Optional JSON array of resource candidates; the nearest one is referenced
    #[arg(long)]
    resources: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Config(args) => {
            let config = PipelineConfig::load(args.file.as_deref())
                .context("failed to load pipeline configuration")?;
            print_json(&config)
        }
        Command::Geohash(args) => {
            let point = Coordinates::new(args.lat, args.lon);
            print_json(&json!({
                "geohash": point.geohash(args.precision),
                "cell": point.disaster_cell(),
                "disaster_id": new_disaster_id(&point),
            }))
        }
        Command::Rank(args) => {
            let origin = Coordinates::new(args.lat, args.lon);
            let candidates = read_resources(&args.resources)?;
            let total = candidates.len();
            let ranked = rank_nearest(&origin, candidates, args.top);
            info!(total, kept = ranked.len(), "resources ranked");
            print_json(&ranked)
        }
        Command::Triage(args) => print_json(&triage(&args)?),
    }
}

/// Same urgency normalization and nearest-resource lookup as the task
/// pipeline, then the keyword fallback.
fn triage(args: &TriageArgs) -> Result<Value> {
    let location = Coordinates::new(args.lat, args.lon);
    let urgency = normalize_urgency(&args.urgency);
    let nearest = match &args.resources {
        Some(path) => rank_nearest(&location, read_resources(path)?, 1)
            .into_iter()
            .next()
            .map(|ranked| {
                ranked
                    .item
                    .name
                    .unwrap_or_else(|| "nearby resource".to_string())
            }),
        None => None,
    };
    let draft = heuristic_draft(&HeuristicInput {
        help_text: &args.help_text,
        emergency_type: &args.emergency_type,
        urgency: &urgency,
        location,
        nearest_resource: nearest.as_deref(),
    });
    Ok(json!({
        "urgency": urgency,
        "description": draft.description,
        "assignment": draft.assignment,
        "roles": draft.assignment.roles(),
        "reasoning": draft.reasoning,
        "resource_utilization": draft.resource_utilization,
    }))
}

fn read_resources(path: &Path) -> Result<Vec<ResourceCandidate>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read resources from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse resources in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
