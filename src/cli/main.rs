//! Command-line forward geocoding.
//!
//! Resolves each place text through one paced client and prints the best
//! match per line, or the full normalized results as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ocd_geocoder::{GeoQuery, GeoResult, Geocoder, GeocoderOptions};

#[derive(Parser, Debug)]
#[command(name = "geocode")]
#[command(about = "Forward geocode place descriptions")]
struct Args {
    /// Place descriptions to geocode
    #[arg(required = true)]
    queries: Vec<String>,

    /// TOML file with client options; flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API key
    #[arg(long, env = "OCD_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// API endpoint
    #[arg(long, env = "OCD_API_URL")]
    api_url: Option<String>,

    /// Requests per pacing interval
    #[arg(long)]
    pace_limit: Option<u32>,

    /// Disable the response cache
    #[arg(long)]
    no_cache: bool,

    /// Restrict results to these country codes (comma-separated)
    #[arg(long)]
    countrycode: Option<String>,

    /// Preferred result language
    #[arg(long)]
    language: Option<String>,

    /// Maximum candidates per query
    #[arg(long)]
    limit: Option<u32>,

    /// Print full results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut options = match &args.config {
        Some(path) => GeocoderOptions::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GeocoderOptions::default(),
    };
    if args.api_key.is_some() {
        options.api_key = args.api_key.clone();
    }
    if args.api_url.is_some() {
        options.api_url = args.api_url.clone();
    }
    if args.pace_limit.is_some() {
        options.pace_limit = args.pace_limit;
    }
    if args.no_cache {
        options.cached = Some(false);
    }

    let geocoder = Geocoder::new(options).context("Failed to create geocoder")?;
    info!("Geocoding {} queries via {}", args.queries.len(), geocoder.api_url());

    let queries: Vec<GeoQuery> = args.queries.iter().map(|q| build_query(&args, q)).collect();
    let results = geocoder.geocode_all(queries).await;

    if args.json {
        let results: Vec<&GeoResult> = results.iter().map(|r| r.as_ref()).collect();
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    for (query, result) in args.queries.iter().zip(&results) {
        println!("{}", format_line(query, result));
    }

    Ok(())
}

fn build_query(args: &Args, text: &str) -> GeoQuery {
    GeoQuery {
        countrycode: args.countrycode.clone(),
        language: args.language.clone(),
        limit: args.limit,
        ..GeoQuery::new(text.trim())
    }
}

fn format_line(query: &str, result: &GeoResult) -> String {
    match result.geo().coordinates() {
        Some((lat, lng)) if result.ok() => format!("{},{}\t{}", lat, lng, result.address()),
        _ => {
            let status = result.status.clone().unwrap_or_default();
            format!(
                "no match for \"{}\" ({} {})",
                query,
                status.code.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
                status.message.unwrap_or_default()
            )
        }
    }
}
