//! Flood-risk toolbox: evaluate points, routes, heatmaps and avoidance
//! polygons offline, or ask a running server for ranked routes.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use optiroute_cli::{load_route, parse_lat_lng, Datasets, RouteClient};
use optiroute_core::{to_geojson, BoundingBox, ExclusionTier, RiskRules};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding flood_pivots.csv and bad_roads.csv
    #[arg(long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Pivot influence decay distance in km
    #[arg(long, default_value_t = 2.0, global = true)]
    spread_km: f64,

    /// Rainfall accumulated over the last 24h in mm (omit for no weather data)
    #[arg(long, global = true)]
    rain_mm: Option<f64>,

    /// Arc-length samples evaluated per route
    #[arg(long, default_value_t = 100, global = true)]
    samples: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Risk breakdown at one coordinate
    Point {
        /// "lat,lng"
        location: String,
    },
    /// Mean risk and road penalty along a route file (JSON or encoded polyline)
    Score { path: PathBuf },
    /// Heatmap lattice above the visibility threshold
    Heatmap {
        /// "min_lat,min_lng,max_lat,max_lng"; defaults to the city heatmap area
        #[arg(long)]
        bbox: Option<String>,
        #[arg(long, default_value_t = 0.015)]
        spacing: f64,
        #[arg(long, value_enum, default_value = "csv")]
        format: OutputFormat,
    },
    /// Avoidance polygons for a tier as GeoJSON
    Exclusion {
        #[arg(long, value_enum, default_value = "strong")]
        tier: TierArg,
        /// "lat,lng"
        #[arg(long)]
        origin: String,
        /// "lat,lng"
        #[arg(long)]
        destination: String,
    },
    /// Ask a running server for the three ranked routes
    Routes {
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        url: String,
        /// "lat,lng"
        #[arg(long)]
        origin: String,
        /// "lat,lng"
        #[arg(long, conflicts_with = "to")]
        destination: Option<String>,
        /// Free-text destination, geocoded by the server
        #[arg(long)]
        to: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TierArg {
    Moderate,
    Strong,
}

impl From<TierArg> for ExclusionTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Moderate => ExclusionTier::Moderate,
            TierArg::Strong => ExclusionTier::Strong,
        }
    }
}

fn parse_bbox(value: &str) -> Result<BoundingBox> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()?;
    let [min_lat, min_lng, max_lat, max_lng] = parts.as_slice() else {
        bail!("expected 'min_lat,min_lng,max_lat,max_lng', got '{}'", value);
    };
    Ok(BoundingBox::new(*min_lat, *min_lng, *max_lat, *max_lng))
}

fn main() -> Result<()> {
    let args = Args::parse();
    let rules = RiskRules {
        spread_km: args.spread_km,
        route_sample_points: args.samples.max(1),
        ..RiskRules::default()
    };

    match args.command {
        Command::Routes {
            url,
            origin,
            destination,
            to,
        } => request_routes(&url, &origin, destination.as_deref(), to.as_deref()),
        command => {
            let datasets = Datasets::load(&args.data_dir, rules);
            evaluate_offline(&datasets, args.rain_mm, command)
        }
    }
}

fn request_routes(url: &str, origin: &str, destination: Option<&str>, to: Option<&str>) -> Result<()> {
    let origin = parse_lat_lng(origin)?;
    let destination = destination.map(parse_lat_lng).transpose()?;
    if destination.is_none() && to.is_none() {
        bail!("either --destination or --to is required");
    }
    let response = RouteClient::new(url).plan(origin, destination, to)?;
    for route in &response.routes {
        println!(
            "{:<15} {:>8.1} km {:>6.1} min  risk {:>5.1}%  score {:.3}  {}",
            route.label,
            route.distance_m / 1000.0,
            route.duration_s / 60.0,
            route.risk_score * 100.0,
            route.score,
            route.explanation
        );
    }
    println!("{} heatmap points", response.heatmap_points.len());
    Ok(())
}

fn evaluate_offline(datasets: &Datasets, rain_mm: Option<f64>, command: Command) -> Result<()> {
    let engine = datasets.engine(rain_mm);

    match command {
        Command::Point { location } => {
            let point = parse_lat_lng(&location)?;
            let breakdown = engine.point_breakdown(point);
            println!("preference      {:.4}", breakdown.preference);
            println!("rainfall_mm     {:.1}", breakdown.rainfall_mm);
            println!("rainfall_factor {:.4}", breakdown.rainfall_factor);
            println!("risk            {:.4}", breakdown.risk);
            println!("road_penalty    {:.4}", datasets.roads.penalty_at(point));
        }
        Command::Score { path } => {
            let route = load_route(&path)?;
            let id = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_else(|| "route".to_string());
            let risk = engine.route_risk(id, &route);
            if risk.insufficient_data {
                println!("{}: insufficient data (empty route)", risk.route_id);
            } else {
                println!(
                    "{}: risk {:.4} over {} samples, road penalty {:.4}",
                    risk.route_id,
                    risk.risk_score,
                    risk.sampled_points,
                    datasets
                        .roads
                        .penalty_along(&route, engine.rules().route_sample_points)
                );
            }
        }
        Command::Heatmap {
            bbox,
            spacing,
            format,
        } => {
            let bbox = match bbox {
                Some(value) => parse_bbox(&value)?,
                None => engine.rules().heatmap_bbox,
            };
            let points = engine.grid_risk(bbox, spacing);
            match format {
                OutputFormat::Csv => {
                    println!("lat,lng,intensity");
                    for point in points {
                        println!("{:.5},{:.5},{:.4}", point.lat, point.lng, point.intensity);
                    }
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
            }
        }
        Command::Exclusion {
            tier,
            origin,
            destination,
        } => {
            let origin = parse_lat_lng(&origin)?;
            let destination = parse_lat_lng(&destination)?;
            let outcome = datasets.exclusion_builder(&engine).build_with_report(
                tier.into(),
                origin,
                destination,
            );
            eprintln!(
                "{} polygons ({} shrunk, {} dropped)",
                outcome.polygons.len(),
                outcome.shrunk,
                outcome.dropped
            );
            match to_geojson(&outcome.polygons) {
                Some(geojson) => println!("{}", serde_json::to_string_pretty(&geojson)?),
                None => println!("null"),
            }
        }
        Command::Routes { .. } => bail!("routes requires a running server"),
    }

    Ok(())
}
