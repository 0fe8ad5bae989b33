#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the wildfire risk toolchain.
//!
//! Runs the API server, trains and persists a model from a CSV dataset,
//! scores a single property, or projects fire spread, all from one
//! binary. Every option that the server reads from the environment can
//! also be given as a flag.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use terra_insight_features::{FeatureAssembler, collaborators::ElevationRaster};
use terra_insight_features_models::{
    Coordinates, ElevationGrid, PropertyOverrides, PropertyRequest,
};
use terra_insight_model::{NormalizationMode, WildfireRiskModel, training::TrainingConfig};
use terra_insight_risk::{report::RiskAssessor, spread};
use terra_insight_server::config::{
    DEFAULT_BIND_ADDR, DEFAULT_CORS_ORIGINS, DEFAULT_MODEL_PATH, DEFAULT_PORT, ServerConfig,
};

#[derive(Parser)]
#[command(name = "terra_insight_cli", about = "Wildfire risk scoring toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Train a model from a CSV dataset and save it
    Train(TrainArgs),
    /// Score one property and print the risk report as JSON
    Assess(AssessArgs),
    /// Project fire spread hour by hour and print it as JSON
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct ModelArgs {
    /// Directory of the persisted model pair
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    model_path: PathBuf,
    /// `trained` or `per_request_refit`
    #[arg(
        long,
        env = "NORMALIZATION_MODE",
        default_value = "trained",
        value_parser = parse_normalization
    )]
    normalization: NormalizationMode,
}

fn parse_normalization(value: &str) -> Result<NormalizationMode, String> {
    value
        .parse()
        .map_err(|_| format!("expected 'trained' or 'per_request_refit', got '{value}'"))
}

#[derive(Args)]
struct ServeArgs {
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    bind_addr: String,
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Allowed CORS origins, comma separated; `*` allows any
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
    #[command(flatten)]
    model: ModelArgs,
}

impl ServeArgs {
    fn into_config(self) -> ServerConfig {
        let cors_origins = if self.cors_origins.is_empty() {
            DEFAULT_CORS_ORIGINS.iter().map(ToString::to_string).collect()
        } else {
            self.cors_origins
        };

        ServerConfig {
            bind_addr: self.bind_addr,
            port: self.port,
            model_path: self.model.model_path,
            normalization: self.model.normalization,
            cors_origins,
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// CSV file with the model feature columns and `risk_score`
    #[arg(long)]
    data: PathBuf,
    #[arg(long, default_value_t = 100)]
    epochs: usize,
    /// Directory to write the model pair to
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH)]
    output: PathBuf,
}

#[derive(Args)]
struct AssessArgs {
    #[arg(long)]
    property_id: String,
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,
    #[arg(long)]
    vegetation_density: Option<f64>,
    #[arg(long)]
    slope_percentage: Option<f64>,
    #[arg(long)]
    distance_to_fire_station: Option<f64>,
    #[arg(long)]
    has_firebreak: bool,
    #[arg(long)]
    property_size_acres: Option<f64>,
    /// JSON elevation tile (`rows`, `cols`, row-major `values`) around the
    /// property; terrain falls back to static defaults without it
    #[arg(long)]
    elevation_grid: Option<PathBuf>,
    /// Elevation value marking missing cells in the tile
    #[arg(long, requires = "elevation_grid", allow_hyphen_values = true)]
    elevation_nodata: Option<f64>,
    #[command(flatten)]
    model: ModelArgs,
}

impl AssessArgs {
    /// Overrides are only sent when at least one property flag is given.
    fn overrides(&self) -> Option<PropertyOverrides> {
        let any = self.vegetation_density.is_some()
            || self.slope_percentage.is_some()
            || self.distance_to_fire_station.is_some()
            || self.has_firebreak
            || self.property_size_acres.is_some();
        if !any {
            return None;
        }

        let defaults = PropertyOverrides::default();
        Some(PropertyOverrides {
            vegetation_density: self
                .vegetation_density
                .unwrap_or(defaults.vegetation_density),
            slope_percentage: self.slope_percentage.unwrap_or(defaults.slope_percentage),
            distance_to_fire_station: self
                .distance_to_fire_station
                .unwrap_or(defaults.distance_to_fire_station),
            has_firebreak: self.has_firebreak,
            property_size_acres: self
                .property_size_acres
                .unwrap_or(defaults.property_size_acres),
        })
    }

    fn assembler(&self) -> Result<FeatureAssembler, Box<dyn std::error::Error>> {
        let Some(path) = &self.elevation_grid else {
            return Ok(FeatureAssembler::new());
        };

        let grid: ElevationGrid = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        log::info!(
            "Using {}x{} elevation grid from {}",
            grid.rows,
            grid.cols,
            path.display()
        );
        let mut raster = ElevationRaster::new(grid);
        if let Some(nodata) = self.elevation_nodata {
            raster = raster.with_nodata(nodata);
        }
        Ok(FeatureAssembler::new().with_terrain(Arc::new(raster)))
    }

    fn request(&self) -> PropertyRequest {
        PropertyRequest {
            property_id: self.property_id.clone(),
            location: Coordinates::new(self.lat, self.lon),
            overrides: self.overrides(),
        }
    }
}

#[derive(Args)]
struct SimulateArgs {
    #[arg(long, default_value_t = 10.0)]
    wind_speed: f64,
    #[arg(long, default_value_t = 10.0)]
    slope: f64,
    #[arg(long, default_value_t = spread::DEFAULT_SIMULATION_HOURS)]
    hours: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.into_config();
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(move || {
                actix_web::rt::System::new().block_on(terra_insight_server::run_server(config))
            })
            .await??;
        }
        Commands::Train(args) => train(args).await?,
        Commands::Assess(args) => assess(&args).await?,
        Commands::Simulate(args) => {
            let projection = spread::project_spread(args.wind_speed, args.slope, args.hours)?;
            println!("{}", serde_json::to_string_pretty(&projection)?);
        }
    }

    Ok(())
}

/// Trains on `args.data` off the async runtime and saves the result.
async fn train(args: TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = TrainingConfig {
        epochs: args.epochs,
        ..TrainingConfig::default()
    };

    log::info!(
        "Training for up to {} epochs on {}...",
        config.epochs,
        args.data.display()
    );
    let (_, history) = tokio::task::spawn_blocking(move || {
        WildfireRiskModel::train_from_csv(&args.data, &config, &args.output)
    })
    .await??;

    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(())
}

/// Assembles features and prints the report. Terrain comes from the
/// elevation grid when one is given; every other source uses defaults.
async fn assess(args: &AssessArgs) -> Result<(), Box<dyn std::error::Error>> {
    let model =
        WildfireRiskModel::load_or_build(Some(&args.model.model_path), args.model.normalization)?;
    let assessor = RiskAssessor::new(Arc::new(model));

    let features = args.assembler()?.assemble(&args.request()).await?;
    let report = assessor.assess(&features)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use terra_insight_risk_models::FeatureName;

    use super::*;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    fn parse_assess(args: &[&str]) -> AssessArgs {
        let argv = ["terra_insight_cli", "assess"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Assess(args) => args,
            _ => panic!("expected assess"),
        }
    }

    #[test]
    fn assess_without_property_flags_sends_no_overrides() {
        let args = parse_assess(&["--property-id", "p1", "--lat", "34.0", "--lon", "-118.2"]);
        let request = args.request();

        assert!(request.overrides.is_none());
        assert!((request.location.lon + 118.2).abs() < f64::EPSILON);
    }

    #[test]
    fn assess_property_flags_fill_remaining_defaults() {
        let args = parse_assess(&[
            "--property-id",
            "p2",
            "--lat",
            "0",
            "--lon",
            "0",
            "--slope-percentage",
            "32",
        ]);
        let overrides = args.overrides().unwrap();

        assert!((overrides.slope_percentage - 32.0).abs() < f64::EPSILON);
        assert!((overrides.vegetation_density - 0.5).abs() < f64::EPSILON);
        assert!(!overrides.has_firebreak);
    }

    #[tokio::test]
    async fn assess_reads_terrain_from_elevation_grid() {
        let path = std::env::temp_dir().join("terra_insight_cli_elevation.json");
        std::fs::write(
            &path,
            r#"{"rows": 2, "cols": 2, "values": [-1, 250.0, 250.0, 250.0]}"#,
        )
        .unwrap();

        let args = parse_assess(&[
            "--property-id",
            "p3",
            "--lat",
            "0",
            "--lon",
            "0",
            "--elevation-grid",
            path.to_str().unwrap(),
            "--elevation-nodata",
            "-1",
        ]);
        let features = args
            .assembler()
            .unwrap()
            .assemble(&args.request())
            .await
            .unwrap();

        assert_eq!(features.get(FeatureName::Elevation), Some(250.0));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_elevation_grid_is_reported() {
        let args = parse_assess(&[
            "--property-id",
            "p4",
            "--lat",
            "0",
            "--lon",
            "0",
            "--elevation-grid",
            "/nonexistent/terra_insight_elevation.json",
        ]);
        assert!(args.assembler().is_err());
    }

    #[test]
    fn simulate_defaults() {
        let cli = Cli::try_parse_from(["terra_insight_cli", "simulate"]).unwrap();
        let Commands::Simulate(args) = cli.command else {
            panic!("expected simulate");
        };
        assert_eq!(args.hours, 24);
        assert!((args.wind_speed - 10.0).abs() < f64::EPSILON);
    }
}
