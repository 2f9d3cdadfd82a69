use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use whereabouts::{
    haversine_distance_km, to_decimal_degrees, validate_coordinate, Cache, Coordinate, Geocoder,
    GeocoderConfig, RawGpsTag,
};

/// Resolve locations from photos, addresses, and raw GPS values
#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Show debug output
    #[arg(short, long, global = true, action)]
    verbose: bool,
    /// Directory for cached geocoder responses
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Read the GPS position embedded in a photo
    FromPhoto { path: PathBuf },
    /// Resolve a free-text address to a coordinate
    Geocode { address: String },
    /// Look up a human-readable address for a coordinate
    Reverse {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lng: f64,
    },
    /// Great-circle distance in kilometers between two coordinates
    Distance {
        #[arg(allow_negative_numbers = true)]
        lat_a: f64,
        #[arg(allow_negative_numbers = true)]
        lng_a: f64,
        #[arg(allow_negative_numbers = true)]
        lat_b: f64,
        #[arg(allow_negative_numbers = true)]
        lng_b: f64,
    },
    /// Convert a raw GPS tag string to decimal degrees
    ParseTag {
        raw: String,
        /// Hemisphere reference (N, S, E or W)
        #[arg(long)]
        hemisphere: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let _logger = match flexi_logger::Logger::try_with_str(level).and_then(|l| l.start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("logger setup failed: {e}");
            None
        }
    };

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::FromPhoto { path } => {
            let bytes = fs::read(&path)?;
            let coord = whereabouts::extract_location(&bytes)?;
            println!("{}", coord.format(6));
        }
        Command::Geocode { address } => {
            let resolved = build_geocoder(cli.cache_dir.as_deref())?.geocode(&address)?;
            println!("{}", resolved.coordinate.format(6));
            if let Some(name) = resolved.display_name {
                println!("{name}");
            }
        }
        Command::Reverse { lat, lng } => {
            let coord = checked_coordinate(lat, lng)?;
            match build_geocoder(cli.cache_dir.as_deref())?.reverse(&coord) {
                Some(name) => println!("{name}"),
                None => println!("(no address found)"),
            }
        }
        Command::Distance {
            lat_a,
            lng_a,
            lat_b,
            lng_b,
        } => {
            let a = checked_coordinate(lat_a, lng_a)?;
            let b = checked_coordinate(lat_b, lng_b)?;
            println!("{:.3}", haversine_distance_km(&a, &b));
        }
        Command::ParseTag { raw, hemisphere } => {
            let degrees = to_decimal_degrees(&RawGpsTag::Text(raw), hemisphere.as_deref())?;
            println!("{degrees}");
        }
    }
    Ok(())
}

fn build_geocoder(cache_dir: Option<&std::path::Path>) -> Result<Geocoder, Box<dyn std::error::Error>> {
    let geocoder = Geocoder::new(GeocoderConfig::default())?;
    Ok(match cache_dir {
        Some(dir) => geocoder.with_cache(Cache::new(dir)?),
        None => geocoder,
    })
}

fn checked_coordinate(lat: f64, lng: f64) -> Result<Coordinate, String> {
    if !validate_coordinate(lat, lng) {
        return Err(format!("coordinate ({lat}, {lng}) is out of range"));
    }
    Ok(Coordinate::new(lat, lng))
}
