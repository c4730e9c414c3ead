//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::MapError;
use crate::geo::{Coordinate, RIYADH};

#[derive(Debug, Parser)]
#[command(name = "raya-map", version, about = "Trending venues and historical places on a terminal map")]
pub struct CliArgs {
    /// Base URL of the venues/places API
    #[arg(long, env = "RAYA_API_BASE", default_value = "http://localhost:5000")]
    pub api_base: String,

    /// Directory holding Natural Earth GeoJSON files
    #[arg(long, env = "RAYA_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Initial centre latitude
    #[arg(long, default_value_t = RIYADH.lat, allow_negative_numbers = true)]
    pub lat: f64,

    /// Initial centre longitude
    #[arg(long, default_value_t = RIYADH.lng, allow_negative_numbers = true)]
    pub lng: f64,

    /// Initial zoom level (0 = world, 11 = city)
    #[arg(long, default_value_t = 11.0)]
    pub zoom: f64,

    /// Quiet period before a layout change is applied to the map
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub resize_debounce_ms: u64,

    /// HTTP timeout for API requests
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Where log output goes; the terminal itself is taken by the UI
    #[arg(long, env = "RAYA_LOG_FILE", default_value = "raya-map.log")]
    pub log_file: PathBuf,

    /// Do not contact the API; chat replies are echoed locally
    #[arg(long)]
    pub no_fetch: bool,
}

/// Validated runtime settings
#[derive(Clone, Debug)]
pub struct Config {
    pub api_base: String,
    pub data_dir: PathBuf,
    pub center: Coordinate,
    pub zoom: f64,
    pub resize_debounce: Duration,
    pub timeout: Duration,
    pub log_file: PathBuf,
    pub fetch: bool,
}

impl TryFrom<CliArgs> for Config {
    type Error = MapError;

    fn try_from(args: CliArgs) -> Result<Self, MapError> {
        let center = Coordinate::from_lat_lng(args.lat, args.lng).ok_or_else(|| {
            MapError::Config(format!("centre {}, {} is out of range", args.lat, args.lng))
        })?;
        if !(0.0..=18.0).contains(&args.zoom) {
            return Err(MapError::Config(format!(
                "--zoom must be between 0 and 18, got {}",
                args.zoom
            )));
        }
        let api_base = args.api_base.trim().trim_end_matches('/').to_string();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(MapError::Config(format!(
                "--api-base must be an http(s) URL, got {api_base:?}"
            )));
        }
        if args.timeout_secs == 0 {
            return Err(MapError::Config("--timeout-secs must be at least 1".into()));
        }

        Ok(Self {
            api_base,
            data_dir: args.data_dir,
            center,
            zoom: args.zoom,
            resize_debounce: Duration::from_millis(args.resize_debounce_ms),
            timeout: Duration::from_secs(args.timeout_secs),
            log_file: args.log_file,
            fetch: !args.no_fetch,
        })
    }
}
