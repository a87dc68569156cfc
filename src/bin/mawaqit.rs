//! mawaqit CLI - Daily prayer times in the terminal
//!
//! Shows the six prayer times for a region and date, with a countdown to the
//! upcoming prayer. `--watch` keeps the countdown live.

// Exclude from coverage - CLI binary tested via integration tests
#![cfg_attr(tarpaulin, ignore)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mawaqit::core::{
    ClientConfig, FixedPosition, GeoPosition, HttpTransport, MawaqitSession, MemorySurface,
    NoPosition, PositionProvider, Prayer, Region, Resolution, SavedRegion, ScheduleDate,
    SessionParts, SystemClock,
};
use tracing_subscriber::{fmt, EnvFilter};

/// Daily prayer times with a next-prayer countdown
#[derive(Parser, Debug)]
#[command(name = "mawaqit")]
#[command(version = mawaqit::VERSION)]
#[command(about = "Daily prayer times with a next-prayer countdown")]
#[command(after_help = "EXAMPLES:
  # Today's times for the saved (or default) region
  mawaqit

  # Another region and date
  mawaqit --region وهران --date 2024-03-01

  # Detect the region from a position and remember it
  mawaqit --locate --lat 36.75 --lon 3.06 --save

  # Keep the countdown live, redrawing every 30 seconds
  mawaqit --watch 30
")]
struct Cli {
    /// Region (wilaya) to show
    #[arg(short = 'r', long = "region", value_name = "NAME")]
    region: Option<String>,

    /// Date to show, YYYY-MM-DD (default: today, UTC)
    #[arg(short = 'd', long = "date", value_name = "DATE")]
    date: Option<String>,

    /// Resolve the region from the device position
    #[arg(long = "locate")]
    locate: bool,

    /// Latitude of the device position
    #[arg(long = "lat", value_name = "DEG", requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Longitude of the device position
    #[arg(long = "lon", value_name = "DEG", requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Save the selected region on the server
    #[arg(long = "save")]
    save: bool,

    /// Redraw every N seconds until interrupted
    #[arg(short = 'w', long = "watch", value_name = "SECS")]
    watch: Option<u64>,

    /// Config file (default: ./mawaqit.json, then the user config dir)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server root URL
    #[arg(long = "base-url", value_name = "URL")]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long = "timeout", value_name = "SECS")]
    timeout: Option<u64>,

    /// More logging (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting runtime")?;
    runtime.block_on(run(cli))
}

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("mawaqit={level}")))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ClientConfig::discover(cli.config.as_deref())?;
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_seconds = timeout;
    }
    config.validate()?;

    let date = cli.date.as_deref().map(ScheduleDate::parse).transpose()?;

    let state_file = SavedRegion::default_path();
    let region = match cli.region {
        Some(name) => Region::new(name),
        None => MawaqitSession::initial_region(&config, state_file.as_deref()),
    };

    let positions: Arc<dyn PositionProvider> = match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => Arc::new(FixedPosition(GeoPosition::new(lat, lon))),
        _ => Arc::new(NoPosition),
    };

    let surface = Arc::new(MemorySurface::new());
    let parts = SessionParts {
        transport: Arc::new(HttpTransport::new(&config)?),
        surface: surface.clone(),
        positions,
        clock: Arc::new(SystemClock),
    };
    let mut session = MawaqitSession::new(&config, parts, region);
    if let Some(path) = state_file {
        session = session.with_state_file(path);
    }

    if let Some(date) = date {
        session = session.with_date(date);
    }

    if cli.locate {
        match session.locate().await {
            Ok(Resolution::Resolved(region)) => eprintln!("Located: {region}"),
            Ok(Resolution::Skipped) => {}
            Err(e) => eprintln!("Location unavailable: {e}"),
        }
    }

    session.load().await?;
    render(&session, &surface);

    if cli.save {
        session.save().await?;
        for message in surface.notifications() {
            eprintln!("{message}");
        }
    }

    if let Some(secs) = cli.watch {
        watch(&session, &surface, Duration::from_secs(secs.max(1))).await;
    }

    Ok(())
}

async fn watch(session: &MawaqitSession, surface: &MemorySurface, every: Duration) {
    let mut interval = tokio::time::interval(every);
    // the first tick completes immediately
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match session.tick().await {
                    Ok(_) => render(session, surface),
                    Err(e) => eprintln!("Refresh failed: {e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

fn render(session: &MawaqitSession, surface: &MemorySurface) {
    let selection = session
        .coordinator()
        .last_applied()
        .unwrap_or_else(|| session.selection());

    println!("{}  {}", selection.region, selection.date);
    for prayer in Prayer::ALL {
        let text = surface.text(prayer.id()).unwrap_or_else(|| "--:--".to_string());
        println!("  {:<8} {:<8} {}", prayer.arabic_name(), prayer.id(), text);
    }
}
