//! Replay a recorded track through a fog session.
//!
//! Input is a CSV file with the columns `latitude,longitude,accuracy,timestamp`.
//! A header line is optional. Accuracy may be empty or non-positive when
//! unknown; the timestamp is RFC 3339 and defaults to one second after the
//! previous fix when left empty.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use clap::Args;
use console::style;
use fogmap::centering::{CameraCommand, CameraPosition};
use fogmap::region::{GeoBounds, LocationFix};
use fogmap::session::FogSession;
use fogmap::store::{RegionRepository, SqliteRegionStore};
use fogmap::tracker::ExplorationTracker;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::info;

use super::common::{format_coord, Context};
use crate::error::CliError;

/// Replay arguments.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// CSV file of fixes
    pub file: PathBuf,
    /// Override the exploration radius in meters
    #[arg(long)]
    pub radius: Option<u32>,
    /// Use a throwaway in-memory database
    #[arg(long)]
    pub dry_run: bool,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the replay command.
pub fn run(args: ReplayArgs, ctx: &Context) -> Result<(), CliError> {
    let contents = std::fs::read_to_string(&args.file).map_err(|source| CliError::Io {
        path: args.file.clone(),
        source,
    })?;
    let fixes = parse_fixes(&contents, Utc::now())?;

    let store = if args.dry_run {
        Arc::new(SqliteRegionStore::in_memory()?)
    } else {
        ctx.open_store()?
    };

    let mut settings = ctx.config.map;
    if let Some(radius) = args.radius {
        if radius == 0 {
            return Err(CliError::Config("Radius must be greater than zero".to_string()));
        }
        settings.exploration_radius = radius;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let report = runtime.block_on(replay(store.clone(), settings.into_shared(), fixes));

    if args.json {
        let output = json!({
            "file": args.file.display().to_string(),
            "stats": report.stats,
            "regions_stored": store.count()?,
            "camera": report.last_camera.map(|cmd| json!({
                "latitude": cmd.center.0,
                "longitude": cmd.center.1,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_report(&args.file, &report, store.count()?);
    }
    Ok(())
}

struct ReplayReport {
    stats: fogmap::session::SessionStats,
    last_camera: Option<CameraCommand>,
}

/// Feed fixes through a session with a simulated map host.
///
/// The host applies each camera command to its own viewport and publishes
/// the result back, the way a real map view would.
async fn replay(
    store: Arc<SqliteRegionStore>,
    settings: fogmap::config::SharedSettings,
    fixes: Vec<LocationFix>,
) -> ReplayReport {
    let tracker = Arc::new(ExplorationTracker::with_defaults(store));
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<CameraCommand>();
    let (camera_tx, camera_rx) = watch::channel(Some(CameraPosition::Automatic));

    let host = tokio::spawn(async move {
        let mut bounds: Option<GeoBounds> = None;
        let mut last = None;
        while let Some(cmd) = cmd_rx.recv().await {
            let span = match (cmd.span, bounds) {
                (Some(span), _) => span,
                (None, Some(current)) => current.span(),
                (None, None) => fogmap::centering::DEFAULT_SPAN,
            };
            let next = GeoBounds::from_center_span(cmd.center.0, cmd.center.1, span);
            bounds = Some(next);
            camera_tx.send_replace(Some(CameraPosition::Region(next)));
            last = Some(cmd);
        }
        last
    });

    let session = Arc::new(FogSession::new(tracker, settings, camera_rx, cmd_tx));
    let (fix_tx, fix_rx) = mpsc::unbounded_channel();
    let handle = Arc::clone(&session).start(fix_rx);

    info!(fixes = fixes.len(), "Replaying fixes");
    for fix in fixes {
        if fix_tx.send(fix).is_err() {
            break;
        }
    }
    drop(fix_tx);

    if let Err(e) = handle.await {
        tracing::warn!(error = %e, "Session task failed");
    }

    let stats = session.stats();
    // Dropping the session closes the command channel and ends the host
    drop(session);
    let last_camera = host.await.unwrap_or(None);

    ReplayReport { stats, last_camera }
}

fn print_report(file: &Path, report: &ReplayReport, stored: u64) {
    let stats = &report.stats;
    println!("{} {}", style("Replayed").bold(), file.display());
    println!("  Fixes:            {}", stats.fixes_received);
    println!("  Dropped:          {}", stats.fixes_dropped);
    println!("  Regions created:  {}", style(stats.regions_created).green());
    println!("  Regions merged:   {}", stats.regions_merged);
    println!("  Camera commands:  {}", stats.camera_commands);
    if stats.store_errors > 0 {
        println!("  Store errors:     {}", style(stats.store_errors).red());
    }
    println!("  Regions stored:   {}", stored);
    if let Some(cmd) = report.last_camera {
        println!("  Camera center:    {}", format_coord(cmd.center.0, cmd.center.1));
    }
}

/// Parse replay CSV contents.
///
/// `start` is used for the first fix when it has no timestamp.
fn parse_fixes(contents: &str, start: DateTime<Utc>) -> Result<Vec<LocationFix>, CliError> {
    let mut fixes = Vec::new();
    let mut previous = start - Duration::seconds(1);

    for (index, raw) in contents.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if index == 0 && trimmed.to_ascii_lowercase().starts_with("latitude") {
            continue;
        }

        let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields.len() > 4 {
            return Err(CliError::Replay {
                line,
                message: format!("expected 2 to 4 columns, found {}", fields.len()),
            });
        }

        let number = |name: &str, value: &str| {
            value.parse::<f64>().map_err(|e| CliError::Replay {
                line,
                message: format!("invalid {} '{}': {}", name, value, e),
            })
        };

        let latitude = number("latitude", fields[0])?;
        let longitude = number("longitude", fields[1])?;
        if fogmap::coord::validate_lat_lon(latitude, longitude).is_err() {
            return Err(CliError::Replay {
                line,
                message: format!("coordinate out of range: {}, {}", latitude, longitude),
            });
        }

        let accuracy = match fields.get(2) {
            Some(v) if !v.is_empty() => number("accuracy", *v)?,
            _ => -1.0,
        };

        let timestamp = match fields.get(3) {
            Some(v) if !v.is_empty() => DateTime::parse_from_rfc3339(*v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| CliError::Replay {
                    line,
                    message: format!("invalid timestamp '{}': {}", v, e),
                })?,
            _ => previous + Duration::seconds(1),
        };
        previous = timestamp;

        fixes.push(LocationFix::new(latitude, longitude, accuracy, timestamp));
    }

    Ok(fixes)
}
