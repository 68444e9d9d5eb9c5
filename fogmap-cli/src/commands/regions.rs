//! Visited region inspection commands.

use clap::Subcommand;
use console::style;
use fogmap::region::VisitedRegion;
use fogmap::store::RegionRepository;

use super::common::{format_coord, Context};
use crate::error::CliError;

/// Region subcommands.
#[derive(Debug, Subcommand)]
pub enum RegionsAction {
    /// List visited regions, most recent first
    List {
        /// Show at most this many regions
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List regions near a point
    Near {
        /// Latitude in degrees
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        /// Longitude in degrees
        #[arg(allow_hyphen_values = true)]
        lon: f64,
        /// Search radius in kilometers
        radius_km: f64,
    },

    /// Delete every visited region
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show how many regions are stored
    Count,
}

/// Run a regions subcommand.
pub fn run(action: RegionsAction, ctx: &Context) -> Result<(), CliError> {
    let store = ctx.open_store()?;

    match action {
        RegionsAction::List { limit } => {
            let regions = store.get_all()?;
            let total = regions.len();
            let shown: Vec<_> = match limit {
                Some(n) => regions.into_iter().take(n).collect(),
                None => regions,
            };
            print_regions(&shown);
            if shown.len() < total {
                println!("... {} more", total - shown.len());
            }
            Ok(())
        }
        RegionsAction::Near {
            lat,
            lon,
            radius_km,
        } => {
            if !(radius_km.is_finite() && radius_km >= 0.0) {
                return Err(CliError::Config(format!(
                    "Radius must be a non-negative number of kilometers, got {}",
                    radius_km
                )));
            }
            let regions = store.get_near(lat, lon, radius_km)?;
            print_regions(&regions);
            Ok(())
        }
        RegionsAction::Clear { yes } => {
            if !yes {
                return Err(CliError::NotConfirmed(
                    "Refusing to delete all regions without --yes".to_string(),
                ));
            }
            let removed = store.delete_all()?;
            println!(
                "Deleted {} regions from {}",
                removed,
                ctx.config.storage.database.display()
            );
            Ok(())
        }
        RegionsAction::Count => {
            println!("{}", store.count()?);
            Ok(())
        }
    }
}

fn print_regions(regions: &[VisitedRegion]) {
    if regions.is_empty() {
        println!("No regions");
        return;
    }

    println!(
        "{}",
        style(format!(
            "{:>6}  {:<22}  {:>6}  {:>6}  {:<24}  {}",
            "ID", "CENTER", "RADIUS", "VISITS", "FIRST SEEN", "GEOHASH"
        ))
        .bold()
    );
    for region in regions {
        println!(
            "{:>6}  {:<22}  {:>5}m  {:>6}  {:<24}  {}",
            region.id.map(|id| id.to_string()).unwrap_or_default(),
            format_coord(region.latitude, region.longitude),
            region.radius,
            region.visit_count,
            region.timestamp_start.format("%Y-%m-%d %H:%M:%S UTC"),
            region.geohash.as_deref().unwrap_or("-"),
        );
    }
}
