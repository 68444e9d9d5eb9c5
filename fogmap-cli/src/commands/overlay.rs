//! Overlay command: print reveal ellipses for a viewport as JSON.

use clap::Args;
use fogmap::overlay::{self, Viewport};
use fogmap::region::GeoBounds;
use fogmap::tracker::ExplorationTracker;
use serde_json::json;

use super::common::Context;
use crate::error::CliError;

/// Viewport arguments.
#[derive(Debug, Args)]
pub struct OverlayArgs {
    /// Northern edge latitude
    #[arg(long, allow_hyphen_values = true)]
    pub north: f64,
    /// Southern edge latitude
    #[arg(long, allow_hyphen_values = true)]
    pub south: f64,
    /// Eastern edge longitude
    #[arg(long, allow_hyphen_values = true)]
    pub east: f64,
    /// Western edge longitude
    #[arg(long, allow_hyphen_values = true)]
    pub west: f64,
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1024.0)]
    pub width: f64,
    /// Viewport height in pixels
    #[arg(long, default_value_t = 1024.0)]
    pub height: f64,
    /// Include ellipses that fall outside the viewport
    #[arg(long)]
    pub all: bool,
    /// Drop circles fully covered by larger ones
    #[arg(long)]
    pub simplify: bool,
}

/// Run the overlay command.
pub fn run(args: OverlayArgs, ctx: &Context) -> Result<(), CliError> {
    let bounds = GeoBounds::new(args.south, args.north, args.west, args.east);
    let viewport = Viewport::fit(bounds, args.width, args.height)?;

    let tracker = ExplorationTracker::with_defaults(ctx.open_store()?);
    tracker.load()?;

    let circles = if args.simplify {
        tracker.simplified_circles()
    } else {
        tracker.circles()
    };

    let ellipses = if args.all {
        overlay::project(&circles, &viewport)
    } else {
        overlay::project_visible(&circles, &viewport)
    };

    let output = json!({
        "viewport": viewport,
        "circles": circles.len(),
        "ellipses": ellipses,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
