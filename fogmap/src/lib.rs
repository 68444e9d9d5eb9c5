//! fogmap - Explored-area tracking for fog-of-war maps
//!
//! This library records where a user has physically been as circular
//! visited regions, persists them in SQLite, and turns them into pixel
//! ellipses that a map host cuts out of an opaque fog layer. It also
//! decides when the map camera should follow the user.
//!
//! # Modules
//!
//! - [`store`] - durable region storage behind [`store::RegionRepository`]
//! - [`tracker`] - merge-or-create of location fixes into regions
//! - [`overlay`] - explored circles to pixel-space reveal ellipses
//! - [`centering`] - camera follow state machine
//! - [`session`] - async loop wiring a fix stream to all of the above
//! - [`config`], [`logging`] - INI settings and tracing setup

pub mod centering;
pub mod config;
pub mod coord;
pub mod logging;
pub mod overlay;
pub mod region;
pub mod session;
pub mod store;
pub mod tracker;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
