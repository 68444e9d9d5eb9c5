//! CLI command implementations.

pub mod common;
pub mod config;
pub mod overlay;
pub mod regions;
pub mod replay;
