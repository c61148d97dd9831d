//! Data ingestion and normalization for the optval engine.
//!
//! This crate handles:
//! - Grouping raw bars into per-instrument series
//! - Bar ordering and domain validation
//! - Market shock-event labelling by date range

pub mod series;
pub mod shock;

pub use series::SeriesBuilder;
pub use shock::{ShockCalendar, ShockEvent};
