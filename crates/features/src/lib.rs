//! Feature assembly for the optval engine.
//!
//! This crate handles:
//! - Model feature schemas and dense feature vectors
//! - Sector label encoding
//! - Merging an indicator row with a contract, its price inputs and Greeks
//! - Re-valuing a contract over a timeline up to expiry

pub mod schema;
pub mod sector;
pub mod assembler;
pub mod timeline;

pub use schema::{FeatureName, FeatureSchema, FeatureVector};
pub use sector::SectorEncoder;
pub use assembler::{FeatureAssembler, MergedFeatures};
pub use timeline::{Predictor, Sampling, TimelinePoint, TimelineSimulator};
