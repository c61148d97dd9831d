//! Technical indicator computation for the optval engine.
//!
//! This crate handles:
//! - Simple returns and annualized rolling volatility
//! - Rolling skewness and excess kurtosis of returns
//! - RSI and MACD momentum indicators
//! - Volume averages, relative volume and volume changes
//!
//! Every transform runs per instrument over an ordered series; windows count
//! observations, not calendar days.

pub mod rolling;
pub mod volatility;
pub mod momentum;
pub mod volume;
pub mod engine;

pub use rolling::RollingWindow;
pub use volatility::{RollingMoments, RollingVolatility};
pub use momentum::{Ema, Macd, Rsi};
pub use volume::VolumeTracker;
pub use engine::IndicatorEngine;
