//! Option pricing for the optval engine.
//!
//! This crate handles:
//! - Generalized Black-Scholes prices with cost of carry
//! - American prices via the Barone-Adesi-Whaley quadratic approximation
//! - Finite-difference Greeks over the American pricer

pub mod black_scholes;
pub mod baw;
pub mod greeks;

pub use baw::{AmericanOptionPricer, BawValuation};
pub use greeks::GreeksEngine;
