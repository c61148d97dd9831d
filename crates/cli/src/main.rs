//! optval: indicators, American option prices and model features from daily bars.
//!
//! # Indicator rows for every instrument in a bars file
//! optval indicators --bars data/bars.json --latest
//!
//! # Price and Greeks for explicit inputs
//! optval price --spot 100 --strike 100 --time 0.25 --rate 0.03 --sigma 0.2 --option-type put
//!
//! # Feature vector for one instrument and contract
//! optval features --bars data/bars.json --instrument AAPL --contract contract.json
//!
//! # Valuation timeline up to expiry
//! optval timeline --bars data/bars.json --instrument AAPL --contract contract.json --points 10

mod input;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use optval_core::{Config, OptionType, PricingInputs};
use optval_features::{FeatureAssembler, FeatureSchema, Sampling, TimelineSimulator};
use optval_indicators::IndicatorEngine;
use optval_pricing::GreeksEngine;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "optval")]
#[command(about = "American option feature and pricing engine")]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute indicator rows from a bars file
    Indicators {
        /// JSON array of bars
        #[arg(short, long)]
        bars: PathBuf,

        /// JSON map of instrument id to sector
        #[arg(long)]
        sectors: Option<PathBuf>,

        /// JSON array of shock events replacing the built-in calendar
        #[arg(long)]
        shocks: Option<PathBuf>,

        /// Only emit the latest row per instrument
        #[arg(long)]
        latest: bool,
    },

    /// Price an American option and its Greeks
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Time to expiry in years
        #[arg(long)]
        time: f64,

        #[arg(long)]
        rate: f64,

        #[arg(long)]
        sigma: f64,

        #[arg(long, default_value_t = 0.0)]
        dividend_yield: f64,

        /// call or put
        #[arg(long)]
        option_type: OptionType,
    },

    /// Assemble a model feature vector for one instrument and contract
    Features {
        #[arg(short, long)]
        bars: PathBuf,

        #[arg(long)]
        sectors: Option<PathBuf>,

        #[arg(short, long)]
        instrument: String,

        /// JSON contract (K, option_type, expiry_date or T, optional r/sigma/q)
        #[arg(long)]
        contract: PathBuf,

        /// Valuation date; defaults to the latest bar's date
        #[arg(long)]
        valuation_date: Option<NaiveDate>,

        /// option_price or exercise_probability
        #[arg(long, default_value = "option_price")]
        schema: FeatureSchema,
    },

    /// Re-value a contract on dates up to its expiry
    Timeline {
        #[arg(short, long)]
        bars: PathBuf,

        #[arg(long)]
        sectors: Option<PathBuf>,

        #[arg(short, long)]
        instrument: String,

        #[arg(long)]
        contract: PathBuf,

        /// First date; defaults to the latest bar's date
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Evenly spaced points instead of every day
        #[arg(long)]
        points: Option<usize>,
    },
}

#[derive(Serialize)]
struct PriceReport {
    inputs: PricingInputs,
    price: f64,
    european: f64,
    critical_price: Option<f64>,
    early_exercise: bool,
    greeks: optval_core::Greeks,
}

#[derive(Serialize)]
struct FeatureReport<'a> {
    instrument: &'a str,
    valuation_date: NaiveDate,
    schema: FeatureSchema,
    columns: Vec<&'static str>,
    values: &'a [f64],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Indicators {
            bars,
            sectors,
            shocks,
            latest,
        } => {
            let series = input::load_series(&bars, sectors.as_deref())?;
            let engine = IndicatorEngine::new(config.indicators.clone())
                .with_shock_calendar(input::load_shocks(shocks.as_deref())?);
            info!(instruments = series.len(), "computing indicators");

            if latest {
                print_json(&engine.latest_batch(&series)?)?;
            } else {
                print_json(&engine.compute_batch(&series))?;
            }
        }

        Commands::Price {
            spot,
            strike,
            time,
            rate,
            sigma,
            dividend_yield,
            option_type,
        } => {
            let inputs = PricingInputs::new(spot, strike, time, rate, sigma, option_type)
                .with_dividend_yield(dividend_yield);
            let engine = GreeksEngine::new(config.pricing.clone());
            let valuation = engine.pricer().valuation(&inputs)?;
            let greeks = engine.compute(&inputs)?;

            print_json(&PriceReport {
                inputs,
                price: valuation.price,
                european: valuation.european,
                critical_price: valuation.critical_price,
                early_exercise: valuation.early_exercise,
                greeks,
            })?;
        }

        Commands::Features {
            bars,
            sectors,
            instrument,
            contract,
            valuation_date,
            schema,
        } => {
            let series = input::load_instrument(&bars, sectors.as_deref(), &instrument)?;
            let contract = input::load_contract(&contract)?;
            let row = IndicatorEngine::new(config.indicators.clone()).latest(&series)?;
            let valuation_date = valuation_date.unwrap_or(row.date);

            let vector = FeatureAssembler::new(&config).assemble(
                &row,
                &contract,
                valuation_date,
                schema,
            )?;
            print_json(&FeatureReport {
                instrument: &instrument,
                valuation_date,
                schema,
                columns: schema.column_names(),
                values: vector.values(),
            })?;
        }

        Commands::Timeline {
            bars,
            sectors,
            instrument,
            contract,
            start,
            points,
        } => {
            let series = input::load_instrument(&bars, sectors.as_deref(), &instrument)?;
            let contract = input::load_contract(&contract)?;
            let row = IndicatorEngine::new(config.indicators.clone()).latest(&series)?;
            let start = start.unwrap_or(row.date);
            let sampling = points.map_or(Sampling::Daily, Sampling::Points);

            let timeline = TimelineSimulator::new(FeatureAssembler::new(&config))
                .run(&row, &contract, start, sampling)?;
            print_json(&timeline)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
