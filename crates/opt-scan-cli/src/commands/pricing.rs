use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use opt_scan_core::pricing;
use opt_scan_core::types::OptionClass;

use crate::input;

// ---------------------------------------------------------------------------
// Greeks
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GreeksInput {
    spot: Decimal,
    strike: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    volatility: Decimal,
    option_type: OptionClass,
}

/// Arguments for Greeks calculation
#[derive(Args)]
pub struct GreeksArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_greeks(args: GreeksArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let g: GreeksInput = input::read(&args.input, "greeks")?;
    let greeks = pricing::greeks(
        g.spot,
        g.strike,
        g.time_to_expiry,
        g.risk_free_rate,
        g.volatility,
        g.option_type,
    )
    .map(|greeks| greeks.rounded());

    // null means the model could not price the inputs: not an error
    Ok(serde_json::json!({ "greeks": greeks }))
}

// ---------------------------------------------------------------------------
// Probabilities
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ProbabilityKind {
    Otm,
    Itm,
    Between,
}

#[derive(Deserialize)]
struct ProbabilityInput {
    kind: ProbabilityKind,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    volatility: Decimal,
    #[serde(default)]
    strike: Option<Decimal>,
    #[serde(default)]
    option_type: Option<OptionClass>,
    #[serde(default)]
    lower: Option<Decimal>,
    #[serde(default)]
    upper: Option<Decimal>,
}

/// Arguments for probability calculation
#[derive(Args)]
pub struct ProbabilityArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_probability(args: ProbabilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let p: ProbabilityInput = input::read(&args.input, "probability")?;

    let probability = match p.kind {
        ProbabilityKind::Otm | ProbabilityKind::Itm => {
            let strike = p.strike.ok_or("strike is required for otm/itm")?;
            let class = p.option_type.ok_or("option_type is required for otm/itm")?;
            let f = match p.kind {
                ProbabilityKind::Otm => pricing::probability_otm,
                _ => pricing::probability_itm,
            };
            f(
                p.spot,
                strike,
                p.time_to_expiry,
                p.risk_free_rate,
                p.volatility,
                class,
            )
        }
        ProbabilityKind::Between => {
            let lower = p.lower.ok_or("lower is required for between")?;
            let upper = p.upper.ok_or("upper is required for between")?;
            pricing::probability_between(
                p.spot,
                lower,
                upper,
                p.time_to_expiry,
                p.risk_free_rate,
                p.volatility,
            )
        }
    };

    Ok(serde_json::json!({ "probability": probability.map(|v| v.round_dp(4)) }))
}
