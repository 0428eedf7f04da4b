use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use frontier_core::frontier::{optimize_frontier, FrontierConfig, FrontierInput};
use frontier_core::returns::{
    load_return_table, RawPriceTable, ResampleFrequency, ReturnTable, DEFAULT_DATE_COLUMN,
};
use frontier_core::types::{ComputationOutput, Rate};

use crate::input;
use crate::input::stdin::StdinPayload;

const DEFAULT_RISK_FREE_RATE: Rate = dec!(0.03);

/// Arguments shared by `optimize` and `summary`
#[derive(Args)]
pub struct OptimizeArgs {
    /// CSV price table, or a full JSON frontier input (returns, risk_free_rate, config)
    #[arg(long, conflicts_with = "returns")]
    pub input: Option<String>,

    /// JSON return table (tickers, rows) of periodic decimal returns
    #[arg(long)]
    pub returns: Option<String>,

    /// Name of the date column in a CSV price table
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Resampling frequency for CSV prices: monthly, quarterly, annual
    #[arg(long, default_value = "monthly")]
    pub frequency: ResampleFrequency,

    /// Risk-free rate as a decimal (0.03 = 3%); subtracted from percent returns as given [default: 0.03]
    #[arg(long, allow_hyphen_values = true)]
    pub risk_free_rate: Option<Rate>,

    /// Return periods per year [default: 12, or the resampling frequency's]
    #[arg(long)]
    pub periods_per_year: Option<u32>,

    /// Number of target returns between 0 and the largest asset mean [default: 40]
    #[arg(long)]
    pub grid_size: Option<usize>,

    /// Minimum weight per asset [default: 0]
    #[arg(long)]
    pub lower_bound: Option<Decimal>,

    /// Maximum weight per asset [default: 0.3]
    #[arg(long)]
    pub upper_bound: Option<Decimal>,

    /// Solver iteration cap per target [default: 200]
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

pub fn run_optimize(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let frontier_input = load_frontier_input(&args)?;
    let result = optimize_frontier(&frontier_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: OptimizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let frontier_input = load_frontier_input(&args)?;
    let out = optimize_frontier(&frontier_input)?;
    let summary = ComputationOutput {
        result: out.result.summary(),
        methodology: out.methodology,
        assumptions: out.assumptions,
        warnings: out.warnings,
        metadata: out.metadata,
    };
    Ok(serde_json::to_value(summary)?)
}

fn load_frontier_input(args: &OptimizeArgs) -> Result<FrontierInput, Box<dyn std::error::Error>> {
    let base = if let Some(ref path) = args.returns {
        let returns: ReturnTable = input::file::read_json(path)?;
        from_returns(returns, FrontierConfig::default())
    } else if let Some(ref path) = args.input {
        if input::file::is_json(path) {
            input::file::read_json(path)?
        } else {
            from_prices(input::csv_prices::read_price_csv(path)?, args)?
        }
    } else {
        match input::stdin::read_stdin()? {
            Some(StdinPayload::Json(data)) => serde_json::from_value(data)?,
            Some(StdinPayload::Csv(text)) => {
                from_prices(input::csv_prices::read_prices(text.as_bytes())?, args)?
            }
            None => {
                return Err(
                    "--input <prices.csv|input.json>, --returns <returns.json> or stdin required"
                        .into(),
                )
            }
        }
    };
    Ok(apply_overrides(base, args))
}

fn from_returns(returns: ReturnTable, config: FrontierConfig) -> FrontierInput {
    FrontierInput {
        returns,
        risk_free_rate: DEFAULT_RISK_FREE_RATE,
        config,
    }
}

fn from_prices(
    table: RawPriceTable,
    args: &OptimizeArgs,
) -> Result<FrontierInput, Box<dyn std::error::Error>> {
    let returns = load_return_table(&table, &args.date_column, args.frequency)?;
    let config = FrontierConfig {
        periods_per_year: args.frequency.periods_per_year(),
        ..FrontierConfig::default()
    };
    Ok(from_returns(returns, config))
}

fn apply_overrides(mut input: FrontierInput, args: &OptimizeArgs) -> FrontierInput {
    if let Some(rf) = args.risk_free_rate {
        input.risk_free_rate = rf;
    }
    let config = &mut input.config;
    if let Some(ppy) = args.periods_per_year {
        config.periods_per_year = ppy;
    }
    if let Some(size) = args.grid_size {
        config.return_grid_size = size;
    }
    if let Some(lo) = args.lower_bound {
        config.lower_bound = lo;
    }
    if let Some(hi) = args.upper_bound {
        config.upper_bound = hi;
    }
    if let Some(n) = args.max_iterations {
        config.solver.max_iterations = n;
    }
    input
}
