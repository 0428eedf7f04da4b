use clap::Args;
use serde_json::Value;

use frontier_core::returns::{
    prepare_returns, RawPriceTable, ResampleFrequency, ReturnsInput, DEFAULT_DATE_COLUMN,
};

use crate::input;
use crate::input::stdin::StdinPayload;

/// Arguments for price-to-returns preprocessing
#[derive(Args)]
pub struct ReturnsArgs {
    /// CSV price table, or a JSON document with `table`, `date_column`, `frequency`
    #[arg(long)]
    pub input: Option<String>,

    /// Name of the date column in the price table
    #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
    pub date_column: String,

    /// Resampling frequency: monthly, quarterly, annual
    #[arg(long, default_value = "monthly")]
    pub frequency: ResampleFrequency,
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let returns_input = if let Some(ref path) = args.input {
        if input::file::is_json(path) {
            input::file::read_json(path)?
        } else {
            with_table(input::csv_prices::read_price_csv(path)?, &args)
        }
    } else {
        match input::stdin::read_stdin()? {
            Some(StdinPayload::Json(data)) => serde_json::from_value(data)?,
            Some(StdinPayload::Csv(text)) => {
                with_table(input::csv_prices::read_prices(text.as_bytes())?, &args)
            }
            None => return Err("--input <prices.csv|input.json> or stdin required".into()),
        }
    };
    let result = prepare_returns(&returns_input)?;
    Ok(serde_json::to_value(result)?)
}

fn with_table(table: RawPriceTable, args: &ReturnsArgs) -> ReturnsInput {
    ReturnsInput {
        table,
        date_column: args.date_column.clone(),
        frequency: args.frequency,
    }
}
