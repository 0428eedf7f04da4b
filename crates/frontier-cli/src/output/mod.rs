pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// A result flattened into rows with a fixed column order.
pub struct Rows {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

/// Row view of the known result shapes: frontier report, frontier summary
/// and return table. `None` for anything else.
pub fn tabulate(result: &Value) -> Option<Rows> {
    if result.get("return_array").is_some() {
        frontier_rows(result)
    } else if let Some(curve) = result.get("frontier_curve").and_then(Value::as_array) {
        Some(Rows {
            headers: vec!["std".into(), "return".into()],
            records: curve
                .iter()
                .filter_map(Value::as_array)
                .map(|pair| pair.iter().map(cell).collect())
                .collect(),
        })
    } else if result.get("tickers").is_some() && result.get("rows").is_some() {
        return_rows(result)
    } else {
        None
    }
}

fn frontier_rows(result: &Value) -> Option<Rows> {
    let returns = result.get("return_array")?.as_array()?;
    let stds = result.get("variance_array")?.as_array()?;
    let sharpes = result.get("sharpe_array")?.as_array()?;
    let weights = result
        .get("weights_array")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let tickers = strings(result.pointer("/statistics/tickers"));

    let mut headers = vec![
        "target_return".to_string(),
        "std".to_string(),
        "sharpe_ratio".to_string(),
    ];
    headers.extend(tickers.iter().map(|t| format!("w_{}", t)));

    let records = (0..returns.len())
        .map(|k| {
            let mut row = vec![
                cell(&returns[k]),
                stds.get(k).map(cell).unwrap_or_default(),
                sharpes.get(k).map(cell).unwrap_or_default(),
            ];
            if let Some(Value::Array(w)) = weights.get(k) {
                row.extend(w.iter().map(cell));
            }
            row
        })
        .collect();
    Some(Rows { headers, records })
}

fn return_rows(result: &Value) -> Option<Rows> {
    let tickers = strings(result.get("tickers"));
    let rows = result.get("rows")?.as_array()?;
    let dates = strings(result.get("dates"));

    let mut headers = Vec::with_capacity(tickers.len() + 1);
    if !dates.is_empty() {
        headers.push("date".to_string());
    }
    headers.extend(tickers);

    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut record: Vec<String> = dates.get(i).cloned().into_iter().collect();
            if let Value::Array(values) = row {
                record.extend(values.iter().map(cell));
            }
            record
        })
        .collect();
    Some(Rows { headers, records })
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|a| a.iter().map(cell).collect())
        .unwrap_or_default()
}

/// Scalar rendering shared by the formatters.
pub fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
