use rust_decimal::Decimal;
use serde_json::Value;

use super::cell;

/// Print just the key answer from the output.
///
/// Frontier results print the max-Sharpe target return and std; anything
/// else falls back to the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(point) = max_sharpe(result_obj) {
        println!("{}", point);
        return;
    }

    if let Value::Object(map) = result_obj {
        // Return table: number of periods.
        if let Some(Value::Array(rows)) = map.get("rows") {
            println!("{}", rows.len());
            return;
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result_obj));
}

/// `"<return> <std>"` of the highest-Sharpe point, or `"empty"` for a
/// frontier without points.
fn max_sharpe(result: &Value) -> Option<String> {
    if let Some(point) = result.get("max_sharpe_point") {
        return Some(match point {
            Value::Null => "empty".to_string(),
            p => format!("{} {}", cell(&p["target_return"]), cell(&p["variance"])),
        });
    }

    let sharpes = result.get("sharpe_array")?.as_array()?;
    let returns = result.get("return_array")?.as_array()?;
    let stds = result.get("variance_array")?.as_array()?;
    let mut best: Option<(usize, Decimal)> = None;
    for (i, s) in sharpes.iter().enumerate() {
        let Ok(v) = cell(s).parse::<Decimal>() else {
            continue;
        };
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    Some(match best {
        Some((i, _)) => format!("{} {}", cell(&returns[i]), cell(&stds[i])),
        None => "empty".to_string(),
    })
}
