use serde_json::Value;
use std::io;

use super::{cell, tabulate};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(rows) = tabulate(result) {
        let _ = wtr.write_record(&rows.headers);
        for record in &rows.records {
            let _ = wtr.write_record(record);
        }
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &cell(val)]);
        }
    } else {
        let _ = wtr.write_record([&cell(result)]);
    }

    let _ = wtr.flush();
}
