use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, tabulate, Rows};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_fields(map);
            }
        }
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match (tabulate(result), result) {
        (Some(rows), _) => {
            print_rows(&rows);
            if let Some(best) = result.get("max_sharpe_point").filter(|v| !v.is_null()) {
                println!("\nMax Sharpe:");
                if let Value::Object(fields) = best {
                    print_fields(fields);
                }
            }
        }
        (None, Value::Object(fields)) => print_fields(fields),
        (None, other) => println!("{}", other),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_rows(rows: &Rows) {
    if rows.records.is_empty() {
        println!("(empty)");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(rows.headers.iter().map(String::as_str));
    for record in &rows.records {
        builder.push_record(record.iter().map(String::as_str));
    }
    println!("{}", Table::from(builder));
}

fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        other => cell(other),
    }
}
