use csv::{ReaderBuilder, Trim};
use std::io::Read;

use frontier_core::returns::RawPriceTable;

/// Read a CSV price file: header row, then one row per observation.
pub fn read_price_csv(path: &str) -> Result<RawPriceTable, Box<dyn std::error::Error>> {
    let file = super::file::open(path)?;
    read_prices(file).map_err(|e| format!("Failed to parse '{}': {}", path, e).into())
}

/// Parse CSV prices from any reader. Ragged rows are passed through so the
/// core reports them with row numbers.
pub fn read_prices<R: Read>(reader: R) -> Result<RawPriceTable, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(RawPriceTable::new(headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_prices() {
        let data = "Date, AAA ,BBB\n2024-01-02,100,50\n\n2024-02-01, 110 ,55\n";
        let t = read_prices(data.as_bytes()).unwrap();
        assert_eq!(t.headers, vec!["Date", "AAA", "BBB"]);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[1], vec!["2024-02-01", "110", "55"]);
    }

    #[test]
    fn test_ragged_rows_pass_through() {
        let data = "Date,AAA\n2024-01-02,100,7\n";
        let t = read_prices(data.as_bytes()).unwrap();
        assert_eq!(t.rows[0].len(), 3);
    }
}
