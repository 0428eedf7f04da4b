use std::io::{self, Read};

/// Piped stdin content, as either a JSON document or a CSV price table.
pub enum StdinPayload {
    Json(serde_json::Value),
    Csv(String),
}

/// Read stdin if data is being piped. Returns None for an interactive TTY
/// or empty input.
pub fn read_stdin() -> Result<Option<StdinPayload>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    classify(&buffer)
}

fn classify(buffer: &str) -> Result<Option<StdinPayload>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(Some(StdinPayload::Json(serde_json::from_str(trimmed)?)));
    }
    Ok(Some(StdinPayload::Csv(trimmed.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(classify("  \n").unwrap().is_none());
        assert!(matches!(
            classify("{\"a\": 1}").unwrap(),
            Some(StdinPayload::Json(_))
        ));
        assert!(matches!(
            classify("Date,AAA\n2024-01-02,1\n").unwrap(),
            Some(StdinPayload::Csv(_))
        ));
        assert!(classify("{not json").is_err());
    }
}
