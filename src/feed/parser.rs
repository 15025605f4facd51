use super::FeedError;
use crate::tiers::RawMetricsRow;
use serde_json::{Map, Value};
use std::io::Read;

/// Body encodings the branch feeds publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Json,
    Csv,
}

impl FeedFormat {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type.and_then(|value| value.parse::<mime::Mime>().ok()) {
            Some(media) if media.subtype() == mime::CSV => Self::Csv,
            _ => Self::Json,
        }
    }
}

pub fn parse_body(format: FeedFormat, body: &str) -> Result<Vec<RawMetricsRow>, FeedError> {
    match format {
        FeedFormat::Json => parse_json(body),
        FeedFormat::Csv => parse_csv(body.as_bytes()),
    }
}

/// Accepts a bare array, an object wrapping the rows under `rows` or `data`, or an
/// `{"error": ..., "code": ...}` envelope reported back as an upstream error.
pub fn parse_json(body: &str) -> Result<Vec<RawMetricsRow>, FeedError> {
    let document: Value = serde_json::from_str(body)
        .map_err(|err| FeedError::Malformed(format!("feed body is not JSON: {err}")))?;

    match document {
        Value::Array(items) => rows_from_items(items),
        Value::Object(mut map) => {
            if let Some(error) = map.remove("error") {
                return Err(error_envelope(error, map.get("code")));
            }
            match map.remove("rows").or_else(|| map.remove("data")) {
                Some(Value::Array(items)) => rows_from_items(items),
                _ => Err(FeedError::Malformed(
                    "feed object does not contain a row collection".to_string(),
                )),
            }
        }
        other => Err(FeedError::Malformed(format!(
            "expected a collection of rows, found {}",
            kind(&other)
        ))),
    }
}

/// Spreadsheet export with a header row; headers are folded to snake_case field names.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<RawMetricsRow>, FeedError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(header_key).collect();
    let mut rows = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let fields: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), Value::String(value.to_string())))
            .collect();

        if fields.values().all(|value| value.as_str() == Some("")) {
            continue;
        }

        rows.push(row_from_object(rows.len(), fields)?);
    }

    Ok(rows)
}

fn rows_from_items(items: Vec<Value>) -> Result<Vec<RawMetricsRow>, FeedError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => row_from_object(index, fields),
            other => Err(FeedError::Malformed(format!(
                "row {index} is {} instead of an object",
                kind(&other)
            ))),
        })
        .collect()
}

fn row_from_object(index: usize, fields: Map<String, Value>) -> Result<RawMetricsRow, FeedError> {
    serde_json::from_value(Value::Object(fields))
        .map_err(|err| FeedError::Malformed(format!("row {index} could not be read: {err}")))
}

fn error_envelope(error: Value, code: Option<&Value>) -> FeedError {
    let (message, nested_code) = match error {
        Value::String(message) => (message, None),
        Value::Object(mut details) => {
            let message = details
                .remove("message")
                .and_then(|value| value.as_str().map(str::to_string))
                .unwrap_or_else(|| "feed reported an error".to_string());
            (message, details.get("code").and_then(numeric_code))
        }
        other => (other.to_string(), None),
    };

    FeedError::Upstream {
        message,
        code: code.and_then(numeric_code).or(nested_code),
    }
}

fn numeric_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn header_key(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_array() {
        let rows = parse_json(
            r#"[{"representative": "Ana", "efficiency": "88", "zone": "A1"},
                {"representative": "Beto", "coverage": 71}]"#,
        )
        .expect("rows parse");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].representative_name(), "Ana");
        assert_eq!(rows[0].extra.get("zone"), Some(&Value::String("A1".into())));
        assert_eq!(rows[1].coverage.value(), &Value::from(71));
    }

    #[test]
    fn unwraps_rows_and_data_envelopes() {
        assert_eq!(
            parse_json(r#"{"rows": [{"representative": "Ana"}]}"#)
                .expect("rows")
                .len(),
            1
        );
        assert_eq!(
            parse_json(r#"{"data": []}"#).expect("data").len(),
            0
        );
    }

    #[test]
    fn error_envelope_carries_feed_code() {
        match parse_json(r#"{"error": "sheet not shared", "code": 403}"#) {
            Err(FeedError::Upstream { message, code }) => {
                assert_eq!(message, "sheet not shared");
                assert_eq!(code, Some(403));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }

        match parse_json(r#"{"error": {"message": "quota", "code": "429"}}"#) {
            Err(FeedError::Upstream { message, code }) => {
                assert_eq!(message, "quota");
                assert_eq!(code, Some(429));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_collections_without_partial_rows() {
        assert!(matches!(parse_json("42"), Err(FeedError::Malformed(_))));
        assert!(matches!(parse_json("not json"), Err(FeedError::Malformed(_))));
        assert!(matches!(
            parse_json(r#"{"status": "ok"}"#),
            Err(FeedError::Malformed(_))
        ));
        assert!(matches!(
            parse_json(r#"[{"representative": "Ana"}, "oops"]"#),
            Err(FeedError::Malformed(_))
        ));
    }

    #[test]
    fn parses_csv_exports_with_display_headers() {
        let csv = "\u{feff}Representative,Supervisor,Efficiency,Avg Route Duration,Projected Tier\n\
                   Ana,Marta,85%,5:20:00,Semi Senior\n\
                   ,,,,\n\
                   Beto,Marta,,,Junior\n";
        let rows = parse_csv(csv.as_bytes()).expect("csv parses");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].representative_name(), "Ana");
        assert_eq!(rows[0].avg_route_duration.text(), "5:20:00");
        assert_eq!(rows[0].projected_tier.text(), "Semi Senior");
        assert_eq!(rows[1].efficiency.text(), "");
    }

    #[test]
    fn content_type_selects_format() {
        assert_eq!(
            FeedFormat::from_content_type(Some("text/csv; charset=utf-8")),
            FeedFormat::Csv
        );
        assert_eq!(
            FeedFormat::from_content_type(Some("application/json")),
            FeedFormat::Json
        );
        assert_eq!(FeedFormat::from_content_type(None), FeedFormat::Json);
    }
}
