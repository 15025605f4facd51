use super::metrics::{LooseValue, NormalizedMetrics, RawMetricsRow};
use serde_json::Value;

/// Convert every loosely typed cell into its typed counterpart.
///
/// This is the only place feed values are interpreted; anything unparseable becomes `0`
/// or `false` so a single corrupt cell never keeps the rest of the board from rendering.
pub fn normalize(row: &RawMetricsRow) -> NormalizedMetrics {
    NormalizedMetrics {
        billing: number(&row.billing),
        total_sales: count(&row.total_sales),
        visited_points: count(&row.visited_points),
        planned_visits: count(&row.planned_visits),
        pos_sales: count(&row.pos_sales),
        remote_sales: count(&row.remote_sales),
        effectiveness: number(&row.effectiveness),
        efficiency: number(&row.efficiency),
        avg_route_seconds: duration_seconds(&row.avg_route_duration.text()),
        route_compliance: flag(&row.route_compliance),
        effectiveness_compliance: flag(&row.effectiveness_compliance),
        coverage: count(&row.coverage),
        volume: count(&row.volume),
        pos_presence: number(&row.pos_presence),
        display_compliance: number(&row.display_compliance),
    }
}

pub(crate) fn number(value: &LooseValue) -> f64 {
    let parsed = match value.value() {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => parse_number(text),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

pub(crate) fn count(value: &LooseValue) -> u32 {
    let parsed = number(value);
    if parsed <= 0.0 {
        0
    } else if parsed >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        parsed.trunc() as u32
    }
}

pub(crate) fn flag(value: &LooseValue) -> bool {
    match value.value() {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(text) => matches!(
            text.trim().to_lowercase().as_str(),
            "true" | "1" | "si" | "sí" | "yes" | "y" | "x" | "ok" | "cumple" | "verdadero"
        ),
        _ => false,
    }
}

/// Parse sheet-formatted numbers such as `"85%"`, `"$ 1.234.567,50"` or `"1,234.5"`.
///
/// A lone separator followed by exactly three digits is a thousands separator, so
/// `"1.234"` and `"1,234"` both read as 1234.
fn parse_number(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();

    if cleaned.is_empty() {
        return 0.0;
    }

    let canonical = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(_)) => {
            let decimals = cleaned.rsplit(',').next().map(str::len).unwrap_or(0);
            if cleaned.matches(',').count() == 1 && decimals != 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        (Some(_), None) => {
            let decimals = cleaned.rsplit('.').next().map(str::len).unwrap_or(0);
            if cleaned.matches('.').count() > 1 || decimals == 3 {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    canonical.parse::<f64>().unwrap_or(0.0)
}

/// `H:MM:SS` or `HH:MM:SS` into total seconds; anything else is `0`.
pub(crate) fn duration_seconds(raw: &str) -> u32 {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let [hours, minutes, seconds] = parts.as_slice() else {
        return 0;
    };

    let valid_hours = (1..=2).contains(&hours.len());
    let valid_minutes = minutes.len() == 2;
    let valid_seconds = seconds.len() == 2;
    let all_digits = [hours, minutes, seconds]
        .iter()
        .all(|part| part.chars().all(|c| c.is_ascii_digit()));
    if !(valid_hours && valid_minutes && valid_seconds && all_digits) {
        return 0;
    }

    match (
        hours.parse::<u32>(),
        minutes.parse::<u32>(),
        seconds.parse::<u32>(),
    ) {
        (Ok(h), Ok(m), Ok(s)) if m < 60 && s < 60 => h * 3600 + m * 60 + s,
        _ => 0,
    }
}
