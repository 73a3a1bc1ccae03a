//! Cell-level interpretation shared by the KPI and key-result normalizers.
//!
//! Every function here is total: malformed input degrades to `0.0`, `None`
//! or an empty string and is never reported as an error.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

use crate::models::kpi::UnitKind;
use crate::models::period::Period;

const CURRENCY_MARKERS: [&str; 2] = ["R$", "$"];
const ZERO_TOKENS: [&str; 2] = ["0", "0%"];
const DATE_FORMATS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];
const SERIAL_MIN: i64 = 1;
const SERIAL_MAX: i64 = 2_958_465;

pub fn cell_text(cell: &JsonValue) -> String {
    match cell {
        JsonValue::Null => String::new(),
        JsonValue::String(value) => value.trim().to_string(),
        JsonValue::Number(value) => value.to_string(),
        JsonValue::Bool(value) => value.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => String::new(),
    }
}

/// Parses `R$ 1.234,56`-style text. Returns `0.0` on any failure.
pub fn parse_locale_number(raw: &str) -> f64 {
    let mut cleaned = raw.trim().to_string();
    for marker in CURRENCY_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    let cleaned: String = cleaned
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '.')
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

pub fn cell_number(cell: &JsonValue) -> f64 {
    match cell {
        JsonValue::Number(value) => value.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        JsonValue::String(value) => parse_locale_number(value),
        _ => 0.0,
    }
}

/// Target/result value after unit scaling; percentages become fractions.
///
/// A trailing `%` is only a display marker, so `"50%"` and `"50"` scale alike.
pub fn scaled_value(cell: &JsonValue, unit: UnitKind) -> f64 {
    let value = match cell {
        JsonValue::String(text) => parse_locale_number(text.trim().trim_end_matches('%')),
        other => cell_number(other),
    };
    unit.apply_scale(value)
}

/// Attainment fraction with the "not filled in" sentinel: blank, `0` and
/// `0%` cells are `None`, every other value is `Some`.
pub fn parse_attainment(cell: &JsonValue) -> Option<f64> {
    let text = cell_text(cell);
    if text.is_empty() || ZERO_TOKENS.contains(&text.as_str()) {
        return None;
    }

    match cell {
        JsonValue::Number(_) => {
            let value = cell_number(cell);
            if value == 0.0 {
                None
            } else {
                Some(value)
            }
        }
        _ => {
            let has_percent = text.contains('%');
            let value = parse_locale_number(&text.replace('%', ""));
            Some(if has_percent { value / 100.0 } else { value })
        }
    }
}

/// Key-result attainment on the 0–100 scale.
pub fn parse_percent(cell: &JsonValue) -> f64 {
    match cell {
        JsonValue::String(value) => parse_locale_number(&value.replace('%', "")),
        other => cell_number(other),
    }
}

pub fn parse_date(cell: &JsonValue) -> Option<NaiveDate> {
    match cell {
        JsonValue::Number(value) => value.as_f64().and_then(serial_to_date),
        JsonValue::String(value) => parse_date_text(value),
        _ => None,
    }
}

/// Reporting month from a `MM/YYYY` / `YYYY-MM` label or any supported date form.
/// Digit-only text is never read as a serial here, so a stray `"2024"` stays `None`.
pub fn parse_period(cell: &JsonValue) -> Option<Period> {
    let text = cell_text(cell);
    if let Some(period) = Period::parse(&text) {
        return Some(period);
    }
    if matches!(cell, JsonValue::String(_)) && text.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    parse_date(cell).map(Period::from_date)
}

/// Year from either a bare year cell or any supported date form.
pub fn parse_year(cell: &JsonValue) -> Option<i32> {
    match cell {
        JsonValue::Number(value) => {
            let raw = value.as_f64()?;
            if raw.fract() == 0.0 && (1900.0..=2999.0).contains(&raw) {
                Some(raw as i32)
            } else {
                serial_to_date(raw).map(|date| date.year())
            }
        }
        JsonValue::String(value) => {
            let trimmed = value.trim();
            if trimmed.len() == 4 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
                return trimmed.parse().ok();
            }
            parse_date_text(trimmed).map(|date| date.year())
        }
        _ => None,
    }
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(stamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(stamp.date_naive());
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Some(stamp.date());
    }

    let date_part = trimmed.split_whitespace().next().unwrap_or(trimmed);
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, format) {
            return Some(date);
        }
    }

    date_part
        .parse::<i64>()
        .ok()
        .and_then(|serial| serial_to_date(serial as f64))
}

/// Spreadsheet serial day number (days since 1899-12-30).
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.floor() as i64;
    if !(SERIAL_MIN..=SERIAL_MAX).contains(&days) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(days))
}
