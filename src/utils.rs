use crate::error::{BudgetError, Result};
use chrono::{DateTime, Datelike, FixedOffset, Months, NaiveDate, Offset, Utc};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const SECONDS_PER_DAY: i64 = 24 * 3600;

/// Formats a value as US dollars with two decimals and thousands grouping,
/// e.g. `-$1,234.50`. Values that round to zero cents carry no sign.
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

fn group_thousands(whole: u64) -> String {
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// `0.25` becomes `"25%"`. No rounding is applied, so binary float noise
/// shows through (`0.07` becomes `"7.000000000000001%"`).
pub fn format_percent(value: f64) -> String {
    format!("{}%", value * 100.0)
}

/// Formats unix seconds as an unpadded `YYYY-M-D` date in UTC.
pub fn format_date(timestamp: i64) -> String {
    format_date_in(timestamp, utc_offset())
}

pub fn format_date_in(timestamp: i64, offset: FixedOffset) -> String {
    match local_day(timestamp, offset) {
        Some(day) => format_day(day),
        None => timestamp.to_string(),
    }
}

pub fn format_day(day: NaiveDate) -> String {
    format!("{}-{}-{}", day.year(), day.month(), day.day())
}

/// Calendar day a timestamp falls on once shifted into `offset`.
pub fn local_day(timestamp: i64, offset: FixedOffset) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&offset).date_naive())
}

/// The same instant one calendar year earlier. Feb 29 clamps to Feb 28.
pub fn one_year_before(timestamp: i64) -> Option<i64> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .and_then(|dt| dt.checked_sub_months(Months::new(12)))
        .map(|dt| dt.timestamp())
}

pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

pub fn validate_utc_offset(seconds: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(seconds).ok_or_else(|| {
        BudgetError::InvalidConfig(format!(
            "UTC offset {} seconds is outside ±86399",
            seconds
        ))
    })
}

/// Approximates a locale-aware name ordering. Letters compare first with
/// accents and case folded away, then accents decide, then lowercase sorts
/// before uppercase.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fold_name(a)
        .cmp(&fold_name(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

fn fold_name(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}
