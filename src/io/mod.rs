//! Source readers and schema normalization.
//!
//! One submodule per origin; each turns the source's idiosyncratic shape
//! into [`CanonicalObservation`]s (or case records for the case-line
//! source). The helpers below are shared across readers:
//!
//! - header lookup is case-insensitive and BOM-tolerant, since the upstream
//!   files mix spellings and some exports prefix a UTF-8 BOM
//! - dates appear in several formats across (and within) sources, so
//!   parsing tries a small fixed set deterministically

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::StringRecord;

pub mod cantonal;
pub mod caseline;
pub mod daily;
pub mod global;

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

pub(crate) fn normalize_header_name(name: &str) -> String {
    // Excel exports sometimes emit a BOM prefix on the first header
    // (e.g. "\u{feff}FIPS"); without stripping it, schema validation would
    // incorrectly report the column missing.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn get_field<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a calendar date in any of the formats the sources use.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y"];
    FMTS.iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse the date component of a "last update" timestamp.
///
/// The daily-report files switched timestamp formats several times; plain
/// dates are accepted as a final fallback.
pub(crate) fn parse_timestamp_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%m/%d/%y %H:%M",
        "%m/%d/%y %H:%M:%S",
    ];
    for fmt in FMTS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    parse_date(s)
}

pub(crate) fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
