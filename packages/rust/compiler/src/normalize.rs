//! Normalization of raw API values into canonical record fields.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;

use civicore_shared::{CivicoreError, ELECTION_DAY_HOUR, Result};

/// Matches the trailing `state:xx` component of a region-division identifier
/// such as `ocd-division/country:us/state:ny`.
static STATE_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"state:([A-Za-z]{2})$").expect("state suffix regex"));

/// Derive the two-letter uppercase state code from an optional
/// region-division identifier. Identifiers without a state component
/// (country-level, or absent entirely) yield an empty string.
pub fn state_from_division(division: Option<&str>) -> String {
    division
        .and_then(|d| STATE_SUFFIX_RE.captures(d.trim()))
        .map(|caps| caps[1].to_uppercase())
        .unwrap_or_default()
}

/// Normalize an election day (`YYYY-MM-DD`) to the fixed reference time:
/// that day at [`ELECTION_DAY_HOUR`]:00 UTC.
pub fn election_date(election_day: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(election_day.trim(), "%Y-%m-%d")
        .map_err(|e| CivicoreError::parse(format!("election day '{election_day}': {e}")))?;
    let datetime = date
        .and_hms_opt(ELECTION_DAY_HOUR, 0, 0)
        .ok_or_else(|| CivicoreError::parse(format!("election day '{election_day}' out of range")))?;
    Ok(Utc.from_utc_datetime(&datetime))
}
