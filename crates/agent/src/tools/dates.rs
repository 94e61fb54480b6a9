//! `travel_dates` argument handling

use chrono::{Duration, Local, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Searches without usable dates start this many days from today
pub const DEFAULT_LEAD_DAYS: i64 = 28;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d{4}-\d{2}-\d{2})\s+to\s+(\d{4}-\d{2}-\d{2})\s*$")
            .expect("valid travel date pattern")
    })
}

/// Parse `"YYYY-MM-DD to YYYY-MM-DD"`; `None` if anything is off
pub fn parse_range(input: &str) -> Option<DateRange> {
    let caps = range_pattern().captures(input)?;
    let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok()?;
    if end < start {
        return None;
    }
    Some(DateRange { start, end })
}

/// Start half of `"<start> to <anything>"`
pub fn parse_start(input: &str) -> Option<NaiveDate> {
    let (start, _) = input.split_once(" to ")?;
    NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d").ok()
}

pub fn default_start_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(DEFAULT_LEAD_DAYS)
}

/// Range from the optional argument, logging what was used. `context` names
/// the search for the log line.
pub fn resolve(travel_dates: Option<&str>, context: &str) -> Option<DateRange> {
    match travel_dates {
        Some(raw) => match parse_range(raw) {
            Some(range) => {
                info!(
                    "◆ {}: using dates {} to {}",
                    context, range.start, range.end
                );
                Some(range)
            }
            None => {
                warn!("◆ {}: could not parse travel dates {:?}", context, raw);
                None
            }
        },
        None => {
            info!("◆ {}: no travel dates given, using defaults", context);
            None
        }
    }
}

/// Departure date for flight offers. A valid start date is kept even when
/// the end date is unusable.
pub fn start_date_or_default(travel_dates: Option<&str>) -> NaiveDate {
    if let Some(range) = resolve(travel_dates, "flight search") {
        return range.start;
    }
    match travel_dates.and_then(parse_start) {
        Some(start) => {
            info!("◆ flight search: keeping start date {}", start);
            start
        }
        None => default_start_date(),
    }
}
