// src/enhance/columns.rs
//
// Sort keys for columns whose display text does not sort naturally. The key
// is written to each body cell's data-order attribute, which the table
// library prefers over the cell text when ordering.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Status cells sort by state, best first. Matching is lowercase substring
/// containment, first hit wins; the warning needle is the bare `⚠` so the
/// emoji-presentation variant matches too.
const STATUS_RANKS: &[(&str, &[&str])] = &[
    ("0-ongoing", &["🟢", "ongoing"]),
    ("1-unknown", &["❓", "unknown"]),
    ("2-discontinued", &["🔴", "discontinued"]),
    ("3-issues", &["⚠", "issues", "deprecated"]),
];
const STATUS_DEFAULT: &str = "4-other";

static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9][0-9,]*)").unwrap());
static DAYS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(\d+)\s+days?\s+ago").unwrap());
static ABSOLUTE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap());

/// Which special sort treatment a column gets, decided by its header text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    /// Status badges: ongoing, unknown, discontinued, has-issues, other.
    StatusRank,
    /// Comma-grouped star counts, with N/A pushed to the bottom.
    StarCount,
    /// Relative or absolute activity dates, as epoch milliseconds.
    LastActivity,
}

impl ColumnRule {
    pub fn for_header(header: &str) -> Option<ColumnRule> {
        let name = header.trim();
        if name.eq_ignore_ascii_case("Status") {
            Some(ColumnRule::StatusRank)
        } else if name.eq_ignore_ascii_case("Stars") {
            Some(ColumnRule::StarCount)
        } else if name.eq_ignore_ascii_case("Last Activity") {
            Some(ColumnRule::LastActivity)
        } else {
            None
        }
    }

    /// The data-order value for one cell. `now` anchors relative dates.
    pub fn sort_key(&self, cell: &str, now: DateTime<Utc>) -> String {
        match self {
            ColumnRule::StatusRank => status_rank(cell).to_string(),
            ColumnRule::StarCount => star_count(cell).to_string(),
            ColumnRule::LastActivity => activity_epoch_ms(cell, now).to_string(),
        }
    }
}

fn status_rank(cell: &str) -> &'static str {
    let lower = cell.to_lowercase();
    for &(rank, needles) in STATUS_RANKS {
        if needles.iter().any(|needle| lower.contains(needle)) {
            return rank;
        }
    }
    STATUS_DEFAULT
}

fn star_count(cell: &str) -> i64 {
    let lower = cell.to_lowercase();
    if lower.contains("n/a") || lower.contains("not found") {
        return -1;
    }
    let digits = match LEADING_NUMBER.captures(cell) {
        Some(caps) => caps[1].replace(',', ""),
        None => return -1,
    };
    digits.parse().unwrap_or(-1)
}

fn activity_epoch_ms(cell: &str, now: DateTime<Utc>) -> i64 {
    let lower = cell.to_lowercase();
    if lower.contains("today") {
        return now.timestamp_millis();
    }
    if let Some(caps) = DAYS_AGO.captures(cell) {
        if let Ok(days) = caps[1].parse::<i64>() {
            if let Some(delta) = chrono::Duration::try_days(days) {
                if let Some(instant) = now.checked_sub_signed(delta) {
                    return instant.timestamp_millis();
                }
            }
        }
        return 0;
    }
    if let Some(caps) = ABSOLUTE_TIME.captures(cell) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&caps[1], "%Y-%m-%d %H:%M:%S") {
            return Utc.from_utc_datetime(&naive).timestamp_millis();
        }
    }
    // Vague text like "over a year ago" sinks to the bottom.
    0
}
