// src/localize/mod.rs

use crate::config::parse_fixed_offset;
use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Text shown when neither a report timestamp nor the current time could be
/// rendered.
pub const UNAVAILABLE_TEXT: &str = "Time unavailable";

/// Suffix marking a rendered time as "now" rather than the report's own
/// timestamp.
pub const CURRENT_SUFFIX: &str = " (current)";

const PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RENDER_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

/// Patterns tried against the timestamp element's text, in order. The first
/// one that both matches and parses wins.
static ELEMENT_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "utc-suffixed",
            Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC").unwrap(),
        ),
        (
            "bare",
            Regex::new(r"(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})").unwrap(),
        ),
        (
            "report-generated",
            Regex::new(r"Report Generated:\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC").unwrap(),
        ),
        (
            "last-updated",
            Regex::new(r"Last Updated:\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC").unwrap(),
        ),
    ]
});

/// Patterns used when scanning the whole document instead of the dedicated
/// element. Only labeled forms here, so arbitrary dates in table cells never
/// win.
static DISCOVERY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "report-generated",
            Regex::new(r"Report Generated:\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC").unwrap(),
        ),
        (
            "last-updated",
            Regex::new(r"Last Updated:\s*(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}) UTC").unwrap(),
        ),
    ]
});

/// A timestamp pulled out of page text.
#[derive(Debug, Clone)]
pub struct TimestampScan {
    /// The matched `YYYY-MM-DD HH:MM:SS` text, without the `UTC` suffix.
    pub raw: String,
    pub instant: DateTime<Utc>,
    /// Which pattern matched, for logging.
    pub pattern: &'static str,
}

/// What ends up in the local-time element.
#[derive(Debug, Clone)]
pub enum LocalTime {
    /// The report timestamp, rendered in the target zone.
    Localized {
        text: String,
        raw: String,
        pattern: &'static str,
    },
    /// No report timestamp found; the current time stands in.
    CurrentTime { text: String },
    /// Nothing could be rendered at all.
    Unavailable,
}

impl LocalTime {
    pub fn display(&self) -> &str {
        match self {
            LocalTime::Localized { text, .. } => text,
            LocalTime::CurrentTime { text } => text,
            LocalTime::Unavailable => UNAVAILABLE_TEXT,
        }
    }
}

/// Timezone the localized text is rendered in.
#[derive(Debug, Clone, Copy)]
pub enum TargetZone {
    /// The machine's local timezone.
    Local,
    /// A pinned offset such as `+10:00`, for reproducible output.
    Fixed(FixedOffset),
}

impl TargetZone {
    /// `None` or `"local"` means the machine's timezone; anything else must
    /// be a `+HH:MM` offset.
    pub fn from_config(timezone: Option<&str>) -> Result<TargetZone> {
        match timezone {
            None => Ok(TargetZone::Local),
            Some(s) if s.trim().eq_ignore_ascii_case("local") => Ok(TargetZone::Local),
            Some(s) => Ok(TargetZone::Fixed(parse_fixed_offset(s)?)),
        }
    }

    /// Render an instant in this zone, or `None` if formatting failed.
    pub fn render(&self, instant: DateTime<Utc>) -> Option<String> {
        match self {
            TargetZone::Local => try_format(instant.with_timezone(&Local)),
            TargetZone::Fixed(offset) => try_format(instant.with_timezone(offset)),
        }
    }
}

/// `DelayedFormat`'s `Display` can fail, which would panic through
/// `to_string`. Route it through `fmt::Write` so a bad render degrades to the
/// unavailable text instead.
fn try_format<Tz: TimeZone>(instant: DateTime<Tz>) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    use std::fmt::Write;
    let mut out = String::new();
    write!(out, "{}", instant.format(RENDER_FORMAT)).ok()?;
    Some(out)
}

/// Try the element patterns in order against `text`.
pub fn scan_timestamp(text: &str) -> Option<TimestampScan> {
    scan_with(&ELEMENT_PATTERNS, text)
}

/// Scan whole-document text with the labeled patterns only.
pub fn discover_timestamp(text: &str) -> Option<TimestampScan> {
    scan_with(&DISCOVERY_PATTERNS, text)
}

fn scan_with(patterns: &[(&'static str, Regex)], text: &str) -> Option<TimestampScan> {
    for &(pattern, ref regex) in patterns {
        let captures = match regex.captures(text) {
            Some(c) => c,
            None => continue,
        };
        let raw = match captures.get(1) {
            Some(m) => m.as_str(),
            None => continue,
        };
        match NaiveDateTime::parse_from_str(raw, PARSE_FORMAT) {
            Ok(naive) => {
                return Some(TimestampScan {
                    raw: raw.to_string(),
                    instant: Utc.from_utc_datetime(&naive),
                    pattern,
                });
            }
            Err(err) => {
                debug!(pattern, raw, %err, "matched text is not a valid timestamp, trying next pattern");
            }
        }
    }
    None
}

/// Decide the local-time text for a page.
///
/// 1) scan the timestamp element's text
/// 2) fall back to scanning the whole page for a labeled timestamp
/// 3) fall back to the current time, marked as such
pub fn localize(
    element_text: Option<&str>,
    page_text: &str,
    zone: &TargetZone,
    now: DateTime<Utc>,
) -> LocalTime {
    let scan = element_text
        .and_then(scan_timestamp)
        .or_else(|| discover_timestamp(page_text));
    match scan {
        Some(found) => match zone.render(found.instant) {
            Some(text) => LocalTime::Localized {
                text,
                raw: found.raw,
                pattern: found.pattern,
            },
            None => LocalTime::Unavailable,
        },
        None => match zone.render(now) {
            Some(mut text) => {
                text.push_str(CURRENT_SUFFIX);
                LocalTime::CurrentTime { text }
            }
            None => LocalTime::Unavailable,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plus_ten() -> TargetZone {
        TargetZone::from_config(Some("+10:00")).expect("offset parses")
    }

    fn some_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 26, 5, 5, 43).single().expect("valid")
    }

    #[test]
    fn utc_suffixed_timestamp_localizes() {
        let out = localize(Some("2025-09-26 05:05:43 UTC"), "", &plus_ten(), some_now());
        match out {
            LocalTime::Localized { text, raw, pattern } => {
                assert_eq!(text, "2025-09-26 15:05:43 +10:00");
                assert_eq!(raw, "2025-09-26 05:05:43");
                assert_eq!(pattern, "utc-suffixed");
            }
            other => panic!("expected Localized, got {:?}", other),
        }
    }

    #[test]
    fn bare_timestamp_still_matches() {
        let out = localize(Some("built at 2025-09-26 05:05:43"), "", &plus_ten(), some_now());
        match out {
            LocalTime::Localized { pattern, .. } => assert_eq!(pattern, "bare"),
            other => panic!("expected Localized, got {:?}", other),
        }
    }

    #[test]
    fn labeled_prefix_is_fine() {
        let out = localize(
            Some("Report Generated: 2025-01-02 03:04:05 UTC"),
            "",
            &plus_ten(),
            some_now(),
        );
        assert!(matches!(out, LocalTime::Localized { .. }));
    }

    #[test]
    fn negative_offset_renders_with_sign() {
        let zone = TargetZone::from_config(Some("-05:30")).expect("offset parses");
        let out = localize(Some("2025-09-26 05:05:43 UTC"), "", &zone, some_now());
        match out {
            LocalTime::Localized { text, .. } => {
                assert_eq!(text, "2025-09-25 23:35:43 -05:30");
            }
            other => panic!("expected Localized, got {:?}", other),
        }
    }

    #[test]
    fn missing_timestamp_falls_back_to_current() {
        let out = localize(Some("no time here"), "", &plus_ten(), some_now());
        match out {
            LocalTime::CurrentTime { text } => {
                assert_eq!(text, "2025-09-26 15:05:43 +10:00 (current)");
            }
            other => panic!("expected CurrentTime, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_match_falls_through_to_current() {
        // Matches the digit shapes but is not a real datetime.
        let out = localize(Some("2025-13-45 99:99:99 UTC"), "", &plus_ten(), some_now());
        assert!(matches!(out, LocalTime::CurrentTime { .. }));
    }

    #[test]
    fn discovery_runs_when_element_text_has_no_timestamp() {
        let page = "footer: Report Generated: 2025-09-26 05:05:43 UTC";
        let out = localize(Some("pending"), page, &plus_ten(), some_now());
        match out {
            LocalTime::Localized { pattern, raw, .. } => {
                assert_eq!(pattern, "report-generated");
                assert_eq!(raw, "2025-09-26 05:05:43");
            }
            other => panic!("expected Localized, got {:?}", other),
        }
    }

    #[test]
    fn document_discovery_uses_labeled_patterns_only() {
        let page = "created 2020-01-01 00:00:00 somewhere. Last Updated: 2025-09-26 05:05:43 UTC";
        let out = localize(None, page, &plus_ten(), some_now());
        match out {
            LocalTime::Localized { raw, pattern, .. } => {
                assert_eq!(raw, "2025-09-26 05:05:43");
                assert_eq!(pattern, "last-updated");
            }
            other => panic!("expected Localized, got {:?}", other),
        }
    }

    #[test]
    fn unlabeled_page_dates_do_not_count_as_report_time() {
        let page = "first released 2020-01-01 00:00:00 and nothing else";
        let out = localize(None, page, &plus_ten(), some_now());
        assert!(matches!(out, LocalTime::CurrentTime { .. }));
    }

    #[test]
    fn unavailable_text_constant() {
        assert_eq!(LocalTime::Unavailable.display(), "Time unavailable");
    }
}
