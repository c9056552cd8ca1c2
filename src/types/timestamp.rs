use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const MERIDIEM_FORMATS: &[&str] = &[
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// When a quote was last updated. Some feed rows carry only the date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteTimestamp {
    At(NaiveDateTime),
    /// No time of day; the quote cannot be placed within a session
    Day(NaiveDate),
}

impl QuoteTimestamp {
    pub fn date(&self) -> NaiveDate {
        match self {
            QuoteTimestamp::At(ts) => ts.date(),
            QuoteTimestamp::Day(date) => *date,
        }
    }

    pub fn time_of_day(&self) -> Option<NaiveDateTime> {
        match self {
            QuoteTimestamp::At(ts) => Some(*ts),
            QuoteTimestamp::Day(_) => None,
        }
    }
}

impl From<NaiveDateTime> for QuoteTimestamp {
    fn from(ts: NaiveDateTime) -> Self {
        QuoteTimestamp::At(ts)
    }
}

fn is_meridiem(token: &str) -> bool {
    token.eq_ignore_ascii_case("AM") || token.eq_ignore_ascii_case("PM")
}

/// Parse a quote's last-update timestamp as delivered by the quote feed.
///
/// The feed writes `YYYY-MM-DD HH:MM:SS TZ`; the zone label is dropped and
/// the wall-clock time kept. 12-hour times with AM/PM are understood.
/// Anything unparseable yields `None`, which the weight model treats as an
/// old quote rather than an error.
pub fn parse_quote_timestamp(raw: &str) -> Option<QuoteTimestamp> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(QuoteTimestamp::At(dt.naive_local()));
    }

    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    if parts.len() >= 3 && is_meridiem(parts[2]) {
        // Anything after the AM/PM marker is a zone label
        let candidate = parts[..3].join(" ").to_uppercase();
        return MERIDIEM_FORMATS.iter()
            .find_map(|format| NaiveDateTime::parse_from_str(&candidate, format).ok())
            .map(QuoteTimestamp::At);
    }

    // Drop a trailing zone label such as "EST" or "UTC"
    let candidate = parts.iter().take(2).copied().collect::<Vec<_>>().join(" ");

    if let Some(ts) = DATETIME_FORMATS.iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&candidate, format).ok())
    {
        return Some(QuoteTimestamp::At(ts));
    }

    if parts.len() == 1 {
        return DATE_FORMATS.iter()
            .find_map(|format| NaiveDate::parse_from_str(&candidate, format).ok())
            .map(QuoteTimestamp::Day);
    }

    None
}

/// Render a timestamp back into the feed's layout for exports.
pub fn format_quote_timestamp(ts: &QuoteTimestamp) -> String {
    match ts {
        QuoteTimestamp::At(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
        QuoteTimestamp::Day(date) => date.format("%Y-%m-%d").to_string(),
    }
}
