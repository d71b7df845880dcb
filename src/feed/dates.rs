//! Publish-date normalization.
//!
//! Feeds in the wild put almost anything in `<pubDate>`. [`parse_published`]
//! tries a fixed list of layouts in order and keeps the first that fits, so a
//! given string always lands on the same layout. A string no layout accepts
//! is "no publish time", never an error.

use chrono::{DateTime, FixedOffset, NaiveDateTime};

/// Layouts tried by [`parse_published`], in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Numeric,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123Named,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Numeric,
    /// `02 Jan 06 15:04 MST`
    Rfc822Named,
    /// `2006-01-02T15:04:05-07:00`
    Rfc3339,
    /// RFC 2822 as RSS uses it: weekday optional, one-digit days allowed
    RssCommon,
    /// `Mon Jan 02 15:04:05 -0700 2006`
    Ruby,
}

pub const LAYOUTS: [Layout; 7] = [
    Layout::Rfc1123Numeric,
    Layout::Rfc1123Named,
    Layout::Rfc822Numeric,
    Layout::Rfc822Named,
    Layout::Rfc3339,
    Layout::RssCommon,
    Layout::Ruby,
];

impl Layout {
    /// Parse `s` under this layout.
    ///
    /// A leading weekday must be a real day name but need not agree with
    /// the date.
    pub fn parse(self, s: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            Layout::Rfc1123Numeric => {
                let rest = strip_weekday(s, ", ").filter(|r| two_digit_day(r))?;
                DateTime::parse_from_str(rest, "%d %b %Y %H:%M:%S %z").ok()
            }
            Layout::Rfc1123Named => {
                let rest = strip_weekday(s, ", ").filter(|r| two_digit_day(r))?;
                parse_with_zone_name(rest, "%d %b %Y %H:%M:%S")
            }
            Layout::Rfc822Numeric if two_digit_day(s) => {
                DateTime::parse_from_str(s, "%d %b %y %H:%M %z").ok()
            }
            Layout::Rfc822Named if two_digit_day(s) => parse_with_zone_name(s, "%d %b %y %H:%M"),
            Layout::Rfc822Numeric | Layout::Rfc822Named => None,
            Layout::Rfc3339 => DateTime::parse_from_rfc3339(s).ok(),
            Layout::RssCommon => {
                DateTime::parse_from_rfc2822(strip_weekday(s, ", ").unwrap_or(s)).ok()
            }
            Layout::Ruby => {
                // `Jan 02 ...`: the day sits after the month name
                let rest = strip_weekday(s, " ")
                    .filter(|r| r.get(4..).is_some_and(two_digit_day))?;
                DateTime::parse_from_str(rest, "%b %d %H:%M:%S %z %Y").ok()
            }
        }
    }
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Remove a leading abbreviated day name followed by `sep`.
fn strip_weekday<'a>(s: &'a str, sep: &str) -> Option<&'a str> {
    let rest = s.get(3..)?.strip_prefix(sep)?;
    let name = &s[..3];
    WEEKDAYS
        .iter()
        .any(|day| day.eq_ignore_ascii_case(name))
        .then_some(rest)
}

/// `02 ...`: chrono's `%d` also takes one digit, these layouts do not.
fn two_digit_day(s: &str) -> bool {
    matches!(s.as_bytes(), [a, b, b' ', ..] if a.is_ascii_digit() && b.is_ascii_digit())
}

/// Parse a feed timestamp, returning `None` when it is blank or unrecognized.
pub fn parse_published(raw: &str) -> Option<DateTime<FixedOffset>> {
    parse_with_layout(raw).map(|(dt, _)| dt)
}

/// Like [`parse_published`], also reporting which layout matched.
pub fn parse_with_layout(raw: &str) -> Option<(DateTime<FixedOffset>, Layout)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(trimmed).map(|dt| (dt, *layout)))
}

/// Split off a trailing alphabetic zone name and parse the rest as a naive
/// time in that zone.
fn parse_with_zone_name(s: &str, fmt: &str) -> Option<DateTime<FixedOffset>> {
    let (rest, zone) = s.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(rest, fmt).ok()?;
    naive.and_local_timezone(offset).single()
}

/// Offset for an RFC 822 zone name. Names outside the table are accepted with
/// a zero offset as long as they are purely alphabetic.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "UT" | "UTC" | "GMT" | "Z" => 0,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}
