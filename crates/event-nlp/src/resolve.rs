//! Free-text date/time resolution against a reference instant.
//!
//! Turns fuzzy phrases such as `"friday at 11am"`, `"3rd Jun 2018"`,
//! `"21/05/2017 2pm"` or `"3rd thursday of the month at 7:30pm"` into an
//! absolute wall-clock [`Timestamp`]. Every function takes the reference
//! instant explicitly (no system clock access), so results are a pure
//! function of `(phrase, reference, options)`.
//!
//! # Grammar
//!
//! A phrase is an optional date part followed by an optional time part.
//!
//! **Time**: `"2pm"`, `"7:30pm"`, `"14:00"`, `"@1436"`, optionally introduced by
//! `at`, `@` or `from`; named times `"noon"`, `"midnight"`, `"morning"` (09:00),
//! `"afternoon"` (13:00), `"evening"` (18:00), `"night"` (21:00), `"end of day"` (17:00)
//!
//! **Anchored**: `"now"`, `"today"`, `"tonight"`, `"tomorrow"`, `"yesterday"`
//!
//! **Weekdays**: `"friday"` (next Friday strictly after the reference day),
//! `"next Monday"`, `"this Friday"`, `"last Wednesday"`
//!
//! **Ordinal dates**: `"first Monday of March"`, `"3rd thursday of the month"`,
//! `"last day of every month"`, `"last Friday of June 2018"`
//!
//! **Calendar dates**: `"24th Mar"`, `"3 june 2018"`, `"june 3rd"`, `"27-Mar"`,
//! `"21/05/2017"` (day/month order from [`ResolveOptions`]), `"2017-05-21"`
//!
//! A date without a year falls in the reference year. A date without a time
//! resolves to 00:00. A time without a date resolves to the next occurrence
//! of that time at or after the reference instant.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::NlpError;
use crate::ordinal::ordinal;
use crate::Timestamp;

// ── Options ─────────────────────────────────────────────────────────────────

/// How an all-numeric date such as `05/06/2017` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayMonthOrder {
    /// `MM/DD/YYYY`, the US convention.
    #[default]
    MonthFirst,
    /// `DD/MM/YYYY`, the European convention.
    DayFirst,
}

/// Options for [`resolve`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Which component comes first in numeric dates.
    pub day_month_order: DayMonthOrder,
}

impl ResolveOptions {
    /// Same options with a different day/month order.
    pub fn with_order(self, day_month_order: DayMonthOrder) -> Self {
        Self { day_month_order }
    }
}

// ── resolve ─────────────────────────────────────────────────────────────────

/// Resolve a date/time phrase relative to `reference`.
///
/// # Errors
///
/// Returns [`NlpError::InvalidExpression`] if the phrase is empty or matches
/// none of the supported forms. Callers inside the rule table treat this as
/// "unparseable" and leave the corresponding field absent.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use event_nlp::resolve::{resolve, ResolveOptions};
///
/// // Monday, November 6 2017 at midnight
/// let now = NaiveDate::from_ymd_opt(2017, 11, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let friday = resolve("friday at 11am", now, &ResolveOptions::default()).unwrap();
/// assert_eq!(friday.to_string(), "2017-11-10 11:00:00");
/// ```
pub fn resolve(
    phrase: &str,
    reference: Timestamp,
    options: &ResolveOptions,
) -> Result<Timestamp, NlpError> {
    let normalized = normalize_expression(phrase);
    if normalized.is_empty() {
        return Err(NlpError::InvalidExpression("empty expression".to_string()));
    }
    if normalized == "now" {
        return Ok(reference);
    }

    let (date_part, time) = split_time(&normalized);
    let date_part = date_part.strip_prefix("on ").unwrap_or(date_part).trim();

    let resolved = if date_part.is_empty() {
        time.map(|t| next_time_of_day(reference, t))
    } else {
        // "tonight" is today with a night-time default
        let (date_part, default_time) = match date_part {
            "tonight" => ("today", named_time_to_naive("night")),
            other => (other, None),
        };
        let today = reference.date();

        // Try each parser in order of specificity
        try_passthrough_iso_date(date_part)
            .or_else(|| try_anchored(date_part, today))
            .or_else(|| try_weekday_relative(date_part, today))
            .or_else(|| try_bare_weekday(date_part, today))
            .or_else(|| try_ordinal_date(date_part, today))
            .or_else(|| try_day_month(date_part, today))
            .or_else(|| try_numeric_date(date_part, today, options.day_month_order))
            .map(|date| date.and_time(time.or(default_time).unwrap_or(NaiveTime::MIN)))
    };

    resolved.ok_or_else(|| {
        NlpError::InvalidExpression(format!("cannot parse expression: '{}'", phrase.trim()))
    })
}

/// Convert a UTC instant into the wall-clock time of an IANA timezone.
///
/// # Errors
///
/// Returns [`NlpError::InvalidTimezone`] if `timezone` is not a valid IANA name.
pub fn local_reference(anchor: DateTime<Utc>, timezone: &str) -> Result<Timestamp, NlpError> {
    let tz = parse_timezone(timezone)?;
    Ok(anchor.with_timezone(&tz).naive_local())
}

// ── Canonical forms ─────────────────────────────────────────────────────────

/// The canonical date form written back into rewritten input: `"10th Nov 2017"`.
///
/// [`resolve`] reads this form back to the same calendar day for any
/// reference instant.
pub fn canonical_date(ts: Timestamp) -> String {
    format!("{} {}", ordinal(ts.day()), ts.format("%b %Y"))
}

/// The canonical clock form: `"11am"`, `"7:30pm"`.
pub fn canonical_time(t: NaiveTime) -> String {
    if t.minute() == 0 {
        t.format("%-I%P").to_string()
    } else {
        t.format("%-I:%M%P").to_string()
    }
}

/// End of a time range that starts at `start`: same day, or the next day
/// when `end` is not after the start time (`"11am until 12am"`).
pub fn range_end(start: Timestamp, end: NaiveTime) -> Timestamp {
    let same_day = start.date().and_time(end);
    if same_day <= start {
        same_day + chrono::Duration::days(1)
    } else {
        same_day
    }
}

// ── Internal helpers ────────────────────────────────────────────────────────

/// Parse an IANA timezone string into `Tz`.
fn parse_timezone(s: &str) -> Result<Tz, NlpError> {
    s.parse::<Tz>()
        .map_err(|_| NlpError::InvalidTimezone(format!("'{}'", s)))
}

/// Normalize expression: trim, lowercase, strip articles and commas,
/// collapse whitespace.
fn normalize_expression(s: &str) -> String {
    let s = s.trim().to_lowercase().replace(',', " ");
    let s = format!(" {s} ")
        .replace(" the ", " ")
        .replace(" a ", " ")
        .replace(" an ", " ");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A trailing time token, optionally introduced by "at", "@" or "from".
static TRAILING_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<date>.*?)\s*(?:@\s*(?P<compact>\d{4})|(?:(?:\bat|@|\bfrom)\s*)?\b(?P<time>\d{1,2}(?::\d{2}){0,2}\s*(?:am|pm)|\d{1,2}:\d{2}(?::\d{2})?|noon|midnight|morning|afternoon|evening|night|end of day))$",
    )
    .expect("valid trailing time pattern")
});

/// Split `"friday at 11am"` into `("friday", Some(11:00))`.
fn split_time(s: &str) -> (&str, Option<NaiveTime>) {
    let Some(caps) = TRAILING_TIME.captures(s) else {
        return (s, None);
    };
    let time = if let Some(compact) = caps.name("compact") {
        parse_compact_time(compact.as_str())
    } else {
        caps.name("time").and_then(|t| {
            named_time_to_naive(t.as_str()).or_else(|| parse_time_string(t.as_str()))
        })
    };
    match (time, caps.name("date")) {
        (Some(time), Some(date)) => (date.as_str().trim(), Some(time)),
        _ => (s, None),
    }
}

/// Next occurrence of `time` at or after `reference`.
fn next_time_of_day(reference: Timestamp, time: NaiveTime) -> Timestamp {
    let candidate = reference.date().and_time(time);
    if candidate < reference {
        candidate + chrono::Duration::days(1)
    } else {
        candidate
    }
}

/// Try to parse as an ISO 8601 date (YYYY-MM-DD).
fn try_passthrough_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Try anchored references: "today", "tomorrow", "yesterday".
fn try_anchored(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
        "today" => Some(today),
        "tomorrow" => today.succ_opt(),
        "yesterday" => today.pred_opt(),
        _ => None,
    }
}

/// Try weekday-relative: "next Monday", "this Friday", "last Wednesday".
fn try_weekday_relative(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let (modifier, rest) = s.split_once(' ')?;
    let weekday = parse_weekday(rest)?;
    let current = today.weekday();

    match modifier {
        "next" => Some(weekday_after(today, weekday)),
        "this" => {
            // Same week: may be past or future
            let diff =
                weekday.num_days_from_monday() as i64 - current.num_days_from_monday() as i64;
            Some(today + chrono::Duration::days(diff))
        }
        "last" => {
            // Always past: if today is the same weekday, go to last week
            let days_back =
                (current.num_days_from_monday() as i64 - weekday.num_days_from_monday() as i64 + 7)
                    % 7;
            let days_back = if days_back == 0 { 7 } else { days_back };
            Some(today - chrono::Duration::days(days_back))
        }
        _ => None,
    }
}

/// Try a bare weekday: "friday" is the next Friday strictly after today.
fn try_bare_weekday(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    parse_weekday(s).map(|weekday| weekday_after(today, weekday))
}

/// First `weekday` strictly after `today`.
fn weekday_after(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let days_ahead = (weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64
        + 7)
        % 7;
    let days_ahead = if days_ahead == 0 { 7 } else { days_ahead };
    today + chrono::Duration::days(days_ahead)
}

/// Try ordinal date: "first Monday of March", "3rd thursday of month",
/// "last day of every month", "third Tuesday of March 2026".
fn try_ordinal_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    let of_idx = parts.iter().position(|&p| p == "of")?;
    if of_idx != 2 {
        return None;
    }

    let (month, year) = month_and_year(&parts[of_idx + 1..], today)?;
    let ordinal_str = parts[0];
    let target_str = parts[1];

    if ordinal_str == "last" && target_str == "day" {
        return last_day_of_month(year, month);
    }

    let weekday = parse_weekday(target_str)?;
    let ordinal = parse_ordinal(ordinal_str)?;
    find_nth_weekday_in_month(year, month, weekday, ordinal)
}

/// Month designator after "of": "month", "every month", "next month",
/// "march", "march 2026".
fn month_and_year(parts: &[&str], today: NaiveDate) -> Option<(u32, i32)> {
    match parts {
        ["month"] | ["every", "month"] => Some((today.month(), today.year())),
        ["next", "month"] => {
            let next = today.checked_add_months(Months::new(1))?;
            Some((next.month(), next.year()))
        }
        [month] => Some((parse_month(month)?, today.year())),
        [month, year] => Some((parse_month(month)?, year.parse().ok()?)),
        _ => None,
    }
}

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?P<day>\d{1,2})(?:st|nd|rd|th)?\s+(?:of\s+)?(?P<month>[a-z]+)\.?|(?P<month2>[a-z]+)\.?\s+(?P<day2>\d{1,2})(?:st|nd|rd|th)?)(?:\s+(?P<year>\d{4}))?$",
    )
    .expect("valid day-month pattern")
});

/// Try day + month name: "24th mar", "3 june 2018", "june 3rd", "tuesday 10th july".
fn try_day_month(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    // A leading weekday name is redundant next to a full date
    let s = match s.split_once(' ') {
        Some((first, rest)) if parse_weekday(first).is_some() => rest,
        _ => s,
    };
    let caps = DAY_MONTH.captures(s)?;
    let day: u32 = caps.name("day").or(caps.name("day2"))?.as_str().parse().ok()?;
    let month = parse_month(caps.name("month").or(caps.name("month2"))?.as_str())?;
    let year = match caps.name("year") {
        Some(y) => y.as_str().parse().ok()?,
        None => today.year(),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<a>\d{1,4})[/.\-](?P<b>\d{1,2}|[a-z]{3,9})(?:[/.\-](?P<c>\d{2,4}))?$")
        .expect("valid numeric date pattern")
});

/// Try numeric dates: "21/05/2017", "05/21", "27-mar", "27-mar-2017", "2017/05/21".
fn try_numeric_date(s: &str, today: NaiveDate, order: DayMonthOrder) -> Option<NaiveDate> {
    let caps = NUMERIC_DATE.captures(s)?;
    let a = &caps["a"];
    let b = &caps["b"];
    let c = caps.name("c").map(|m| m.as_str());

    // Year first: 2017/05/21
    if a.len() == 4 {
        let year = a.parse().ok()?;
        let month = b.parse().ok()?;
        let day = c?.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let year = match c {
        Some(y) => expand_year(y.parse().ok()?),
        None => today.year(),
    };
    let a: u32 = a.parse().ok()?;

    // Named month: 27-mar
    if let Some(month) = parse_month(b) {
        return NaiveDate::from_ymd_opt(year, month, a);
    }

    let b: u32 = b.parse().ok()?;
    let (day, month) = match order {
        DayMonthOrder::DayFirst => (a, b),
        DayMonthOrder::MonthFirst => (b, a),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years belong to the 2000s.
fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

/// Last calendar day of a month.
fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()
}

/// Find the Nth weekday in a month. ordinal < 0 means "last" (-1), "second to last" (-2), etc.
fn find_nth_weekday_in_month(
    year: i32,
    month: u32,
    weekday: Weekday,
    ordinal: i32,
) -> Option<NaiveDate> {
    // Negative ordinals count back from the month's last matching weekday
    let target = match ordinal {
        0 => return None,
        1.. => {
            let n = u8::try_from(ordinal).ok()?;
            NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)?
        }
        _ => {
            let last = last_day_of_month(year, month)?;
            let back =
                (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
            let weeks = i64::from(ordinal.checked_neg()? - 1);
            last - chrono::Duration::days(i64::from(back)) - chrono::Duration::weeks(weeks)
        }
    };
    (target.month() == month).then_some(target)
}

// ── Parsing helpers ─────────────────────────────────────────────────────────

/// Parse a weekday name (lower-case, full or abbreviated).
pub(crate) fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a month name to number (1-12).
pub(crate) fn parse_month(s: &str) -> Option<u32> {
    match s {
        "january" | "jan" => Some(1),
        "february" | "feb" => Some(2),
        "march" | "mar" => Some(3),
        "april" | "apr" => Some(4),
        "may" => Some(5),
        "june" | "jun" => Some(6),
        "july" | "jul" => Some(7),
        "august" | "aug" => Some(8),
        "september" | "sep" | "sept" => Some(9),
        "october" | "oct" => Some(10),
        "november" | "nov" => Some(11),
        "december" | "dec" => Some(12),
        _ => None,
    }
}

/// Parse an ordinal: "first"→1, "2nd"→2, ..., "last"→-1.
pub(crate) fn parse_ordinal(s: &str) -> Option<i32> {
    match s {
        "first" | "1st" => Some(1),
        "second" | "2nd" => Some(2),
        "third" | "3rd" => Some(3),
        "fourth" | "4th" => Some(4),
        "fifth" | "5th" => Some(5),
        "last" => Some(-1),
        _ => None,
    }
}

/// Map named time to NaiveTime.
fn named_time_to_naive(s: &str) -> Option<NaiveTime> {
    match s {
        "morning" => NaiveTime::from_hms_opt(9, 0, 0),
        "noon" => NaiveTime::from_hms_opt(12, 0, 0),
        "afternoon" => NaiveTime::from_hms_opt(13, 0, 0),
        "end of day" => NaiveTime::from_hms_opt(17, 0, 0),
        "evening" => NaiveTime::from_hms_opt(18, 0, 0),
        "night" => NaiveTime::from_hms_opt(21, 0, 0),
        "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
        _ => None,
    }
}

/// Parse a compact 24-hour time: "1436" → 14:36.
fn parse_compact_time(s: &str) -> Option<NaiveTime> {
    let hour: u32 = s.get(..2)?.parse().ok()?;
    let minute: u32 = s.get(2..4)?.parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Parse a time string: "2pm", "2:30pm", "14:00", "14:30:00".
pub(crate) fn parse_time_string(s: &str) -> Option<NaiveTime> {
    let s = s.trim().to_lowercase();

    // 24-hour format: "14:00", "14:30", "14:30:00"
    if let Ok(t) = NaiveTime::parse_from_str(&s, "%H:%M:%S") {
        return Some(t);
    }
    if let Ok(t) = NaiveTime::parse_from_str(&s, "%H:%M") {
        return Some(t);
    }

    // 12-hour format: "2pm", "2:30pm", "2:30:00pm", "2 pm"
    let s_no_space = s.replace(' ', "");
    let (time_part, is_pm) = if let Some(t) = s_no_space.strip_suffix("pm") {
        (t, true)
    } else if let Some(t) = s_no_space.strip_suffix("am") {
        (t, false)
    } else {
        return None;
    };

    let parts: Vec<&str> = time_part.split(':').collect();
    let hour: u32 = parts.first()?.parse().ok()?;
    let minute: u32 = parts.get(1).and_then(|s| s.parse().ok()).unwrap_or(0);
    let second: u32 = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    if hour == 0 || hour > 12 {
        return None;
    }

    let hour24 = match (hour, is_pm) {
        (12, true) => 12,
        (12, false) => 0,
        (h, true) => h + 12,
        (h, false) => h,
    };

    NaiveTime::from_hms_opt(hour24, minute, second)
}

// ── Tests ───────────────────────────────────────────────────────────────────
