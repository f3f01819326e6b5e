//! Recurrence tag → RRULE-backed schedule.
//!
//! A recurrence tag is the textual phrase a rule captured ("every 2 weeks",
//! "3rd thursday of the month at 7:30pm", "yearly"). [`compile`] turns it into
//! an RFC 5545 RRULE anchored at a wall-clock instant and hands it to the
//! `rrule` crate for evaluation. Wall-clock values are carried through the
//! RRULE as UTC, so no offset is ever applied.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rrule::RRuleSet;

use crate::error::{NlpError, Result};
use crate::resolve::{parse_ordinal, parse_time_string, parse_weekday};
use crate::Timestamp;

/// A compiled recurrence: the RRULE text and its evaluable set.
#[derive(Debug, Clone)]
pub struct Schedule {
    rule: String,
    set: RRuleSet,
}

impl Schedule {
    /// The RRULE body, e.g. `FREQ=WEEKLY;INTERVAL=2`.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// First occurrence strictly after `t`.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::ScheduleExhausted`] when no occurrence exists after `t`.
    pub fn next_after(&self, t: Timestamp) -> Result<Timestamp> {
        self.find(|d| d > t)
            .ok_or_else(|| NlpError::ScheduleExhausted(format!("{} after {}", self.rule, t)))
    }

    /// First occurrence at or after `t`.
    ///
    /// # Errors
    ///
    /// Returns [`NlpError::ScheduleExhausted`] when no occurrence exists from `t` on.
    pub fn first_on_or_after(&self, t: Timestamp) -> Result<Timestamp> {
        self.find(|d| d >= t)
            .ok_or_else(|| NlpError::ScheduleExhausted(format!("{} from {}", self.rule, t)))
    }

    fn find(&self, accept: impl Fn(Timestamp) -> bool) -> Option<Timestamp> {
        self.set
            .clone()
            .into_iter()
            .map(|d| d.naive_utc())
            .find(|d| accept(*d))
    }
}

/// Compile a recurrence tag into a [`Schedule`] starting at `anchor`.
///
/// A trailing `at <time>[-<time>]` sets the time of day of every occurrence;
/// the end of the range is ignored here.
///
/// # Errors
///
/// Returns [`NlpError::InvalidRecurrence`] when the tag is not a supported
/// recurrence form, has a zero interval, or produces an RRULE the `rrule`
/// crate rejects.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use event_nlp::schedule::compile;
///
/// let anchor = NaiveDate::from_ymd_opt(2017, 11, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let schedule = compile("every 2 weeks at 9am", anchor).unwrap();
/// assert_eq!(schedule.rule(), "FREQ=WEEKLY;INTERVAL=2");
/// let next = schedule.next_after(anchor).unwrap();
/// assert_eq!(next.to_string(), "2017-11-06 09:00:00");
/// ```
pub fn compile(tag: &str, anchor: Timestamp) -> Result<Schedule> {
    let text = tag
        .trim()
        .to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.strip_prefix("on ").unwrap_or(&text);
    let text = text.strip_prefix("the ").unwrap_or(text);

    let (body, anchor) = match TIME_SUFFIX.captures(text) {
        Some(caps) => {
            let time = parse_time_string(&caps["start"])
                .ok_or_else(|| invalid(tag, "unreadable time of day"))?;
            let body = caps.name("body").map_or("", |m| m.as_str());
            (body, anchor.date().and_time(time))
        }
        None => (text, anchor),
    };

    let rule = rule_for(body).ok_or_else(|| invalid(tag, "unsupported recurrence"))??;
    let source = format!(
        "DTSTART:{}\nRRULE:{}",
        anchor.format("%Y%m%dT%H%M%SZ"),
        rule
    );
    let set = RRuleSet::from_str(&source).map_err(|e| invalid(tag, &e.to_string()))?;
    Ok(Schedule { rule, set })
}

fn invalid(tag: &str, reason: &str) -> NlpError {
    NlpError::InvalidRecurrence(format!("'{}': {}", tag.trim(), reason))
}

// ── Tag grammar ─────────────────────────────────────────────────────────────

const TIME: &str = r"\d{1,2}(?::\d{2})?\s*(?:am|pm)|\d{1,2}:\d{2}";

static TIME_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<body>.*?)\s+(?:at|@)\s+(?P<start>{TIME})(?:\s*(?:-|to|until)\s*(?P<end>{TIME}))?$"
    ))
    .expect("valid time suffix pattern")
});

static EVERY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^every\s+(?:(?P<count>\d+(?:st|nd|rd|th)?|other|[a-z]+)\s+)??(?P<unit>days?|weeks?|fortnights?|months?|years?|weekdays?|weekends?|mon(?:day)?s?|tue(?:s|sday)?s?|wed(?:nesday)?s?|thu(?:rs|rsday)?s?|fri(?:day)?s?|sat(?:urday)?s?|sun(?:day)?s?)$",
    )
    .expect("valid every pattern")
});

static NTH_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<ord>[a-z0-9]+)\s+(?P<wd>[a-z]+)\s+of\s+(?:the\s+|every\s+)?month$")
        .expect("valid nth weekday pattern")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<day>\d{1,2})(?:st|nd|rd|th)?\s+of\s+(?:the\s+|every\s+)?month$")
        .expect("valid month day pattern")
});

/// RRULE body for a tag without its time suffix. The outer `Option` is
/// "recognised at all", the inner `Result` carries interval errors.
fn rule_for(body: &str) -> Option<Result<String>> {
    let fixed = match body {
        "daily" => Some("FREQ=DAILY"),
        "weekly" => Some("FREQ=WEEKLY"),
        "fortnightly" => Some("FREQ=WEEKLY;INTERVAL=2"),
        "monthly" => Some("FREQ=MONTHLY"),
        "yearly" | "annually" => Some("FREQ=YEARLY"),
        "last day of month" | "last day of the month" | "last day of every month" => {
            Some("FREQ=MONTHLY;BYMONTHDAY=-1")
        }
        _ => None,
    };
    if let Some(rule) = fixed {
        return Some(Ok(rule.to_string()));
    }

    if let Some(caps) = MONTH_DAY.captures(body) {
        let day: u32 = caps["day"].parse().ok()?;
        if !(1..=31).contains(&day) {
            return Some(Err(invalid(body, "day of month out of range")));
        }
        return Some(Ok(format!("FREQ=MONTHLY;BYMONTHDAY={day}")));
    }

    if let Some(caps) = NTH_WEEKDAY.captures(body) {
        let ordinal = parse_ordinal(&caps["ord"])?;
        let weekday = byday(&caps["wd"])?;
        return Some(Ok(format!("FREQ=MONTHLY;BYDAY={ordinal}{weekday}")));
    }

    let caps = EVERY.captures(body)?;
    let count = match caps.name("count") {
        Some(m) => parse_count(m.as_str())?,
        None => 1,
    };
    if count == 0 {
        return Some(Err(invalid(body, "zero interval")));
    }
    let unit = &caps["unit"];
    let rule = match unit.trim_end_matches('s') {
        "day" => format!("FREQ=DAILY{}", interval(count)),
        "week" => format!("FREQ=WEEKLY{}", interval(count)),
        "fortnight" => match count.checked_mul(2) {
            Some(weeks) => format!("FREQ=WEEKLY{}", interval(weeks)),
            None => return Some(Err(invalid(body, "interval out of range"))),
        },
        "month" => format!("FREQ=MONTHLY{}", interval(count)),
        "year" => format!("FREQ=YEARLY{}", interval(count)),
        "weekday" => format!("FREQ=WEEKLY{};BYDAY=MO,TU,WE,TH,FR", interval(count)),
        "weekend" => format!("FREQ=WEEKLY{};BYDAY=SA,SU", interval(count)),
        _ => format!("FREQ=WEEKLY{};BYDAY={}", interval(count), byday(unit)?),
    };
    Some(Ok(rule))
}

/// `;INTERVAL=n`, omitted for the RRULE default of 1.
fn interval(count: u32) -> String {
    if count == 1 {
        String::new()
    } else {
        format!(";INTERVAL={count}")
    }
}

/// Two-letter RRULE weekday code for a weekday name, tolerating a plural "s".
fn byday(s: &str) -> Option<&'static str> {
    let weekday = parse_weekday(s).or_else(|| parse_weekday(s.strip_suffix('s')?))?;
    Some(match weekday {
        chrono::Weekday::Mon => "MO",
        chrono::Weekday::Tue => "TU",
        chrono::Weekday::Wed => "WE",
        chrono::Weekday::Thu => "TH",
        chrono::Weekday::Fri => "FR",
        chrono::Weekday::Sat => "SA",
        chrono::Weekday::Sun => "SU",
    })
}

/// Interval count: "3", "2nd", "other", "two", "second".
fn parse_count(s: &str) -> Option<u32> {
    let digits = s.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    if !digits.is_empty() {
        return digits.parse().ok();
    }
    let n = match s {
        "other" => 2,
        "one" | "first" => 1,
        "two" | "second" => 2,
        "three" | "third" => 3,
        "four" | "fourth" => 4,
        "five" | "fifth" => 5,
        "six" | "sixth" => 6,
        "seven" | "seventh" => 7,
        "eight" | "eighth" => 8,
        "nine" | "ninth" => 9,
        "ten" | "tenth" => 10,
        "eleven" | "eleventh" => 11,
        "twelve" | "twelfth" => 12,
        _ => return None,
    };
    Some(n)
}

/// Whether a recurrence tag repeats on a monthly cadence.
///
/// Nth-weekday tags ("3rd thursday of the month") are excluded: their date
/// moves within the month, so the projector steps them by day.
pub fn is_monthly(tag: &str) -> bool {
    static MONTHLY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)^(?:on\s+)?(?:the\s+)?(?:\d{1,2}(?:st|nd|rd|th)?\s+of\s+(?:the|every)\s+month|last\s+day\b|monthly\b|every\s+(?:\S+\s+)?months?\b)",
        )
        .expect("valid monthly pattern")
    });
    MONTHLY.is_match(tag.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // Monday
    fn monday() -> Timestamp {
        ts(2017, 11, 6, 0, 0)
    }

    #[test]
    fn test_compile_every_two_weeks_keeps_anchor_weekday() {
        let schedule = compile("every 2 weeks", ts(2017, 11, 6, 9, 0)).unwrap();
        let next = schedule.next_after(ts(2017, 11, 6, 9, 0)).unwrap();
        assert_eq!(next, ts(2017, 11, 20, 9, 0));
    }

    #[test]
    fn test_compile_every_nth_weekday() {
        let schedule = compile("every 2nd thursday", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=WEEKLY;INTERVAL=2;BYDAY=TH");
        assert_eq!(schedule.first_on_or_after(monday()).unwrap(), ts(2017, 11, 9, 0, 0));
    }

    #[test]
    fn test_compile_every_other_month() {
        let schedule = compile("every other month", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=MONTHLY;INTERVAL=2");
    }

    #[test]
    fn test_compile_number_word_interval() {
        let schedule = compile("every three days", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=DAILY;INTERVAL=3");
    }

    #[test]
    fn test_compile_fortnightly() {
        assert_eq!(
            compile("fortnightly", monday()).unwrap().rule(),
            "FREQ=WEEKLY;INTERVAL=2"
        );
        assert_eq!(
            compile("every fortnight", monday()).unwrap().rule(),
            "FREQ=WEEKLY;INTERVAL=2"
        );
    }

    #[test]
    fn test_compile_nth_weekday_of_month_with_time() {
        let schedule = compile("3rd thursday of the month at 7:30pm", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=MONTHLY;BYDAY=3TH");
        // November 2017 Thursdays: 2, 9, 16
        assert_eq!(
            schedule.first_on_or_after(monday()).unwrap(),
            ts(2017, 11, 16, 19, 30)
        );
        assert_eq!(
            schedule.next_after(ts(2017, 11, 16, 19, 30)).unwrap(),
            ts(2017, 12, 21, 19, 30)
        );
    }

    #[test]
    fn test_compile_last_weekday_of_month() {
        let schedule = compile("last friday of every month", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=MONTHLY;BYDAY=-1FR");
        assert_eq!(schedule.first_on_or_after(monday()).unwrap(), ts(2017, 11, 24, 0, 0));
    }

    #[test]
    fn test_compile_last_day_of_month() {
        let schedule = compile("last day of the month", monday()).unwrap();
        assert_eq!(
            schedule.next_after(ts(2017, 11, 30, 0, 0)).unwrap(),
            ts(2017, 12, 31, 0, 0)
        );
    }

    #[test]
    fn test_compile_day_of_every_month() {
        let schedule = compile("on the 14th of every month", monday()).unwrap();
        assert_eq!(schedule.rule(), "FREQ=MONTHLY;BYMONTHDAY=14");
        assert_eq!(schedule.first_on_or_after(monday()).unwrap(), ts(2017, 11, 14, 0, 0));
    }

    #[test]
    fn test_compile_yearly_rolls_to_next_year() {
        let schedule = compile("yearly", ts(2017, 6, 3, 0, 0)).unwrap();
        assert_eq!(schedule.next_after(monday()).unwrap(), ts(2018, 6, 3, 0, 0));
    }

    #[test]
    fn test_compile_every_weekday_skips_weekend() {
        let friday = ts(2017, 11, 10, 8, 0);
        let schedule = compile("every weekday", friday).unwrap();
        assert_eq!(schedule.next_after(friday).unwrap(), ts(2017, 11, 13, 8, 0));
    }

    #[test]
    fn test_compile_time_range_uses_start() {
        let schedule = compile("every tuesday at 6pm-7:30pm", monday()).unwrap();
        assert_eq!(schedule.first_on_or_after(monday()).unwrap(), ts(2017, 11, 7, 18, 0));
    }

    #[test]
    fn test_compile_zero_interval_is_invalid() {
        let err = compile("every 0 days", monday()).unwrap_err();
        assert!(matches!(err, NlpError::InvalidRecurrence(_)), "got: {err}");
    }

    #[test]
    fn test_compile_huge_fortnight_interval_is_invalid() {
        let err = compile("every 3000000000 fortnights", monday()).unwrap_err();
        assert!(err.to_string().contains("interval out of range"), "got: {err}");
    }

    #[test]
    fn test_compile_unknown_form_is_invalid() {
        let err = compile("every blue moon", monday()).unwrap_err();
        assert!(err.to_string().contains("unsupported recurrence"), "got: {err}");
    }

    #[test]
    fn test_is_monthly() {
        assert!(is_monthly("14th of every month"));
        assert!(is_monthly("on the 1st of the month at 9am"));
        assert!(is_monthly("last day of the month"));
        assert!(is_monthly("monthly"));
        assert!(is_monthly("every 3 months"));
        assert!(!is_monthly("3rd thursday of the month"));
        assert!(!is_monthly("every 2 weeks"));
        assert!(!is_monthly("yearly"));
    }
}
