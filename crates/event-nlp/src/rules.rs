//! The standard English rule table.
//!
//! Rules run from the most syntactically specific (explicit recurrence
//! phrases with `starting`/`until` qualifiers) down to bare time fragments.
//! Each extractor returns a [`PartialResult`]. Rules that resolve a
//! clock-relative token (a weekday, a bare time, `tomorrow`) rewrite the
//! input into the pinned form `<title> <Dth Mon YYYY>[ at <time>[-<time>]]`
//! so that re-reading it later lands on the same instant.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveTime};
use regex::{Captures, Match, Regex};

use crate::error::Result;
use crate::fallback;
use crate::resolve::{canonical_date, canonical_time, parse_time_string, range_end, DayMonthOrder};
use crate::router::{PartialResult, RecurrenceTag, Router, RuleContext};
use crate::Timestamp;

// ── Building blocks ─────────────────────────────────────────────────────────

pub(crate) const WEEKDAY: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
pub(crate) const MONTH: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";
pub(crate) const TIME: &str = r"(?:\d{1,2}(?::\d{2})?\s*(?:am|pm)|\d{1,2}:\d{2})";
const ORDINAL: &str = "1st|2nd|3rd|4th|5th|first|second|third|fourth|fifth|last";
const COUNT: &str = r"\d+(?:st|nd|rd|th)?|other|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|first|second|third|fourth|fifth|sixth|seventh|eighth|ninth|tenth|eleventh|twelfth";

/// `24th Mar`, `3 june 2018`
fn day_month() -> String {
    format!(r"\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTH})\b(?:\s+\d{{4}})?")
}

/// Optional end of a time range: `-12pm`, `until 12am`, `to 5:30pm`.
fn range() -> String {
    format!(r"(?:\s*(?:-|until|to)\s*(?P<end>{TIME}))?")
}

fn rx(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){pattern}")).expect("valid rule pattern")
}

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| rx(&format!(r"\b{TIME}")));

// ── Patterns, in priority order ─────────────────────────────────────────────

// book club 3rd thursday of the month at 7:30pm
// 1st Monday of every month (starting 3rd Jul 2017)
static NTH_WEEKDAY_OF_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.*?)\s*\b(?P<recurring>(?:{ORDINAL})\s+(?:{WEEKDAY})\s+of\s+(?:the|every)\s+month(?:\s+at\s+(?P<time>{TIME})(?:\s*-\s*{TIME})?)?)(?:\s*\(?\s*starting\s+(?:from\s+)?(?P<start>{dm})\s*\)?)?\s*$",
        dm = day_month()
    ))
});

// rent on the 14th of every month
static DAY_OF_EVERY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.*?)\s*\b(?:on\s+)?(?:the\s+)?(?P<recurring>\d{{1,2}}(?:st|nd|rd|th)?\s+of\s+(?:the|every)\s+month(?:\s+at\s+{TIME}(?:\s*-\s*{TIME})?)?)\s*$"
    ))
});

// council tax last day of the month
static LAST_DAY_OF_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.*?)\s*\b(?P<recurring>last\s+day\s+of\s+(?:the\s+|every\s+)?month(?:\s+at\s+{TIME})?)\s*$"
    ))
});

// some event every 2 weeks at 6am starting from 14th Jan until 28th Oct
// some event every 2nd Monday (starting 7th Nov 2016)
// yoga every tuesday at 6pm-7:30pm
static EVERY_INTERVAL: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.*?)\s*\b(?P<recurring>every\s+(?:(?:{COUNT})\s+)?(?:days?|weeks?|fortnights?|months?|years?|weekdays?|weekends?|(?:{WEEKDAY})s?)\b(?:\s+at\s+(?P<time>{TIME})(?:\s*-\s*{TIME})?)?)(?:\s*\(?\s*(?:starting\s+(?:from\s+)?(?P<start>{dm}))?(?:\s*until\s+(?P<until>[^)]*?))?\s*\)?)?\s*$",
        dm = day_month()
    ))
});

// 7th Oct Euston Station (meet at Timothy's house at 7pm)
static DATED_MEETING_WITH_VENUE: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<date>{dm})\s+(?P<title>[^(]+?)\s*\(\s*meet\s+at\s+(?P<venue>.+?)\s+at\s+(?P<time>{TIME})\s*\)\s*$",
        dm = day_month()
    ))
});

// some important day 24th Mar
// Birthday party 3rd Jun *
// hall 2 10th Nov 2017 at 11am-12pm
static TITLE_THEN_DATE: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?:(?P<title>.*?)\s+)?(?:on\s+)?(?:(?:{WEEKDAY})\s+)?(?P<date>{dm})(?:\s+(?:(?:at|from|@)\s+)?(?P<time>{TIME}){range})?\s*(?P<annual>\*)?\s*$",
        dm = day_month(),
        range = range()
    ))
});

// 3rd June garden party at 2pm
static DATE_THEN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<date>{dm})\s+(?P<title>.+?)(?:\s+(?:at|from)\s+(?P<time>{TIME}){range})?\s*(?P<annual>\*)?\s*$",
        dm = day_month(),
        range = range()
    ))
});

// hall 2 friday at 11am
static WEEKDAY_AT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?:(?P<title>.*?)\s+)?(?:on\s+)?(?P<weekday>(?:(?:next|this)\s+)?(?:{WEEKDAY}))\s+(?:at|@|from)\s+(?P<time>{TIME}){range}\s*$",
        range = range()
    ))
});

// friday hall 2 11am until 12am
static WEEKDAY_THEN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?:on\s+)?(?P<weekday>{WEEKDAY})\s+(?P<title>.+?)\s+(?:(?:at|from|@)\s+)?(?P<time>{TIME}){range}\s*$",
        range = range()
    ))
});

// 21/05/2017 Forum meetup at Roundpeg from 2pm
static SLASH_DATE_THEN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<date>\d{{1,2}}/\d{{1,2}}/\d{{2,4}})\s+(?P<title>.*?)(?:\s+(?:from|at)\s+(?P<time>{TIME}){range})?\s*(?P<annual>\*)?\s*$",
        range = range()
    ))
});

// dentist tomorrow at 3pm
// quiz tonight
static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.+?)\s+(?P<day>today|tonight|tomorrow)(?:\s+(?:at|@|from)\s+(?P<time>{TIME}){range})?\s*$",
        range = range()
    ))
});

// hall 2 at 11am
static TITLE_AT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    rx(&format!(
        r"^(?P<title>.+?)\s+(?:at|@|from)\s+(?P<time>{TIME}){range}\s*$",
        range = range()
    ))
});

// 27-Mar@1436 some important day
static NUMERIC_DATE_THEN_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    rx(r"^(?P<date>\d{1,4}[-/.]\S+)\s+(?P<title>[^*]+?)\s*(?P<annual>\*)?\s*$")
});

/// Build the standard rule table.
pub fn standard() -> Router {
    Router::builder()
        .rule("nth_weekday_of_month", NTH_WEEKDAY_OF_MONTH.clone(), nth_weekday_of_month)
        .rule("day_of_every_month", DAY_OF_EVERY_MONTH.clone(), monthly_from_month_start)
        .rule("last_day_of_month", LAST_DAY_OF_MONTH.clone(), monthly_from_month_start)
        .rule("every_interval", EVERY_INTERVAL.clone(), every_interval)
        .rule(
            "dated_meeting_with_venue",
            DATED_MEETING_WITH_VENUE.clone(),
            dated_meeting_with_venue,
        )
        .rule("title_then_date", TITLE_THEN_DATE.clone(), dated)
        .rule("date_then_title", DATE_THEN_TITLE.clone(), dated)
        .rule("weekday_at_time", WEEKDAY_AT_TIME.clone(), weekday_with_time)
        .rule("weekday_then_title", WEEKDAY_THEN_TITLE.clone(), weekday_with_time)
        .rule("slash_date_then_title", SLASH_DATE_THEN_TITLE.clone(), dated_day_first)
        .rule("relative_day", RELATIVE_DAY.clone(), relative_day)
        .rule("title_at_time", TITLE_AT_TIME.clone(), title_at_time)
        .rule("numeric_date_then_title", NUMERIC_DATE_THEN_TITLE.clone(), dated_day_first)
        .fallback("catch_all", fallback::catch_all)
}

// ── Extractors ──────────────────────────────────────────────────────────────

fn nth_weekday_of_month(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let tag = RecurrenceTag::new(&caps["recurring"]);
    let start = caps.name("start").map(|m| m.as_str());
    let from = match start {
        Some(start) => ctx.resolve(&with_time(start, caps.name("time"))),
        None => Some(month_start(ctx.now())),
    };
    Ok(PartialResult {
        title: tidy_title(group(caps, "title")),
        date: align(&tag, from)?,
        recurring: Some(tag),
        anchor: start.map(str::to_string),
        ..PartialResult::default()
    })
}

/// `14th of every month`, `last day of the month`: the occurrence in the
/// reference month, rolled forward by the interpreter if already past.
fn monthly_from_month_start(
    ctx: &RuleContext<'_>,
    caps: &Captures<'_>,
) -> Result<PartialResult> {
    let tag = RecurrenceTag::new(&caps["recurring"]);
    Ok(PartialResult {
        title: tidy_title(group(caps, "title")),
        date: align(&tag, Some(month_start(ctx.now())))?,
        recurring: Some(tag),
        ..PartialResult::default()
    })
}

fn every_interval(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let tag = RecurrenceTag::new(&caps["recurring"]);
    let title = tidy_title(group(caps, "title"));
    let start = caps.name("start").map(|m| m.as_str());
    let until = caps.name("until").map(|m| m.as_str().trim());

    let from = match (start, caps.name("time")) {
        (Some(start), time) => ctx.resolve(&with_time(start, time)),
        (None, Some(time)) => ctx.resolve(time.as_str()),
        (None, None) => ctx.resolve("today"),
    };
    let date = align(&tag, from)?;

    let until_date = match (until, tag.range_end()) {
        (Some(until), None) => ctx.resolve(until).map(|date| until_end(until, date)),
        _ => None,
    };

    // Without a "starting" qualifier the first occurrence is written into the
    // text so that re-reading it keeps the same phase.
    let (input, anchor) = match (start, date) {
        (Some(start), _) => (None, Some(start.to_string())),
        (None, Some(date)) => {
            let pinned = canonical_date(date);
            let mut qualifier = format!("starting {pinned}");
            if let Some(until) = until {
                qualifier.push_str(" until ");
                qualifier.push_str(until);
            }
            let input = join([title.as_str(), tag.as_str(), qualifier.as_str()]);
            (Some(input), Some(pinned))
        }
        (None, None) => (None, None),
    };

    Ok(PartialResult {
        input,
        title,
        date,
        recurring: Some(tag),
        anchor,
        until: until_date,
        ..PartialResult::default()
    })
}

fn dated_meeting_with_venue(
    ctx: &RuleContext<'_>,
    caps: &Captures<'_>,
) -> Result<PartialResult> {
    Ok(PartialResult {
        title: tidy_title(group(caps, "title")),
        date: ctx.resolve(&with_time(&caps["date"], caps.name("time"))),
        venue: Some(caps["venue"].trim().to_string()),
        ..PartialResult::default()
    })
}

/// An absolute date with optional time, range and yearly `*` marker.
fn dated(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let phrase = with_time(&caps["date"], caps.name("time"));
    Ok(dated_result(caps, ctx.resolve(&phrase)))
}

/// Numeric dates are read day-first regardless of the configured order.
fn dated_day_first(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let phrase = with_time(&caps["date"], caps.name("time"));
    Ok(dated_result(
        caps,
        ctx.resolve_with(&phrase, DayMonthOrder::DayFirst),
    ))
}

fn dated_result(caps: &Captures<'_>, date: Option<Timestamp>) -> PartialResult {
    let recurring = caps.name("annual").map(|_| RecurrenceTag::yearly());
    PartialResult {
        title: tidy_title(group(caps, "title")),
        date,
        end_date: end_of_range(date, caps.name("end")),
        anchor: recurring.as_ref().map(|_| caps["date"].to_string()),
        recurring,
        ..PartialResult::default()
    }
}

fn weekday_with_time(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let phrase = with_time(&caps["weekday"], caps.name("time"));
    Ok(pinned(ctx, group(caps, "title"), &phrase, caps.name("end")))
}

fn relative_day(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    let phrase = with_time(&caps["day"], caps.name("time"));
    Ok(pinned(ctx, group(caps, "title"), &phrase, caps.name("end")))
}

fn title_at_time(ctx: &RuleContext<'_>, caps: &Captures<'_>) -> Result<PartialResult> {
    Ok(pinned(ctx, group(caps, "title"), &caps["time"], caps.name("end")))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Resolve a clock-relative phrase and pin the result into the input text.
fn pinned(
    ctx: &RuleContext<'_>,
    title: &str,
    phrase: &str,
    end: Option<Match<'_>>,
) -> PartialResult {
    let title = tidy_title(title);
    let date = ctx.resolve(phrase);
    let end_date = end_of_range(date, end);
    PartialResult {
        input: date.map(|date| pinned_input(&title, date, end_date)),
        title,
        date,
        end_date,
        ..PartialResult::default()
    }
}

/// `<title> <Dth Mon YYYY>[ at <time>[-<time>]]`
pub(crate) fn pinned_input(title: &str, date: Timestamp, end: Option<Timestamp>) -> String {
    let mut when = canonical_date(date);
    if date.time() != NaiveTime::MIN || end.is_some() {
        when.push_str(" at ");
        when.push_str(&canonical_time(date.time()));
        if let Some(end) = end {
            when.push('-');
            when.push_str(&canonical_time(end.time()));
        }
    }
    join([title, when.as_str()])
}

/// A date-only `until` phrase includes the whole of its last day.
pub(crate) fn until_end(phrase: &str, date: Timestamp) -> Timestamp {
    if date.time() == NaiveTime::MIN && !CLOCK_TIME.is_match(phrase) {
        date.date().and_hms_opt(23, 59, 59).unwrap_or(date)
    } else {
        date
    }
}

/// First occurrence of `tag` at or after `from`.
fn align(tag: &RecurrenceTag, from: Option<Timestamp>) -> Result<Option<Timestamp>> {
    from.map(|from| tag.compile(from)?.first_on_or_after(from))
        .transpose()
}

pub(crate) fn end_of_range(date: Option<Timestamp>, end: Option<Match<'_>>) -> Option<Timestamp> {
    let end = parse_time_string(end?.as_str())?;
    Some(range_end(date?, end))
}

pub(crate) fn with_time(date: &str, time: Option<Match<'_>>) -> String {
    match time {
        Some(time) => format!("{} at {}", date.trim(), time.as_str()),
        None => date.trim().to_string(),
    }
}

fn month_start(now: Timestamp) -> Timestamp {
    now.date()
        .with_day(1)
        .unwrap_or(now.date())
        .and_time(NaiveTime::MIN)
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

pub(crate) fn join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drop dangling connectors and empty brackets left over from extraction.
pub(crate) fn tidy_title(raw: &str) -> String {
    let cleaned = raw.replace("()", " ");
    let mut words: Vec<&str> = cleaned.split_whitespace().collect();
    while words.last().is_some_and(|w| is_connector(w)) {
        words.pop();
    }
    while words.first().is_some_and(|w| is_connector(w)) {
        words.remove(0);
    }
    words
        .join(" ")
        .trim_matches(|c: char| c == ',' || c == '-' || c.is_whitespace())
        .to_string()
}

fn is_connector(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "at" | "on" | "from" | "until" | "starting" | "@" | "-" | ","
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::TracingSink;
    use crate::resolve::ResolveOptions;
    use crate::router::Routed;
    use chrono::{Duration, NaiveDate};

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    // Monday
    fn now() -> Timestamp {
        ts(2017, 11, 6, 0, 0)
    }

    fn route_at(text: &str, now: Timestamp) -> Routed {
        let options = ResolveOptions::default();
        let ctx = RuleContext::new(now, &options, &TracingSink);
        standard().route(text, &ctx).unwrap()
    }

    fn route(text: &str) -> Routed {
        route_at(text, now())
    }

    #[test]
    fn test_standard_rule_order() {
        assert_eq!(
            standard().names(),
            [
                "nth_weekday_of_month",
                "day_of_every_month",
                "last_day_of_month",
                "every_interval",
                "dated_meeting_with_venue",
                "title_then_date",
                "date_then_title",
                "weekday_at_time",
                "weekday_then_title",
                "slash_date_then_title",
                "relative_day",
                "title_at_time",
                "numeric_date_then_title",
                "catch_all",
            ]
        );
    }

    #[test]
    fn test_specific_rule_shadows_generic_one() {
        let text = "book club 3rd thursday of the month at 7:30pm";
        // The generic time rule would also accept this line
        assert!(TITLE_AT_TIME.is_match(text));
        assert_eq!(route(text).rule, "nth_weekday_of_month");
    }

    #[test]
    fn test_nth_weekday_of_month() {
        let routed = route("book club 3rd thursday of the month at 7:30pm");
        assert_eq!(routed.rule, "nth_weekday_of_month");
        let r = routed.result;
        assert_eq!(r.title, "book club");
        assert_eq!(r.date, Some(ts(2017, 11, 16, 19, 30)));
        assert_eq!(
            r.recurring.unwrap().as_str(),
            "3rd thursday of the month at 7:30pm"
        );
        assert_eq!(r.input, None);
    }

    #[test]
    fn test_nth_weekday_of_month_with_start() {
        let r = route("1st Monday of every month (starting 3rd Jul 2017)").result;
        assert_eq!(r.title, "");
        assert_eq!(r.date, Some(ts(2017, 7, 3, 0, 0)));
        assert_eq!(r.anchor.as_deref(), Some("3rd Jul 2017"));
    }

    #[test]
    fn test_day_of_every_month() {
        let routed = route("Rent on the 14th of every month");
        assert_eq!(routed.rule, "day_of_every_month");
        assert_eq!(routed.result.title, "Rent");
        assert_eq!(routed.result.date, Some(ts(2017, 11, 14, 0, 0)));
    }

    #[test]
    fn test_last_day_of_month() {
        let routed = route("Council Tax last day of the month");
        assert_eq!(routed.rule, "last_day_of_month");
        assert_eq!(routed.result.title, "Council Tax");
        assert_eq!(routed.result.date, Some(ts(2017, 11, 30, 0, 0)));
    }

    #[test]
    fn test_every_interval_pins_first_occurrence() {
        let routed = route("Team sync every 2 weeks at 9am");
        assert_eq!(routed.rule, "every_interval");
        let r = routed.result;
        assert_eq!(r.title, "Team sync");
        assert_eq!(r.date, Some(ts(2017, 11, 6, 9, 0)));
        assert_eq!(
            r.input.as_deref(),
            Some("Team sync every 2 weeks at 9am starting 6th Nov 2017")
        );
        assert_eq!(r.anchor.as_deref(), Some("6th Nov 2017"));
    }

    #[test]
    fn test_every_interval_with_start_and_until() {
        let line = "some event every 2 weeks at 6am starting from 14th Jan until 28th Oct";
        let r = route(line).result;
        assert_eq!(r.title, "some event");
        assert_eq!(r.date, Some(ts(2017, 1, 14, 6, 0)));
        assert_eq!(r.until, Some(ts(2017, 10, 28, 23, 59) + Duration::seconds(59)));
        assert_eq!(r.end_date, None);
        assert_eq!(r.anchor.as_deref(), Some("14th Jan"));
        assert_eq!(r.input, None);
    }

    #[test]
    fn test_every_interval_until_with_time_is_kept() {
        let r = route("swim every day at 6am until 1st Dec at 8am").result;
        assert_eq!(r.until, Some(ts(2017, 12, 1, 8, 0)));
    }

    #[test]
    fn test_until_end_covers_date_only_phrase() {
        let midnight = ts(2017, 12, 12, 0, 0);
        assert_eq!(
            until_end("12th Dec", midnight),
            ts(2017, 12, 12, 23, 59) + Duration::seconds(59)
        );
        assert_eq!(until_end("12th Dec at 12am", midnight), midnight);
        assert_eq!(until_end("tonight", ts(2017, 11, 6, 21, 0)), ts(2017, 11, 6, 21, 0));
    }

    #[test]
    fn test_every_nth_weekday_with_bracketed_start() {
        let r = route("some event every 2nd Monday (starting 7th Nov 2016)").result;
        assert_eq!(r.title, "some event");
        assert_eq!(r.date, Some(ts(2016, 11, 7, 0, 0)));
        assert_eq!(r.recurring.unwrap().as_str(), "every 2nd Monday");
    }

    #[test]
    fn test_every_weekday_with_time_range() {
        let r = route("yoga every tuesday at 6pm-7:30pm").result;
        assert_eq!(r.title, "yoga");
        assert_eq!(r.date, Some(ts(2017, 11, 7, 18, 0)));
    }

    #[test]
    fn test_dated_meeting_with_venue() {
        let routed = route("7th Oct Euston Station (meet at Timothy's house at 7pm)");
        assert_eq!(routed.rule, "dated_meeting_with_venue");
        let r = routed.result;
        assert_eq!(r.title, "Euston Station");
        assert_eq!(r.venue.as_deref(), Some("Timothy's house"));
        assert_eq!(r.date, Some(ts(2017, 10, 7, 19, 0)));
    }

    #[test]
    fn test_title_then_date() {
        let routed = route("some important day 24th Mar");
        assert_eq!(routed.rule, "title_then_date");
        assert_eq!(routed.result.title, "some important day");
        assert_eq!(routed.result.date, Some(ts(2017, 3, 24, 0, 0)));
        assert_eq!(routed.result.recurring, None);
    }

    #[test]
    fn test_title_then_date_yearly_marker() {
        let r = route("Birthday party 3rd Jun *").result;
        assert_eq!(r.title, "Birthday party");
        assert_eq!(r.recurring, Some(RecurrenceTag::yearly()));
        assert_eq!(r.anchor.as_deref(), Some("3rd Jun"));
        // Roll-forward happens in the interpreter, not here
        assert_eq!(r.date, Some(ts(2017, 6, 3, 0, 0)));
    }

    #[test]
    fn test_title_then_date_with_range() {
        let r = route("hall 2 10th Nov 2017 at 11am-12pm").result;
        assert_eq!(r.date, Some(ts(2017, 11, 10, 11, 0)));
        assert_eq!(r.end_date, Some(ts(2017, 11, 10, 12, 0)));
    }

    #[test]
    fn test_date_then_title() {
        let routed = route("3rd June garden party at 2pm");
        assert_eq!(routed.rule, "date_then_title");
        assert_eq!(routed.result.title, "garden party");
        assert_eq!(routed.result.date, Some(ts(2017, 6, 3, 14, 0)));
    }

    #[test]
    fn test_weekday_at_time_pins_input() {
        let routed = route("hall 2 friday at 11am");
        assert_eq!(routed.rule, "weekday_at_time");
        let r = routed.result;
        assert_eq!(r.title, "hall 2");
        assert_eq!(r.date, Some(ts(2017, 11, 10, 11, 0)));
        assert_eq!(r.input.as_deref(), Some("hall 2 10th Nov 2017 at 11am"));
    }

    #[test]
    fn test_weekday_then_title_with_overnight_range() {
        let routed = route("friday hall 2 11am until 12am");
        assert_eq!(routed.rule, "weekday_then_title");
        let r = routed.result;
        assert_eq!(r.title, "hall 2");
        assert_eq!(r.date, Some(ts(2017, 11, 10, 11, 0)));
        assert_eq!(r.end_date, Some(ts(2017, 11, 11, 0, 0)));
        assert_eq!(r.input.as_deref(), Some("hall 2 10th Nov 2017 at 11am-12am"));
    }

    #[test]
    fn test_slash_date_then_title_is_day_first() {
        let routed = route("21/05/2017 Forum meetup at Roundpeg from 2pm");
        assert_eq!(routed.rule, "slash_date_then_title");
        assert_eq!(routed.result.title, "Forum meetup at Roundpeg");
        assert_eq!(routed.result.date, Some(ts(2017, 5, 21, 14, 0)));
    }

    #[test]
    fn test_relative_day() {
        let routed = route("dentist tomorrow at 3pm");
        assert_eq!(routed.rule, "relative_day");
        assert_eq!(routed.result.date, Some(ts(2017, 11, 7, 15, 0)));

        let r = route("quiz tonight").result;
        assert_eq!(r.date, Some(ts(2017, 11, 6, 21, 0)));
        assert_eq!(r.input.as_deref(), Some("quiz 6th Nov 2017 at 9pm"));
    }

    #[test]
    fn test_title_at_time() {
        let routed = route("hall 2 at 11am");
        assert_eq!(routed.rule, "title_at_time");
        assert_eq!(routed.result.title, "hall 2");
        assert_eq!(routed.result.date, Some(ts(2017, 11, 6, 11, 0)));
    }

    #[test]
    fn test_numeric_date_then_title() {
        let routed = route("27-Mar@1436 some important day");
        assert_eq!(routed.rule, "numeric_date_then_title");
        assert_eq!(routed.result.title, "some important day");
        assert_eq!(routed.result.date, Some(ts(2017, 3, 27, 14, 36)));
    }

    #[test]
    fn test_pinned_input_reads_back_to_same_date() {
        let first = route("hall 2 friday at 11am").result;
        let later = route_at(&first.input.unwrap(), ts(2017, 11, 9, 8, 0)).result;
        assert_eq!(later.date, first.date);
        assert_eq!(later.title, "hall 2");
    }

    #[test]
    fn test_tidy_title() {
        assert_eq!(tidy_title("  hall 2 at "), "hall 2");
        assert_eq!(tidy_title("on the town,"), "the town");
        assert_eq!(tidy_title("party ()"), "party");
        assert_eq!(tidy_title(""), "");
    }

    #[test]
    fn test_pinned_input_forms() {
        assert_eq!(pinned_input("x", ts(2017, 11, 6, 0, 0), None), "x 6th Nov 2017");
        assert_eq!(
            pinned_input("", ts(2017, 11, 6, 19, 30), Some(ts(2017, 11, 6, 21, 0))),
            "6th Nov 2017 at 7:30pm-9pm"
        );
    }
}
