//! Catch-all extraction by token stripping.
//!
//! Reached only when no specific rule matched. Date fragments are found
//! and removed from the text in a fixed order (time or time range, weekday,
//! month with its adjacent day and year, a lone suffixed day, the trailing
//! `*` marker); whatever remains is the title.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::resolve::{parse_time_string, range_end};
use crate::router::{PartialResult, RecurrenceTag, RuleContext};
use crate::rules::{join, pinned_input, tidy_title, MONTH, TIME, WEEKDAY};

static TIME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?:\b(?:at|from)\s+|@\s*)?\b(?P<start>{TIME})(?:\s*(?:-|until|to)\s*(?P<end>{TIME}))?"
    ))
    .expect("valid time token pattern")
});

static WEEKDAY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:on\s+)?(?P<weekday>(?:(?:next|this)\s+)?(?:{WEEKDAY}))\b"
    ))
    .expect("valid weekday token pattern")
});

static MONTH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)(?P<whole>(?:\b(?P<before>\d{{1,2}})(?:st|nd|rd|th)?\s+)?\b(?P<month>{MONTH})\b(?:\s+(?P<after>\d{{1,2}})(?:st|nd|rd|th)?\b)?(?:\s+(?P<year>\d{{4}})\b)?)"
    ))
    .expect("valid month token pattern")
});

static DAY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?P<day>\d{1,2})(?:st|nd|rd|th)\b").expect("valid day token pattern")
});

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\*\s*$").expect("valid marker pattern"));

/// Strip the first match of `pattern` from `text`, returning the named
/// groups asked for.
fn take<const N: usize>(
    pattern: &Regex,
    text: &mut String,
    groups: [&str; N],
) -> Option<[Option<String>; N]> {
    let caps = pattern.captures(text.as_str())?;
    let whole = caps.get(0)?.range();
    let values = groups.map(|name| caps.name(name).map(|m| m.as_str().to_string()));
    text.replace_range(whole, " ");
    Some(values)
}

pub(crate) fn catch_all(ctx: &RuleContext<'_>, text: &str) -> Result<PartialResult> {
    let mut rest = text.to_string();

    let [start, end] = take(&TIME_TOKEN, &mut rest, ["start", "end"]).unwrap_or_default();
    let [weekday] = take(&WEEKDAY_TOKEN, &mut rest, ["weekday"]).unwrap_or_default();
    let [whole, before, month, after, year] = take(
        &MONTH_TOKEN,
        &mut rest,
        ["whole", "before", "month", "after", "year"],
    )
    .unwrap_or_default();
    let [lone_day] = take(&DAY_TOKEN, &mut rest, ["day"]).unwrap_or_default();
    let marked = MARKER.is_match(&rest);
    let rest = MARKER.replace(&rest, "");

    // Day + month first, else the weekday on its own
    let calendar = month.and_then(|month| {
        let day = before.or(after).or(lone_day)?;
        Some(join([day.as_str(), month.as_str(), year.as_deref().unwrap_or("")]))
    });
    let day_phrase = calendar.clone().or(weekday);
    let phrase = join([
        day_phrase.as_deref().unwrap_or(""),
        start.as_deref().map_or("", |_| "at"),
        start.as_deref().unwrap_or(""),
    ]);
    let phrase = phrase.strip_prefix("at ").unwrap_or(&phrase);

    let title = tidy_title(&rest);
    let date = if phrase.is_empty() {
        None
    } else {
        ctx.resolve(phrase)
    };
    let end_date = date
        .zip(end.as_deref().and_then(parse_time_string))
        .map(|(date, end)| range_end(date, end));

    // A weekday or bare time depends on the clock; pin it
    let input = match (date, &calendar) {
        (Some(date), None) => Some(pinned_input(&title, date, end_date)),
        _ => None,
    };
    let recurring = (marked && date.is_some()).then(RecurrenceTag::yearly);
    let anchor = recurring.as_ref().and(calendar).and(whole);

    Ok(PartialResult {
        input,
        title,
        date,
        end_date,
        recurring,
        anchor,
        ..PartialResult::default()
    })
}
