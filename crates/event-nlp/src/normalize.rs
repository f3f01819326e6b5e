//! Canonical rewrites of irregular phrasings, applied once before routing.
//!
//! At most one rewrite fires, checked in a fixed order. Text that matches
//! none passes through unchanged.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::ordinal::ordinal;

const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";
const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

type Rewrite = fn(&Captures<'_>) -> String;

static REWRITES: LazyLock<Vec<(Regex, Rewrite)>> = LazyLock::new(|| {
    let rewrites: [(String, Rewrite); 4] = [
        // "Thursday every 2 weeks" → "every 2nd Thursday"
        (
            format!(r"(?i)\b(?P<weekday>{WEEKDAYS})\s+every\s+(?P<n>\d+)\s+weeks?\b"),
            |caps: &Captures<'_>| format!("every {} {}", nth(&caps["n"]), &caps["weekday"]),
        ),
        // "14th March monthly" → "on the 14th of every month"
        (
            format!(r"(?i)\b(?P<day>\d{{1,2}})(?:st|nd|rd|th)?\s+(?:{MONTHS})\s+monthly\b"),
            |caps: &Captures<'_>| format!("on the {} of every month", nth(&caps["day"])),
        ),
        // "14th monthly"
        (
            r"(?i)\b(?P<day>\d{1,2})(?:st|nd|rd|th)\s+monthly\b".to_string(),
            |caps: &Captures<'_>| format!("on the {} of every month", nth(&caps["day"])),
        ),
        (
            r"(?i)\blast\s+day\s+monthly\b".to_string(),
            |_: &Captures<'_>| "last day of the month".to_string(),
        ),
    ];
    rewrites
        .into_iter()
        .map(|(pattern, rewrite)| {
            (
                Regex::new(&pattern).expect("valid normalizer pattern"),
                rewrite,
            )
        })
        .collect()
});

/// Rewrite `text` into the canonical form the router recognises.
///
/// ```
/// use event_nlp::normalize;
///
/// assert_eq!(normalize("Council Tax last day monthly"), "Council Tax last day of the month");
/// assert_eq!(normalize("Bins Thursday every 2 weeks"), "Bins every 2nd Thursday");
/// assert_eq!(normalize("hall 2 friday at 11am"), "hall 2 friday at 11am");
/// ```
pub fn normalize(text: &str) -> String {
    REWRITES
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(pattern, rewrite)| {
            pattern
                .replace(text, |caps: &Captures<'_>| rewrite(caps))
                .into_owned()
        })
        .unwrap_or_else(|| text.to_string())
}

fn nth(digits: &str) -> String {
    digits.parse().map(ordinal).unwrap_or_else(|_| digits.to_string())
}
