//! Recurrence projection by re-reading a line against an advancing clock.
//!
//! Occurrences are not computed from the schedule directly. The interpreter
//! is run again on its own rewritten output with the reference clock moved
//! just past the previous occurrence, and whatever date comes back is the
//! next one. A line whose date does not move when the clock passes it is a
//! single event.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, Months, NaiveDate};
use regex::Regex;

use crate::error::{NlpError, Result};
use crate::interpreter::EventNlp;
use crate::observe::Trace;
use crate::router::RecurrenceTag;
use crate::rules::{until_end, TIME};
use crate::Timestamp;

static UNTIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<head>.*?)\s+until\s+(?P<until>.+?)\s*\)?\s*$")
        .expect("valid until pattern")
});

static BARE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^{TIME}$")).expect("valid bare time pattern")
});

impl EventNlp {
    /// Enumerate the occurrences of `text` up to its `until` phrase, or
    /// through the end of `year`. Without a `year` the horizon is the later
    /// of the reference clock's year and the first occurrence's year.
    ///
    /// The reference clock is restored before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`NlpError::InvalidRecurrence`] if a matched recurrence cannot be compiled
    /// - [`NlpError::NonMonotonicProjection`] if re-reading the line fails to
    ///   produce a strictly later date
    /// - [`NlpError::InvalidExpression`] if `year` has no December 31st
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use event_nlp::EventNlp;
    ///
    /// let now = NaiveDate::from_ymd_opt(2017, 11, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let mut nlp = EventNlp::new(now);
    /// let dates = nlp.project("Rent on the 14th of every month", Some(2018)).unwrap();
    /// assert_eq!(dates.len(), 14);
    /// assert_eq!(nlp.now(), now);
    /// ```
    pub fn project(&mut self, text: &str, year: Option<i32>) -> Result<Vec<Timestamp>> {
        let original = self.now();
        let projected = self.project_from(text, year);
        self.set_now(original);
        projected
    }

    fn project_from(&mut self, text: &str, year: Option<i32>) -> Result<Vec<Timestamp>> {
        let (head, until) = split_until(text);
        let mut record = self.parse(head)?;
        let Some(mut current) = record.date else {
            return Ok(Vec::new());
        };

        let until_date = until.and_then(|until| {
            let date = self.fork(self.now()).parse(until).ok()?.date?;
            Some(until_end(until, date))
        });
        let end = match until_date {
            Some(end) => end,
            None => horizon(year.unwrap_or(current.year().max(self.now().year())))?,
        };

        // Fixed point: a single event does not move when the clock passes it
        let probe = self.fork(current + Duration::seconds(1)).parse(&record.input)?;
        if probe.date == Some(current) {
            return Ok(vec![current]);
        }

        let mut dates = Vec::new();
        while current <= end {
            dates.push(current);
            self.sink().record(&Trace::ProjectionStep {
                reference: self.now(),
                date: current,
            });

            let reference = next_reference(current, record.recurring.as_ref())?;
            if reference <= self.now() {
                return Err(NlpError::NonMonotonicProjection(format!(
                    "reference clock stuck at {} for '{}'",
                    self.now(),
                    record.input
                )));
            }
            self.set_now(reference);

            record = self.parse(&record.input)?;
            current = match record.date {
                Some(next) if next > current => next,
                Some(next) => {
                    return Err(NlpError::NonMonotonicProjection(format!(
                        "{next} does not follow {current} for '{}'",
                        record.input
                    )))
                }
                None => {
                    return Err(NlpError::NonMonotonicProjection(format!(
                        "no date after {current} for '{}'",
                        record.input
                    )))
                }
            };
        }
        Ok(dates)
    }
}

/// Split off an `until <phrase>` horizon; `11am until 12am` is a time range.
fn split_until(text: &str) -> (&str, Option<&str>) {
    let Some(caps) = UNTIL.captures(text) else {
        return (text, None);
    };
    match (caps.name("head"), caps.name("until")) {
        (Some(head), Some(until)) if !BARE_TIME.is_match(until.as_str()) => {
            (head.as_str(), Some(until.as_str()))
        }
        _ => (text, None),
    }
}

/// Last instant of `year`.
fn horizon(year: i32) -> Result<Timestamp> {
    NaiveDate::from_ymd_opt(year, 12, 31)
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .ok_or_else(|| NlpError::InvalidExpression(format!("year out of range: {year}")))
}

/// One second before the same instant one cadence unit later: a calendar
/// month for monthly tags (day-of-month clamped), a day otherwise.
fn next_reference(current: Timestamp, tag: Option<&RecurrenceTag>) -> Result<Timestamp> {
    let later = if tag.is_some_and(RecurrenceTag::is_monthly) {
        current.checked_add_months(Months::new(1)).ok_or_else(|| {
            NlpError::NonMonotonicProjection(format!("no month after {current}"))
        })?
    } else {
        current + Duration::days(1)
    };
    Ok(later - Duration::seconds(1))
}
