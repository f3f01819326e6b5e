//! Event interpreter: normalize, route, roll recurrences forward.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::normalize::normalize;
use crate::observe::{EventSink, Trace, TracingSink};
use crate::resolve::{canonical_date, local_reference, range_end, ResolveOptions};
use crate::router::{PartialResult, RecurrenceTag, Router, RuleContext};
use crate::Timestamp;

/// The interpretation of one event line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    /// The normalized input, rewritten when a clock-relative token was pinned
    /// or a recurrence rolled forward.
    pub input: String,
    pub title: String,
    pub date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub recurring: Option<RecurrenceTag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        match self.date {
            Some(date) => write!(f, ": {}", date.format("%A, %B %-d, %Y at %-I:%M %p"))?,
            None => f.write_str(": no date")?,
        }
        if let Some(end) = self.end_date {
            write!(f, " until {}", end.format("%A, %B %-d, %Y at %-I:%M %p"))?;
        }
        if let Some(tag) = &self.recurring {
            write!(f, " ({tag})")?;
        }
        Ok(())
    }
}

/// Interprets event lines against a reference clock.
///
/// The rule table is built once and shared between forks; the reference
/// clock is the only mutable state.
#[derive(Clone)]
pub struct EventNlp {
    now: Timestamp,
    options: ResolveOptions,
    router: Arc<Router>,
    sink: Arc<dyn EventSink>,
}

impl EventNlp {
    /// Interpreter with the standard rule table and month-first numeric dates.
    pub fn new(now: Timestamp) -> Self {
        Self::with_options(now, ResolveOptions::default())
    }

    pub fn with_options(now: Timestamp, options: ResolveOptions) -> Self {
        Self {
            now,
            options,
            router: Arc::new(Router::standard()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Interpreter whose reference clock is `anchor` seen from an IANA timezone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NlpError::InvalidTimezone`] for an unknown zone name.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use event_nlp::EventNlp;
    ///
    /// let utc = Utc.with_ymd_and_hms(2017, 11, 6, 23, 30, 0).unwrap();
    /// let nlp = EventNlp::at(utc, "Australia/Sydney").unwrap();
    /// assert_eq!(nlp.now().to_string(), "2017-11-07 10:30:00");
    /// ```
    pub fn at(anchor: DateTime<Utc>, timezone: &str) -> Result<Self> {
        Ok(Self::new(local_reference(anchor, timezone)?))
    }

    /// Replace the trace sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace the rule table.
    pub fn with_router(mut self, router: Router) -> Self {
        self.router = Arc::new(router);
        self
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn set_now(&mut self, now: Timestamp) {
        self.now = now;
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub(crate) fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// An independent interpreter sharing this one's rule table, options and
    /// sink, with its own reference clock.
    pub fn fork(&self, now: Timestamp) -> Self {
        Self {
            now,
            ..self.clone()
        }
    }

    /// Interpret one event line.
    ///
    /// A recurring match whose date is not after the reference clock is
    /// rolled forward to the first occurrence strictly after it, and the
    /// anchor fragment in `input` is rewritten to that occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NlpError::InvalidRecurrence`] when a matched recurrence
    /// cannot be compiled. Unresolvable dates are reported as `date: None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use event_nlp::EventNlp;
    ///
    /// let now = NaiveDate::from_ymd_opt(2017, 11, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// let record = EventNlp::new(now).parse("Birthday party 3rd Jun *").unwrap();
    /// assert_eq!(record.date.unwrap().to_string(), "2018-06-03 00:00:00");
    /// assert_eq!(record.input, "Birthday party 3rd Jun 2018 *");
    /// ```
    pub fn parse(&self, text: &str) -> Result<EventRecord> {
        let normalized = normalize(text.trim());
        let ctx = RuleContext::new(self.now, &self.options, self.sink());
        let routed = self.router.route(&normalized, &ctx)?;

        let PartialResult {
            input,
            title,
            mut date,
            mut end_date,
            recurring,
            venue,
            anchor,
            until,
        } = routed.result;
        let mut input = input.unwrap_or(normalized);

        if let Some(tag) = &recurring {
            if date.is_none_or(|date| date <= self.now) {
                let from = date.unwrap_or(self.now);
                let next = tag.compile(from)?.next_after(self.now)?;
                self.sink.record(&Trace::RecurrenceAdvanced {
                    tag: tag.as_str(),
                    from,
                    to: next,
                });
                if let Some(anchor) = anchor.as_deref() {
                    replace_last(&mut input, anchor, &canonical_date(next));
                }
                end_date = end_date.map(|end| end + (next - from));
                date = Some(next);
            }
            if let Some(end) = tag.range_end() {
                end_date = date.map(|date| range_end(date, end));
            }
        }

        Ok(EventRecord {
            input,
            title,
            date,
            end_date: end_date.or(until.filter(|until| date.is_none_or(|date| *until >= date))),
            recurring,
            venue,
        })
    }
}

impl fmt::Debug for EventNlp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventNlp")
            .field("now", &self.now)
            .field("options", &self.options)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

/// Replace the last occurrence of `from` in `text`.
fn replace_last(text: &mut String, from: &str, to: &str) {
    if let Some(pos) = text.rfind(from) {
        text.replace_range(pos..pos + from.len(), to);
    }
}
