//! # event-nlp
//!
//! Deterministic interpretation of human-written calendar event descriptions.
//!
//! A line such as `"book club 3rd thursday of the month at 7:30pm"` becomes an
//! [`EventRecord`] with a cleaned title, an absolute occurrence date, an
//! optional end date and an optional recurrence tag. Recurring lines can be
//! projected into the concrete sequence of future occurrences.
//!
//! Everything is computed against an explicit reference clock; nothing reads
//! the system time.
//!
//! ## Modules
//!
//! - [`ordinal`] — integer to ordinal string (`1st`, `22nd`)
//! - [`normalize`] — canonical rewrites of irregular phrasings before routing
//! - [`resolve`] — fuzzy date/time phrase → absolute timestamp
//! - [`schedule`] — recurrence tag → RRULE-backed schedule
//! - [`router`] — ordered first-match rule table
//! - [`rules`] — the standard rule set
//! - [`interpreter`] — normalize, route, roll recurrences forward
//! - [`projector`] — enumerate occurrences of a recurring line
//! - [`observe`] — injectable sink for decision traces
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use event_nlp::EventNlp;
//!
//! let now = NaiveDate::from_ymd_opt(2017, 11, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();
//! let nlp = EventNlp::new(now);
//! let record = nlp.parse("hall 2 friday at 11am").unwrap();
//! assert_eq!(record.title, "hall 2");
//! assert_eq!(record.date.unwrap().to_string(), "2017-11-10 11:00:00");
//! ```

pub mod error;
mod fallback;
pub mod interpreter;
pub mod normalize;
pub mod observe;
pub mod ordinal;
pub mod projector;
pub mod resolve;
pub mod router;
pub mod rules;
pub mod schedule;

/// Wall-clock instant used throughout the crate.
pub type Timestamp = chrono::NaiveDateTime;

pub use error::NlpError;
pub use interpreter::{EventNlp, EventRecord};
pub use normalize::normalize;
pub use observe::{EventSink, Trace, TracingSink};
pub use ordinal::ordinal;
pub use resolve::{resolve, DayMonthOrder, ResolveOptions};
pub use router::{PartialResult, RecurrenceTag, Router, RouterBuilder, Rule};
pub use schedule::{compile, Schedule};
