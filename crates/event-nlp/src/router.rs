//! Ordered first-match rule table.
//!
//! A [`Router`] holds pattern rules in registration order followed by a
//! single fallback. Routing tries each rule's pattern in turn; the first
//! that matches has its extractor invoked and nothing after it is tried.
//! The fallback takes no pattern at all, so every input is routed.
//!
//! Registration order is the priority order. A generic rule registered
//! before a specific one shadows it.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::Result;
use crate::observe::{EventSink, Trace};
use crate::resolve::{parse_time_string, resolve, DayMonthOrder, ResolveOptions};
use crate::schedule::{self, Schedule};
use crate::Timestamp;

// ── Results ─────────────────────────────────────────────────────────────────

/// Unresolved textual descriptor of repetition ("every 2 weeks", "yearly").
///
/// Not a schedule: [`RecurrenceTag::compile`] is needed whenever a concrete
/// occurrence is wanted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RecurrenceTag(String);

impl RecurrenceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().trim().to_string())
    }

    /// The sentinel carried by a trailing `*` marker.
    pub fn yearly() -> Self {
        Self("yearly".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the tag repeats on a monthly cadence.
    pub fn is_monthly(&self) -> bool {
        schedule::is_monthly(&self.0)
    }

    /// End of an explicit time range inside the tag (`"... at 6pm-7:30pm"`).
    pub fn range_end(&self) -> Option<NaiveTime> {
        static RANGE_END: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"(?i)\d\s*(?:am|pm)?\s*-\s*(?P<end>\d{1,2}(?::\d{2})?\s*(?:am|pm)|\d{1,2}:\d{2})\s*$")
                .expect("valid range end pattern")
        });
        let caps = RANGE_END.captures(&self.0)?;
        parse_time_string(&caps["end"])
    }

    /// Compile the tag into a schedule anchored at `anchor`.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::NlpError::InvalidRecurrence`] from [`schedule::compile`].
    pub fn compile(&self, anchor: Timestamp) -> Result<Schedule> {
        schedule::compile(&self.0, anchor)
    }
}

impl fmt::Display for RecurrenceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields a rule extracted from its match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialResult {
    /// Rewritten input, present only when the rule rewrote the text.
    pub input: Option<String>,
    pub title: String,
    pub date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
    pub recurring: Option<RecurrenceTag>,
    pub venue: Option<String>,
    /// Date fragment of the input that roll-forward rewrites.
    pub anchor: Option<String>,
    /// Explicit `until` horizon of a recurrence.
    pub until: Option<Timestamp>,
}

/// A routed result together with the name of the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routed {
    pub rule: &'static str,
    pub result: PartialResult,
}

// ── Extraction context ──────────────────────────────────────────────────────

/// What an extractor may consult: the reference clock, resolver options
/// and the trace sink.
pub struct RuleContext<'a> {
    now: Timestamp,
    options: &'a ResolveOptions,
    sink: &'a dyn EventSink,
}

impl<'a> RuleContext<'a> {
    pub fn new(now: Timestamp, options: &'a ResolveOptions, sink: &'a dyn EventSink) -> Self {
        Self { now, options, sink }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Resolve a phrase with the configured options; `None` when unparseable.
    pub fn resolve(&self, phrase: &str) -> Option<Timestamp> {
        self.resolve_with(phrase, self.options.day_month_order)
    }

    /// Resolve a phrase with an explicit day/month order.
    pub fn resolve_with(&self, phrase: &str, order: DayMonthOrder) -> Option<Timestamp> {
        let date = resolve(phrase, self.now, &self.options.with_order(order)).ok();
        self.sink.record(&Trace::DateResolved { phrase, date });
        date
    }
}

// ── Rules ───────────────────────────────────────────────────────────────────

/// Maps a rule's captures to a partial result.
pub type Extract = fn(&RuleContext<'_>, &Captures<'_>) -> Result<PartialResult>;

/// Maps whole text to a partial result; used by the fallback.
pub type ExtractText = fn(&RuleContext<'_>, &str) -> Result<PartialResult>;

/// A named pattern and its extractor.
pub struct Rule {
    name: &'static str,
    pattern: Regex,
    extract: Extract,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

struct Fallback {
    name: &'static str,
    extract: ExtractText,
}

/// Collects rules in priority order. Only [`RouterBuilder::fallback`]
/// produces a [`Router`], which keeps the catch-all structurally last.
#[derive(Default)]
pub struct RouterBuilder {
    rules: Vec<Rule>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule after every rule registered so far.
    pub fn rule(mut self, name: &'static str, pattern: Regex, extract: Extract) -> Self {
        self.rules.push(Rule {
            name,
            pattern,
            extract,
        });
        self
    }

    /// Register the catch-all and finish the table.
    pub fn fallback(self, name: &'static str, extract: ExtractText) -> Router {
        Router {
            rules: self.rules,
            fallback: Fallback { name, extract },
        }
    }
}

/// An immutable, ordered rule table.
pub struct Router {
    rules: Vec<Rule>,
    fallback: Fallback,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The standard English rule table.
    pub fn standard() -> Self {
        crate::rules::standard()
    }

    /// Rule names in priority order, fallback last.
    pub fn names(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .map(Rule::name)
            .chain(std::iter::once(self.fallback.name))
            .collect()
    }

    /// Route `text` to the first matching rule.
    ///
    /// # Errors
    ///
    /// Only hard failures of the matched extractor are returned (a malformed
    /// recurrence). An unresolvable date is an absent field, not an error.
    pub fn route(&self, text: &str, ctx: &RuleContext<'_>) -> Result<Routed> {
        for rule in &self.rules {
            if let Some(caps) = rule.pattern.captures(text) {
                ctx.sink.record(&Trace::RuleSelected {
                    rule: rule.name,
                    text,
                });
                let result = (rule.extract)(ctx, &caps)?;
                return Ok(Routed {
                    rule: rule.name,
                    result,
                });
            }
        }
        ctx.sink.record(&Trace::RuleSelected {
            rule: self.fallback.name,
            text,
        });
        Ok(Routed {
            rule: self.fallback.name,
            result: (self.fallback.extract)(ctx, text)?,
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").field("rules", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::TracingSink;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl EventSink for Recorder {
        fn record(&self, event: &Trace<'_>) {
            if let Trace::RuleSelected { rule, .. } = event {
                self.0.lock().unwrap().push(rule.to_string());
            }
        }
    }

    fn now() -> Timestamp {
        NaiveDate::from_ymd_opt(2017, 11, 6)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn titled(title: &str) -> PartialResult {
        PartialResult {
            title: title.to_string(),
            ..PartialResult::default()
        }
    }

    fn toy_router() -> Router {
        Router::builder()
            .rule("greeting", Regex::new(r"^hello (?P<who>\w+)").unwrap(), |_, caps| {
                Ok(titled(&caps["who"]))
            })
            .rule("anything_hello", Regex::new(r"hello").unwrap(), |_, _| {
                Ok(titled("shadowed"))
            })
            .fallback("rest", |_, text| Ok(titled(text)))
    }

    #[test]
    fn test_route_first_match_wins() {
        let options = ResolveOptions::default();
        let ctx = RuleContext::new(now(), &options, &TracingSink);
        let routed = toy_router().route("hello world", &ctx).unwrap();
        assert_eq!(routed.rule, "greeting");
        assert_eq!(routed.result.title, "world");
    }

    #[test]
    fn test_route_later_rule_when_earlier_misses() {
        let options = ResolveOptions::default();
        let ctx = RuleContext::new(now(), &options, &TracingSink);
        let routed = toy_router().route("say hello", &ctx).unwrap();
        assert_eq!(routed.rule, "anything_hello");
    }

    #[test]
    fn test_route_fallback_is_total() {
        let options = ResolveOptions::default();
        let ctx = RuleContext::new(now(), &options, &TracingSink);
        for text in ["", "nothing here", "\n"] {
            let routed = toy_router().route(text, &ctx).unwrap();
            assert_eq!(routed.rule, "rest");
            assert_eq!(routed.result.title, text);
        }
    }

    #[test]
    fn test_router_names_in_priority_order() {
        assert_eq!(toy_router().names(), ["greeting", "anything_hello", "rest"]);
    }

    #[test]
    fn test_route_reports_selected_rule_once() {
        let options = ResolveOptions::default();
        let recorder = Recorder::default();
        let ctx = RuleContext::new(now(), &options, &recorder);
        toy_router().route("hello there", &ctx).unwrap();
        toy_router().route("bye", &ctx).unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), ["greeting", "rest"]);
    }

    #[test]
    fn test_context_resolve_unparseable_is_none() {
        let options = ResolveOptions::default();
        let ctx = RuleContext::new(now(), &options, &TracingSink);
        assert_eq!(ctx.resolve("not a date"), None);
        assert!(ctx.resolve("friday").is_some());
    }

    #[test]
    fn test_recurrence_tag_range_end() {
        let tag = RecurrenceTag::new("every tuesday at 6pm-7:30pm");
        assert_eq!(tag.range_end(), NaiveTime::from_hms_opt(19, 30, 0));
        assert_eq!(RecurrenceTag::new("every 2 weeks").range_end(), None);
        assert_eq!(RecurrenceTag::yearly().range_end(), None);
    }

    #[test]
    fn test_recurrence_tag_serializes_as_string() {
        let json = serde_json::to_string(&RecurrenceTag::yearly()).unwrap();
        assert_eq!(json, "\"yearly\"");
    }
}
