//! Observability hook for the interpreter's decision points.
//!
//! The interpreter never prints. Every decision worth inspecting (which
//! rule fired, what a phrase resolved to, how far a recurrence was rolled,
//! each projection step) is handed to an [`EventSink`]. The default sink,
//! [`TracingSink`], forwards them as structured `tracing` events under the
//! `event_nlp` target.

use crate::Timestamp;

/// A single decision taken while interpreting a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trace<'a> {
    /// The router picked `rule` for `text`.
    RuleSelected { rule: &'a str, text: &'a str },
    /// The resolver turned `phrase` into `date` (`None` when unparseable).
    DateResolved {
        phrase: &'a str,
        date: Option<Timestamp>,
    },
    /// A recurring date at `from` was rolled forward to `to`.
    RecurrenceAdvanced {
        tag: &'a str,
        from: Timestamp,
        to: Timestamp,
    },
    /// The projector emitted `date` while the reference clock stood at `reference`.
    ProjectionStep {
        reference: Timestamp,
        date: Timestamp,
    },
}

/// Receiver for [`Trace`] events.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &Trace<'_>);
}

/// Forwards every trace to `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &Trace<'_>) {
        match *event {
            Trace::RuleSelected { rule, text } => {
                tracing::debug!(target: "event_nlp", rule, text, "rule selected");
            }
            Trace::DateResolved { phrase, date } => match date {
                Some(date) => {
                    tracing::debug!(target: "event_nlp", phrase, %date, "date resolved");
                }
                None => tracing::debug!(target: "event_nlp", phrase, "date unresolved"),
            },
            Trace::RecurrenceAdvanced { tag, from, to } => {
                tracing::debug!(target: "event_nlp", tag, %from, %to, "recurrence advanced");
            }
            Trace::ProjectionStep { reference, date } => {
                tracing::debug!(target: "event_nlp", %reference, %date, "projection step");
            }
        }
    }
}
