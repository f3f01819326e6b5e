use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use event_nlp::resolve::local_reference;
use event_nlp::{DayMonthOrder, EventNlp, ResolveOptions, Timestamp};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "event-nlp",
    version,
    about = "Interpret free-text calendar event descriptions"
)]
struct Cli {
    /// Reference clock: RFC 3339, or a wall-clock "YYYY-MM-DD[ HH:MM[:SS]]".
    /// Defaults to the current time.
    #[arg(long, global = true)]
    now: Option<String>,
    /// IANA timezone used to read an RFC 3339 or current reference instant
    #[arg(long, global = true, default_value = "UTC")]
    timezone: String,
    /// Read numeric dates as day/month (21/05/2017) instead of month/day
    #[arg(long, global = true)]
    day_first: bool,
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Interpret each phrase into a title, date, end date and recurrence
    Parse {
        /// Event phrases; one per stdin line when omitted
        phrases: Vec<String>,
    },
    /// List the occurrences of each phrase
    Project {
        /// Last year to project through when the phrase has no "until"
        #[arg(long)]
        year: Option<i32>,
        /// Event phrases; one per stdin line when omitted
        phrases: Vec<String>,
    },
}

#[derive(Serialize)]
struct Projection<'a> {
    input: &'a str,
    dates: Vec<Timestamp>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let options = ResolveOptions::default().with_order(if cli.day_first {
        DayMonthOrder::DayFirst
    } else {
        DayMonthOrder::MonthFirst
    });
    let now = reference(cli.now.as_deref(), &cli.timezone)?;
    let mut nlp = EventNlp::with_options(now, options);
    tracing::debug!(%now, ?options, "reference clock");

    let mut out = io::stdout().lock();
    match cli.command {
        Command::Parse { phrases } => {
            for phrase in read_phrases(phrases)? {
                let record = nlp
                    .parse(&phrase)
                    .with_context(|| format!("failed to interpret '{phrase}'"))?;
                emit(&mut out, &record, cli.pretty)?;
            }
        }
        Command::Project { year, phrases } => {
            for phrase in read_phrases(phrases)? {
                let dates = nlp
                    .project(&phrase, year)
                    .with_context(|| format!("failed to project '{phrase}'"))?;
                let projection = Projection {
                    input: &phrase,
                    dates,
                };
                emit(&mut out, &projection, cli.pretty)?;
            }
        }
    }
    Ok(())
}

/// Resolve the `--now` flag into a wall-clock reference.
fn reference(now: Option<&str>, timezone: &str) -> Result<Timestamp> {
    let Some(raw) = now else {
        return Ok(local_reference(Utc::now(), timezone)?);
    };
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(local_reference(instant.with_timezone(&Utc), timezone)?);
    }
    parse_wall_clock(raw).with_context(|| {
        format!("invalid --now value '{raw}': expected RFC 3339 or YYYY-MM-DD[ HH:MM[:SS]]")
    })
}

fn parse_wall_clock(raw: &str) -> Result<Timestamp> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
        Err(e) => bail!("{e}"),
    }
}

/// Phrases from the command line, or one per non-blank stdin line.
fn read_phrases(args: Vec<String>) -> Result<Vec<String>> {
    if !args.is_empty() {
        return Ok(args);
    }
    let mut phrases = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        if !line.trim().is_empty() {
            phrases.push(line);
        }
    }
    Ok(phrases)
}

fn emit<T: Serialize>(out: &mut impl Write, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    writeln!(out, "{json}")?;
    Ok(())
}
