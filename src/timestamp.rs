//! Segment timestamp parsing.
//!
//! Timestamps arrive either as RFC-3339 or as a bare `YYYY-MM-DDThh:mm:ss`.
//! Formats are tried in that order; a value matching neither degrades to the
//! Unix epoch instead of failing the render.

use chrono::{DateTime, NaiveDateTime};

const FALLBACK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Outcome of parsing a segment timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock time as written in the input.
    Parsed(NaiveDateTime),
    /// No format matched; displays as the epoch.
    Defaulted { raw: String },
}

type Attempt = fn(&str) -> Option<NaiveDateTime>;

fn rfc3339(raw: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local())
}

fn without_zone(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, FALLBACK_FORMAT).ok()
}

const ATTEMPTS: [Attempt; 2] = [rfc3339, without_zone];

impl Timestamp {
    /// Parse `raw`, logging when every format fails.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match ATTEMPTS.iter().find_map(|attempt| attempt(trimmed)) {
            Some(dt) => Timestamp::Parsed(dt),
            None => {
                tracing::warn!(raw, "unparseable segment timestamp, using epoch");
                Timestamp::Defaulted { raw: raw.to_string() }
            }
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Timestamp::Defaulted { .. })
    }

    pub fn value(&self) -> NaiveDateTime {
        match self {
            Timestamp::Parsed(dt) => *dt,
            Timestamp::Defaulted { .. } => NaiveDateTime::default(),
        }
    }

    /// `DD-MM-YYYY`
    pub fn date(&self) -> String {
        self.value().format("%d-%m-%Y").to_string()
    }

    /// `Weekday DD Month YYYY`
    pub fn long_date(&self) -> String {
        self.value().format("%A %d %B %Y").to_string()
    }

    /// `HH:MM`
    pub fn time(&self) -> String {
        self.value().format("%H:%M").to_string()
    }
}
