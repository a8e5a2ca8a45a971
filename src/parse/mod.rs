//! Turns one line of free text into structured task fields.
//!
//! Stages run in a fixed order over a [`Draft`]. Each takes the draft by value
//! and hands back the remaining text plus whatever fields it recognized. URLs
//! are pulled out before dates so digits inside a link are never read as a day.

pub mod date;
pub mod directive;
pub mod priority;
pub mod urls;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::core::task::{Priority, TaskStatus};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Structured fields read out of a line of input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTaskFields {
    /// May be empty when the input held nothing but metadata.
    pub title: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDateTime>,
    /// Normalized URLs in order of appearance.
    pub links: Vec<String>,
    pub status: TaskStatus,
    pub completed_at: Option<NaiveDateTime>,
}

impl Default for ParsedTaskFields {
    fn default() -> Self {
        Self {
            title: String::new(),
            priority: Priority::Medium,
            due_date: None,
            links: Vec::new(),
            status: TaskStatus::Todo,
            completed_at: None,
        }
    }
}

/// Working state threaded through the stages.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub fields: ParsedTaskFields,
}

impl Draft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fields: ParsedTaskFields::default(),
        }
    }

    /// Collapse whitespace and move the remaining text into the title.
    pub fn finish(self) -> ParsedTaskFields {
        let title = WHITESPACE_RE.replace_all(self.text.trim(), " ").into_owned();
        ParsedTaskFields {
            title,
            ..self.fields
        }
    }
}

type Stage = fn(Draft, NaiveDateTime) -> Draft;

const STAGES: [Stage; 4] = [directive::extract, url_stage, priority_stage, date::extract];

fn url_stage(draft: Draft, _now: NaiveDateTime) -> Draft {
    urls::extract(draft)
}

fn priority_stage(draft: Draft, _now: NaiveDateTime) -> Draft {
    priority::extract(draft)
}

/// Interpret `input` as of `now`. Never fails; unrecognized parts stay in the title.
pub fn interpret(input: &str, now: NaiveDateTime) -> ParsedTaskFields {
    let parsed = STAGES
        .iter()
        .fold(Draft::new(input), |draft, stage| stage(draft, now))
        .finish();
    log::debug!(
        "Interpreted {:?} as {:?} ({} links, due {:?})",
        input,
        parsed.title,
        parsed.links.len(),
        parsed.due_date
    );
    parsed
}

/// [`interpret`] against the local wall clock.
pub fn interpret_now(input: &str) -> ParsedTaskFields {
    interpret(input, chrono::Local::now().naive_local())
}
