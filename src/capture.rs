//! Turning typed input into stored tasks.
//!
//! Saving the task and cataloging its links are separate steps. Once the task
//! is stored, a failure in the link catalog is handed back alongside it rather
//! than as an error, since the task itself is not lost.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::core::task::Task;
use crate::links::{LinkRegistry, TitleFetcher};
use crate::parse::{self, Draft, date};
use crate::store::{RecordStore, StoreError};

pub const PREP_PREFIX: &str = "Prep for";

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Task has no title")]
    EmptyTitle,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A stored task, plus the link catalog error if registering its links failed.
#[derive(Debug)]
pub struct Captured {
    pub task: Task,
    pub link_error: Option<StoreError>,
}

/// Interpret one line, store it, then catalog its links.
pub async fn add_task<S: RecordStore, F: TitleFetcher>(
    store: &mut S,
    registry: &LinkRegistry<F>,
    text: &str,
    now: NaiveDateTime,
) -> Result<Captured, CaptureError> {
    let parsed = parse::interpret(text, now);
    if parsed.title.is_empty() {
        return Err(CaptureError::EmptyTitle);
    }
    let task = Task::from_parsed(parsed, now);
    let scan_text = task.scannable_text();
    Ok(store_and_register(store, registry, task, &scan_text).await?)
}

/// The prep task for one line of a meeting list: its first date expression
/// becomes the due date, the rest names the meeting.
pub fn prep_task(line: &str, now: NaiveDateTime) -> Option<Task> {
    let fields = date::extract(Draft::new(line), now).finish();
    if fields.title.is_empty() {
        return None;
    }
    let mut task = Task::new(format!("{} {}", PREP_PREFIX, fields.title), now);
    task.due_date = fields.due_date;
    Some(task)
}

/// One prep todo per non-empty line of `meetings`. Links anywhere on a line
/// are cataloged against that line's task.
pub async fn import_meeting_prep<S: RecordStore, F: TitleFetcher>(
    store: &mut S,
    registry: &LinkRegistry<F>,
    meetings: &str,
    now: NaiveDateTime,
) -> Result<Vec<Captured>, StoreError> {
    let mut captured = Vec::new();
    for line in meetings.lines().filter(|l| !l.trim().is_empty()) {
        let Some(task) = prep_task(line, now) else {
            log::debug!("No meeting name in {:?}", line);
            continue;
        };
        captured.push(store_and_register(store, registry, task, line).await?);
    }
    log::info!("Created {} prep tasks", captured.len());
    Ok(captured)
}

async fn store_and_register<S: RecordStore, F: TitleFetcher>(
    store: &mut S,
    registry: &LinkRegistry<F>,
    mut task: Task,
    scan_text: &str,
) -> Result<Captured, StoreError> {
    task.id = store.insert_task(task.clone())?;
    let link_error = registry
        .register_links(store, scan_text, Some(task.id))
        .await
        .err();
    if let Some(e) = &link_error {
        log::warn!("Task {} saved but its links were not cataloged: {}", task.id, e);
    }
    Ok(Captured { task, link_error })
}
