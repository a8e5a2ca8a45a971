use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::parse::ParsedTaskFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Completed,
    Someday,
}

impl TaskStatus {
    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Completed => "completed",
            Self::Someday => "someday",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Some(Self::Todo),
            "completed" | "done" => Some(Self::Completed),
            "someday" => Some(Self::Someday),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Open work, including parked someday items.
    pub fn is_active(&self) -> bool {
        !self.is_done()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Info,
}

impl Priority {
    /// List weight: high, medium, low, then info.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
            Self::Info => 0,
        }
    }

    pub fn as_keyword(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub links: Vec<String>,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_focus: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub description: String,
    /// Base64-encoded image attachments.
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sub_tasks: Vec<SubTask>,
    /// Derived by the health check, never authoritative.
    #[serde(default)]
    pub is_stale: bool,
}

impl Task {
    pub fn new(title: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            id: Uuid::nil(),
            title: title.into(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date: None,
            links: Vec::new(),
            created_at: now,
            completed_at: None,
            is_focus: false,
            notes: String::new(),
            description: String::new(),
            images: Vec::new(),
            sub_tasks: Vec::new(),
            is_stale: false,
        }
    }

    /// Build a fresh task record from interpreted input. The id is assigned by the store.
    pub fn from_parsed(parsed: ParsedTaskFields, now: NaiveDateTime) -> Self {
        let mut task = Self::new(parsed.title, now);
        task.priority = parsed.priority;
        task.due_date = parsed.due_date;
        task.links = parsed.links;
        task.status = parsed.status;
        task.completed_at = match parsed.status {
            TaskStatus::Completed => parsed.completed_at.or(Some(now)),
            _ => None,
        };
        task
    }

    pub fn complete(&mut self, now: NaiveDateTime) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.is_focus = false;
    }

    pub fn move_to_someday(&mut self) {
        self.status = TaskStatus::Someday;
        self.completed_at = None;
        self.is_focus = false;
    }

    pub fn reopen(&mut self) {
        self.status = TaskStatus::Todo;
        self.completed_at = None;
    }

    /// All free text that may carry links, joined for a registry scan.
    pub fn scannable_text(&self) -> String {
        [self.title.as_str(), self.notes.as_str(), self.description.as_str()]
            .into_iter()
            .chain(self.links.iter().map(String::as_str))
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(links) = patch.links {
            self.links = links;
        }
        match patch.status {
            Some(StatusChange::Completed(at)) if self.status != TaskStatus::Completed => {
                self.status = TaskStatus::Completed;
                self.completed_at = Some(at);
            }
            Some(StatusChange::Completed(_)) | None => {}
            Some(StatusChange::Todo) => self.reopen(),
            Some(StatusChange::Someday) => {
                self.status = TaskStatus::Someday;
                self.completed_at = None;
            }
        }
        if let Some(is_focus) = patch.is_focus {
            self.is_focus = is_focus;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(is_stale) = patch.is_stale {
            self.is_stale = is_stale;
        }
    }
}

/// Main-list order: higher priority first, then earliest due date, undated last.
pub fn sort_for_list(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
}

/// Status transition carried by a patch. Completion always brings its timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Todo,
    Completed(NaiveDateTime),
    Someday,
}

/// Partial update for a stored task. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDateTime>>,
    pub links: Option<Vec<String>>,
    pub status: Option<StatusChange>,
    pub is_focus: Option<bool>,
    pub notes: Option<String>,
    pub description: Option<String>,
    pub is_stale: Option<bool>,
}

impl TaskPatch {
    pub fn complete(now: NaiveDateTime) -> Self {
        Self {
            status: Some(StatusChange::Completed(now)),
            is_focus: Some(false),
            ..Self::default()
        }
    }

    pub fn someday() -> Self {
        Self {
            status: Some(StatusChange::Someday),
            is_focus: Some(false),
            ..Self::default()
        }
    }

    pub fn stale(is_stale: bool) -> Self {
        Self {
            is_stale: Some(is_stale),
            ..Self::default()
        }
    }
}
