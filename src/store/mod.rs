//! Record store for tasks and links.
//!
//! Every operation touches a single record and is atomic on its own. Nothing
//! here retries; failures go straight back to the caller.

pub mod json;
pub mod memory;
pub mod migrate;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::core::link::{Link, NewLink, TitleSource};
use crate::core::task::{Task, TaskPatch, TaskStatus};

pub use json::JsonStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed store data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("No {collection} record with id {id}")]
    NotFound { collection: &'static str, id: Uuid },
}

pub trait RecordStore {
    /// Insert a task, assigning it a fresh id.
    fn insert_task(&mut self, task: Task) -> Result<Uuid, StoreError>;
    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<(), StoreError>;
    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;
    fn tasks(&self) -> Result<Vec<Task>, StoreError>;

    fn tasks_with_status(&self, statuses: &[TaskStatus]) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .tasks()?
            .into_iter()
            .filter(|t| statuses.contains(&t.status))
            .collect())
    }

    /// Insert a link row, assigning it a fresh id.
    fn insert_link(&mut self, link: NewLink) -> Result<Uuid, StoreError>;
    fn update_link_title(
        &mut self,
        id: Uuid,
        title: &str,
        source: TitleSource,
    ) -> Result<(), StoreError>;
    fn links_by_url(&self, url: &str) -> Result<Vec<Link>, StoreError>;
    fn links(&self) -> Result<Vec<Link>, StoreError>;
}

/// Current on-disk schema version.
pub const SCHEMA_VERSION: u64 = 3;

/// The full contents of a store, in its on-disk shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Collections {
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION,
            ..Self::default()
        }
    }
}

impl RecordStore for Collections {
    fn insert_task(&mut self, mut task: Task) -> Result<Uuid, StoreError> {
        task.id = Uuid::new_v4();
        let id = task.id;
        self.tasks.push(task);
        Ok(id)
    }

    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<(), StoreError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound { collection: "task", id })?;
        task.apply(patch);
        Ok(())
    }

    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.iter().find(|t| t.id == id).cloned())
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.clone())
    }

    fn insert_link(&mut self, link: NewLink) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.links.push(link.into_link(id));
        Ok(id)
    }

    fn update_link_title(
        &mut self,
        id: Uuid,
        title: &str,
        source: TitleSource,
    ) -> Result<(), StoreError> {
        let link = self
            .links
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(StoreError::NotFound { collection: "link", id })?;
        link.title = title.to_string();
        link.title_source = source;
        Ok(())
    }

    fn links_by_url(&self, url: &str) -> Result<Vec<Link>, StoreError> {
        Ok(self.links.iter().filter(|l| l.url == url).cloned().collect())
    }

    fn links(&self) -> Result<Vec<Link>, StoreError> {
        Ok(self.links.clone())
    }
}
