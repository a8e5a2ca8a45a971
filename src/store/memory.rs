use uuid::Uuid;

use super::{Collections, RecordStore, StoreError};
use crate::core::link::{Link, NewLink, TitleSource};
use crate::core::task::{Task, TaskPatch};

/// Volatile store, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Collections,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: Collections::new(),
        }
    }

    pub fn into_collections(self) -> Collections {
        self.data
    }
}

impl From<Collections> for MemoryStore {
    fn from(data: Collections) -> Self {
        Self { data }
    }
}

impl RecordStore for MemoryStore {
    fn insert_task(&mut self, task: Task) -> Result<Uuid, StoreError> {
        self.data.insert_task(task)
    }

    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<(), StoreError> {
        self.data.update_task(id, patch)
    }

    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.data.task(id)
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.data.tasks()
    }

    fn insert_link(&mut self, link: NewLink) -> Result<Uuid, StoreError> {
        self.data.insert_link(link)
    }

    fn update_link_title(
        &mut self,
        id: Uuid,
        title: &str,
        source: TitleSource,
    ) -> Result<(), StoreError> {
        self.data.update_link_title(id, title, source)
    }

    fn links_by_url(&self, url: &str) -> Result<Vec<Link>, StoreError> {
        self.data.links_by_url(url)
    }

    fn links(&self) -> Result<Vec<Link>, StoreError> {
        self.data.links()
    }
}
