use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::migrate::migrate;
use super::{Collections, RecordStore, StoreError};
use crate::core::link::{Link, NewLink, TitleSource};
use crate::core::task::{Task, TaskPatch};

/// Store kept in a single JSON file, rewritten after every mutation.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    data: Collections,
}

impl JsonStore {
    /// Open (or start) the store at `path`, upgrading an older file in place.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if !path.exists() {
            log::info!("Starting new store at {}", path.display());
            return Ok(Self {
                path,
                data: Collections::new(),
            });
        }

        let raw = std::fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        let mut doc: serde_json::Value = serde_json::from_str(&raw)?;
        let migrated = migrate(&mut doc);
        let data: Collections = serde_json::from_value(doc)?;

        let store = Self { path, data };
        if migrated {
            store.save()?;
        }
        log::debug!(
            "Opened store {} ({} tasks, {} links)",
            store.path.display(),
            store.data.tasks.len(),
            store.data.links.len()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the whole file via a temp file and rename.
    pub fn save(&self) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&self.data)?;
        std::fs::write(&tmp, body).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl RecordStore for JsonStore {
    fn insert_task(&mut self, task: Task) -> Result<Uuid, StoreError> {
        let id = self.data.insert_task(task)?;
        self.save()?;
        Ok(id)
    }

    fn update_task(&mut self, id: Uuid, patch: TaskPatch) -> Result<(), StoreError> {
        self.data.update_task(id, patch)?;
        self.save()
    }

    fn task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.data.task(id)
    }

    fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.data.tasks()
    }

    fn insert_link(&mut self, link: NewLink) -> Result<Uuid, StoreError> {
        let id = self.data.insert_link(link)?;
        self.save()?;
        Ok(id)
    }

    fn update_link_title(
        &mut self,
        id: Uuid,
        title: &str,
        source: TitleSource,
    ) -> Result<(), StoreError> {
        self.data.update_link_title(id, title, source)?;
        self.save()
    }

    fn links_by_url(&self, url: &str) -> Result<Vec<Link>, StoreError> {
        self.data.links_by_url(url)
    }

    fn links(&self) -> Result<Vec<Link>, StoreError> {
        self.data.links()
    }
}
