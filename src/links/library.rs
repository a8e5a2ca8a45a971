//! The link library: every catalogued link, split by whether its task is
//! still live, searchable and grouped by domain.

use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::core::link::Link;
use crate::core::task::{Task, TaskStatus};
use crate::store::{RecordStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct DomainGroup {
    pub domain: String,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkLibrary {
    /// Links with no source task, or whose task is todo or someday.
    pub active: Vec<DomainGroup>,
    /// Links whose source task is completed.
    pub archived: Vec<DomainGroup>,
}

impl LinkLibrary {
    pub fn load<S: RecordStore>(store: &S, query: &str) -> Result<Self, StoreError> {
        Ok(Self::build(store.links()?, &store.tasks()?, query))
    }

    /// Links whose source task no longer exists appear in neither section.
    pub fn build(mut links: Vec<Link>, tasks: &[Task], query: &str) -> Self {
        let status: HashMap<Uuid, TaskStatus> = tasks.iter().map(|t| (t.id, t.status)).collect();
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut active = Vec::new();
        let mut archived = Vec::new();
        for link in links {
            match link.source_task_id.map(|id| status.get(&id)) {
                None => active.push(link),
                Some(Some(s)) if s.is_done() => archived.push(link),
                Some(Some(_)) => active.push(link),
                Some(None) => {}
            }
        }

        let query = query.trim().to_lowercase();
        Self {
            active: group_by_domain(filter(dedupe(active), &query)),
            archived: group_by_domain(filter(dedupe(archived), &query)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.archived.is_empty()
    }
}

fn dedupe(links: Vec<Link>) -> Vec<Link> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|l| seen.insert(l.url.clone()))
        .collect()
}

fn filter(links: Vec<Link>, query: &str) -> Vec<Link> {
    if query.is_empty() {
        return links;
    }
    links
        .into_iter()
        .filter(|l| {
            l.url.to_lowercase().contains(query)
                || l.title.to_lowercase().contains(query)
                || l.domain.to_lowercase().contains(query)
        })
        .collect()
}

fn group_by_domain(links: Vec<Link>) -> Vec<DomainGroup> {
    let mut groups: BTreeMap<String, Vec<Link>> = BTreeMap::new();
    for link in links {
        groups.entry(link.domain.clone()).or_default().push(link);
    }
    groups
        .into_iter()
        .map(|(domain, links)| DomainGroup { domain, links })
        .collect()
}
