//! One-time upgrade of older store files to the current schema.
//!
//! Runs on the raw JSON before it is typed, so the rest of the crate only ever
//! sees the current shape: a `links` array on every task, string ids, and
//! local timestamps. Running it twice is a no-op.

use chrono::{DateTime, Local};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use super::SCHEMA_VERSION;
use crate::core::link::domain_of;
use crate::parse::urls::{find_urls, parse_url};

const TASK_DATE_FIELDS: [&str; 3] = ["createdAt", "completedAt", "dueDate"];

/// Upgrade `doc` in place. Returns whether anything changed.
pub fn migrate(doc: &mut Value) -> bool {
    let Some(root) = doc.as_object_mut() else {
        return false;
    };
    let version = root.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version >= SCHEMA_VERSION {
        return false;
    }

    if let Some(tasks) = root.get_mut("tasks").and_then(Value::as_array_mut) {
        for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
            migrate_task(task);
        }
    }
    if let Some(links) = root.get_mut("links").and_then(Value::as_array_mut) {
        for link in links.iter_mut().filter_map(Value::as_object_mut) {
            migrate_link(link);
        }
        collapse_link_rows(links);
    }
    root.insert("version".into(), json!(SCHEMA_VERSION));
    log::info!("Migrated store from schema v{} to v{}", version, SCHEMA_VERSION);
    true
}

fn migrate_task(task: &mut Map<String, Value>) {
    lift_id(task, "id", "task");
    lift_links(task);
    for field in TASK_DATE_FIELDS {
        lift_timestamp(task, field);
    }
    for (field, default) in [
        ("isStale", json!(false)),
        ("isFocus", json!(false)),
        ("description", json!("")),
        ("notes", json!("")),
        ("images", json!([])),
        ("subTasks", json!([])),
    ] {
        if task.get(field).is_none_or(Value::is_null) {
            task.insert(field.into(), default);
        }
    }
}

fn migrate_link(link: &mut Map<String, Value>) {
    lift_id(link, "id", "link");
    lift_id(link, "sourceTaskId", "task");
    lift_timestamp(link, "createdAt");
    if link.get("titleSource").is_none_or(Value::is_null) {
        link.insert("titleSource".into(), json!("domain"));
    }
    if let Some(url) = link.get("url").and_then(Value::as_str).and_then(canonical_url) {
        link.insert("domain".into(), json!(domain_of(&url)));
        link.insert("url".into(), json!(url.as_str()));
    }
}

/// Old rows hold the raw matched text; read it the way the link scanner does.
fn canonical_url(raw: &str) -> Option<url::Url> {
    match find_urls(raw).into_iter().next() {
        Some(found) => Some(found.url),
        None => parse_url(raw),
    }
}

fn title_rank(link: &Value) -> u8 {
    match link.get("titleSource").and_then(Value::as_str) {
        Some("fetched") => 2,
        Some("pattern") => 1,
        _ => 0,
    }
}

/// Keep one row per (url, sourceTaskId), the one with the most trusted title.
fn collapse_link_rows(links: &mut Vec<Value>) {
    let mut kept: Vec<Value> = Vec::with_capacity(links.len());
    for link in links.drain(..) {
        let key = |v: &Value| (v.get("url").cloned(), v.get("sourceTaskId").cloned());
        match kept.iter_mut().find(|k| key(&**k) == key(&link)) {
            Some(existing) if title_rank(&link) > title_rank(existing) => *existing = link,
            Some(_) => {}
            None => kept.push(link),
        }
    }
    *links = kept;
}

/// Fold the singular `externalLink` and the interim `externalLinks` into `links`.
fn lift_links(task: &mut Map<String, Value>) {
    let mut links: Vec<Value> = match task.remove("links") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    if let Some(Value::Array(items)) = task.remove("externalLinks") {
        links.extend(items);
    }
    if let Some(Value::String(single)) = task.remove("externalLink") {
        if !single.trim().is_empty() {
            links.push(Value::String(single));
        }
    }

    for link in links.iter_mut() {
        if let Some(url) = link.as_str().and_then(canonical_url) {
            *link = json!(url.as_str());
        }
    }

    let mut seen = Vec::new();
    links.retain(|v| match v.as_str() {
        Some(s) if !seen.contains(&s.to_string()) => {
            seen.push(s.to_string());
            true
        }
        _ => false,
    });
    task.insert("links".into(), Value::Array(links));
}

/// Replace auto-increment ids with stable UUIDs so cross-references survive.
fn lift_id(record: &mut Map<String, Value>, field: &str, kind: &str) {
    match record.get(field) {
        Some(Value::Number(n)) => {
            let id = legacy_uuid(kind, &n.to_string());
            record.insert(field.into(), json!(id));
        }
        None | Some(Value::Null) if field == "id" => {
            record.insert(field.into(), json!(Uuid::new_v4()));
        }
        _ => {}
    }
}

/// Deterministic UUID for a numeric id from the old auto-increment schema.
pub fn legacy_uuid(kind: &str, id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("vivi:{}:{}", kind, id).as_bytes())
}

/// Timestamps with an offset (`...Z`) become local wall-clock time.
fn lift_timestamp(record: &mut Map<String, Value>, field: &str) {
    let Some(Value::String(raw)) = record.get(field) else {
        return;
    };
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        let local = at.with_timezone(&Local).naive_local();
        record.insert(field.into(), json!(local));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::link::TitleSource;
    use crate::store::Collections;

    fn legacy_doc() -> Value {
        json!({
            "tasks": [
                {
                    "id": 7,
                    "title": "Review spec",
                    "status": "todo",
                    "priority": "high",
                    "externalLink": "https://docs.google.com/document/d/abc123xyz",
                    "createdAt": "2026-02-01T10:00:00",
                    "isFocus": false
                },
                {
                    "id": 8,
                    "title": "Handoff",
                    "status": "completed",
                    "priority": "medium",
                    "externalLinks": ["https://a.com/x", "https://a.com/x"],
                    "createdAt": "2026-02-02T10:00:00",
                    "completedAt": "2026-02-03T10:00:00"
                }
            ],
            "links": [
                {
                    "id": 1,
                    "url": "https://docs.google.com/document/d/abc123xyz",
                    "title": "Google Doc",
                    "domain": "docs.google.com",
                    "sourceTaskId": 7,
                    "createdAt": "2026-02-01T10:00:00"
                }
            ]
        })
    }

    #[test]
    fn lifts_legacy_rows() {
        let mut doc = legacy_doc();
        assert!(migrate(&mut doc));

        let data: Collections = serde_json::from_value(doc).unwrap();
        assert_eq!(data.version, SCHEMA_VERSION);
        assert_eq!(
            data.tasks[0].links,
            ["https://docs.google.com/document/d/abc123xyz"]
        );
        assert_eq!(data.tasks[1].links, ["https://a.com/x"]);
        assert!(!data.tasks[0].is_stale);

        let link = &data.links[0];
        assert_eq!(link.title_source, TitleSource::Domain);
        assert_eq!(link.source_task_id, Some(data.tasks[0].id));
        assert_eq!(data.tasks[0].id, legacy_uuid("task", "7"));
    }

    #[test]
    fn legacy_urls_become_canonical() {
        let mut doc = json!({
            "tasks": [
                {"id": 1, "title": "See https://example.com", "status": "todo",
                 "priority": "medium", "externalLink": "www.example.com/notes.",
                 "createdAt": "2026-02-01T10:00:00"}
            ],
            "links": [
                {"id": 1, "url": "https://example.com", "title": "Example.com",
                 "domain": "example.com", "sourceTaskId": 1, "createdAt": "2026-02-01T10:00:00"},
                {"id": 2, "url": "https://example.com/", "title": "Example Domain",
                 "titleSource": "fetched", "domain": "example.com", "sourceTaskId": 1,
                 "createdAt": "2026-02-01T10:00:00"},
                {"id": 3, "url": "https://WWW.Example.com/notes).", "title": "Notes",
                 "domain": "WWW.Example.com", "createdAt": "2026-02-01T10:00:00"}
            ]
        });
        migrate(&mut doc);

        let data: Collections = serde_json::from_value(doc).unwrap();
        assert_eq!(data.tasks[0].links, ["https://www.example.com/notes"]);
        assert_eq!(data.links.len(), 2);
        assert_eq!(data.links[0].url, "https://example.com/");
        assert_eq!(data.links[0].title, "Example Domain");
        assert_eq!(data.links[0].title_source, TitleSource::Fetched);
        assert_eq!(data.links[1].url, "https://www.example.com/notes");
        assert_eq!(data.links[1].domain, "example.com");
    }

    #[tokio::test]
    async fn rescan_after_migration_adds_nothing() {
        use crate::links::stub::StubFetcher;
        use crate::links::{LinkRegistry, TitleResolver};
        use crate::store::{MemoryStore, RecordStore};
        use std::time::Duration;

        let mut doc = json!({
            "tasks": [
                {"id": 1, "title": "See https://example.com", "status": "todo",
                 "priority": "medium", "createdAt": "2026-02-01T10:00:00"}
            ],
            "links": [
                {"id": 1, "url": "https://example.com", "title": "Example.com",
                 "domain": "example.com", "sourceTaskId": 1, "createdAt": "2026-02-01T10:00:00"}
            ]
        });
        migrate(&mut doc);
        let mut store = MemoryStore::from(serde_json::from_value::<Collections>(doc).unwrap());

        let registry = LinkRegistry::new(TitleResolver::new(StubFetcher::new(), Duration::from_secs(1)));
        let summary = registry.scan_tasks(&mut store).await.unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.reused, 0);
        assert_eq!(store.links().unwrap().len(), 1);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut doc = legacy_doc();
        migrate(&mut doc);
        let once = doc.clone();
        assert!(!migrate(&mut doc));
        assert_eq!(doc, once);
    }

    #[test]
    fn current_documents_are_untouched() {
        let mut doc = serde_json::to_value(Collections::new()).unwrap();
        let before = doc.clone();
        assert!(!migrate(&mut doc));
        assert_eq!(doc, before);
    }
}
