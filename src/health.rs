//! Stale-task check. A todo that has sat untouched for too long gets flagged
//! so it can be parked in someday.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::core::task::{Task, TaskPatch, TaskStatus};
use crate::store::{RecordStore, StoreError};

pub const DEFAULT_STALE_AFTER_DAYS: i64 = 14;

/// Only todo tasks go stale; age is counted in whole days since creation.
pub fn is_stale(task: &Task, now: NaiveDateTime, stale_after_days: i64) -> bool {
    task.status == TaskStatus::Todo && (now - task.created_at).num_days() > stale_after_days
}

/// Recompute `is_stale` for every todo task, writing only the ones that changed.
/// Returns how many tasks were updated.
pub fn check_task_health<S: RecordStore>(
    store: &mut S,
    now: NaiveDateTime,
    stale_after_days: i64,
) -> Result<usize, StoreError> {
    let mut changed = 0;
    for task in store.tasks_with_status(&[TaskStatus::Todo])? {
        let stale = is_stale(&task, now, stale_after_days);
        if task.is_stale != stale {
            store.update_task(task.id, TaskPatch::stale(stale))?;
            changed += 1;
        }
    }
    if changed > 0 {
        log::info!("Task health: {} tasks changed stale state", changed);
    }
    Ok(changed)
}

pub fn stale_tasks<S: RecordStore>(store: &S) -> Result<Vec<Task>, StoreError> {
    Ok(store
        .tasks_with_status(&[TaskStatus::Todo])?
        .into_iter()
        .filter(|t| t.is_stale)
        .collect())
}

pub fn move_to_someday<S: RecordStore>(store: &mut S, id: Uuid) -> Result<(), StoreError> {
    store.update_task(id, TaskPatch::someday())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, month, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn threshold_is_exclusive() {
        let task = Task::new("Old", at(3, 1));
        assert!(!is_stale(&task, at(3, 15), 14));
        assert!(is_stale(&task, at(3, 16), 14));

        let mut done = task.clone();
        done.complete(at(3, 2));
        assert!(!is_stale(&done, at(6, 1), 14));
    }

    #[test]
    fn check_flags_and_unflags() {
        let mut store = MemoryStore::new();
        let old = store.insert_task(Task::new("Old", at(1, 1))).unwrap();
        let fresh = store.insert_task(Task::new("Fresh", at(3, 1))).unwrap();
        let mut parked = Task::new("Parked", at(1, 1));
        parked.move_to_someday();
        store.insert_task(parked).unwrap();

        assert_eq!(check_task_health(&mut store, at(3, 4), 14).unwrap(), 1);
        assert_eq!(check_task_health(&mut store, at(3, 4), 14).unwrap(), 0);
        let stale: Vec<Uuid> = stale_tasks(&store).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(stale, [old]);
        assert!(!store.task(fresh).unwrap().unwrap().is_stale);

        // A wider threshold clears the flag again
        assert_eq!(check_task_health(&mut store, at(3, 4), 90).unwrap(), 1);
        assert!(stale_tasks(&store).unwrap().is_empty());
    }

    #[test]
    fn someday_clears_focus() {
        let mut store = MemoryStore::new();
        let mut task = Task::new("Focus", at(1, 1));
        task.is_focus = true;
        let id = store.insert_task(task).unwrap();

        move_to_someday(&mut store, id).unwrap();
        let task = store.task(id).unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Someday);
        assert!(!task.is_focus);
        assert!(stale_tasks(&store).unwrap().is_empty());
        assert!(matches!(
            move_to_someday(&mut store, Uuid::new_v4()),
            Err(StoreError::NotFound { .. })
        ));
    }
}
