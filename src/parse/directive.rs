use chrono::NaiveDateTime;

use super::Draft;
use crate::core::task::TaskStatus;

/// Leading marker for logging work that is already done.
pub const DID_MARKER: &str = "/did ";

/// Strip a leading `/did ` marker and mark the draft completed as of `now`.
pub fn extract(mut draft: Draft, now: NaiveDateTime) -> Draft {
    if let Some(rest) = draft.text.trim_start().strip_prefix(DID_MARKER) {
        draft.text = rest.trim().to_string();
        draft.fields.status = TaskStatus::Completed;
        draft.fields.completed_at = Some(now);
    }
    draft
}
