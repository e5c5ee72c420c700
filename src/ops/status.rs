//! Status transitions for tasks and subtasks.

use super::{EntityId, OpContext, parse_entity_id};
use crate::error::{EngineError, EngineResult};
use crate::types::TaskStatus;
use serde::Serialize;

/// Result of a status change.
#[derive(Debug, Clone, Serialize)]
pub struct SetStatusResult {
    pub updated: Vec<String>,
}

/// Set the status of one or more tasks/subtasks.
///
/// Marking a parent done cascades the same status to every subtask. The
/// reverse direction is only suggested: completing the last open subtask
/// logs a hint, it never auto-completes the parent.
pub fn set_status(ctx: &OpContext, ids: &[String], status_raw: &str) -> EngineResult<SetStatusResult> {
    if ids.is_empty() {
        return Err(EngineError::missing_field("id"));
    }
    let status = TaskStatus::from_str(status_raw)
        .ok_or_else(|| EngineError::invalid_value("status", &format!("unknown status: {}", status_raw)))?;

    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();
    let mut updated = Vec::new();

    for raw in ids {
        match parse_entity_id(raw)? {
            EntityId::Task(task_id) => {
                let task = store.task_mut(&tag, task_id)?;
                task.status = status;
                if status.is_locked() {
                    // A completed parent implies completed children.
                    for subtask in task.subtasks.iter_mut() {
                        subtask.status = status;
                    }
                }
                updated.push(raw.clone());
            }
            EntityId::Subtask(parent_id, subtask_id) => {
                let parent = store.task_mut(&tag, parent_id)?;
                let subtask = parent
                    .subtask_mut(subtask_id)
                    .ok_or_else(|| EngineError::subtask_not_found(parent_id, subtask_id))?;
                subtask.status = status;
                updated.push(raw.clone());

                let all_done = !parent.subtasks.is_empty()
                    && parent.subtasks.iter().all(|s| s.status.is_locked());
                if all_done && !parent.status.is_locked() {
                    ctx.logger.info(&format!(
                        "all subtasks of task {} are done; consider marking the task done as well",
                        parent_id
                    ));
                }
            }
        }
    }

    store.save()?;
    ctx.logger.success(&format!(
        "set status of {} item(s) to {}",
        updated.len(),
        status.as_str()
    ));

    Ok(SetStatusResult { updated })
}
