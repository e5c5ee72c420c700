//! Task and subtask removal with referential-integrity cleanup.

use super::{EntityId, OpContext, parse_entity_id};
use crate::error::{EngineError, EngineResult};
use crate::graph;
use crate::types::{Task, next_task_id};
use serde::Serialize;

/// Per-id failure inside a batch removal.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveError {
    pub id: String,
    pub message: String,
}

/// Aggregate result of a (possibly multi-id) removal.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveResult {
    pub removed: Vec<String>,
    pub errors: Vec<RemoveError>,
}

/// Remove tasks and/or subtasks by id. Failures are isolated per id; the
/// rest of the batch still runs, and the document is written once at the
/// end.
pub fn remove_tasks(ctx: &OpContext, ids: &[String]) -> EngineResult<RemoveResult> {
    if ids.is_empty() {
        return Err(EngineError::missing_field("id"));
    }

    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();

    let mut removed = Vec::new();
    let mut errors = Vec::new();

    for raw in ids {
        let outcome = (|| -> EngineResult<()> {
            match parse_entity_id(raw)? {
                EntityId::Task(task_id) => {
                    let tasks = store.tasks_mut(&tag)?;
                    let before = tasks.len();
                    tasks.retain(|t| t.id != task_id);
                    if tasks.len() == before {
                        return Err(EngineError::task_not_found(task_id));
                    }
                    // Every remaining dependency list referencing the removed
                    // id is pruned, never left dangling.
                    graph::prune_task_references(tasks, task_id);
                    Ok(())
                }
                EntityId::Subtask(parent_id, subtask_id) => {
                    let tasks = store.tasks_mut(&tag)?;
                    let parent = tasks
                        .iter_mut()
                        .find(|t| t.id == parent_id)
                        .ok_or_else(|| EngineError::task_not_found(parent_id))?;
                    let before = parent.subtasks.len();
                    parent.subtasks.retain(|s| s.id != subtask_id);
                    if parent.subtasks.len() == before {
                        return Err(EngineError::subtask_not_found(parent_id, subtask_id));
                    }
                    graph::prune_subtask_references(tasks, parent_id, subtask_id);
                    Ok(())
                }
            }
        })();

        match outcome {
            Ok(()) => removed.push(raw.clone()),
            Err(e) => {
                ctx.logger.error(&format!("failed to remove {}: {}", raw, e));
                errors.push(RemoveError {
                    id: raw.clone(),
                    message: e.message,
                });
            }
        }
    }

    if !removed.is_empty() {
        store.save()?;
        ctx.logger
            .success(&format!("removed {} item(s)", removed.len()));
    }

    Ok(RemoveResult { removed, errors })
}

/// Result of a subtask removal.
#[derive(Debug, Clone, Serialize)]
pub struct RemoveSubtaskResult {
    /// Id of the standalone task the subtask was promoted to, if any.
    pub promoted_to: Option<u64>,
}

/// Remove one subtask, optionally promoting it to a standalone task.
///
/// A promoted subtask inherits the parent's priority and gains the parent as
/// an explicit dependency, so it stays ordered after the work it came from.
pub fn remove_subtask(
    ctx: &OpContext,
    parent_id: u64,
    subtask_id: u64,
    promote: bool,
) -> EngineResult<RemoveSubtaskResult> {
    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();

    let tasks = store.tasks_mut(&tag)?;
    let parent = tasks
        .iter_mut()
        .find(|t| t.id == parent_id)
        .ok_or_else(|| EngineError::task_not_found(parent_id))?;
    let parent_priority = parent.priority;

    let position = parent
        .subtasks
        .iter()
        .position(|s| s.id == subtask_id)
        .ok_or_else(|| EngineError::subtask_not_found(parent_id, subtask_id))?;
    let subtask = parent.subtasks.remove(position);

    graph::prune_subtask_references(tasks, parent_id, subtask_id);

    let promoted_to = if promote {
        let new_id = next_task_id(tasks);
        // Sibling references cannot survive promotion; only dependencies
        // resolving to real tasks are carried over.
        let mut dependencies: Vec<u64> = subtask
            .dependencies
            .iter()
            .copied()
            .filter(|dep| tasks.iter().any(|t| t.id == *dep))
            .collect();
        if !dependencies.contains(&parent_id) {
            dependencies.push(parent_id);
        }
        tasks.push(Task {
            id: new_id,
            title: subtask.title,
            description: subtask.description,
            details: subtask.details,
            test_strategy: String::new(),
            status: subtask.status,
            priority: parent_priority,
            dependencies,
            subtasks: Vec::new(),
        });
        Some(new_id)
    } else {
        None
    };

    store.save()?;
    match promoted_to {
        Some(id) => ctx.logger.success(&format!(
            "promoted subtask {}.{} to task {}",
            parent_id, subtask_id, id
        )),
        None => ctx
            .logger
            .success(&format!("removed subtask {}.{}", parent_id, subtask_id)),
    }

    Ok(RemoveSubtaskResult { promoted_to })
}
