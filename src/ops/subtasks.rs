//! Subtask creation, including demotion of standalone tasks.

use super::OpContext;
use crate::error::{EngineError, EngineResult};
use crate::graph;
use crate::types::{Subtask, TaskStatus};
use serde::Serialize;

/// Arguments for subtask creation. Either `existing_task_id` (demote a
/// standalone task) or `title` + `description` (create fresh).
#[derive(Debug, Clone, Default)]
pub struct AddSubtaskArgs {
    pub existing_task_id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub dependencies: Vec<u64>,
}

/// Result of a subtask creation.
#[derive(Debug, Clone, Serialize)]
pub struct AddSubtaskResult {
    pub parent_id: u64,
    pub subtask_id: u64,
}

/// Add a subtask under `parent_id`, either freshly or by demoting an
/// existing standalone task.
///
/// Demotion is rejected when it would create a cycle: a task cannot become a
/// subtask of something that transitively depends on it (or vice versa).
pub fn add_subtask(
    ctx: &OpContext,
    parent_id: u64,
    args: AddSubtaskArgs,
) -> EngineResult<AddSubtaskResult> {
    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();

    store.task(&tag, parent_id)?;

    let subtask_id = match args.existing_task_id {
        Some(task_id) => demote_task(ctx, &mut store, &tag, parent_id, task_id)?,
        None => {
            let title = args
                .title
                .clone()
                .ok_or_else(|| EngineError::missing_field("title"))?;
            let description = args
                .description
                .clone()
                .ok_or_else(|| EngineError::missing_field("description"))?;

            let tasks = store.tasks_mut(&tag)?;
            let task_ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
            let parent = tasks
                .iter_mut()
                .find(|t| t.id == parent_id)
                .ok_or_else(|| EngineError::task_not_found(parent_id))?;

            // Dependencies must name a sibling subtask or an existing task.
            let mut dependencies = Vec::new();
            for dep in args.dependencies {
                let is_sibling = parent.subtasks.iter().any(|s| s.id == dep);
                if is_sibling || task_ids.contains(&dep) {
                    dependencies.push(dep);
                } else {
                    ctx.logger
                        .warn(&format!("dropping unknown dependency {}", dep));
                }
            }

            let id = parent.next_subtask_id();
            parent.subtasks.push(Subtask {
                id,
                title,
                description,
                details: args.details.unwrap_or_default(),
                status: TaskStatus::Pending,
                dependencies,
            });
            id
        }
    };

    store.save()?;
    ctx.logger.success(&format!(
        "added subtask {}.{}",
        parent_id, subtask_id
    ));

    Ok(AddSubtaskResult {
        parent_id,
        subtask_id,
    })
}

/// Convert a standalone task into a subtask of `parent_id`.
fn demote_task(
    ctx: &OpContext,
    store: &mut crate::store::TaskStore,
    tag: &str,
    parent_id: u64,
    task_id: u64,
) -> EngineResult<u64> {
    if task_id == parent_id {
        return Err(EngineError::dependency_cycle(
            &task_id.to_string(),
            &parent_id.to_string(),
        ));
    }

    let tasks = store.tasks(tag)?;
    let task = tasks
        .iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| EngineError::task_not_found(task_id))?;

    if !task.subtasks.is_empty() {
        return Err(EngineError::invalid_value(
            "id",
            "cannot convert a task that has subtasks of its own",
        ));
    }

    // Either direction of transitive dependency between the two tasks would
    // close a loop once the containment link exists.
    if graph::is_dependent_on(tasks, parent_id, task_id)
        || graph::is_dependent_on(tasks, task_id, parent_id)
    {
        return Err(EngineError::dependency_cycle(
            &task_id.to_string(),
            &parent_id.to_string(),
        ));
    }

    let tasks = store.tasks_mut(tag)?;
    let position = tasks
        .iter()
        .position(|t| t.id == task_id)
        .ok_or_else(|| EngineError::task_not_found(task_id))?;
    let task = tasks.remove(position);

    // References to the demoted task are pruned like any other removal.
    graph::prune_task_references(tasks, task_id);

    let remaining_ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
    let parent = tasks
        .iter_mut()
        .find(|t| t.id == parent_id)
        .ok_or_else(|| EngineError::task_not_found(parent_id))?;

    let id = parent.next_subtask_id();
    let dependencies: Vec<u64> = task
        .dependencies
        .into_iter()
        .filter(|dep| remaining_ids.contains(dep))
        .collect();
    parent.subtasks.push(Subtask {
        id,
        title: task.title,
        description: task.description,
        details: task.details,
        status: task.status,
        dependencies,
    });

    ctx.logger
        .debug(&format!("demoted task {} under task {}", task_id, parent_id));
    Ok(id)
}
