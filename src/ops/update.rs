//! AI-driven rewrites of existing tasks and subtasks.
//!
//! All model output passes through the reconciliation engine before anything
//! is written; a rejected payload leaves the document untouched.

use super::OpContext;
use crate::ai::extract::{DetailAppendPayload, ProposedTask, decode};
use crate::ai::orchestrator::GenerationParams;
use crate::error::{EngineError, EngineResult};
use crate::prompts;
use crate::reconcile::{reconcile_batch, reconcile_task};
use crate::types::Task;
use serde::Serialize;

/// Result of a single-task update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTaskResult {
    pub task_id: u64,
    pub title: String,
}

/// Result of a multi-task update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateTasksResult {
    pub updated_ids: Vec<u64>,
    pub considered: usize,
}

/// Rewrite one task according to the operator's instruction.
pub async fn update_task(
    ctx: &OpContext,
    task_id: u64,
    instruction: &str,
    research: bool,
) -> EngineResult<UpdateTaskResult> {
    if instruction.trim().is_empty() {
        return Err(EngineError::missing_field("prompt"));
    }

    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();
    let existing = store.task(&tag, task_id)?.clone();

    let params = GenerationParams {
        system: prompts::update_task_system(),
        prompt: prompts::update_task_prompt(&existing, instruction),
        research,
    };
    let raw = ctx.generate(&params).await?;
    let proposed: ProposedTask = decode(&raw)?;

    let merged = reconcile_task(&existing, proposed, instruction)?;
    let title = merged.title.clone();
    *store.task_mut(&tag, task_id)? = merged;

    store.save()?;
    ctx.logger.success(&format!("updated task {}", task_id));

    Ok(UpdateTaskResult { task_id, title })
}

/// Rewrite every unlocked task from `from_id` onward in one model call.
pub async fn update_tasks(
    ctx: &OpContext,
    from_id: u64,
    instruction: &str,
    research: bool,
) -> EngineResult<UpdateTasksResult> {
    if instruction.trim().is_empty() {
        return Err(EngineError::missing_field("prompt"));
    }

    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();

    let candidates: Vec<Task> = store
        .tasks(&tag)?
        .iter()
        .filter(|t| t.id >= from_id && !t.status.is_locked())
        .cloned()
        .collect();
    if candidates.is_empty() {
        return Err(EngineError::task_not_found(from_id));
    }

    let params = GenerationParams {
        system: prompts::update_tasks_system(),
        prompt: prompts::update_tasks_prompt(&candidates, instruction),
        research,
    };
    let raw = ctx.generate(&params).await?;
    let proposals: Vec<ProposedTask> = decode(&raw)?;

    // Merge against the candidate set only; everything else in the tag is
    // untouched by construction.
    let outcome = reconcile_batch(&candidates, proposals, instruction)?;
    if outcome.unmatched > 0 {
        ctx.logger.warn(&format!(
            "{} proposal(s) named no candidate task and were ignored",
            outcome.unmatched
        ));
    }

    for merged in outcome.tasks {
        let id = merged.id;
        *store.task_mut(&tag, id)? = merged;
    }

    store.save()?;
    ctx.logger.success(&format!(
        "updated {} task(s) from id {} onward",
        outcome.updated_ids.len(),
        from_id
    ));

    Ok(UpdateTasksResult {
        updated_ids: outcome.updated_ids,
        considered: candidates.len(),
    })
}

/// Append AI-cleaned progress notes to a subtask's details.
///
/// The operator targets the subtask explicitly, so the locked-state
/// protection does not apply here.
pub async fn update_subtask(
    ctx: &OpContext,
    parent_id: u64,
    subtask_id: u64,
    instruction: &str,
    research: bool,
) -> EngineResult<UpdateTaskResult> {
    if instruction.trim().is_empty() {
        return Err(EngineError::missing_field("prompt"));
    }

    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();

    let parent = store.task(&tag, parent_id)?.clone();
    let subtask = parent
        .subtask(subtask_id)
        .ok_or_else(|| EngineError::subtask_not_found(parent_id, subtask_id))?
        .clone();

    let params = GenerationParams {
        system: prompts::update_subtask_system(),
        prompt: prompts::update_subtask_prompt(&parent, &subtask, instruction),
        research,
    };
    let raw = ctx.generate(&params).await?;
    let payload: DetailAppendPayload = decode(&raw)?;
    if payload.details.trim().is_empty() {
        return Err(EngineError::reconciliation(
            "model returned no detail text to append",
        ));
    }

    let stamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    let slot = store
        .task_mut(&tag, parent_id)?
        .subtask_mut(subtask_id)
        .ok_or_else(|| EngineError::subtask_not_found(parent_id, subtask_id))?;
    if !slot.details.is_empty() {
        slot.details.push_str("\n\n");
    }
    slot.details
        .push_str(&format!("[{}]\n{}", stamp, payload.details.trim()));
    let title = slot.title.clone();

    store.save()?;
    ctx.logger
        .success(&format!("updated subtask {}.{}", parent_id, subtask_id));

    Ok(UpdateTaskResult {
        task_id: parent_id,
        title,
    })
}
