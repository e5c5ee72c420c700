//! Reconciliation of AI-proposed rewrites against existing state.
//!
//! The model proposes, the engine disposes: ids and task titles are forced
//! back to their originals, status only changes when the operator asked for
//! it, and subtasks already marked done are restored verbatim when the model
//! drops or edits them.

use crate::ai::extract::{ProposedSubtask, ProposedTask, require_task_fields};
use crate::error::EngineResult;
use crate::types::{Subtask, Task, TaskStatus, parse_priority};
use std::collections::HashSet;

/// Whether the operator's instruction text explicitly mentions status.
///
/// Case-insensitive substring match, the same shape of documented
/// approximation as the overload heuristic.
pub fn instruction_mentions_status(instruction: &str) -> bool {
    instruction.to_lowercase().contains("status")
}

/// Convert a proposed subtask, assigning `fallback_id` when the model did
/// not echo one.
fn subtask_from_proposed(proposed: ProposedSubtask, fallback_id: u64) -> Subtask {
    Subtask {
        id: proposed.id.unwrap_or(fallback_id),
        title: proposed.title.unwrap_or_default(),
        description: proposed.description.unwrap_or_default(),
        details: proposed.details.unwrap_or_default(),
        status: proposed
            .status
            .as_deref()
            .and_then(TaskStatus::from_str)
            .unwrap_or_default(),
        dependencies: proposed.dependencies,
    }
}

fn convert_subtasks(proposed: Vec<ProposedSubtask>) -> Vec<Subtask> {
    let mut converted: Vec<Subtask> = Vec::with_capacity(proposed.len());
    for item in proposed {
        let fallback = converted.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        converted.push(subtask_from_proposed(item, fallback));
    }
    converted
}

fn subtask_content_differs(a: &Subtask, b: &Subtask) -> bool {
    a.title != b.title || a.description != b.description || a.details != b.details || a.status != b.status
}

/// Restore locked (done/completed) subtasks the model dropped or edited,
/// then deduplicate by id keeping the first occurrence.
fn protect_locked_subtasks(existing: &Task, mut merged: Vec<Subtask>) -> Vec<Subtask> {
    for (index, original) in existing.subtasks.iter().enumerate() {
        if !original.status.is_locked() {
            continue;
        }
        match merged.iter_mut().find(|s| s.id == original.id) {
            Some(proposed) => {
                if subtask_content_differs(proposed, original) {
                    // AI edits to locked subtasks are discarded, not merged.
                    *proposed = original.clone();
                }
            }
            None => {
                let at = index.min(merged.len());
                merged.insert(at, original.clone());
            }
        }
    }

    let mut seen: HashSet<u64> = HashSet::new();
    merged.retain(|s| seen.insert(s.id));
    merged
}

/// Merge a proposed rewrite into an existing task.
///
/// Fails closed (no write) when the proposal lacks a title or description.
pub fn reconcile_task(
    existing: &Task,
    proposed: ProposedTask,
    instruction: &str,
) -> EngineResult<Task> {
    require_task_fields(&proposed)?;

    let status = if instruction_mentions_status(instruction) {
        proposed
            .status
            .as_deref()
            .and_then(TaskStatus::from_str)
            .unwrap_or(existing.status)
    } else {
        existing.status
    };

    let merged_subtasks = protect_locked_subtasks(existing, convert_subtasks(proposed.subtasks));

    Ok(Task {
        // Id is always forced back to the original, whatever the model sent.
        id: existing.id,
        // Task titles are never replaced on update; the template asks the
        // model to keep them, the engine enforces it.
        title: existing.title.clone(),
        description: proposed.description.unwrap_or_else(|| existing.description.clone()),
        details: proposed.details.unwrap_or_else(|| existing.details.clone()),
        test_strategy: proposed
            .test_strategy
            .unwrap_or_else(|| existing.test_strategy.clone()),
        status,
        priority: proposed
            .priority
            .as_deref()
            .map(parse_priority)
            .unwrap_or(existing.priority),
        dependencies: proposed.dependencies,
        subtasks: merged_subtasks,
    })
}

/// Outcome of a batch reconciliation pass.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub tasks: Vec<Task>,
    /// Task ids the model echoed back and that were merged.
    pub updated_ids: Vec<u64>,
    /// Proposals that named no existing task and were ignored.
    pub unmatched: usize,
}

/// Merge a multi-task proposal. Tasks the model did not echo back are left
/// untouched: partial AI responses never blank out the rest of the graph.
/// Any matched proposal failing validation fails the whole batch before any
/// write.
pub fn reconcile_batch(
    existing: &[Task],
    proposals: Vec<ProposedTask>,
    instruction: &str,
) -> EngineResult<BatchOutcome> {
    let mut tasks: Vec<Task> = existing.to_vec();
    let mut updated_ids = Vec::new();
    let mut unmatched = 0;

    for proposal in proposals {
        let Some(id) = proposal.id else {
            unmatched += 1;
            continue;
        };
        let Some(slot) = tasks.iter_mut().find(|t| t.id == id) else {
            unmatched += 1;
            continue;
        };
        let merged = reconcile_task(slot, proposal, instruction)?;
        *slot = merged;
        updated_ids.push(id);
    }

    Ok(BatchOutcome {
        tasks,
        updated_ids,
        unmatched,
    })
}
