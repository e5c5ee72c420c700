//! Prompt templates for AI-backed pipelines.
//!
//! Every template pins the output contract: JSON only, no prose, ids echoed
//! back. The engine re-validates everything the model returns, so the
//! templates are a first line of defense, not the enforcement point.

use crate::types::{Subtask, Task};

fn task_json(task: &Task) -> String {
    serde_json::to_string_pretty(task).unwrap_or_else(|_| "{}".to_string())
}

/// System prompt for drafting a brand-new task from an operator request.
pub fn draft_task_system() -> String {
    "You are a senior engineer breaking a feature request into an actionable \
     development task. Respond with a single JSON object with the fields: \
     title, description, details, testStrategy, priority (high|medium|low), \
     dependencies (array of existing task ids). Respond with JSON only, no \
     surrounding prose or markdown fence."
        .to_string()
}

pub fn draft_task_prompt(request: &str, existing: &[Task]) -> String {
    let listing: Vec<String> = existing
        .iter()
        .map(|t| format!("{}: {}", t.id, t.title))
        .collect();
    format!(
        "Existing tasks:\n{}\n\nCreate one new task for this request:\n{}",
        listing.join("\n"),
        request
    )
}

/// System prompt for expanding a task into subtasks.
pub fn expand_system(count: u32) -> String {
    format!(
        "You are a senior engineer decomposing a development task into {} \
         subtasks. Respond with a single JSON object: {{\"subtasks\": [...]}} \
         where each subtask has title, description, details, and dependencies \
         (array of sibling subtask ids it depends on). Order subtasks so \
         earlier ones unblock later ones. Respond with JSON only.",
        count
    )
}

pub fn expand_prompt(task: &Task, extra_context: Option<&str>) -> String {
    let mut prompt = format!("Decompose this task:\n{}", task_json(task));
    if let Some(context) = extra_context {
        prompt.push_str("\n\nAdditional context:\n");
        prompt.push_str(context);
    }
    prompt
}

/// System prompt for rewriting a single task.
pub fn update_task_system() -> String {
    "You are maintaining a development task list. Apply the requested change \
     to the task and return the complete updated task as a single JSON \
     object with the same field names. Keep the id and title unchanged, and \
     do not modify subtasks that are already done or completed. Respond with \
     JSON only."
        .to_string()
}

pub fn update_task_prompt(task: &Task, instruction: &str) -> String {
    format!(
        "Current task:\n{}\n\nRequested change:\n{}",
        task_json(task),
        instruction
    )
}

/// System prompt for rewriting every task from a starting id onward.
pub fn update_tasks_system() -> String {
    "You are maintaining a development task list. Apply the requested change \
     to the given tasks and return a JSON array of the complete updated \
     tasks, echoing each task's id. Omit tasks that need no change. Keep ids \
     and titles unchanged, and do not modify subtasks that are already done \
     or completed. Respond with JSON only."
        .to_string()
}

pub fn update_tasks_prompt(tasks: &[Task], instruction: &str) -> String {
    let listing = serde_json::to_string_pretty(tasks).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Current tasks:\n{}\n\nRequested change:\n{}",
        listing, instruction
    )
}

/// System prompt for appending progress notes to one subtask.
pub fn update_subtask_system() -> String {
    "You are logging implementation progress on a subtask. Given the subtask \
     and the new information, respond with a single JSON object: \
     {\"details\": \"...\"} containing only the new detail text to append, \
     cleaned up and concise. Respond with JSON only."
        .to_string()
}

pub fn update_subtask_prompt(parent: &Task, subtask: &Subtask, instruction: &str) -> String {
    format!(
        "Parent task: {} ({})\nSubtask:\n{}\n\nNew information:\n{}",
        parent.id,
        parent.title,
        serde_json::to_string_pretty(subtask).unwrap_or_else(|_| "{}".to_string()),
        instruction
    )
}

/// System prompt for turning a PRD document into an initial task list.
pub fn parse_prd_system(target_count: u32) -> String {
    format!(
        "You are a technical lead turning a product requirements document \
         into roughly {} ordered development tasks. Respond with a single \
         JSON object: {{\"tasks\": [...]}} where each task has title, \
         description, details, testStrategy, priority (high|medium|low), and \
         dependencies (array of indices of earlier tasks in this list, \
         1-based). Respond with JSON only.",
        target_count
    )
}

pub fn parse_prd_prompt(prd_text: &str) -> String {
    format!("Product requirements document:\n\n{}", prd_text)
}
