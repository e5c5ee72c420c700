//! Task creation: manual fields or an AI-drafted task.

use super::OpContext;
use crate::ai::extract::{ProposedTask, decode, require_task_fields};
use crate::ai::orchestrator::GenerationParams;
use crate::error::{EngineError, EngineResult};
use crate::prompts;
use crate::types::{Task, TaskStatus, next_task_id, parse_priority};
use serde::Serialize;

/// Arguments for task creation. Either `prompt` (AI draft) or `title` +
/// `description` (manual) must be supplied.
#[derive(Debug, Clone, Default)]
pub struct AddTaskArgs {
    pub prompt: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    pub test_strategy: Option<String>,
    pub priority: Option<String>,
    pub dependencies: Vec<u64>,
    pub research: bool,
}

/// Result of a task creation.
#[derive(Debug, Clone, Serialize)]
pub struct AddTaskResult {
    pub id: u64,
    pub title: String,
    /// Dependency ids that named nothing in the tag and were dropped.
    pub dropped_dependencies: Vec<u64>,
}

pub async fn add_task(ctx: &OpContext, args: AddTaskArgs) -> EngineResult<AddTaskResult> {
    let mut store = ctx.load_store()?;
    let tag = ctx.active_tag().to_string();

    let proposed = match &args.prompt {
        Some(prompt) => {
            let existing = store.tag_entry(&tag).tasks.clone();
            let params = GenerationParams {
                system: prompts::draft_task_system(),
                prompt: prompts::draft_task_prompt(prompt, &existing),
                research: args.research,
            };
            let raw = ctx.generate(&params).await?;
            let drafted: ProposedTask = decode(&raw)?;
            require_task_fields(&drafted)?;
            Some(drafted)
        }
        None => None,
    };

    let title = args
        .title
        .clone()
        .or_else(|| proposed.as_ref().and_then(|p| p.title.clone()))
        .ok_or_else(|| EngineError::missing_field("title"))?;
    let description = args
        .description
        .clone()
        .or_else(|| proposed.as_ref().and_then(|p| p.description.clone()))
        .ok_or_else(|| EngineError::missing_field("description"))?;

    let details = args
        .details
        .clone()
        .or_else(|| proposed.as_ref().and_then(|p| p.details.clone()))
        .unwrap_or_default();
    let test_strategy = args
        .test_strategy
        .clone()
        .or_else(|| proposed.as_ref().and_then(|p| p.test_strategy.clone()))
        .unwrap_or_default();
    let priority = args
        .priority
        .as_deref()
        .or_else(|| {
            proposed
                .as_ref()
                .and_then(|p| p.priority.as_deref())
        })
        .map(parse_priority)
        .unwrap_or_else(|| parse_priority(&ctx.config.defaults.priority));

    let mut requested_deps = args.dependencies.clone();
    if let Some(p) = &proposed {
        for dep in &p.dependencies {
            if !requested_deps.contains(dep) {
                requested_deps.push(*dep);
            }
        }
    }

    let tasks = &mut store.tag_entry(&tag).tasks;
    let id = next_task_id(tasks);

    // Unknown dependency ids are dropped with a warning; a bad hint from the
    // model or the operator should not fail the whole add.
    let mut dependencies = Vec::new();
    let mut dropped = Vec::new();
    for dep in requested_deps {
        if tasks.iter().any(|t| t.id == dep) {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        } else {
            dropped.push(dep);
        }
    }
    if !dropped.is_empty() {
        let rendered: Vec<String> = dropped.iter().map(u64::to_string).collect();
        ctx.logger.warn(&format!(
            "dropping unknown dependencies: {}",
            rendered.join(", ")
        ));
    }

    tasks.push(Task {
        id,
        title: title.clone(),
        description,
        details,
        test_strategy,
        status: TaskStatus::Pending,
        priority,
        dependencies,
        subtasks: Vec::new(),
    });

    store.save()?;
    ctx.logger
        .success(&format!("added task {} to tag {}", id, tag));

    Ok(AddTaskResult {
        id,
        title,
        dropped_dependencies: dropped,
    })
}
