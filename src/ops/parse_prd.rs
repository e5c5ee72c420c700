//! PRD parsing: turn a requirements document into an initial task set.

use super::OpContext;
use crate::ai::extract::{PrdPayload, decode, require_task_fields};
use crate::ai::orchestrator::GenerationParams;
use crate::error::{EngineError, EngineResult};
use crate::prompts;
use crate::types::{Task, TaskStatus, next_task_id, parse_priority};
use serde::Serialize;
use std::path::Path;

/// Result of PRD parsing.
#[derive(Debug, Clone, Serialize)]
pub struct ParsePrdResult {
    pub created_ids: Vec<u64>,
}

/// Generate tasks from a PRD file into the active tag.
///
/// The tag must be empty unless `append` is set; PRD output replaces
/// nothing silently.
pub async fn parse_prd(
    ctx: &OpContext,
    input: &Path,
    num_tasks: Option<u32>,
    research: bool,
    append: bool,
) -> EngineResult<ParsePrdResult> {
    if !input.exists() {
        return Err(EngineError::file_not_found(&input.display().to_string()));
    }
    let prd_text = std::fs::read_to_string(input)
        .map_err(|e| EngineError::internal(format!("reading {}: {}", input.display(), e)))?;
    if prd_text.trim().is_empty() {
        return Err(EngineError::invalid_value("input", "PRD file is empty"));
    }

    let mut store = ctx.load_store()?;
    let tag = ctx.active_tag().to_string();

    if !append && !store.tag_entry(&tag).tasks.is_empty() {
        return Err(EngineError::invalid_value(
            "tag",
            "tag already contains tasks; pass append to add to them",
        ));
    }

    let target = num_tasks.unwrap_or(10);
    let params = GenerationParams {
        system: prompts::parse_prd_system(target),
        prompt: prompts::parse_prd_prompt(&prd_text),
        research,
    };
    let raw = ctx.generate(&params).await?;
    let payload: PrdPayload = decode(&raw)?;
    if payload.tasks.is_empty() {
        return Err(EngineError::reconciliation("model returned no tasks"));
    }
    for proposed in &payload.tasks {
        require_task_fields(proposed)?;
    }

    let tasks = &mut store.tag_entry(&tag).tasks;
    let base = next_task_id(tasks) - 1;
    let generated_count = payload.tasks.len() as u64;
    let mut created_ids = Vec::with_capacity(payload.tasks.len());

    for (index, proposed) in payload.tasks.into_iter().enumerate() {
        let id = base + index as u64 + 1;
        // The model references earlier tasks by 1-based position; shift
        // those to the assigned id range and drop out-of-range entries.
        let dependencies: Vec<u64> = proposed
            .dependencies
            .iter()
            .filter(|&&dep| dep >= 1 && dep <= generated_count && dep + base != id)
            .map(|&dep| dep + base)
            .collect();
        tasks.push(Task {
            id,
            title: proposed.title.unwrap_or_default(),
            description: proposed.description.unwrap_or_default(),
            details: proposed.details.unwrap_or_default(),
            test_strategy: proposed.test_strategy.unwrap_or_default(),
            status: TaskStatus::Pending,
            priority: proposed
                .priority
                .as_deref()
                .map(parse_priority)
                .unwrap_or_else(|| parse_priority(&ctx.config.defaults.priority)),
            dependencies,
            subtasks: Vec::new(),
        });
        created_ids.push(id);
    }

    store.save()?;
    ctx.logger.success(&format!(
        "created {} task(s) from {}",
        created_ids.len(),
        input.display()
    ));

    Ok(ParsePrdResult { created_ids })
}
