//! Task expansion: generate subtasks for one task or for every eligible
//! task in the tag.

use super::OpContext;
use crate::ai::extract::{SubtaskListPayload, decode, require_subtask_fields};
use crate::ai::orchestrator::GenerationParams;
use crate::error::EngineResult;
use crate::prompts;
use crate::store::{TaskStore, load_complexity_report};
use crate::types::{ComplexityReport, Subtask, TaskStatus};
use serde::Serialize;

/// Arguments for a single-task expansion.
#[derive(Debug, Clone, Default)]
pub struct ExpandArgs {
    /// Explicit subtask count; otherwise the complexity report's
    /// recommendation, otherwise the configured default.
    pub count: Option<u32>,
    pub research: bool,
    /// Extra operator context passed to the model.
    pub context: Option<String>,
    /// Replace existing subtasks instead of treating them as a no-op.
    pub force: bool,
    /// Keep existing subtasks and continue ids after them.
    pub append: bool,
}

/// Result of a single-task expansion.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandResult {
    pub task_id: u64,
    pub subtasks: Vec<Subtask>,
    /// True when subtasks already existed and no write happened.
    pub noop: bool,
}

/// Aggregate result of a batch expansion.
#[derive(Debug, Clone, Serialize)]
pub struct ExpandAllResult {
    pub expanded_count: u32,
    pub tasks_to_expand: u32,
    pub expansion_errors: u32,
}

/// Resolve the subtask count for a task.
fn resolve_count(
    ctx: &OpContext,
    task_id: u64,
    explicit: Option<u32>,
    report: Option<&ComplexityReport>,
) -> u32 {
    if let Some(count) = explicit {
        return count;
    }
    if let Some(analysis) = report.and_then(|r| r.for_task(task_id)) {
        return analysis.recommended_subtasks;
    }
    ctx.config.ai.default_subtasks
}

/// Expand one task inside an already-loaded store and persist the result.
/// The caller is responsible for taking a backup first.
async fn expand_in_store(
    ctx: &OpContext,
    store: &mut TaskStore,
    task_id: u64,
    args: &ExpandArgs,
    report: Option<&ComplexityReport>,
) -> EngineResult<ExpandResult> {
    let tag = ctx.active_tag().to_string();
    let task = store.task(&tag, task_id)?.clone();

    if !task.subtasks.is_empty() && !args.force && !args.append {
        ctx.logger.info(&format!(
            "task {} already has {} subtasks; skipping (use force to regenerate)",
            task_id,
            task.subtasks.len()
        ));
        return Ok(ExpandResult {
            task_id,
            subtasks: task.subtasks,
            noop: true,
        });
    }

    let count = resolve_count(ctx, task_id, args.count, report);

    let mut extra_context = String::new();
    if let Some(analysis) = report.and_then(|r| r.for_task(task_id)) {
        if let Some(prompt) = &analysis.expansion_prompt {
            extra_context.push_str(prompt);
        }
    }
    if let Some(context) = &args.context {
        if !extra_context.is_empty() {
            extra_context.push_str("\n\n");
        }
        extra_context.push_str(context);
    }

    let params = GenerationParams {
        system: prompts::expand_system(count),
        prompt: prompts::expand_prompt(
            &task,
            (!extra_context.is_empty()).then_some(extra_context.as_str()),
        ),
        research: args.research,
    };
    let raw = ctx.generate(&params).await?;
    let payload: SubtaskListPayload = decode(&raw)?;
    for proposed in &payload.subtasks {
        require_subtask_fields(proposed)?;
    }

    // Appending continues local ids after the existing ones; replacing (or a
    // first expansion) starts at 1.
    let offset = if args.append {
        task.subtasks.iter().map(|s| s.id).max().unwrap_or(0)
    } else {
        0
    };
    let generated_count = payload.subtasks.len() as u64;
    let existing_task_ids: std::collections::HashSet<u64> =
        store.tasks(&tag)?.iter().map(|t| t.id).collect();

    let mut generated: Vec<Subtask> = Vec::with_capacity(payload.subtasks.len());
    for (index, proposed) in payload.subtasks.into_iter().enumerate() {
        let local_id = offset + index as u64 + 1;
        // The model numbers siblings 1..=n in its own list; shift those
        // references to the assigned id range and drop anything else that
        // resolves to nothing.
        let dependencies: Vec<u64> = proposed
            .dependencies
            .iter()
            .filter_map(|&dep| {
                if dep >= 1 && dep <= generated_count {
                    Some(dep + offset)
                } else if existing_task_ids.contains(&dep) {
                    Some(dep)
                } else {
                    None
                }
            })
            .collect();
        generated.push(Subtask {
            id: local_id,
            title: proposed.title.unwrap_or_default(),
            description: proposed.description.unwrap_or_default(),
            details: proposed.details.unwrap_or_default(),
            status: TaskStatus::Pending,
            dependencies,
        });
    }

    let slot = store.task_mut(&tag, task_id)?;
    if args.append {
        slot.subtasks.extend(generated);
    } else {
        slot.subtasks = generated;
    }
    let subtasks = slot.subtasks.clone();

    store.save()?;
    ctx.logger.success(&format!(
        "expanded task {} into {} subtasks",
        task_id,
        subtasks.len()
    ));

    Ok(ExpandResult {
        task_id,
        subtasks,
        noop: false,
    })
}

/// Expand a single task into subtasks.
pub async fn expand_task(
    ctx: &OpContext,
    task_id: u64,
    args: ExpandArgs,
) -> EngineResult<ExpandResult> {
    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag();

    // Fail fast before the backup if the task is unknown.
    let task = store.task(tag, task_id)?;
    let will_write = task.subtasks.is_empty() || args.force || args.append;
    if will_write {
        if let Some(path) = store.backup_to(&ctx.config.paths.backup_dir)? {
            ctx.logger
                .debug(&format!("backed up tasks document to {}", path.display()));
        }
    }

    let report = load_complexity_report(&ctx.config.paths.complexity_report);
    expand_in_store(ctx, &mut store, task_id, &args, report.as_ref()).await
}

/// Expand every eligible task, sequentially, continuing past per-item
/// failures.
pub async fn expand_all(
    ctx: &OpContext,
    count: Option<u32>,
    research: bool,
    force: bool,
) -> EngineResult<ExpandAllResult> {
    let mut store = ctx.load_existing_store()?;
    let tag = ctx.active_tag().to_string();
    let report = load_complexity_report(&ctx.config.paths.complexity_report);

    let mut candidates: Vec<u64> = store
        .tasks(&tag)?
        .iter()
        .filter(|t| {
            matches!(t.status, TaskStatus::Pending | TaskStatus::InProgress)
                && (t.subtasks.is_empty() || force)
        })
        .map(|t| t.id)
        .collect();

    // Highest-complexity first when a report exists, ascending id otherwise.
    match &report {
        Some(report) => candidates.sort_by(|a, b| {
            let score = |id: u64| {
                report
                    .for_task(id)
                    .map(|a| a.complexity_score)
                    .unwrap_or(0.0)
            };
            score(*b)
                .partial_cmp(&score(*a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(b))
        }),
        None => candidates.sort_unstable(),
    }

    let tasks_to_expand = candidates.len() as u32;
    let mut expanded_count = 0;
    let mut expansion_errors = 0;

    if tasks_to_expand == 0 {
        ctx.logger.info("no tasks eligible for expansion");
        return Ok(ExpandAllResult {
            expanded_count,
            tasks_to_expand,
            expansion_errors,
        });
    }

    if let Some(path) = store.backup_to(&ctx.config.paths.backup_dir)? {
        ctx.logger
            .debug(&format!("backed up tasks document to {}", path.display()));
    }

    let args = ExpandArgs {
        count,
        research,
        context: None,
        force,
        append: false,
    };

    // Strictly sequential: provider load stays predictable, and one item's
    // failure cannot disturb a later, independent item.
    for (index, task_id) in candidates.iter().enumerate() {
        match expand_in_store(ctx, &mut store, *task_id, &args, report.as_ref()).await {
            Ok(result) if !result.noop => expanded_count += 1,
            Ok(_) => {}
            Err(e) => {
                expansion_errors += 1;
                ctx.logger
                    .error(&format!("failed to expand task {}: {}", task_id, e));
            }
        }
        if index + 1 < candidates.len() && ctx.config.ai.batch_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(ctx.config.ai.batch_delay_ms))
                .await;
        }
    }

    ctx.logger.success(&format!(
        "expanded {}/{} tasks ({} errors)",
        expanded_count, tasks_to_expand, expansion_errors
    ));

    Ok(ExpandAllResult {
        expanded_count,
        tasks_to_expand,
        expansion_errors,
    })
}
