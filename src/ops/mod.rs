//! Mutation pipelines: the public operations over the task document.
//!
//! Every pipeline receives an [`OpContext`] carrying the configuration,
//! logger, provider orchestrator, and resolved tag. Nothing here touches
//! process-global state; two contexts never interfere.

pub mod add_task;
pub mod expand;
pub mod parse_prd;
pub mod remove;
pub mod status;
pub mod subtasks;
pub mod update;

use crate::ai::orchestrator::{GenerationParams, Orchestrator};
use crate::ai::provider::ProgressSink;
use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::graph;
use crate::logging::Logger;
use crate::store::TaskStore;
use crate::tags::TagContext;
use std::sync::Arc;

/// Everything a pipeline call needs, threaded explicitly.
pub struct OpContext {
    pub config: Config,
    pub logger: Logger,
    pub orchestrator: Orchestrator,
    pub tag: TagContext,
    /// Optional sink for heuristic generation progress.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl OpContext {
    pub fn new(
        config: Config,
        logger: Logger,
        orchestrator: Orchestrator,
        tag: TagContext,
    ) -> Self {
        Self {
            config,
            logger,
            orchestrator,
            tag,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The tag this operation targets.
    pub fn active_tag(&self) -> &str {
        &self.tag.active
    }

    /// Load the tasks document, starting empty when the file is absent.
    pub fn load_store(&self) -> EngineResult<TaskStore> {
        TaskStore::load_or_create(&self.config.paths.tasks_file)
    }

    /// Load the tasks document, failing when the file is absent.
    pub fn load_existing_store(&self) -> EngineResult<TaskStore> {
        TaskStore::load(&self.config.paths.tasks_file)
    }

    /// Run one generation call through the orchestrator.
    pub async fn generate(&self, params: &GenerationParams) -> EngineResult<String> {
        self.orchestrator
            .generate(params, self.progress.as_deref(), &self.logger)
            .await
    }
}

/// A task or subtask reference parsed from operator input: `"5"` or `"5.2"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityId {
    Task(u64),
    Subtask(u64, u64),
}

/// Parse an id argument. Malformed input is a validation error, surfaced
/// immediately and never retried.
pub fn parse_entity_id(raw: &str) -> EngineResult<EntityId> {
    let raw = raw.trim();
    match raw.split_once('.') {
        Some((parent, sub)) => {
            let parent: u64 = parent
                .parse()
                .map_err(|_| EngineError::invalid_task_id(raw))?;
            let sub: u64 = sub.parse().map_err(|_| EngineError::invalid_task_id(raw))?;
            Ok(EntityId::Subtask(parent, sub))
        }
        None => {
            let id: u64 = raw.parse().map_err(|_| EngineError::invalid_task_id(raw))?;
            Ok(EntityId::Task(id))
        }
    }
}

/// Report of a read-only dependency validation pass.
pub fn validate_dependencies(ctx: &OpContext) -> EngineResult<Vec<graph::Violation>> {
    let store = ctx.load_existing_store()?;
    let tasks = store.tasks(ctx.active_tag())?;
    Ok(graph::validate(tasks))
}

/// Repair dependency lists in place and persist the result.
pub fn fix_dependencies(ctx: &OpContext) -> EngineResult<graph::FixReport> {
    let mut store = ctx.load_existing_store()?;
    let tasks = store.tasks_mut(ctx.active_tag())?;
    let report = graph::fix(tasks);

    if report.changes.is_empty() {
        ctx.logger.info("no dependency repairs needed");
    } else {
        ctx.logger
            .info(&format!("repaired {} dependency entries", report.changes.len()));
        store.save()?;
    }
    for cycle in &report.cycles {
        if let graph::Violation::Cycle { path } = cycle {
            let rendered: Vec<String> = path.iter().map(u64::to_string).collect();
            ctx.logger.warn(&format!(
                "dependency cycle detected (not auto-repaired): {}",
                rendered.join(" -> ")
            ));
        }
    }
    Ok(report)
}
