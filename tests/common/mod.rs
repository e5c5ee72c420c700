//! Shared test helpers: scripted mock providers and context construction.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tasksmith::ai::error::{AiError, AiResult, ProviderFailure};
use tasksmith::ai::orchestrator::Orchestrator;
use tasksmith::ai::provider::{GenerationRequest, Provider, ProviderRegistry, TextStream};
use tasksmith::config::Config;
use tasksmith::logging::Logger;
use tasksmith::ops::OpContext;
use tasksmith::store::TaskStore;
use tasksmith::tags::TagContext;
use tasksmith::types::{Priority, Subtask, Task, TaskStatus};

/// One scripted provider response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Stream the given text successfully.
    Text(String),
    /// Raise an overload-shaped error (HTTP 529).
    Overload,
    /// Raise a non-overload provider error (HTTP 401).
    Error(String),
}

/// Provider that plays back a script of responses and counts calls.
pub struct MockProvider {
    id: &'static str,
    research: bool,
    pub calls: Arc<AtomicUsize>,
    script: Mutex<VecDeque<MockResponse>>,
    /// Response used when the script runs dry.
    fallback: MockResponse,
}

impl MockProvider {
    pub fn new(id: &'static str, script: Vec<MockResponse>) -> Self {
        Self {
            id,
            research: false,
            calls: Arc::new(AtomicUsize::new(0)),
            script: Mutex::new(script.into()),
            fallback: MockResponse::Text("{}".to_string()),
        }
    }

    pub fn always(id: &'static str, response: MockResponse) -> Self {
        Self {
            id,
            research: false,
            calls: Arc::new(AtomicUsize::new(0)),
            script: Mutex::new(VecDeque::new()),
            fallback: response,
        }
    }

    pub fn research(mut self) -> Self {
        self.research = true;
        self
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn provider_id(&self) -> &str {
        self.id
    }

    fn supports_research(&self) -> bool {
        self.research
    }

    async fn stream(&self, _request: GenerationRequest) -> AiResult<TextStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match next {
            MockResponse::Text(text) => {
                let stream: TextStream = Box::pin(futures::stream::iter(vec![Ok(text)]));
                Ok(stream)
            }
            MockResponse::Overload => Err(AiError::Provider(ProviderFailure {
                status: Some(529),
                error_type: None,
                nested_type: Some("overloaded_error".to_string()),
                message: "Overloaded".to_string(),
            })),
            MockResponse::Error(message) => Err(AiError::Provider(ProviderFailure {
                status: Some(401),
                error_type: None,
                nested_type: Some("authentication_error".to_string()),
                message,
            })),
        }
    }
}

/// Test configuration rooted in a temp dir, with batch delays disabled.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.tasks_file = dir.join("tasks.json");
    config.paths.complexity_report = dir.join("task-complexity-report.json");
    config.paths.backup_dir = dir.join("backups");
    config.paths.state_file = dir.join("state.json");
    config.ai.batch_delay_ms = 0;
    config.ai.default_subtasks = 3;
    config
}

/// Build an operation context over a temp dir with the given providers.
pub fn test_context(dir: &Path, providers: Vec<MockProvider>) -> OpContext {
    let mut registry = ProviderRegistry::new();
    for provider in providers {
        registry = registry.register(provider);
    }
    let config = test_config(dir);
    let orchestrator = Orchestrator::new(registry, config.ai.clone());
    OpContext::new(
        config,
        Logger::new(),
        orchestrator,
        TagContext {
            active: "master".to_string(),
        },
    )
}

/// Build a task with the given id and dependencies.
pub fn task(id: u64, deps: Vec<u64>) -> Task {
    Task {
        id,
        title: format!("Task {}", id),
        description: format!("Description {}", id),
        details: String::new(),
        test_strategy: String::new(),
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        dependencies: deps,
        subtasks: vec![],
    }
}

/// Build a subtask with the given id.
pub fn subtask(id: u64, status: TaskStatus) -> Subtask {
    Subtask {
        id,
        title: format!("Subtask {}", id),
        description: format!("Subtask description {}", id),
        details: String::new(),
        status,
        dependencies: vec![],
    }
}

/// Write a seeded master tag into the context's tasks file.
pub fn seed_tasks(ctx: &OpContext, tasks: Vec<Task>) {
    let mut store = TaskStore::load_or_create(&ctx.config.paths.tasks_file).unwrap();
    store.tag_entry("master").tasks = tasks;
    store.save().unwrap();
}

/// Reload the tasks of the master tag from disk.
pub fn read_tasks(ctx: &OpContext) -> Vec<Task> {
    let store = TaskStore::load(&ctx.config.paths.tasks_file).unwrap();
    store.tasks("master").unwrap().to_vec()
}

/// Assert that every dependency in every tag resolves (no dangling ids).
pub fn assert_referential_integrity(ctx: &OpContext) {
    let store = TaskStore::load(&ctx.config.paths.tasks_file).unwrap();
    for tag in store.tag_names() {
        let tasks = store.tasks(&tag).unwrap();
        let violations = tasksmith::graph::validate(tasks);
        let dangling: Vec<_> = violations
            .iter()
            .filter(|v| matches!(v, tasksmith::graph::Violation::MissingDependency { .. }))
            .collect();
        assert!(
            dangling.is_empty(),
            "dangling dependencies in tag {}: {:?}",
            tag,
            dangling
        );
    }
}
