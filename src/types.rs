//! Core types for the tasksmith task document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle status shared by tasks and subtasks.
///
/// `Done` and `Completed` are equivalent "locked" states: content in a locked
/// entry is protected from AI-driven rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Completed,
    Blocked,
    Deferred,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in-progress" => Some(TaskStatus::InProgress),
            "done" => Some(TaskStatus::Done),
            "completed" => Some(TaskStatus::Completed),
            "blocked" => Some(TaskStatus::Blocked),
            "deferred" => Some(TaskStatus::Deferred),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status marks the entry as complete and therefore
    /// protected from AI rewrites.
    pub fn is_locked(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Completed)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Parse a priority string ("high", "medium", "low").
/// Returns Medium for unrecognized values.
pub fn parse_priority(s: &str) -> Priority {
    match s.to_lowercase().as_str() {
        "high" => Priority::High,
        "low" => Priority::Low,
        _ => Priority::Medium,
    }
}

/// A task in the task graph.
///
/// Ids are positive integers unique within a tag, assigned as
/// `max(existing) + 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Ordered set of task ids this task depends on.
    #[serde(default)]
    pub dependencies: Vec<u64>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    /// Next free subtask id, local to this parent. Starts at 1.
    pub fn next_subtask_id(&self) -> u64 {
        self.subtasks.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    pub fn subtask(&self, subtask_id: u64) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    pub fn subtask_mut(&mut self, subtask_id: u64) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == subtask_id)
    }
}

/// A child unit of work nested one level beneath a task.
///
/// Subtask ids are unique only within their parent and start at 1. Each
/// dependency entry is either a sibling subtask id or an external task id,
/// disambiguated by lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u64,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: Vec<u64>,
}

/// Next free task id for a tag. Ids are never reused.
pub fn next_task_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

/// Optional metadata attached to a tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "sourceBranch", skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
}

/// One tag's worth of tasks: an isolated namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagData {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TagMetadata>,
}

/// The persisted document: tag name -> tag data.
pub type TaskDocument = BTreeMap<String, TagData>;

/// Per-task complexity analysis, produced out-of-band and consumed by the
/// expansion pipelines to pick subtask counts and ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    #[serde(rename = "taskId")]
    pub task_id: u64,
    #[serde(rename = "complexityScore")]
    pub complexity_score: f64,
    #[serde(rename = "recommendedSubtasks")]
    pub recommended_subtasks: u32,
    #[serde(default)]
    pub reasoning: String,
    #[serde(rename = "expansionPrompt", skip_serializing_if = "Option::is_none")]
    pub expansion_prompt: Option<String>,
}

/// Complexity report document: sibling JSON file to the tasks document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityReport {
    #[serde(default)]
    pub meta: serde_json::Value,
    #[serde(rename = "complexityAnalysis", default)]
    pub complexity_analysis: Vec<ComplexityAnalysis>,
}

impl ComplexityReport {
    pub fn for_task(&self, task_id: u64) -> Option<&ComplexityAnalysis> {
        self.complexity_analysis
            .iter()
            .find(|a| a.task_id == task_id)
    }
}
