//! Strict decoding of model output.
//!
//! Model responses must be JSON matching the expected payload shape. A
//! markdown code fence around the JSON is tolerated; anything else fails
//! closed with a reconciliation error before any write happens.

use crate::error::{EngineError, EngineResult};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Strip a single surrounding markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    rest.strip_suffix("```").map(str::trim).unwrap_or(trimmed)
}

/// Decode model output into a typed payload, failing closed on any shape
/// mismatch.
pub fn decode<T: DeserializeOwned>(raw: &str) -> EngineResult<T> {
    let json = strip_code_fence(raw);
    serde_json::from_str(json).map_err(|e| {
        EngineError::reconciliation(format!("model output did not match the expected shape: {}", e))
    })
}

/// A task as proposed by the model. All fields optional at the decode layer;
/// required fields are enforced by [`require_task_fields`] before any write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposedTask {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<u64>,
    #[serde(default)]
    pub subtasks: Vec<ProposedSubtask>,
}

/// A subtask as proposed by the model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposedSubtask {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<u64>,
}

/// Payload for expansion calls: the generated subtask list.
#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskListPayload {
    pub subtasks: Vec<ProposedSubtask>,
}

/// Payload for PRD parsing: the generated task list.
#[derive(Debug, Clone, Deserialize)]
pub struct PrdPayload {
    pub tasks: Vec<ProposedTask>,
}

/// Payload for subtask progress updates: detail text to append.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailAppendPayload {
    pub details: String,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Reject proposals lacking a title or description. The whole mutation fails
/// before any write occurs.
pub fn require_task_fields(proposed: &ProposedTask) -> EngineResult<()> {
    if !present(&proposed.title) {
        return Err(EngineError::reconciliation(
            "proposed task is missing a title",
        ));
    }
    if !present(&proposed.description) {
        return Err(EngineError::reconciliation(
            "proposed task is missing a description",
        ));
    }
    Ok(())
}

/// Same required-field rule for proposed subtasks.
pub fn require_subtask_fields(proposed: &ProposedSubtask) -> EngineResult<()> {
    if !present(&proposed.title) {
        return Err(EngineError::reconciliation(
            "proposed subtask is missing a title",
        ));
    }
    if !present(&proposed.description) {
        return Err(EngineError::reconciliation(
            "proposed subtask is missing a description",
        ));
    }
    Ok(())
}
