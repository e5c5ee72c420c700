//! Configuration loading and management.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// File locations for the task document and its siblings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Path to the tasks JSON document.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: PathBuf,

    /// Path to the complexity report consumed by expansion.
    #[serde(default = "default_complexity_report")]
    pub complexity_report: PathBuf,

    /// Directory for point-in-time backups taken before expansion.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Path to the state file holding the active tag.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tasks_file: default_tasks_file(),
            complexity_report: default_complexity_report(),
            backup_dir: default_backup_dir(),
            state_file: default_state_file(),
        }
    }
}

fn default_tasks_file() -> PathBuf {
    PathBuf::from(".tasksmith/tasks.json")
}

fn default_complexity_report() -> PathBuf {
    PathBuf::from(".tasksmith/task-complexity-report.json")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".tasksmith/backups")
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".tasksmith/state.json")
}

/// AI generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Model used by the general-purpose provider.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model used by the research (web-search-augmented) provider.
    #[serde(default = "default_research_model")]
    pub research_model: String,

    /// Token budget per generation call; also the denominator of the
    /// heuristic progress percentage.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Attempt limit across the provider fallback chain.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Subtask count used when neither the caller nor the complexity report
    /// supplies one.
    #[serde(default = "default_subtask_count")]
    pub default_subtasks: u32,

    /// Delay between items in batch expansion, to stay under provider rate
    /// limits.
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            research_model: default_research_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            max_attempts: default_max_attempts(),
            default_subtasks: default_subtask_count(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_research_model() -> String {
    "sonar-pro".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_attempts() -> u32 {
    2
}

fn default_subtask_count() -> u32 {
    5
}

fn default_batch_delay_ms() -> u64 {
    500
}

/// Defaults applied when the caller leaves a field unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Tag used when no tag is named and no state file exists.
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Priority assigned to new tasks without an explicit priority.
    #[serde(default = "default_priority")]
    pub priority: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            priority: default_priority(),
        }
    }
}

fn default_tag() -> String {
    "master".to_string()
}

fn default_priority() -> String {
    "medium".to_string()
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default location or return defaults.
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::load(".tasksmith/config.yaml") {
            return config;
        }

        let mut config = Self::default();

        if let Ok(tasks_file) = std::env::var("TASKSMITH_TASKS_FILE") {
            config.paths.tasks_file = PathBuf::from(tasks_file);
        }

        if let Ok(attempts) = std::env::var("TASKSMITH_MAX_ATTEMPTS") {
            if let Ok(attempts) = attempts.parse() {
                config.ai.max_attempts = attempts;
            }
        }

        if let Ok(tag) = std::env::var("TASKSMITH_DEFAULT_TAG") {
            config.defaults.tag = tag;
        }

        config
    }

    /// Ensure the directories referenced by the configuration exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.paths.tasks_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.paths.backup_dir)?;
        Ok(())
    }
}
