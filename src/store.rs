//! Task document storage.
//!
//! The document is a single JSON file keyed by tag name. It is read fully,
//! mutated in memory, and rewritten as a whole file; there is no partial or
//! streamed access. Pure data access lives here, business rules do not.

use crate::error::{EngineError, EngineResult};
use crate::types::{ComplexityReport, Task, TaskDocument};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Handle to one on-disk tasks document.
#[derive(Debug, Clone)]
pub struct TaskStore {
    path: PathBuf,
    document: TaskDocument,
}

impl TaskStore {
    /// Load the document at the given path. Fails if the file is missing.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EngineError::file_not_found(&path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let document: TaskDocument =
            serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    /// Load the document, or start an empty one if the file does not exist.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self {
                path: path.to_path_buf(),
                document: TaskDocument::new(),
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the whole document to disk.
    pub fn save(&self) -> EngineResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.document)
            .context("serializing tasks document")?;
        std::fs::write(&self.path, json + "\n")
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    /// Copy the on-disk document into `backup_dir` with a timestamped name.
    /// No-op returning `None` when the document has never been written.
    pub fn backup_to<P: AsRef<Path>>(&self, backup_dir: P) -> EngineResult<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let backup_dir = backup_dir.as_ref();
        std::fs::create_dir_all(backup_dir)
            .with_context(|| format!("creating {}", backup_dir.display()))?;
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let backup_path = backup_dir.join(format!("tasks-{}.json", stamp));
        std::fs::copy(&self.path, &backup_path)
            .with_context(|| format!("backing up to {}", backup_path.display()))?;
        Ok(Some(backup_path))
    }

    /// All tag names in the document.
    pub fn tag_names(&self) -> Vec<String> {
        self.document.keys().cloned().collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.document.contains_key(tag)
    }

    pub fn tag(&self, tag: &str) -> EngineResult<&crate::types::TagData> {
        self.document
            .get(tag)
            .ok_or_else(|| EngineError::tag_not_found(tag))
    }

    pub fn tag_mut(&mut self, tag: &str) -> EngineResult<&mut crate::types::TagData> {
        self.document
            .get_mut(tag)
            .ok_or_else(|| EngineError::tag_not_found(tag))
    }

    /// Get or create the tag entry, for pipelines that may write into a
    /// fresh tag.
    pub fn tag_entry(&mut self, tag: &str) -> &mut crate::types::TagData {
        self.document.entry(tag.to_string()).or_default()
    }

    pub fn insert_tag(&mut self, tag: String, data: crate::types::TagData) {
        self.document.insert(tag, data);
    }

    pub fn remove_tag(&mut self, tag: &str) -> Option<crate::types::TagData> {
        self.document.remove(tag)
    }

    /// Tasks in a tag, read-only.
    pub fn tasks(&self, tag: &str) -> EngineResult<&[Task]> {
        Ok(&self.tag(tag)?.tasks)
    }

    /// Tasks in a tag, mutable.
    pub fn tasks_mut(&mut self, tag: &str) -> EngineResult<&mut Vec<Task>> {
        Ok(&mut self.tag_mut(tag)?.tasks)
    }

    pub fn task(&self, tag: &str, task_id: u64) -> EngineResult<&Task> {
        self.tasks(tag)?
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(task_id))
    }

    pub fn task_mut(&mut self, tag: &str, task_id: u64) -> EngineResult<&mut Task> {
        self.tasks_mut(tag)?
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| EngineError::task_not_found(task_id))
    }
}

/// Persisted engine state, sibling to the tasks document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineState {
    #[serde(rename = "currentTag")]
    pub current_tag: String,
}

/// Read the state file; `None` when it does not exist.
pub fn load_state<P: AsRef<Path>>(path: P) -> EngineResult<Option<EngineState>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let state: EngineState =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(state))
}

/// Write the state file.
pub fn save_state<P: AsRef<Path>>(path: P, state: &EngineState) -> EngineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(state).context("serializing state")?;
    std::fs::write(path, json + "\n").with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Read the complexity report if present; missing or malformed reports are
/// treated as absent (expansion falls back to configured defaults).
pub fn load_complexity_report<P: AsRef<Path>>(path: P) -> Option<ComplexityReport> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TagData;

    #[test]
    fn load_or_create_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        let store = TaskStore::load_or_create(&path).unwrap();
        assert!(store.tag_names().is_empty());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");

        let mut store = TaskStore::load_or_create(&path).unwrap();
        store.insert_tag("master".to_string(), TagData::default());
        store.save().unwrap();

        let reloaded = TaskStore::load(&path).unwrap();
        assert!(reloaded.has_tag("master"));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TaskStore::load(dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::FileNotFound);
    }

    #[test]
    fn backup_skipped_for_unwritten_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::load_or_create(dir.path().join("tasks.json")).unwrap();
        let backup = store.backup_to(dir.path().join("backups")).unwrap();
        assert!(backup.is_none());
    }
}
