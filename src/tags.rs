//! Tag management: isolated task namespaces.
//!
//! Every pipeline call resolves the tag it targets through [`TagContext`].
//! Tags are fully independent; copying one produces a deep copy with no
//! shared state.

use crate::error::{EngineError, EngineResult};
use crate::store::{EngineState, TaskStore, load_state, save_state};
use crate::types::{TagData, TagMetadata};
use regex_lite::Regex;
use std::path::Path;

/// Tag names that collide with common VCS branch names and are refused for
/// branch-derived tags.
const RESERVED_TAG_NAMES: &[&str] = &["main", "master", "develop", "dev", "head"];

/// Maximum length of a sanitized branch-derived tag name.
const MAX_TAG_NAME_LEN: usize = 50;

/// The tag an operation targets.
#[derive(Debug, Clone)]
pub struct TagContext {
    pub active: String,
}

impl TagContext {
    /// Resolve the active tag: an explicit `--tag` wins, then the state
    /// file, then the configured default.
    pub fn resolve(
        explicit: Option<&str>,
        state_path: &Path,
        default_tag: &str,
    ) -> EngineResult<Self> {
        if let Some(tag) = explicit {
            return Ok(Self {
                active: tag.to_string(),
            });
        }
        if let Some(state) = load_state(state_path)? {
            return Ok(Self {
                active: state.current_tag,
            });
        }
        Ok(Self {
            active: default_tag.to_string(),
        })
    }
}

/// Derive a tag name from a VCS branch name: lowercase, non-alphanumeric
/// runs collapsed to single hyphens, trimmed, and length-capped.
pub fn sanitize_branch_name(branch: &str) -> String {
    let lowered = branch.to_lowercase();
    let non_alnum = Regex::new("[^a-z0-9]+").unwrap();
    let hyphenated = non_alnum.replace_all(&lowered, "-");
    let trimmed = hyphenated.trim_matches('-');
    trimmed.chars().take(MAX_TAG_NAME_LEN).collect()
}

/// Create a new tag, optionally deep-copying tasks from a source tag.
pub fn create_tag(
    store: &mut TaskStore,
    name: &str,
    copy_from: Option<&str>,
    description: Option<String>,
) -> EngineResult<()> {
    if name.is_empty() {
        return Err(EngineError::missing_field("tag name"));
    }
    if store.has_tag(name) {
        return Err(EngineError::tag_exists(name));
    }

    let tasks = match copy_from {
        // Clone produces fully independent task graphs; tags never alias.
        Some(source) => store.tag(source)?.tasks.clone(),
        None => Vec::new(),
    };

    store.insert_tag(
        name.to_string(),
        TagData {
            tasks,
            metadata: Some(TagMetadata {
                description,
                created_at: Some(chrono::Utc::now()),
                source_branch: None,
            }),
        },
    );
    Ok(())
}

/// Create a tag named after a VCS branch. Reserved branch names are
/// rejected so branch-derived tags never shadow the default namespaces.
pub fn create_tag_from_branch(
    store: &mut TaskStore,
    branch: &str,
    copy_from: Option<&str>,
) -> EngineResult<String> {
    let name = sanitize_branch_name(branch);
    if name.is_empty() {
        return Err(EngineError::invalid_value(
            "branch",
            "branch name sanitizes to an empty tag name",
        ));
    }
    if RESERVED_TAG_NAMES.contains(&name.as_str()) {
        return Err(EngineError::reserved_tag(&name));
    }

    create_tag(store, &name, copy_from, None)?;
    if let Ok(tag) = store.tag_mut(&name) {
        if let Some(metadata) = tag.metadata.as_mut() {
            metadata.source_branch = Some(branch.to_string());
        }
    }
    Ok(name)
}

/// Delete a tag. Deleting the active tag is refused; switch away first.
pub fn delete_tag(store: &mut TaskStore, name: &str, context: &TagContext) -> EngineResult<()> {
    if !store.has_tag(name) {
        return Err(EngineError::tag_not_found(name));
    }
    if name == context.active {
        return Err(EngineError::active_tag_deletion(name));
    }
    store.remove_tag(name);
    Ok(())
}

/// Compact tag listing entry.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TagSummary {
    pub name: String,
    pub tasks: usize,
    pub completed: usize,
    pub active: bool,
}

/// Summarize every tag in the document.
pub fn list_tags(store: &TaskStore, context: &TagContext) -> Vec<TagSummary> {
    store
        .tag_names()
        .into_iter()
        .filter_map(|name| {
            let tag = store.tag(&name).ok()?;
            Some(TagSummary {
                tasks: tag.tasks.len(),
                completed: tag.tasks.iter().filter(|t| t.status.is_locked()).count(),
                active: name == context.active,
                name,
            })
        })
        .collect()
}

/// Switch the active tag, persisting it to the state file.
pub fn use_tag(store: &TaskStore, name: &str, state_path: &Path) -> EngineResult<()> {
    if !store.has_tag(name) {
        return Err(EngineError::tag_not_found(name));
    }
    save_state(
        state_path,
        &EngineState {
            current_tag: name.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_collapses_and_trims() {
        assert_eq!(sanitize_branch_name("Feature/ADD-Login!!"), "feature-add-login");
        assert_eq!(sanitize_branch_name("--weird--"), "weird");
        assert_eq!(sanitize_branch_name("release/v1.2.3"), "release-v1-2-3");
    }

    #[test]
    fn sanitize_caps_length() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_branch_name(&long).len(), MAX_TAG_NAME_LEN);
    }

    #[test]
    fn reserved_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = TaskStore::load_or_create(dir.path().join("tasks.json")).unwrap();
        for branch in ["main", "Master", "HEAD", "develop", "dev"] {
            let err = create_tag_from_branch(&mut store, branch, None).unwrap_err();
            assert_eq!(err.code, crate::error::ErrorCode::ReservedTagName, "{}", branch);
        }
    }
}
