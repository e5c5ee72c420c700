//! CLI command definitions for tasksmith
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AI-assisted task graph manager
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Tag (task namespace) to operate on; defaults to the active tag
    #[arg(short, long, global = true)]
    pub tag: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task, from explicit fields or an AI-drafted prompt
    AddTask {
        /// Describe the task and let the model draft it
        #[arg(short, long)]
        prompt: Option<String>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        details: Option<String>,

        #[arg(long)]
        test_strategy: Option<String>,

        /// high, medium, or low
        #[arg(long)]
        priority: Option<String>,

        /// Comma-separated task ids this task depends on
        #[arg(short, long)]
        dependencies: Option<String>,

        /// Prefer the web-search-augmented provider
        #[arg(short, long)]
        research: bool,
    },

    /// Expand a task into subtasks
    Expand {
        /// Task id to expand
        #[arg(short, long)]
        id: u64,

        /// Number of subtasks to generate
        #[arg(short, long)]
        num: Option<u32>,

        /// Extra context for the model
        #[arg(long)]
        context: Option<String>,

        /// Regenerate even when subtasks already exist
        #[arg(short, long)]
        force: bool,

        /// Keep existing subtasks and append new ones
        #[arg(long)]
        append: bool,

        #[arg(short, long)]
        research: bool,
    },

    /// Expand every eligible task
    ExpandAll {
        #[arg(short, long)]
        num: Option<u32>,

        #[arg(short, long)]
        force: bool,

        #[arg(short, long)]
        research: bool,
    },

    /// Rewrite one task according to an instruction
    UpdateTask {
        #[arg(short, long)]
        id: u64,

        #[arg(short, long)]
        prompt: String,

        #[arg(short, long)]
        research: bool,
    },

    /// Rewrite every unlocked task from an id onward
    Update {
        /// First task id to consider
        #[arg(long)]
        from: u64,

        #[arg(short, long)]
        prompt: String,

        #[arg(short, long)]
        research: bool,
    },

    /// Append progress notes to a subtask (id form: parent.subtask)
    UpdateSubtask {
        #[arg(short, long)]
        id: String,

        #[arg(short, long)]
        prompt: String,

        #[arg(short, long)]
        research: bool,
    },

    /// Set the status of tasks or subtasks (comma-separated ids)
    SetStatus {
        #[arg(short, long)]
        id: String,

        /// pending, in-progress, done, completed, blocked, deferred, cancelled
        #[arg(short, long)]
        status: String,
    },

    /// Remove tasks or subtasks (comma-separated ids)
    RemoveTask {
        #[arg(short, long)]
        id: String,
    },

    /// Add a subtask, or demote an existing task into one
    AddSubtask {
        /// Parent task id
        #[arg(short, long)]
        parent: u64,

        /// Existing task id to demote into a subtask
        #[arg(long)]
        task_id: Option<u64>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        details: Option<String>,

        /// Comma-separated dependency ids (sibling subtask or task ids)
        #[arg(short, long)]
        dependencies: Option<String>,
    },

    /// Remove a subtask (id form: parent.subtask)
    RemoveSubtask {
        #[arg(short, long)]
        id: String,

        /// Promote the subtask to a standalone task instead of deleting it
        #[arg(long)]
        convert: bool,
    },

    /// Generate tasks from a PRD document
    ParsePrd {
        /// Path to the PRD text file
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        num_tasks: Option<u32>,

        /// Append to existing tasks instead of requiring an empty tag
        #[arg(long)]
        append: bool,

        #[arg(short, long)]
        research: bool,
    },

    /// List all tags
    Tags,

    /// Create a new tag, optionally copying tasks from another tag
    AddTag {
        /// Tag name; ignored when --from-branch is given
        name: Option<String>,

        /// Derive the tag name from a VCS branch name
        #[arg(long)]
        from_branch: Option<String>,

        /// Deep-copy tasks from this tag
        #[arg(long)]
        copy_from: Option<String>,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a tag (the active tag cannot be deleted)
    DeleteTag { name: String },

    /// Switch the active tag
    UseTag { name: String },

    /// Report dependency violations without modifying anything
    ValidateDependencies,

    /// Strip missing and duplicate dependency entries
    FixDependencies,
}

/// Parse a comma-separated id list argument.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a comma-separated numeric id list argument.
pub fn parse_numeric_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect()
}
