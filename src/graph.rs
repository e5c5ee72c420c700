//! Dependency validation, repair, and cycle detection.
//!
//! Operates on a snapshot of one tag's tasks. Subtask dependency entries are
//! disambiguated by lookup: an entry naming an existing sibling subtask is a
//! sibling reference, otherwise it refers to a task in the same tag.

use crate::types::Task;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// A dependency-integrity violation found by [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Violation {
    /// A dependency entry that resolves to nothing in the tag.
    MissingDependency {
        task_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<u64>,
        dependency: u64,
    },
    /// An entry depending on its own task or subtask.
    SelfDependency {
        task_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<u64>,
    },
    /// A dependency closure containing its own starting task. Reported,
    /// never auto-broken: dropping an arbitrary edge could violate intent.
    Cycle { path: Vec<u64> },
}

/// One repair applied by [`fix`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum FixChange {
    RemovedMissing {
        task_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<u64>,
        dependency: u64,
    },
    RemovedSelf {
        task_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<u64>,
    },
    RemovedDuplicate {
        task_id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<u64>,
        dependency: u64,
    },
}

/// Result of a [`fix`] pass: what changed, and which cycles remain.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub changes: Vec<FixChange>,
    /// Cycles are surfaced for the operator, not repaired.
    pub cycles: Vec<Violation>,
}

fn task_exists(tasks: &[Task], id: u64) -> bool {
    tasks.iter().any(|t| t.id == id)
}

/// Resolve a subtask dependency entry: sibling subtask first, task second.
fn subtask_dep_resolves(tasks: &[Task], parent: &Task, dep: u64) -> bool {
    parent.subtasks.iter().any(|s| s.id == dep) || task_exists(tasks, dep)
}

/// Outgoing task-level edges for traversal: direct dependencies plus every
/// subtask dependency that resolves to an external task. Subtask->parent
/// containment makes a subtask's external edges count as the task's own.
fn task_neighbors(tasks: &[Task], task: &Task) -> Vec<u64> {
    let mut out: Vec<u64> = task.dependencies.clone();
    for sub in &task.subtasks {
        for &dep in &sub.dependencies {
            // A sibling reference stays inside this task; only external
            // entries become graph edges.
            if !task.subtasks.iter().any(|s| s.id == dep) && task_exists(tasks, dep) {
                out.push(dep);
            }
        }
    }
    out
}

/// Check whether `task_id` transitively depends on `target_id`.
///
/// Follows direct dependency lists, dependency-of-dependency chains, and
/// subtask dependency lists (via subtask->parent containment). Used to reject
/// mutations that would introduce a cycle, such as demoting task A under a
/// parent that transitively depends on A.
pub fn is_dependent_on(tasks: &[Task], task_id: u64, target_id: u64) -> bool {
    let mut visited: HashSet<u64> = HashSet::new();
    let mut queue: VecDeque<u64> = VecDeque::new();
    queue.push_back(task_id);

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        let Some(task) = tasks.iter().find(|t| t.id == current) else {
            continue;
        };
        for dep in task_neighbors(tasks, task) {
            if dep == target_id {
                return true;
            }
            if !visited.contains(&dep) {
                queue.push_back(dep);
            }
        }
    }

    false
}

/// Validate every dependency entry in the tag, reporting missing references,
/// self-dependencies, and cycles.
pub fn validate(tasks: &[Task]) -> Vec<Violation> {
    let mut violations = Vec::new();

    for task in tasks {
        for &dep in &task.dependencies {
            if dep == task.id {
                violations.push(Violation::SelfDependency {
                    task_id: task.id,
                    subtask_id: None,
                });
            } else if !task_exists(tasks, dep) {
                violations.push(Violation::MissingDependency {
                    task_id: task.id,
                    subtask_id: None,
                    dependency: dep,
                });
            }
        }

        for sub in &task.subtasks {
            for &dep in &sub.dependencies {
                // An entry equal to the subtask's own id resolves to itself
                // under the sibling-first rule.
                if dep == sub.id {
                    violations.push(Violation::SelfDependency {
                        task_id: task.id,
                        subtask_id: Some(sub.id),
                    });
                } else if !subtask_dep_resolves(tasks, task, dep) {
                    violations.push(Violation::MissingDependency {
                        task_id: task.id,
                        subtask_id: Some(sub.id),
                        dependency: dep,
                    });
                }
            }
        }
    }

    violations.extend(find_cycles(tasks));
    violations
}

/// Detect task-level dependency cycles with an iterative DFS.
fn find_cycles(tasks: &[Task]) -> Vec<Violation> {
    let mut cycles = Vec::new();
    let mut done: HashSet<u64> = HashSet::new();

    for task in tasks {
        if done.contains(&task.id) {
            continue;
        }
        // DFS from this task, tracking the current path for cycle reporting.
        let mut stack: Vec<(u64, usize)> = vec![(task.id, 0)];
        let mut path: Vec<u64> = Vec::new();
        let mut on_path: HashSet<u64> = HashSet::new();

        while let Some((id, child_idx)) = stack.pop() {
            if child_idx == 0 {
                path.push(id);
                on_path.insert(id);
            }

            let neighbors = tasks
                .iter()
                .find(|t| t.id == id)
                .map(|t| task_neighbors(tasks, t))
                .unwrap_or_default();

            if child_idx < neighbors.len() {
                stack.push((id, child_idx + 1));
                let next = neighbors[child_idx];
                if on_path.contains(&next) {
                    // Found a cycle: slice the current path from `next`.
                    let start = path.iter().position(|&p| p == next).unwrap_or(0);
                    let mut cycle_path: Vec<u64> = path[start..].to_vec();
                    cycle_path.push(next);
                    if !cycles.iter().any(|c| matches!(c, Violation::Cycle { path } if same_cycle(path, &cycle_path))) {
                        cycles.push(Violation::Cycle { path: cycle_path });
                    }
                } else if !done.contains(&next) {
                    stack.push((next, 0));
                }
            } else {
                path.pop();
                on_path.remove(&id);
                done.insert(id);
            }
        }
    }

    cycles
}

/// Two cycle paths are the same cycle if they contain the same edge set
/// regardless of starting point.
fn same_cycle(a: &[u64], b: &[u64]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let set_a: HashSet<u64> = a.iter().copied().collect();
    let set_b: HashSet<u64> = b.iter().copied().collect();
    set_a == set_b
}

/// Strip missing, self, and duplicate dependency entries in place.
///
/// Cycles between valid entries are left intact and returned in the report;
/// breaking one arbitrarily could violate intent.
pub fn fix(tasks: &mut Vec<Task>) -> FixReport {
    let mut report = FixReport::default();
    let snapshot = tasks.clone();

    for task in tasks.iter_mut() {
        let task_id = task.id;
        let mut seen: HashSet<u64> = HashSet::new();
        task.dependencies.retain(|&dep| {
            if dep == task_id {
                report.changes.push(FixChange::RemovedSelf {
                    task_id,
                    subtask_id: None,
                });
                return false;
            }
            if !task_exists(&snapshot, dep) {
                report.changes.push(FixChange::RemovedMissing {
                    task_id,
                    subtask_id: None,
                    dependency: dep,
                });
                return false;
            }
            if !seen.insert(dep) {
                report.changes.push(FixChange::RemovedDuplicate {
                    task_id,
                    subtask_id: None,
                    dependency: dep,
                });
                return false;
            }
            true
        });

        let sibling_ids: HashSet<u64> = task.subtasks.iter().map(|s| s.id).collect();
        for sub in task.subtasks.iter_mut() {
            let sub_id = sub.id;
            let mut seen: HashSet<u64> = HashSet::new();
            sub.dependencies.retain(|&dep| {
                if dep == sub_id {
                    report.changes.push(FixChange::RemovedSelf {
                        task_id,
                        subtask_id: Some(sub_id),
                    });
                    return false;
                }
                if !sibling_ids.contains(&dep) && !task_exists(&snapshot, dep) {
                    report.changes.push(FixChange::RemovedMissing {
                        task_id,
                        subtask_id: Some(sub_id),
                        dependency: dep,
                    });
                    return false;
                }
                if !seen.insert(dep) {
                    report.changes.push(FixChange::RemovedDuplicate {
                        task_id,
                        subtask_id: Some(sub_id),
                        dependency: dep,
                    });
                    return false;
                }
                true
            });
        }
    }

    report.cycles = find_cycles(tasks);
    report
}

/// Remove every reference to a removed task from the remaining dependency
/// lists. Subtask entries shadowed by a sibling of the same id are left
/// alone: by the disambiguation rule they never referred to the task.
pub fn prune_task_references(tasks: &mut [Task], removed_id: u64) {
    for task in tasks.iter_mut() {
        task.dependencies.retain(|&dep| dep != removed_id);
        let sibling_ids: HashSet<u64> = task.subtasks.iter().map(|s| s.id).collect();
        for sub in task.subtasks.iter_mut() {
            sub.dependencies
                .retain(|&dep| dep != removed_id || sibling_ids.contains(&dep));
        }
    }
}

/// Remove sibling references to a removed subtask. Only siblings within the
/// same parent can reference it, so other tasks are untouched.
pub fn prune_subtask_references(tasks: &mut [Task], parent_id: u64, removed_subtask_id: u64) {
    if let Some(parent) = tasks.iter_mut().find(|t| t.id == parent_id) {
        for sub in parent.subtasks.iter_mut() {
            sub.dependencies.retain(|&dep| dep != removed_subtask_id);
        }
    }
}
