//! Dependency graph validation, repair, and cycle detection.

mod common;

use common::{subtask, task};
use tasksmith::graph::{self, FixChange, Violation};
use tasksmith::types::{Task, TaskStatus};

#[test]
fn validate_accepts_a_clean_graph() {
    let tasks = vec![task(1, vec![]), task(2, vec![1]), task(3, vec![1, 2])];
    assert!(graph::validate(&tasks).is_empty());
}

#[test]
fn validate_reports_missing_dependency() {
    let tasks = vec![task(1, vec![42])];
    let violations = graph::validate(&tasks);
    assert_eq!(
        violations,
        vec![Violation::MissingDependency {
            task_id: 1,
            subtask_id: None,
            dependency: 42
        }]
    );
}

#[test]
fn validate_reports_subtask_missing_dependency() {
    let mut t = task(1, vec![]);
    let mut s = subtask(1, TaskStatus::Pending);
    s.dependencies = vec![99];
    t.subtasks.push(s);

    let violations = graph::validate(&[t]);
    assert_eq!(
        violations,
        vec![Violation::MissingDependency {
            task_id: 1,
            subtask_id: Some(1),
            dependency: 99
        }]
    );
}

#[test]
fn sibling_subtask_dependencies_resolve() {
    let mut t = task(1, vec![]);
    t.subtasks.push(subtask(1, TaskStatus::Pending));
    let mut s2 = subtask(2, TaskStatus::Pending);
    s2.dependencies = vec![1]; // sibling, not task 1
    t.subtasks.push(s2);

    assert!(graph::validate(&[t]).is_empty());
}

#[test]
fn validate_reports_two_task_cycle() {
    let tasks = vec![task(1, vec![2]), task(2, vec![1])];
    let violations = graph::validate(&tasks);
    assert!(violations.iter().any(|v| matches!(v, Violation::Cycle { .. })));
}

#[test]
fn fix_removes_duplicates_and_missing_but_keeps_cycles() {
    let mut tasks = vec![task(1, vec![2, 2, 77]), task(2, vec![1])];
    let report = graph::fix(&mut tasks);

    assert_eq!(tasks[0].dependencies, vec![2]);
    assert_eq!(tasks[1].dependencies, vec![1]);
    assert!(report.changes.contains(&FixChange::RemovedDuplicate {
        task_id: 1,
        subtask_id: None,
        dependency: 2
    }));
    assert!(report.changes.contains(&FixChange::RemovedMissing {
        task_id: 1,
        subtask_id: None,
        dependency: 77
    }));
    assert_eq!(report.cycles.len(), 1);
}

#[test]
fn is_dependent_on_follows_subtask_links() {
    // Task 1's subtask depends on task 3 through task 2.
    let mut t1 = task(1, vec![]);
    let mut s = subtask(1, TaskStatus::Pending);
    s.dependencies = vec![2];
    t1.subtasks.push(s);
    let tasks = vec![t1, task(2, vec![3]), task(3, vec![])];

    assert!(graph::is_dependent_on(&tasks, 1, 3));
    assert!(!graph::is_dependent_on(&tasks, 3, 1));
}

#[test]
fn prune_task_references_clears_all_lists() {
    let mut t3 = task(3, vec![1]);
    let mut s2 = subtask(2, TaskStatus::Pending);
    s2.dependencies = vec![1]; // no sibling with id 1: refers to task 1
    t3.subtasks.push(s2);
    let mut s3 = subtask(3, TaskStatus::Pending);
    s3.dependencies = vec![2]; // sibling reference
    t3.subtasks.push(s3);

    let mut tasks = vec![task(2, vec![1]), t3];
    graph::prune_task_references(&mut tasks, 1);

    assert!(tasks[0].dependencies.is_empty());
    assert!(tasks[1].dependencies.is_empty());
    // The external reference to task 1 is gone, the sibling one survives.
    assert!(tasks[1].subtasks[0].dependencies.is_empty());
    assert_eq!(tasks[1].subtasks[1].dependencies, vec![2]);
}

// Pseudo-random graphs: build DAGs from a seeded LCG, then induce a cycle
// and assert it is detected. Deterministic, no external dependency.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }
}

fn random_dag(seed: u64, size: u64) -> Vec<Task> {
    let mut rng = Lcg(seed);
    (1..=size)
        .map(|id| {
            // Edges only point at lower ids, so the graph starts acyclic.
            let deps: Vec<u64> = (1..id).filter(|_| rng.next() % 3 == 0).collect();
            task(id, deps)
        })
        .collect()
}

#[test]
fn random_dags_validate_clean() {
    for seed in 1..=20 {
        let tasks = random_dag(seed, 12);
        let cycles: Vec<_> = graph::validate(&tasks)
            .into_iter()
            .filter(|v| matches!(v, Violation::Cycle { .. }))
            .collect();
        assert!(cycles.is_empty(), "seed {} produced {:?}", seed, cycles);
    }
}

#[test]
fn induced_cycles_are_detected() {
    for seed in 1..=20 {
        let mut tasks = random_dag(seed, 12);
        // Close a loop: make task 1 depend on the highest task that
        // transitively depends on it, or on task 12 directly otherwise.
        let target = tasks
            .iter()
            .rev()
            .find(|t| graph::is_dependent_on(&tasks, t.id, 1))
            .map(|t| t.id)
            .unwrap_or(12);
        tasks[0].dependencies.push(target);
        if target == 12 && !graph::is_dependent_on(&tasks, 12, 1) {
            let idx = tasks.iter().position(|t| t.id == 12).unwrap();
            tasks[idx].dependencies.push(1);
        }

        let cycles: Vec<_> = graph::validate(&tasks)
            .into_iter()
            .filter(|v| matches!(v, Violation::Cycle { .. }))
            .collect();
        assert!(!cycles.is_empty(), "seed {} cycle not detected", seed);
    }
}
