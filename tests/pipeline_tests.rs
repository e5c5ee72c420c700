//! End-to-end pipeline behavior over a temp-dir document with scripted
//! providers.

mod common;

use common::{
    MockProvider, MockResponse, assert_referential_integrity, read_tasks, seed_tasks, subtask,
    task, test_context,
};
use tasksmith::error::ErrorCode;
use tasksmith::ops::add_task::{AddTaskArgs, add_task};
use tasksmith::ops::expand::{ExpandArgs, expand_all, expand_task};
use tasksmith::ops::parse_prd::parse_prd;
use tasksmith::ops::remove::{remove_subtask, remove_tasks};
use tasksmith::ops::status::set_status;
use tasksmith::ops::subtasks::{AddSubtaskArgs, add_subtask};
use tasksmith::ops::update::{update_subtask, update_task, update_tasks};
use tasksmith::types::TaskStatus;

const EXPAND_PAYLOAD: &str = r#"{"subtasks":[
    {"title":"Design the schema","description":"Define the data shapes"},
    {"title":"Implement the core","description":"Build it","dependencies":[1]}
]}"#;

fn tasks_file_contents(ctx: &tasksmith::ops::OpContext) -> String {
    std::fs::read_to_string(&ctx.config.paths.tasks_file).unwrap()
}

// ---------------------------------------------------------------------------
// addTask
// ---------------------------------------------------------------------------

#[tokio::test]
async fn add_task_assigns_max_plus_one_and_drops_unknown_deps() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![task(1, vec![]), task(7, vec![1])]);

    let result = add_task(
        &ctx,
        AddTaskArgs {
            title: Some("New work".to_string()),
            description: Some("Do the thing".to_string()),
            dependencies: vec![1, 42],
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.id, 8);
    assert_eq!(result.dropped_dependencies, vec![42]);

    let tasks = read_tasks(&ctx);
    let added = tasks.iter().find(|t| t.id == 8).unwrap();
    assert_eq!(added.dependencies, vec![1]);
    assert_referential_integrity(&ctx);
}

#[tokio::test]
async fn add_task_drafted_by_model() {
    let dir = tempfile::tempdir().unwrap();
    let drafted = r#"{"title":"Wire up auth","description":"Add login","priority":"high","dependencies":[3]}"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(drafted.to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(3, vec![])]);

    let result = add_task(
        &ctx,
        AddTaskArgs {
            prompt: Some("add a login flow".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.id, 4);
    let tasks = read_tasks(&ctx);
    let added = tasks.iter().find(|t| t.id == 4).unwrap();
    assert_eq!(added.title, "Wire up auth");
    assert_eq!(added.dependencies, vec![3]);
}

#[tokio::test]
async fn add_task_without_title_or_prompt_fails() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![]);

    let err = add_task(&ctx, AddTaskArgs::default()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingRequiredField);
}

// ---------------------------------------------------------------------------
// expandTask
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expand_generates_subtasks_with_local_ids() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![])]);

    let result = expand_task(&ctx, 1, ExpandArgs::default()).await.unwrap();

    assert!(!result.noop);
    assert_eq!(result.subtasks.len(), 2);
    assert_eq!(result.subtasks[0].id, 1);
    assert_eq!(result.subtasks[1].id, 2);
    assert_eq!(result.subtasks[1].dependencies, vec![1]);
    assert_referential_integrity(&ctx);
}

#[tokio::test]
async fn expand_is_a_noop_when_subtasks_exist_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    let mut seeded = task(1, vec![]);
    seeded.subtasks.push(subtask(1, TaskStatus::Pending));
    seed_tasks(&ctx, vec![seeded]);

    let before = tasks_file_contents(&ctx);
    let result = expand_task(&ctx, 1, ExpandArgs::default()).await.unwrap();
    let after = tasks_file_contents(&ctx);

    assert!(result.noop);
    assert_eq!(result.subtasks.len(), 1);
    assert_eq!(result.subtasks[0].title, "Subtask 1");
    // No write happened at all.
    assert_eq!(before, after);
}

#[tokio::test]
async fn expand_force_replaces_and_takes_a_backup() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    let mut seeded = task(1, vec![]);
    seeded.subtasks.push(subtask(9, TaskStatus::Pending));
    seed_tasks(&ctx, vec![seeded]);

    let result = expand_task(
        &ctx,
        1,
        ExpandArgs {
            force: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.subtasks.len(), 2);
    assert_eq!(result.subtasks[0].id, 1);

    let backups: Vec<_> = std::fs::read_dir(&ctx.config.paths.backup_dir)
        .unwrap()
        .collect();
    assert_eq!(backups.len(), 1);
}

#[tokio::test]
async fn expand_append_continues_local_ids() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    let mut seeded = task(1, vec![]);
    seeded.subtasks.push(subtask(1, TaskStatus::Done));
    seed_tasks(&ctx, vec![seeded]);

    let result = expand_task(
        &ctx,
        1,
        ExpandArgs {
            append: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(result.subtasks.len(), 3);
    assert_eq!(result.subtasks[1].id, 2);
    assert_eq!(result.subtasks[2].id, 3);
    // The model's sibling reference (1 -> first generated) is shifted past
    // the existing ids.
    assert_eq!(result.subtasks[2].dependencies, vec![2]);
}

#[tokio::test]
async fn expand_uses_complexity_report_recommendation() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![])]);
    std::fs::write(
        &ctx.config.paths.complexity_report,
        r#"{"meta":{},"complexityAnalysis":[
            {"taskId":1,"complexityScore":8.5,"recommendedSubtasks":7,
             "reasoning":"","expansionPrompt":"Focus on error handling"}
        ]}"#,
    )
    .unwrap();

    // The pipeline succeeds and consumes the report; the recommendation
    // lands in the generation prompt, which the mock ignores.
    let result = expand_task(&ctx, 1, ExpandArgs::default()).await.unwrap();
    assert!(!result.noop);
}

#[tokio::test]
async fn expand_rejects_malformed_model_output() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text("Sure! Here are your subtasks: 1. Design".to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![])]);

    let before = tasks_file_contents(&ctx);
    let err = expand_task(&ctx, 1, ExpandArgs::default()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ReconciliationFailed);
    // Failure happened before any write.
    assert_eq!(before, tasks_file_contents(&ctx));
}

// ---------------------------------------------------------------------------
// expandAll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expand_all_isolates_per_item_failures() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::new(
            "primary",
            vec![
                MockResponse::Text(EXPAND_PAYLOAD.to_string()),
                MockResponse::Error("bad auth".to_string()),
                MockResponse::Text(EXPAND_PAYLOAD.to_string()),
            ],
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![]), task(3, vec![])]);

    let result = expand_all(&ctx, None, false, false).await.unwrap();

    assert_eq!(result.tasks_to_expand, 3);
    assert_eq!(result.expanded_count, 2);
    assert_eq!(result.expansion_errors, 1);

    let tasks = read_tasks(&ctx);
    assert_eq!(tasks.iter().find(|t| t.id == 1).unwrap().subtasks.len(), 2);
    assert!(tasks.iter().find(|t| t.id == 2).unwrap().subtasks.is_empty());
    assert_eq!(tasks.iter().find(|t| t.id == 3).unwrap().subtasks.len(), 2);
}

#[tokio::test]
async fn expand_all_skips_done_and_already_expanded_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(EXPAND_PAYLOAD.to_string()),
        )],
    );
    let mut done = task(1, vec![]);
    done.status = TaskStatus::Done;
    let mut expanded = task(2, vec![]);
    expanded.subtasks.push(subtask(1, TaskStatus::Pending));
    seed_tasks(&ctx, vec![done, expanded, task(3, vec![])]);

    let result = expand_all(&ctx, None, false, false).await.unwrap();

    assert_eq!(result.tasks_to_expand, 1);
    assert_eq!(result.expanded_count, 1);
    assert_eq!(result.expansion_errors, 0);
}

#[tokio::test]
async fn expand_all_orders_by_complexity_score() {
    let dir = tempfile::tempdir().unwrap();
    // Two-response script: the first (higher-complexity) candidate gets a
    // valid payload, the second errors. Task 2 has the higher score, so it
    // must be expanded and task 1 must carry the error.
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::new(
            "primary",
            vec![
                MockResponse::Text(EXPAND_PAYLOAD.to_string()),
                MockResponse::Error("bad auth".to_string()),
            ],
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![])]);
    std::fs::write(
        &ctx.config.paths.complexity_report,
        r#"{"meta":{},"complexityAnalysis":[
            {"taskId":1,"complexityScore":2.0,"recommendedSubtasks":2,"reasoning":""},
            {"taskId":2,"complexityScore":9.0,"recommendedSubtasks":5,"reasoning":""}
        ]}"#,
    )
    .unwrap();

    let result = expand_all(&ctx, None, false, false).await.unwrap();
    assert_eq!(result.expanded_count, 1);
    assert_eq!(result.expansion_errors, 1);

    let tasks = read_tasks(&ctx);
    assert_eq!(tasks.iter().find(|t| t.id == 2).unwrap().subtasks.len(), 2);
    assert!(tasks.iter().find(|t| t.id == 1).unwrap().subtasks.is_empty());
}

// ---------------------------------------------------------------------------
// updateTask / updateTasks / updateSubtask
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_preserves_locked_subtask_content() {
    let dir = tempfile::tempdir().unwrap();
    // The model tries to rename a done subtask and the task itself.
    let payload = r#"{
        "id": 5,
        "title": "Renamed by model",
        "description": "fresh description",
        "subtasks": [
            {"id": 1, "title": "Y", "description": "Subtask description 1", "status": "done"}
        ]
    }"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    let mut seeded = task(5, vec![]);
    let mut locked = subtask(1, TaskStatus::Done);
    locked.title = "X".to_string();
    locked.description = "Subtask description 1".to_string();
    seeded.subtasks.push(locked);
    seed_tasks(&ctx, vec![seeded]);

    update_task(&ctx, 5, "clarify the description", false)
        .await
        .unwrap();

    let tasks = read_tasks(&ctx);
    let updated = tasks.iter().find(|t| t.id == 5).unwrap();
    assert_eq!(updated.title, "Task 5");
    assert_eq!(updated.description, "fresh description");
    assert_eq!(updated.subtasks[0].title, "X");
    assert_eq!(updated.subtasks[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn update_restores_dropped_locked_subtasks() {
    let dir = tempfile::tempdir().unwrap();
    let payload = r#"{"id":5,"title":"t","description":"fresh","subtasks":[]}"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    let mut seeded = task(5, vec![]);
    seeded.subtasks.push(subtask(1, TaskStatus::Done));
    seeded.subtasks.push(subtask(2, TaskStatus::Pending));
    seed_tasks(&ctx, vec![seeded]);

    update_task(&ctx, 5, "rewrite the plan", false).await.unwrap();

    let tasks = read_tasks(&ctx);
    let updated = tasks.iter().find(|t| t.id == 5).unwrap();
    // The done subtask came back; the pending one the model dropped stays
    // dropped.
    assert_eq!(updated.subtasks.len(), 1);
    assert_eq!(updated.subtasks[0].id, 1);
    assert_eq!(updated.subtasks[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn update_missing_description_fails_without_write() {
    let dir = tempfile::tempdir().unwrap();
    let payload = r#"{"id":5,"title":"t"}"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(5, vec![])]);

    let before = tasks_file_contents(&ctx);
    let err = update_task(&ctx, 5, "tweak", false).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ReconciliationFailed);
    assert_eq!(before, tasks_file_contents(&ctx));
}

#[tokio::test]
async fn update_tasks_leaves_unechoed_tasks_untouched() {
    let dir = tempfile::tempdir().unwrap();
    // The model only echoes task 2; tasks 1 and 3 must not change.
    let payload = r#"[{"id":2,"title":"t","description":"rewritten"}]"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![]), task(3, vec![])]);

    let result = update_tasks(&ctx, 1, "switch to the new API", false)
        .await
        .unwrap();

    assert_eq!(result.updated_ids, vec![2]);
    let tasks = read_tasks(&ctx);
    assert_eq!(tasks.iter().find(|t| t.id == 1).unwrap().description, "Description 1");
    assert_eq!(tasks.iter().find(|t| t.id == 2).unwrap().description, "rewritten");
    assert_eq!(tasks.iter().find(|t| t.id == 3).unwrap().description, "Description 3");
}

#[tokio::test]
async fn update_subtask_appends_timestamped_details() {
    let dir = tempfile::tempdir().unwrap();
    let payload = r#"{"details":"Implemented the parser with a lookahead of one."}"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    let mut seeded = task(1, vec![]);
    let mut sub = subtask(1, TaskStatus::Done);
    sub.details = "original notes".to_string();
    seeded.subtasks.push(sub);
    seed_tasks(&ctx, vec![seeded]);

    // Explicit targeting bypasses the locked-state protection.
    update_subtask(&ctx, 1, 1, "note the parser design", false)
        .await
        .unwrap();

    let tasks = read_tasks(&ctx);
    let details = &tasks[0].subtasks[0].details;
    assert!(details.starts_with("original notes"));
    assert!(details.contains("Implemented the parser"));
}

// ---------------------------------------------------------------------------
// removeTask / removeSubtask / addSubtask
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_task_cascades_dependency_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![1])]);

    let result = remove_tasks(&ctx, &["1".to_string()]).unwrap();

    assert_eq!(result.removed, vec!["1"]);
    assert!(result.errors.is_empty());
    let tasks = read_tasks(&ctx);
    assert_eq!(tasks.len(), 1);
    assert!(tasks[0].dependencies.is_empty());
    assert_referential_integrity(&ctx);
}

#[tokio::test]
async fn remove_task_batch_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![])]);

    let result = remove_tasks(
        &ctx,
        &["1".to_string(), "99".to_string(), "2".to_string()],
    )
    .unwrap();

    assert_eq!(result.removed, vec!["1", "2"]);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].id, "99");
    assert!(read_tasks(&ctx).is_empty());
}

#[tokio::test]
async fn remove_subtask_with_promotion() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    let mut parent = task(1, vec![]);
    parent.priority = tasksmith::types::Priority::High;
    parent.subtasks.push(subtask(1, TaskStatus::Pending));
    seed_tasks(&ctx, vec![parent, task(2, vec![])]);

    let result = remove_subtask(&ctx, 1, 1, true).unwrap();

    assert_eq!(result.promoted_to, Some(3));
    let tasks = read_tasks(&ctx);
    let promoted = tasks.iter().find(|t| t.id == 3).unwrap();
    // Inherits the parent's priority and depends on the parent.
    assert_eq!(promoted.priority, tasksmith::types::Priority::High);
    assert_eq!(promoted.dependencies, vec![1]);
    assert!(tasks.iter().find(|t| t.id == 1).unwrap().subtasks.is_empty());
    assert_referential_integrity(&ctx);
}

#[tokio::test]
async fn add_subtask_demotion_rejects_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    // Task 4 depends on task 7; demoting 4 under 7 would close a loop.
    seed_tasks(&ctx, vec![task(4, vec![7]), task(7, vec![])]);

    let before = tasks_file_contents(&ctx);
    let err = add_subtask(
        &ctx,
        7,
        AddSubtaskArgs {
            existing_task_id: Some(4),
            ..Default::default()
        },
    )
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::DependencyCycle);
    // Both tasks are exactly as they were.
    assert_eq!(before, tasks_file_contents(&ctx));
}

#[tokio::test]
async fn add_subtask_demotion_moves_task_content() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![task(1, vec![]), task(2, vec![])]);

    let result = add_subtask(
        &ctx,
        1,
        AddSubtaskArgs {
            existing_task_id: Some(2),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(result.subtask_id, 1);
    let tasks = read_tasks(&ctx);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].subtasks[0].title, "Task 2");
    assert_referential_integrity(&ctx);
}

// ---------------------------------------------------------------------------
// setStatus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn set_status_done_cascades_to_subtasks() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    let mut seeded = task(1, vec![]);
    seeded.subtasks.push(subtask(1, TaskStatus::Pending));
    seeded.subtasks.push(subtask(2, TaskStatus::InProgress));
    seed_tasks(&ctx, vec![seeded]);

    set_status(&ctx, &["1".to_string()], "done").unwrap();

    let tasks = read_tasks(&ctx);
    assert_eq!(tasks[0].status, TaskStatus::Done);
    assert!(tasks[0].subtasks.iter().all(|s| s.status == TaskStatus::Done));
}

#[tokio::test]
async fn set_status_on_subtask_does_not_complete_parent() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    let mut seeded = task(1, vec![]);
    seeded.subtasks.push(subtask(1, TaskStatus::Done));
    seeded.subtasks.push(subtask(2, TaskStatus::Pending));
    seed_tasks(&ctx, vec![seeded]);

    set_status(&ctx, &["1.2".to_string()], "done").unwrap();

    let tasks = read_tasks(&ctx);
    // All subtasks done, but the parent is only nudged, never auto-set.
    assert!(tasks[0].subtasks.iter().all(|s| s.status == TaskStatus::Done));
    assert_eq!(tasks[0].status, TaskStatus::Pending);
}

#[tokio::test]
async fn set_status_rejects_unknown_status() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);
    seed_tasks(&ctx, vec![task(1, vec![])]);

    let err = set_status(&ctx, &["1".to_string()], "finished").unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidFieldValue);
}

// ---------------------------------------------------------------------------
// parsePrd
// ---------------------------------------------------------------------------

#[tokio::test]
async fn parse_prd_creates_numbered_tasks_with_remapped_deps() {
    let dir = tempfile::tempdir().unwrap();
    let payload = r#"{"tasks":[
        {"title":"Set up project","description":"scaffold"},
        {"title":"Build API","description":"endpoints","dependencies":[1]}
    ]}"#;
    let ctx = test_context(
        dir.path(),
        vec![MockProvider::always(
            "primary",
            MockResponse::Text(payload.to_string()),
        )],
    );
    let prd = dir.path().join("prd.txt");
    std::fs::write(&prd, "Build a small service.").unwrap();

    let result = parse_prd(&ctx, &prd, Some(2), false, false).await.unwrap();

    assert_eq!(result.created_ids, vec![1, 2]);
    let tasks = read_tasks(&ctx);
    assert_eq!(tasks[1].dependencies, vec![1]);
    assert_referential_integrity(&ctx);
}

#[tokio::test]
async fn parse_prd_missing_file_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_context(dir.path(), vec![]);

    let err = parse_prd(&ctx, &dir.path().join("absent.txt"), None, false, false)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FileNotFound);
}
