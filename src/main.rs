//! tasksmith
//!
//! CLI entry point: resolves configuration and the active tag, wires the
//! provider registry, and dispatches to the mutation pipelines.

use clap::Parser;
use tasksmith::ai::{self, Orchestrator};
use tasksmith::cli::{Cli, Command, parse_id_list, parse_numeric_ids};
use tasksmith::config::Config;
use tasksmith::error::EngineResult;
use tasksmith::logging::Logger;
use tasksmith::ops::{
    self, OpContext,
    add_task::{AddTaskArgs, add_task},
    expand::{ExpandArgs, expand_all, expand_task},
    parse_prd::parse_prd,
    remove::{remove_subtask, remove_tasks},
    status::set_status,
    subtasks::{AddSubtaskArgs, add_subtask},
    update::{update_subtask, update_task, update_tasks},
};
use tasksmith::store::TaskStore;
use tasksmith::tags;
use tracing_subscriber::EnvFilter;

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("failed to render output: {}", e),
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path).map_err(tasksmith::error::EngineError::from)?,
        None => Config::load_or_default(),
    };

    let logger = Logger::new().with_name("tasksmith");
    let registry = ai::registry_from_env(&logger);
    let orchestrator = Orchestrator::new(registry, config.ai.clone());
    let tag = tags::TagContext::resolve(
        cli.tag.as_deref(),
        &config.paths.state_file,
        &config.defaults.tag,
    )?;
    let ctx = OpContext::new(config, logger, orchestrator, tag);

    match cli.command {
        Command::AddTask {
            prompt,
            title,
            description,
            details,
            test_strategy,
            priority,
            dependencies,
            research,
        } => {
            let args = AddTaskArgs {
                prompt,
                title,
                description,
                details,
                test_strategy,
                priority,
                dependencies: dependencies.as_deref().map(parse_numeric_ids).unwrap_or_default(),
                research,
            };
            let result = add_task(&ctx, args).await?;
            print_json(&result);
        }

        Command::Expand {
            id,
            num,
            context,
            force,
            append,
            research,
        } => {
            let args = ExpandArgs {
                count: num,
                research,
                context,
                force,
                append,
            };
            let result = expand_task(&ctx, id, args).await?;
            print_json(&result);
        }

        Command::ExpandAll {
            num,
            force,
            research,
        } => {
            let result = expand_all(&ctx, num, research, force).await?;
            print_json(&result);
        }

        Command::UpdateTask {
            id,
            prompt,
            research,
        } => {
            let result = update_task(&ctx, id, &prompt, research).await?;
            print_json(&result);
        }

        Command::Update {
            from,
            prompt,
            research,
        } => {
            let result = update_tasks(&ctx, from, &prompt, research).await?;
            print_json(&result);
        }

        Command::UpdateSubtask {
            id,
            prompt,
            research,
        } => {
            let (parent_id, subtask_id) = match ops::parse_entity_id(&id)? {
                ops::EntityId::Subtask(p, s) => (p, s),
                ops::EntityId::Task(_) => {
                    return Err(tasksmith::error::EngineError::invalid_value(
                        "id",
                        "expected a subtask id of the form parent.subtask",
                    ));
                }
            };
            let result = update_subtask(&ctx, parent_id, subtask_id, &prompt, research).await?;
            print_json(&result);
        }

        Command::SetStatus { id, status } => {
            let result = set_status(&ctx, &parse_id_list(&id), &status)?;
            print_json(&result);
        }

        Command::RemoveTask { id } => {
            let result = remove_tasks(&ctx, &parse_id_list(&id))?;
            print_json(&result);
        }

        Command::AddSubtask {
            parent,
            task_id,
            title,
            description,
            details,
            dependencies,
        } => {
            let args = AddSubtaskArgs {
                existing_task_id: task_id,
                title,
                description,
                details,
                dependencies: dependencies.as_deref().map(parse_numeric_ids).unwrap_or_default(),
            };
            let result = add_subtask(&ctx, parent, args)?;
            print_json(&result);
        }

        Command::RemoveSubtask { id, convert } => {
            let (parent_id, subtask_id) = match ops::parse_entity_id(&id)? {
                ops::EntityId::Subtask(p, s) => (p, s),
                ops::EntityId::Task(_) => {
                    return Err(tasksmith::error::EngineError::invalid_value(
                        "id",
                        "expected a subtask id of the form parent.subtask",
                    ));
                }
            };
            let result = remove_subtask(&ctx, parent_id, subtask_id, convert)?;
            print_json(&result);
        }

        Command::ParsePrd {
            input,
            num_tasks,
            append,
            research,
        } => {
            let result = parse_prd(&ctx, &input, num_tasks, research, append).await?;
            print_json(&result);
        }

        Command::Tags => {
            let store = TaskStore::load_or_create(&ctx.config.paths.tasks_file)?;
            let summaries = tags::list_tags(&store, &ctx.tag);
            print_json(&summaries);
        }

        Command::AddTag {
            name,
            from_branch,
            copy_from,
            description,
        } => {
            let mut store = TaskStore::load_or_create(&ctx.config.paths.tasks_file)?;
            let created = match (from_branch, name) {
                (Some(branch), _) => {
                    tags::create_tag_from_branch(&mut store, &branch, copy_from.as_deref())?
                }
                (None, Some(name)) => {
                    tags::create_tag(&mut store, &name, copy_from.as_deref(), description)?;
                    name
                }
                (None, None) => {
                    return Err(tasksmith::error::EngineError::missing_field("name"));
                }
            };
            store.save()?;
            ctx.logger.success(&format!("created tag {}", created));
        }

        Command::DeleteTag { name } => {
            let mut store = TaskStore::load(&ctx.config.paths.tasks_file)?;
            tags::delete_tag(&mut store, &name, &ctx.tag)?;
            store.save()?;
            ctx.logger.success(&format!("deleted tag {}", name));
        }

        Command::UseTag { name } => {
            let store = TaskStore::load(&ctx.config.paths.tasks_file)?;
            tags::use_tag(&store, &name, &ctx.config.paths.state_file)?;
            ctx.logger.success(&format!("active tag is now {}", name));
        }

        Command::ValidateDependencies => {
            let violations = ops::validate_dependencies(&ctx)?;
            print_json(&violations);
        }

        Command::FixDependencies => {
            let report = ops::fix_dependencies(&ctx)?;
            print_json(&report);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Err(err) = run(cli).await {
        // Structured diagnostics for scripts, readable message for humans.
        eprintln!(
            "error[{}]: {}",
            serde_json::to_string(&err.code).unwrap_or_else(|_| "\"UNKNOWN\"".into()),
            err.message
        );
        std::process::exit(1);
    }
}
