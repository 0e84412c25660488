mod audit;
mod projects;
mod rules;

use anyhow::Result;
use console::style;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::core::agent::InvokerSettings;
use crate::core::config::{CrewConfig, resolve_data_dir};
use crate::core::coordinator::Coordinator;
use crate::core::llm::build_client;
use crate::core::store::Store;
use crate::core::terminal::{self, GuideSection, print_error};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Projects")
        .command("start <requirement>", "Create a project and let the planner split it into tasks")
        .command("run <task-id>", "Execute a pending task on the worker agent")
        .command("projects", "List projects")
        .command("tasks <project-id>", "List the tasks of a project")
        .print();

    GuideSection::new("Agents & Rules")
        .command("agents", "Show registered agents and their rule versions")
        .command("rules [role]", "List rules, or print the rule of one role")
        .command("rule-set <role> <file>", "Replace a role's rule with the file's content")
        .print();

    GuideSection::new("Audit")
        .command("feedback <task-id>", "Show every AI call made for a task")
        .command("stats", "Row counts of every table")
        .print();

    println!(
        "\n {} {} <command> [args]\n",
        style("Usage:").bold(),
        style("taskcrew").green()
    );
}

/// Everything a command needs, built once per process.
pub(crate) struct CliContext {
    pub data_dir: PathBuf,
    pub config: CrewConfig,
    pub coordinator: Coordinator,
}

async fn bootstrap() -> Result<CliContext> {
    let data_dir = resolve_data_dir()?;
    let config = CrewConfig::load(&data_dir).await?;
    crate::logging::init(&config.logging, &data_dir)?;
    info!("Loaded config from {}: {}", data_dir.display(), config.summary());

    let store = Arc::new(Store::open(&data_dir).await?);
    store.seed_default_rules().await?;

    let llm = build_client(&config.llm);
    let coordinator = Coordinator::new(store, llm, InvokerSettings::from(&config.llm)).await?;
    Ok(CliContext {
        data_dir,
        config,
        coordinator,
    })
}

/// Joins every argument from `start` on, so unquoted requirements work.
pub(crate) fn join_tail(args: &[String], start: usize) -> String {
    args.get(start..)
        .map(|rest| rest.join(" "))
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// The positional argument at `index`, or a usage error naming it.
pub(crate) fn required_arg<'a>(args: &'a [String], index: usize, usage: &str) -> Option<&'a str> {
    match args.get(index).map(|a| a.trim()).filter(|a| !a.is_empty()) {
        Some(arg) => Some(arg),
        None => {
            print_error(&format!("Usage: taskcrew {}", usage));
            None
        }
    }
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("help");

    if matches!(cmd, "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }

    let ctx = bootstrap().await?;
    match cmd {
        "start" => projects::start_project(&ctx, &args).await?,
        "run" => projects::run_task(&ctx, &args).await?,
        "projects" => projects::list_projects(&ctx).await?,
        "tasks" => projects::list_tasks(&ctx, &args).await?,
        "agents" => rules::list_agents(&ctx).await?,
        "rules" => rules::show_rules(&ctx, &args).await?,
        "rule-set" => rules::set_rule(&ctx, &args).await?,
        "feedback" => audit::show_feedback(&ctx, &args).await?,
        "stats" => audit::show_stats(&ctx).await?,
        _ => {
            print_error(&format!("Unknown command: {}", cmd));
            print_help();
        }
    }
    Ok(())
}
