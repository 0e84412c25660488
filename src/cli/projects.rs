use anyhow::Result;
use console::style;

use super::{CliContext, join_tail, required_arg};
use crate::core::model::TaskStatus;
use crate::core::terminal::{
    GuideSection, preview, print_error, print_info, print_launch, print_success, print_warn,
};

pub(super) async fn start_project(ctx: &CliContext, args: &[String]) -> Result<()> {
    let requirement = join_tail(args, 2);
    if requirement.is_empty() {
        print_error("Usage: taskcrew start <requirement>");
        return Ok(());
    }
    if ctx.config.llm.credential().is_none() {
        print_warn("No API credential configured; agents will answer with placeholders.");
    }

    print_launch(&format!("Starting project: {}", requirement));
    let started = ctx.coordinator.start_project(&requirement).await?;

    print_success(&format!(
        "Project {} created with {} task(s)",
        started.project.id,
        started.tasks.len()
    ));
    for (i, task) in started.tasks.iter().enumerate() {
        println!(
            "  {:>2}. {}  {}",
            i + 1,
            task.title,
            style(&task.id).dim()
        );
    }
    if started.tasks.is_empty() {
        print_info("The planner returned no task lines. Check `taskcrew feedback` for its raw output.");
    }
    Ok(())
}

pub(super) async fn run_task(ctx: &CliContext, args: &[String]) -> Result<()> {
    let Some(task_id) = required_arg(args, 2, "run <task-id>") else {
        return Ok(());
    };

    let run = ctx.coordinator.execute_task(task_id).await?;
    match run.response.degraded_reason() {
        Some(reason) => print_warn(&format!(
            "Task {} completed with a placeholder response ({})",
            run.task.id,
            reason.as_str()
        )),
        None => print_success(&format!("Task {} completed", run.task.id)),
    }
    println!("\n{}\n", run.response.text());
    Ok(())
}

pub(super) async fn list_projects(ctx: &CliContext) -> Result<()> {
    let projects = ctx.coordinator.get_projects().await?;
    if projects.is_empty() {
        print_info("No projects yet. Start one with `taskcrew start <requirement>`.");
        return Ok(());
    }

    let mut section = GuideSection::new("Projects");
    for project in &projects {
        section = section.status(
            &project.id,
            &format!(
                "[{}] {}  {}",
                project.status,
                preview(&project.description, 60),
                style(&project.created_at).dim()
            ),
        );
    }
    section.print();
    println!();
    Ok(())
}

fn status_label(status: TaskStatus) -> String {
    let label = status.as_str();
    match status {
        TaskStatus::Pending => style(label).dim().to_string(),
        TaskStatus::Running => style(label).yellow().to_string(),
        TaskStatus::Completed => style(label).green().to_string(),
        TaskStatus::Failed => style(label).red().to_string(),
    }
}

pub(super) async fn list_tasks(ctx: &CliContext, args: &[String]) -> Result<()> {
    let Some(project_id) = required_arg(args, 2, "tasks <project-id>") else {
        return Ok(());
    };

    let project = ctx.coordinator.get_project(project_id).await?;
    let tasks = ctx.coordinator.get_project_tasks(project_id).await?;

    let mut section = GuideSection::new(&format!("{} ({})", project.name, project.id));
    for task in &tasks {
        section = section.status(
            &task.id,
            &format!(
                "{:<9} {}  {}",
                status_label(task.status),
                task.title,
                style(task.agent_id.as_deref().unwrap_or("-")).dim()
            ),
        );
    }
    if tasks.is_empty() {
        section = section.status("tasks", "none");
    }
    section.print();
    println!();
    Ok(())
}
