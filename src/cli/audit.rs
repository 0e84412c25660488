use anyhow::Result;
use console::style;

use super::{CliContext, required_arg};
use crate::core::terminal::{GuideSection, preview, print_info};

pub(super) async fn show_feedback(ctx: &CliContext, args: &[String]) -> Result<()> {
    let Some(task_id) = required_arg(args, 2, "feedback <task-id>") else {
        return Ok(());
    };

    let records = ctx.coordinator.task_feedback(task_id).await?;
    if records.is_empty() {
        print_info(&format!("No AI calls recorded for {}", task_id));
        return Ok(());
    }

    for record in &records {
        let outcome = record.outcome().unwrap_or("unknown");
        let outcome = if outcome == "success" {
            style(outcome).green().to_string()
        } else {
            style(outcome).yellow().to_string()
        };
        GuideSection::new(&record.id)
            .status("When", &record.created_at)
            .status("Agent", &record.agent_id)
            .status("Model", &record.model)
            .status("Outcome", &outcome)
            .status(
                "Rule version",
                &record
                    .rule_version()
                    .map_or_else(|| "default".to_string(), |v| v.to_string()),
            )
            .status(
                "Tokens",
                &record
                    .tokens_used
                    .map_or_else(|| "n/a".to_string(), |t| t.to_string()),
            )
            .status("Duration", &format!("{}ms", record.duration_ms))
            .status("Response", &preview(&record.response, 80))
            .print();
    }
    println!();
    Ok(())
}

pub(super) async fn show_stats(ctx: &CliContext) -> Result<()> {
    let stats = ctx.coordinator.stats().await?;
    GuideSection::new("Store")
        .status("Data dir", &ctx.data_dir.display().to_string())
        .blank()
        .status("Projects", &stats.projects.to_string())
        .status("Tasks", &stats.tasks.to_string())
        .status("Agents", &stats.agents.to_string())
        .status("Rules", &stats.rules.to_string())
        .status("AI calls", &stats.ai_feedback.to_string())
        .status("Modifications", &stats.code_modifications.to_string())
        .print();
    println!(
        "\n {}\n",
        style(format!("Provider: {:?}, model: {}", ctx.config.llm.provider, ctx.config.llm.model)).dim()
    );
    Ok(())
}
