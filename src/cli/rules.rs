use anyhow::{Context, Result};
use console::style;

use super::{CliContext, required_arg};
use crate::core::terminal::{GuideSection, print_info, print_status, print_success, print_warn};

pub(super) async fn list_agents(ctx: &CliContext) -> Result<()> {
    let agents = ctx.coordinator.get_agents().await?;
    let mut section = GuideSection::new("Agents");
    for agent in &agents {
        let version = match ctx.coordinator.agent_info(&agent.role).await {
            Ok(info) if info.rule_version > 0 => format!("rule v{}", info.rule_version),
            Ok(_) => "default rule".to_string(),
            Err(_) => "not loaded".to_string(),
        };
        section = section.status(
            &agent.id,
            &format!(
                "{} ({})  {}  {}",
                agent.name,
                agent.role,
                agent.status,
                style(version).dim()
            ),
        );
    }
    section.print();
    println!();
    Ok(())
}

pub(super) async fn show_rules(ctx: &CliContext, args: &[String]) -> Result<()> {
    if let Some(role) = args.get(2) {
        let rule = ctx.coordinator.get_agent_rule(role).await?;
        print_status("Role", &rule.agent_role);
        print_status("Version", &rule.version.to_string());
        print_status("Updated", &rule.updated_at);
        println!("\n{}\n", rule.rule_content);
        return Ok(());
    }

    let rules = ctx.coordinator.get_agent_rules().await?;
    if rules.is_empty() {
        print_info("No rules stored.");
        return Ok(());
    }
    let mut section = GuideSection::new("Rules");
    for rule in &rules {
        section = section.status(
            &rule.agent_role,
            &format!(
                "v{}  {} chars  {}",
                rule.version,
                rule.rule_content.chars().count(),
                style(&rule.updated_at).dim()
            ),
        );
    }
    section.print();
    println!();
    Ok(())
}

pub(super) async fn set_rule(ctx: &CliContext, args: &[String]) -> Result<()> {
    let usage = "rule-set <role> <file>";
    let (Some(role), Some(file)) = (required_arg(args, 2, usage), required_arg(args, 3, usage))
    else {
        return Ok(());
    };

    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read rule file {}", file))?;
    let rule = ctx.coordinator.update_agent_rule(role, &content).await?;

    print_success(&format!(
        "Rule for '{}' is now version {}",
        rule.agent_role, rule.version
    ));
    if ctx.coordinator.agent(role).is_none() {
        print_warn(&format!(
            "No live agent has role '{}'; the rule is stored for later use.",
            role
        ));
    }
    Ok(())
}
