use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{info, warn};

use super::{AgentIdentity, AgentResponse, AgentTask, InvokeOptions, InvokerSettings, RoleAgent, RuleBoundInvoker};
use crate::core::error::CrewResult;
use crate::core::llm::LlmClient;
use crate::core::store::Store;

pub const PLANNER_ID: &str = "pm-001";
pub const PLANNER_NAME: &str = "PM Assistant";
pub const PLANNER_ROLE: &str = "pm";

/// A numbered item (`1.`) or a priority tag (`[P0]`..`[P2]`, `(p1)`), possibly
/// stacked as in `2. [P1] Build API`.
static TASK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:\d+\.|[\(\[][Pp][0-2][\)\]])\s*)+").expect("task prefix pattern")
});

/// Picks task titles out of free-text planner output. Lines without a
/// recognised prefix are dropped, as are prefixes with nothing after them.
pub fn parse_task_titles(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let prefix = TASK_PREFIX.find(line)?;
            let title = line[prefix.end()..].trim();
            (!title.is_empty()).then(|| title.to_string())
        })
        .collect()
}

pub struct PlannerAgent {
    invoker: RuleBoundInvoker,
}

impl PlannerAgent {
    pub async fn new(
        store: Arc<Store>,
        llm: Option<Arc<dyn LlmClient>>,
        settings: InvokerSettings,
    ) -> CrewResult<Self> {
        let identity = AgentIdentity::new(PLANNER_ID, PLANNER_NAME, PLANNER_ROLE);
        let invoker = RuleBoundInvoker::new(identity, store, llm, settings).await?;
        Ok(Self { invoker })
    }

    /// Turns one requirement into an ordered list of task titles.
    pub async fn decompose(
        &self,
        requirement: &str,
        project_id: Option<&str>,
    ) -> CrewResult<Vec<String>> {
        let prompt = format!(
            "## Requirement\n\n{}\n\nAnalyse the requirement and break it down into a task list, one task per line.",
            requirement.trim()
        );
        let options = InvokeOptions {
            project_id: project_id.map(str::to_string),
            ..Default::default()
        };
        let response = self.invoker.invoke(&prompt, options).await?;
        let titles = parse_task_titles(response.text());
        if titles.is_empty() {
            warn!("{} produced no task lines", PLANNER_NAME);
        } else {
            info!("{} decomposed requirement into {} tasks", PLANNER_NAME, titles.len());
        }
        Ok(titles)
    }
}

#[async_trait]
impl RoleAgent for PlannerAgent {
    fn invoker(&self) -> &RuleBoundInvoker {
        &self.invoker
    }

    async fn execute_task(&self, task: &AgentTask) -> CrewResult<AgentResponse> {
        info!("{} analysing task: {}", PLANNER_NAME, task.title);
        let prompt = format!(
            "## Task\n\n**Title**: {}\n**Description**: {}\n\nAnalyse this requirement following the PM rules and break it down into concrete tasks.",
            task.title, task.description
        );
        self.invoker
            .invoke(&prompt, InvokeOptions::for_task(task.project_id.as_deref(), &task.id))
            .await
    }
}
