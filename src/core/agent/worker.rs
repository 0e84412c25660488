use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::{AgentIdentity, AgentResponse, AgentTask, InvokeOptions, InvokerSettings, RoleAgent, RuleBoundInvoker};
use crate::core::error::CrewResult;
use crate::core::llm::LlmClient;
use crate::core::store::Store;

pub const WORKER_ID: &str = "dev-001";
pub const WORKER_NAME: &str = "Dev Assistant";
pub const WORKER_ROLE: &str = "dev";

/// Produces the work artifact for a single task.
pub struct WorkerAgent {
    invoker: RuleBoundInvoker,
}

impl WorkerAgent {
    pub async fn new(
        store: Arc<Store>,
        llm: Option<Arc<dyn LlmClient>>,
        settings: InvokerSettings,
    ) -> CrewResult<Self> {
        let identity = AgentIdentity::new(WORKER_ID, WORKER_NAME, WORKER_ROLE);
        let invoker = RuleBoundInvoker::new(identity, store, llm, settings).await?;
        Ok(Self { invoker })
    }
}

fn task_prompt(task: &AgentTask) -> String {
    format!(
        "## Development task\n\n**Title**: {}\n**Description**: {}\n\nImplement this following the Dev rules, including:\n1. Technical design\n2. Implementation\n3. Test cases",
        task.title, task.description
    )
}

#[async_trait]
impl RoleAgent for WorkerAgent {
    fn invoker(&self) -> &RuleBoundInvoker {
        &self.invoker
    }

    async fn execute_task(&self, task: &AgentTask) -> CrewResult<AgentResponse> {
        info!("{} working on: {}", WORKER_NAME, task.title);
        self.invoker
            .invoke(
                &task_prompt(task),
                InvokeOptions::for_task(task.project_id.as_deref(), &task.id),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::FeedbackFilter;

    #[test]
    fn prompt_carries_title_and_description() {
        let task = AgentTask {
            id: "task_1".to_string(),
            project_id: None,
            title: "Build API".to_string(),
            description: "REST endpoints for todos".to_string(),
        };
        let prompt = task_prompt(&task);
        assert!(prompt.contains("**Title**: Build API"));
        assert!(prompt.contains("**Description**: REST endpoints for todos"));
        assert!(prompt.ends_with("3. Test cases"));
    }

    #[tokio::test]
    async fn execution_is_audited_against_the_task() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let worker = WorkerAgent::new(store.clone(), None, InvokerSettings::default())
            .await
            .unwrap();
        let task = AgentTask {
            id: "task_9".to_string(),
            project_id: Some("proj_9".to_string()),
            title: "Add tests".to_string(),
            description: String::new(),
        };

        let response = worker.execute_task(&task).await.unwrap();
        assert!(response.is_degraded());

        let records = store
            .list_ai_feedback(&FeedbackFilter {
                task_id: Some("task_9".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].agent_id, WORKER_ID);
        assert_eq!(records[0].project_id.as_deref(), Some("proj_9"));
    }
}
