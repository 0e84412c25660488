//! Role agents: the rule-bound invocation unit shared by every role and the
//! planner / worker variants built on it.

mod invoker;
mod planner;
mod worker;

use async_trait::async_trait;

use crate::core::error::CrewResult;
use crate::core::model::ModificationType;
use crate::core::store::{CodeModificationRecord, TaskRecord};

pub use invoker::{
    AgentIdentity, FALLBACK_RULE, InvokeOptions, InvokerSettings, RuleBoundInvoker,
    compose_prompt,
};
pub use planner::{PLANNER_ID, PLANNER_NAME, PLANNER_ROLE, PlannerAgent, parse_task_titles};
pub use worker::{WORKER_ID, WORKER_NAME, WORKER_ROLE, WorkerAgent};

/// The rule text an agent currently renders prompts with.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRule {
    pub content: String,
    /// `None` when the built-in fallback is in use.
    pub version: Option<i64>,
    pub is_fallback: bool,
}

impl LoadedRule {
    pub fn fallback() -> Self {
        Self {
            content: FALLBACK_RULE.to_string(),
            version: None,
            is_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    Unconfigured,
    Failed,
    TimedOut,
}

impl DegradedReason {
    /// The `outcome` value stored in audit metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            DegradedReason::Unconfigured => "unconfigured",
            DegradedReason::Failed => "failed",
            DegradedReason::TimedOut => "timeout",
        }
    }
}

/// Result of one invocation. Both variants point at their audit record.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentResponse {
    Real {
        text: String,
        feedback_id: String,
    },
    Degraded {
        text: String,
        feedback_id: String,
        reason: DegradedReason,
    },
}

impl AgentResponse {
    pub fn text(&self) -> &str {
        match self {
            AgentResponse::Real { text, .. } | AgentResponse::Degraded { text, .. } => text,
        }
    }

    pub fn feedback_id(&self) -> &str {
        match self {
            AgentResponse::Real { feedback_id, .. }
            | AgentResponse::Degraded { feedback_id, .. } => feedback_id,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AgentResponse::Degraded { .. })
    }

    pub fn degraded_reason(&self) -> Option<DegradedReason> {
        match self {
            AgentResponse::Degraded { reason, .. } => Some(*reason),
            AgentResponse::Real { .. } => None,
        }
    }
}

/// The slice of a task an agent needs to work on it.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTask {
    pub id: String,
    pub project_id: Option<String>,
    pub title: String,
    pub description: String,
}

impl From<&TaskRecord> for AgentTask {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id.clone(),
            project_id: Some(task.project_id.clone()),
            title: task.title.clone(),
            description: task.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub role: String,
    /// Version stored for the role right now; 0 when it has no rule.
    pub rule_version: i64,
}

/// A file-level change reported by an agent. Id, agent and rollback flag are
/// filled in when it is recorded.
#[derive(Debug, Clone)]
pub struct ModificationRequest {
    pub project_id: String,
    pub task_id: Option<String>,
    pub file_path: String,
    pub modification_type: ModificationType,
    pub before_content: Option<String>,
    pub after_content: Option<String>,
    pub diff: Option<String>,
    pub reason: Option<String>,
    pub ai_feedback_id: Option<String>,
}

impl ModificationRequest {
    pub fn new(
        project_id: impl Into<String>,
        file_path: impl Into<String>,
        modification_type: ModificationType,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            task_id: None,
            file_path: file_path.into(),
            modification_type,
            before_content: None,
            after_content: None,
            diff: None,
            reason: None,
            ai_feedback_id: None,
        }
    }
}

/// Shared surface of every role. Rule handling and auditing come from the
/// embedded invoker; each role only decides how a task is framed.
#[async_trait]
pub trait RoleAgent: Send + Sync {
    fn invoker(&self) -> &RuleBoundInvoker;

    async fn execute_task(&self, task: &AgentTask) -> CrewResult<AgentResponse>;

    fn id(&self) -> &str {
        &self.invoker().identity().id
    }

    fn role(&self) -> &str {
        &self.invoker().identity().role
    }

    async fn load_rule(&self) -> CrewResult<LoadedRule> {
        self.invoker().load_rule().await
    }

    async fn reload_rule(&self) -> CrewResult<LoadedRule> {
        self.invoker().reload_rule().await
    }

    async fn invoke(&self, prompt: &str, options: InvokeOptions) -> CrewResult<AgentResponse> {
        self.invoker().invoke(prompt, options).await
    }

    async fn record_modification(
        &self,
        request: ModificationRequest,
    ) -> CrewResult<CodeModificationRecord> {
        self.invoker().record_modification(request).await
    }

    async fn info(&self) -> CrewResult<AgentInfo> {
        self.invoker().info().await
    }
}
