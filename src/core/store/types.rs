use serde::Serialize;

use crate::core::model::{AgentStatus, ModificationType, ProjectStatus, TaskStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub project_id: String,
    /// Last agent that attempted the task.
    pub agent_id: Option<String>,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub last_heartbeat: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentRuleRecord {
    pub id: String,
    pub agent_role: String,
    pub rule_content: String,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// One AI invocation attempt, written before `invoke` returns.
#[derive(Debug, Clone)]
pub struct NewAiFeedback {
    pub id: String,
    pub agent_id: String,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub tokens_used: Option<i64>,
    pub duration_ms: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AiFeedbackRecord {
    pub id: String,
    pub agent_id: String,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub project_id: Option<String>,
    pub task_id: Option<String>,
    pub tokens_used: Option<i64>,
    pub duration_ms: i64,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl AiFeedbackRecord {
    pub fn outcome(&self) -> Option<&str> {
        self.metadata.get("outcome").and_then(|v| v.as_str())
    }

    pub fn rule_version(&self) -> Option<i64> {
        self.metadata.get("rule_version").and_then(|v| v.as_i64())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct NewCodeModification {
    pub id: String,
    pub agent_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub file_path: String,
    pub modification_type: ModificationType,
    pub before_content: Option<String>,
    pub after_content: Option<String>,
    pub diff: Option<String>,
    pub reason: Option<String>,
    pub ai_feedback_id: Option<String>,
    pub can_rollback: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeModificationRecord {
    pub id: String,
    pub agent_id: String,
    pub project_id: String,
    pub task_id: Option<String>,
    pub file_path: String,
    pub modification_type: ModificationType,
    pub before_content: Option<String>,
    pub after_content: Option<String>,
    pub diff: Option<String>,
    pub reason: Option<String>,
    pub ai_feedback_id: Option<String>,
    pub can_rollback: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub projects: i64,
    pub tasks: i64,
    pub agents: i64,
    pub rules: i64,
    pub ai_feedback: i64,
    pub code_modifications: i64,
}
