//! Error taxonomy for orchestration requests.
//!
//! AI capability failures are not part of this enum: the agent layer turns
//! them into a degraded response plus an audit record.

use thiserror::Error;

use crate::core::model::TaskStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Project,
    Task,
    Agent,
    AgentRule,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Project => "project",
            EntityKind::Task => "task",
            EntityKind::Agent => "agent",
            EntityKind::AgentRule => "agent rule",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum CrewError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("task {task_id} failed: {source}")]
    TaskExecution {
        task_id: String,
        #[source]
        source: Box<CrewError>,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl CrewError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        CrewError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CrewError::NotFound { .. })
    }
}

pub type CrewResult<T> = Result<T, CrewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity_and_id() {
        let err = CrewError::not_found(EntityKind::Task, "task_123");
        assert_eq!(err.to_string(), "task not found: task_123");
        assert!(err.is_not_found());
    }

    #[test]
    fn task_execution_keeps_the_cause() {
        let cause = CrewError::Storage(anyhow::anyhow!("disk full"));
        let err = CrewError::TaskExecution {
            task_id: "task_1".to_string(),
            source: Box::new(cause),
        };
        assert!(err.to_string().contains("disk full"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
