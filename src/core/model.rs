//! Enumerated states shared by the store, the agents and the coordinator,
//! plus the task transition table and input validation helpers.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::core::error::CrewError;

/// Generates the SQLite text mapping for a status-like enum.
macro_rules! sql_text_enum {
    ($ty:ident) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                $ty::from_status(text).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} '{}'", stringify!($ty), text).into())
                })
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Paused,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Paused => "paused",
            ProjectStatus::Completed => "completed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ProjectStatus::Active),
            "paused" => Some(ProjectStatus::Paused),
            "completed" => Some(ProjectStatus::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Busy,
    Offline,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Busy => "busy",
            AgentStatus::Offline => "offline",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "idle" => Some(AgentStatus::Idle),
            "busy" => Some(AgentStatus::Busy),
            "offline" => Some(AgentStatus::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    Create,
    Update,
    Delete,
    Rename,
}

impl ModificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModificationType::Create => "create",
            ModificationType::Update => "update",
            ModificationType::Delete => "delete",
            ModificationType::Rename => "rename",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "create" => Some(ModificationType::Create),
            "update" => Some(ModificationType::Update),
            "delete" => Some(ModificationType::Delete),
            "rename" => Some(ModificationType::Rename),
            _ => None,
        }
    }
}

sql_text_enum!(ProjectStatus);
sql_text_enum!(TaskStatus);
sql_text_enum!(AgentStatus);
sql_text_enum!(ModificationType);

/// Task lifecycle: `pending -> running -> {completed | failed}`.
///
/// Nothing re-enters `pending`, and `failed` is only reachable once an
/// execution attempt has started.
pub fn can_transition(from: TaskStatus, to: TaskStatus) -> bool {
    match from {
        TaskStatus::Pending => matches!(to, TaskStatus::Running),
        TaskStatus::Running => matches!(to, TaskStatus::Completed | TaskStatus::Failed),
        TaskStatus::Completed | TaskStatus::Failed => false,
    }
}

/// `<prefix>_<uuid>` identifiers for every stored entity.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

pub fn require_non_empty(field: &'static str, value: &str) -> Result<(), CrewError> {
    if value.trim().is_empty() {
        return Err(CrewError::Validation {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

/// Role names are short lowercase slugs (`pm`, `dev`, `qa`, ...).
pub fn validate_role(role: &str) -> Result<(), CrewError> {
    require_non_empty("role", role)?;
    let valid = role.len() <= 32
        && role
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(CrewError::Validation {
            field: "role",
            reason: format!(
                "'{}' must be at most 32 chars of [a-z0-9_-]",
                role
            ),
        });
    }
    Ok(())
}
