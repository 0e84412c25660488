mod agents;
mod audit;
mod default_rules;
mod projects;
mod rules;
mod tasks;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

pub use default_rules::{DEFAULT_RULE_ROLES, default_rule_content};
pub use types::{
    AgentRecord, AgentRuleRecord, AiFeedbackRecord, CodeModificationRecord, FeedbackFilter,
    NewAiFeedback, NewCodeModification, ProjectRecord, StoreStats, TaskRecord,
};

pub const DB_FILE: &str = "taskcrew.db";

/// UTC timestamp with millisecond precision, evaluated by SQLite.
pub(crate) const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// SET clause moving `updated_at` to now, or one millisecond past its
/// previous value when the clock has not ticked since the last write.
pub(crate) const TOUCH_UPDATED_AT: &str = "updated_at = CASE
        WHEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now') > updated_at
        THEN strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
        ELSE strftime('%Y-%m-%dT%H:%M:%fZ', updated_at, '+0.001 seconds')
    END";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'paused', 'completed')),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE TABLE IF NOT EXISTS agents (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        role TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'idle' CHECK (status IN ('idle', 'busy', 'offline')),
        last_heartbeat TEXT
    )",
    "CREATE TABLE IF NOT EXISTS tasks (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL,
        agent_id TEXT,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'running', 'completed', 'failed')),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
        FOREIGN KEY (agent_id) REFERENCES agents(id) ON DELETE SET NULL
    )",
    "CREATE TABLE IF NOT EXISTS agent_rules (
        id TEXT PRIMARY KEY,
        agent_role TEXT NOT NULL UNIQUE,
        rule_content TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE TABLE IF NOT EXISTS ai_feedback (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        prompt TEXT NOT NULL,
        response TEXT NOT NULL,
        model TEXT NOT NULL,
        project_id TEXT,
        task_id TEXT,
        tokens_used INTEGER,
        duration_ms INTEGER NOT NULL CHECK (duration_ms >= 0),
        metadata TEXT NOT NULL DEFAULT '{}',
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE TABLE IF NOT EXISTS code_modifications (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        project_id TEXT NOT NULL,
        task_id TEXT,
        file_path TEXT NOT NULL,
        modification_type TEXT NOT NULL CHECK (modification_type IN ('create', 'update', 'delete', 'rename')),
        before_content TEXT,
        after_content TEXT,
        diff TEXT,
        reason TEXT,
        ai_feedback_id TEXT,
        can_rollback INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_agent ON tasks(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)",
    "CREATE INDEX IF NOT EXISTS idx_ai_feedback_agent ON ai_feedback(agent_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_ai_feedback_task ON ai_feedback(task_id)",
    "CREATE INDEX IF NOT EXISTS idx_code_modifications_project ON code_modifications(project_id, task_id)",
];

/// SQLite-backed persistence for projects, tasks, agents, rules and the
/// audit trail. Every write is a single-row statement.
pub struct Store {
    db: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Store {
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }
        let db_path = data_dir.join(DB_FILE);
        let db = Connection::open(&db_path)?;
        init_schema(&db)?;
        info!("Opened store at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            path: Some(db_path),
        })
    }

    /// A private in-memory database; nothing touches the filesystem.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        init_schema(&db)?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            path: None,
        })
    }

    pub fn get_db(&self) -> Arc<Mutex<Connection>> {
        self.db.clone()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let db = self.db.lock().await;
        let count = |table: &str| -> Result<i64> {
            Ok(db.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        };
        Ok(StoreStats {
            projects: count("projects")?,
            tasks: count("tasks")?,
            agents: count("agents")?,
            rules: count("agent_rules")?,
            ai_feedback: count("ai_feedback")?,
            code_modifications: count("code_modifications")?,
        })
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    db.pragma_update(None, "foreign_keys", "ON")?;
    for statement in SCHEMA {
        db.execute(statement, [])?;
    }
    Ok(())
}
