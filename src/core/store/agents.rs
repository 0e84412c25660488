use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::types::AgentRecord;
use super::{NOW, Store};
use crate::core::model::AgentStatus;

const AGENT_COLUMNS: &str = "id, name, role, status, last_heartbeat";

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRecord> {
    Ok(AgentRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        role: row.get(2)?,
        status: row.get(3)?,
        last_heartbeat: row.get(4)?,
    })
}

impl Store {
    /// Upsert keyed by id. Runtime status always comes back as `idle`.
    pub async fn register_agent(&self, id: &str, name: &str, role: &str) -> Result<AgentRecord> {
        let db = self.db.lock().await;
        db.execute(
            &format!(
                "INSERT INTO agents (id, name, role, status, last_heartbeat)
                 VALUES (?1, ?2, ?3, ?4, {NOW})
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    role = excluded.role,
                    status = excluded.status,
                    last_heartbeat = excluded.last_heartbeat"
            ),
            params![id, name, role, AgentStatus::Idle],
        )?;
        let rec = db.query_row(
            &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
            params![id],
            agent_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_agent(&self, id: &str) -> Result<Option<AgentRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = ?1"),
                params![id],
                agent_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    pub async fn get_all_agents(&self) -> Result<Vec<AgentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents ORDER BY role ASC"
        ))?;
        let rows = stmt.query_map([], agent_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn update_agent_status(&self, id: &str, status: AgentStatus) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            &format!("UPDATE agents SET status = ?1, last_heartbeat = {NOW} WHERE id = ?2"),
            params![status, id],
        )?;
        Ok(rows > 0)
    }
}
