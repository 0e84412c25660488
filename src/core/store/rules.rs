use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use super::types::AgentRuleRecord;
use super::{NOW, Store};
use crate::core::model::new_id;

const RULE_COLUMNS: &str = "id, agent_role, rule_content, version, created_at, updated_at";

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRuleRecord> {
    Ok(AgentRuleRecord {
        id: row.get(0)?,
        agent_role: row.get(1)?,
        rule_content: row.get(2)?,
        version: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn select_rule(db: &Connection, role: &str) -> Result<Option<AgentRuleRecord>> {
    let rec = db
        .query_row(
            &format!("SELECT {RULE_COLUMNS} FROM agent_rules WHERE agent_role = ?1"),
            params![role],
            rule_from_row,
        )
        .optional()?;
    Ok(rec)
}

fn insert_rule(db: &Connection, role: &str, content: &str) -> Result<AgentRuleRecord> {
    db.execute(
        &format!(
            "INSERT INTO agent_rules (id, agent_role, rule_content, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, {NOW}, {NOW})"
        ),
        params![new_id("rule"), role, content],
    )?;
    select_rule(db, role)?.ok_or_else(|| anyhow!("rule for '{}' vanished after insert", role))
}

impl Store {
    /// Fails if the role already has a rule.
    pub async fn create_agent_rule(&self, role: &str, content: &str) -> Result<AgentRuleRecord> {
        let db = self.db.lock().await;
        let rec = insert_rule(&db, role, content)?;
        info!("Created rule for role '{}'", role);
        Ok(rec)
    }

    pub async fn get_agent_rule(&self, role: &str) -> Result<Option<AgentRuleRecord>> {
        let db = self.db.lock().await;
        select_rule(&db, role)
    }

    /// Replaces the content and bumps the version by one in a single
    /// statement. A role without a rule gets a fresh version 1.
    pub async fn update_agent_rule(&self, role: &str, content: &str) -> Result<AgentRuleRecord> {
        let db = self.db.lock().await;
        let rows = db.execute(
            &format!(
                "UPDATE agent_rules
                 SET rule_content = ?1, version = version + 1, updated_at = {NOW}
                 WHERE agent_role = ?2"
            ),
            params![content, role],
        )?;
        if rows == 0 {
            let rec = insert_rule(&db, role, content)?;
            info!("Created rule for role '{}' on update", role);
            return Ok(rec);
        }
        let rec = select_rule(&db, role)?
            .ok_or_else(|| anyhow!("rule for '{}' vanished after update", role))?;
        info!("Updated rule for role '{}' (version {})", role, rec.version);
        Ok(rec)
    }

    pub async fn get_all_agent_rules(&self) -> Result<Vec<AgentRuleRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM agent_rules ORDER BY agent_role ASC"
        ))?;
        let rows = stmt.query_map([], rule_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn delete_agent_rule(&self, role: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "DELETE FROM agent_rules WHERE agent_role = ?1",
            params![role],
        )?;
        Ok(rows > 0)
    }
}
