use anyhow::Result;
use rusqlite::types::{Type, Value};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use super::types::{
    AiFeedbackRecord, CodeModificationRecord, FeedbackFilter, NewAiFeedback, NewCodeModification,
};
use super::{NOW, Store};

const FEEDBACK_COLUMNS: &str = "id, agent_id, prompt, response, model, project_id, task_id, tokens_used, duration_ms, metadata, created_at";

const MODIFICATION_COLUMNS: &str = "id, agent_id, project_id, task_id, file_path, modification_type, before_content, after_content, diff, reason, ai_feedback_id, can_rollback, created_at";

fn feedback_from_row(row: &Row<'_>) -> rusqlite::Result<AiFeedbackRecord> {
    let metadata: String = row.get(9)?;
    let metadata = serde_json::from_str(&metadata).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e))
    })?;
    Ok(AiFeedbackRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        prompt: row.get(2)?,
        response: row.get(3)?,
        model: row.get(4)?,
        project_id: row.get(5)?,
        task_id: row.get(6)?,
        tokens_used: row.get(7)?,
        duration_ms: row.get(8)?,
        metadata,
        created_at: row.get(10)?,
    })
}

fn modification_from_row(row: &Row<'_>) -> rusqlite::Result<CodeModificationRecord> {
    Ok(CodeModificationRecord {
        id: row.get(0)?,
        agent_id: row.get(1)?,
        project_id: row.get(2)?,
        task_id: row.get(3)?,
        file_path: row.get(4)?,
        modification_type: row.get(5)?,
        before_content: row.get(6)?,
        after_content: row.get(7)?,
        diff: row.get(8)?,
        reason: row.get(9)?,
        ai_feedback_id: row.get(10)?,
        can_rollback: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl Store {
    /// Append-only. A record whose id already exists is rejected.
    pub async fn create_ai_feedback(&self, record: &NewAiFeedback) -> Result<AiFeedbackRecord> {
        let metadata = serde_json::to_string(&record.metadata)?;
        let db = self.db.lock().await;
        db.execute(
            &format!(
                "INSERT INTO ai_feedback
                 (id, agent_id, prompt, response, model, project_id, task_id, tokens_used, duration_ms, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, {NOW})"
            ),
            params![
                record.id,
                record.agent_id,
                record.prompt,
                record.response,
                record.model,
                record.project_id,
                record.task_id,
                record.tokens_used,
                record.duration_ms,
                metadata
            ],
        )?;
        let rec = db.query_row(
            &format!("SELECT {FEEDBACK_COLUMNS} FROM ai_feedback WHERE id = ?1"),
            params![record.id],
            feedback_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_ai_feedback(&self, id: &str) -> Result<Option<AiFeedbackRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {FEEDBACK_COLUMNS} FROM ai_feedback WHERE id = ?1"),
                params![id],
                feedback_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Newest first.
    pub async fn list_ai_feedback(&self, filter: &FeedbackFilter) -> Result<Vec<AiFeedbackRecord>> {
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();
        if let Some(agent_id) = &filter.agent_id {
            args.push(Value::Text(agent_id.clone()));
            clauses.push(format!("agent_id = ?{}", args.len()));
        }
        if let Some(task_id) = &filter.task_id {
            args.push(Value::Text(task_id.clone()));
            clauses.push(format!("task_id = ?{}", args.len()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        args.push(Value::Integer(limit));
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM ai_feedback{where_sql} ORDER BY created_at DESC, rowid DESC LIMIT ?{}",
            args.len()
        );

        let db = self.db.lock().await;
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args.iter()), feedback_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn create_code_modification(
        &self,
        record: &NewCodeModification,
    ) -> Result<CodeModificationRecord> {
        let db = self.db.lock().await;
        db.execute(
            &format!(
                "INSERT INTO code_modifications
                 (id, agent_id, project_id, task_id, file_path, modification_type, before_content, after_content, diff, reason, ai_feedback_id, can_rollback, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, {NOW})"
            ),
            params![
                record.id,
                record.agent_id,
                record.project_id,
                record.task_id,
                record.file_path,
                record.modification_type,
                record.before_content,
                record.after_content,
                record.diff,
                record.reason,
                record.ai_feedback_id,
                record.can_rollback
            ],
        )?;
        let rec = db.query_row(
            &format!("SELECT {MODIFICATION_COLUMNS} FROM code_modifications WHERE id = ?1"),
            params![record.id],
            modification_from_row,
        )?;
        Ok(rec)
    }

    /// Oldest first; `task_id` narrows to one task of the project.
    pub async fn list_code_modifications(
        &self,
        project_id: &str,
        task_id: Option<&str>,
    ) -> Result<Vec<CodeModificationRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {MODIFICATION_COLUMNS} FROM code_modifications
             WHERE project_id = ?1 AND (?2 IS NULL OR task_id = ?2)
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![project_id, task_id], modification_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
