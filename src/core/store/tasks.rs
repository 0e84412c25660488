use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::types::TaskRecord;
use super::{NOW, Store, TOUCH_UPDATED_AT};
use crate::core::model::{TaskStatus, new_id};

const TASK_COLUMNS: &str =
    "id, project_id, agent_id, title, description, status, created_at, updated_at";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        agent_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Store {
    pub async fn create_task(
        &self,
        project_id: &str,
        title: &str,
        description: &str,
    ) -> Result<TaskRecord> {
        let id = new_id("task");
        let db = self.db.lock().await;
        db.execute(
            &format!(
                "INSERT INTO tasks (id, project_id, agent_id, title, description, status, created_at, updated_at)
                 VALUES (?1, ?2, NULL, ?3, ?4, ?5, {NOW}, {NOW})"
            ),
            params![id, project_id, title, description, TaskStatus::Pending],
        )?;
        let rec = db.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            params![id],
            task_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<TaskRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                params![id],
                task_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Tasks of one project in creation order.
    pub async fn get_project_tasks(&self, project_id: &str) -> Result<Vec<TaskRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![project_id], task_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn get_all_tasks(&self) -> Result<Vec<TaskRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], task_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Writes the status as given; transition rules are enforced by the coordinator.
    pub async fn update_task_status(
        &self,
        id: &str,
        status: TaskStatus,
        agent_id: Option<&str>,
    ) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            &format!(
                "UPDATE tasks SET status = ?1, agent_id = ?2, {TOUCH_UPDATED_AT} WHERE id = ?3"
            ),
            params![status, agent_id, id],
        )?;
        Ok(rows > 0)
    }

    pub async fn update_task_description(&self, id: &str, description: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            &format!("UPDATE tasks SET description = ?1, {TOUCH_UPDATED_AT} WHERE id = ?2"),
            params![description, id],
        )?;
        Ok(rows > 0)
    }

    pub async fn delete_task(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
