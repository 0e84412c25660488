use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};

use super::types::ProjectRecord;
use super::{NOW, Store};
use crate::core::model::{ProjectStatus, new_id};

const PROJECT_COLUMNS: &str = "id, name, description, status, created_at";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        status: row.get(3)?,
        created_at: row.get(4)?,
    })
}

impl Store {
    pub async fn create_project(&self, name: &str, description: &str) -> Result<ProjectRecord> {
        let id = new_id("proj");
        let db = self.db.lock().await;
        db.execute(
            &format!(
                "INSERT INTO projects (id, name, description, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, {NOW})"
            ),
            params![id, name, description, ProjectStatus::Active],
        )?;
        let rec = db.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            project_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_project(&self, id: &str) -> Result<Option<ProjectRecord>> {
        let db = self.db.lock().await;
        let rec = db
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
                params![id],
                project_from_row,
            )
            .optional()?;
        Ok(rec)
    }

    /// Newest first.
    pub async fn get_all_projects(&self) -> Result<Vec<ProjectRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], project_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn update_project_status(&self, id: &str, status: ProjectStatus) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute(
            "UPDATE projects SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    /// Removes the project and, through the foreign key, all of its tasks.
    pub async fn delete_project(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
