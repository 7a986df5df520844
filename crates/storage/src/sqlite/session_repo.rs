use chrono::{DateTime, Utc};
use prep_core::model::SessionId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_session_row, ser};
use crate::repository::{SessionRecord, SessionRepository, SessionStatus, StorageError};

const SESSION_COLUMNS: &str = r"
    id, test_slug, status, current_question_index, question_count,
    started_at, updated_at, completed_at
";

impl SqliteRepository {
    async fn session_status(&self, id: SessionId) -> Result<SessionStatus, StorageError> {
        let row = sqlx::query("SELECT status FROM sessions WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        SessionStatus::parse(&row.try_get::<String, _>("status").map_err(ser)?)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, test_slug, status, current_question_index, question_count,
                    started_at, updated_at, completed_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(record.id.to_string())
        .bind(&record.test_slug)
        .bind(record.status.as_str())
        .bind(i64::from(record.current_question_index))
        .bind(i64::from(record.question_count))
        .bind(record.started_at)
        .bind(record.updated_at)
        .bind(record.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => conn(e),
        })?;

        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<SessionRecord, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn find_open_session(
        &self,
        test_slug: &str,
    ) -> Result<Option<SessionRecord>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE test_slug = ?1 AND status = 'in_progress'
             ORDER BY started_at DESC
             LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(test_slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_session_row).transpose()
    }

    async fn update_progress(
        &self,
        id: SessionId,
        current_question_index: u32,
        status: SessionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let completed_at = (status == SessionStatus::Completed).then_some(updated_at);
        let res = sqlx::query(
            r"
                UPDATE sessions
                SET current_question_index = ?2,
                    status = ?3,
                    updated_at = ?4,
                    completed_at = ?5
                WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id.to_string())
        .bind(i64::from(current_question_index))
        .bind(status.as_str())
        .bind(updated_at)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            // Either missing or already completed.
            self.session_status(id).await?;
            return Err(StorageError::Conflict);
        }
        Ok(())
    }

    async fn complete_session(
        &self,
        id: SessionId,
        completed_at: DateTime<Utc>,
    ) -> Result<SessionRecord, StorageError> {
        sqlx::query(
            r"
                UPDATE sessions
                SET status = 'completed', updated_at = ?2, completed_at = ?2
                WHERE id = ?1 AND status = 'in_progress'
            ",
        )
        .bind(id.to_string())
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        self.get_session(id).await
    }
}
