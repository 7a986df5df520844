use prep_core::model::SessionId;

use super::SqliteRepository;
use super::mapping::{conn, letter_to_str, map_response_row, question_id_to_i64};
use crate::repository::{ResponseRecord, ResponseRepository, StorageError};

#[async_trait::async_trait]
impl ResponseRepository for SqliteRepository {
    async fn upsert_response(&self, record: &ResponseRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO responses (
                    session_id, question_id, selected_answer, is_correct,
                    is_skipped, time_spent_secs, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(session_id, question_id) DO UPDATE SET
                    selected_answer = excluded.selected_answer,
                    is_correct = excluded.is_correct,
                    is_skipped = excluded.is_skipped,
                    time_spent_secs = excluded.time_spent_secs,
                    recorded_at = excluded.recorded_at
            ",
        )
        .bind(record.session_id.to_string())
        .bind(question_id_to_i64(record.question_id)?)
        .bind(letter_to_str(record.selected_answer))
        .bind(record.is_correct)
        .bind(record.is_skipped)
        .bind(i64::from(record.time_spent_secs))
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
            _ => conn(e),
        })?;

        Ok(())
    }

    async fn list_responses(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<ResponseRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    session_id, question_id, selected_answer, is_correct,
                    is_skipped, time_spent_secs, recorded_at
                FROM responses
                WHERE session_id = ?1
                ORDER BY recorded_at ASC, question_id ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_response_row(&row)?);
        }

        Ok(out)
    }
}
