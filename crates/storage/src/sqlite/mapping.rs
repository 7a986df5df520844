use prep_core::model::{AnswerLetter, QuestionId, SessionId};
use sqlx::Row;

use crate::repository::{ResponseRecord, SessionRecord, SessionStatus, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Serialization(format!("invalid question_id: {v}")))
}

pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    s.parse::<SessionId>().map_err(ser)
}

pub(crate) fn letter_to_str(letter: Option<AnswerLetter>) -> Option<String> {
    letter.map(|l| l.to_string())
}

pub(crate) fn letter_from_str(s: Option<String>) -> Result<Option<AnswerLetter>, StorageError> {
    s.map(|raw| raw.parse::<AnswerLetter>().map_err(ser))
        .transpose()
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionRecord, StorageError> {
    let id = session_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let status = SessionStatus::parse(&row.try_get::<String, _>("status").map_err(ser)?)?;
    let current_question_index = u32_from_i64(
        "current_question_index",
        row.try_get::<i64, _>("current_question_index")
            .map_err(ser)?,
    )?;
    let question_count = u32_from_i64(
        "question_count",
        row.try_get::<i64, _>("question_count").map_err(ser)?,
    )?;

    Ok(SessionRecord {
        id,
        test_slug: row.try_get("test_slug").map_err(ser)?,
        status,
        current_question_index,
        question_count,
        started_at: row.try_get("started_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

pub(crate) fn map_response_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ResponseRecord, StorageError> {
    let session_id = session_id_from_str(&row.try_get::<String, _>("session_id").map_err(ser)?)?;
    let question_id = question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?;
    let selected_answer =
        letter_from_str(row.try_get::<Option<String>, _>("selected_answer").map_err(ser)?)?;
    let time_spent_secs = u32_from_i64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;

    Ok(ResponseRecord {
        session_id,
        question_id,
        selected_answer,
        is_correct: row.try_get("is_correct").map_err(ser)?,
        is_skipped: row.try_get("is_skipped").map_err(ser)?,
        time_spent_secs,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
