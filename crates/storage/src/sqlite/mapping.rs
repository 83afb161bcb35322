use quiz_core::model::{
    AbandonReason, Difficulty, Question, QuestionId, Session, SessionId, SessionMode,
    SessionStatus, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<SessionId, StorageError> {
    Ok(SessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

//
// ─── ENUM ENCODINGS ────────────────────────────────────────────────────────────
//
// These strings are the on-disk format and must stay stable.

pub(crate) fn mode_to_str(mode: SessionMode) -> &'static str {
    match mode {
        SessionMode::Quick => "quick",
        SessionMode::Timed => "timed",
        SessionMode::Custom => "custom",
    }
}

pub(crate) fn parse_mode(s: &str) -> Result<SessionMode, StorageError> {
    match s {
        "quick" => Ok(SessionMode::Quick),
        "timed" => Ok(SessionMode::Timed),
        "custom" => Ok(SessionMode::Custom),
        _ => Err(StorageError::Serialization(format!("invalid mode: {s}"))),
    }
}

pub(crate) fn status_to_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Completed => "completed",
        SessionStatus::Abandoned => "abandoned",
    }
}

pub(crate) fn parse_status(s: &str) -> Result<SessionStatus, StorageError> {
    match s {
        "active" => Ok(SessionStatus::Active),
        "completed" => Ok(SessionStatus::Completed),
        "abandoned" => Ok(SessionStatus::Abandoned),
        _ => Err(StorageError::Serialization(format!("invalid status: {s}"))),
    }
}

pub(crate) fn reason_to_str(reason: AbandonReason) -> &'static str {
    match reason {
        AbandonReason::UserNavigation => "user_navigation",
        AbandonReason::WindowClosed => "window_closed",
        AbandonReason::Policy => "policy",
    }
}

pub(crate) fn parse_reason(s: &str) -> Result<AbandonReason, StorageError> {
    match s {
        "user_navigation" => Ok(AbandonReason::UserNavigation),
        "window_closed" => Ok(AbandonReason::WindowClosed),
        "policy" => Ok(AbandonReason::Policy),
        _ => Err(StorageError::Serialization(format!("invalid reason: {s}"))),
    }
}

pub(crate) fn difficulty_to_str(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "easy",
        Difficulty::Medium => "medium",
        Difficulty::Hard => "hard",
    }
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    match s {
        "easy" => Ok(Difficulty::Easy),
        "medium" => Ok(Difficulty::Medium),
        "hard" => Ok(Difficulty::Hard),
        _ => Err(StorageError::Serialization(format!(
            "invalid difficulty: {s}"
        ))),
    }
}

//
// ─── JSON COLUMNS ──────────────────────────────────────────────────────────────
//

pub(crate) fn question_ids_to_json(ids: &[QuestionId]) -> Result<String, StorageError> {
    let raw: Vec<u64> = ids.iter().map(QuestionId::value).collect();
    serde_json::to_string(&raw).map_err(ser)
}

pub(crate) fn question_ids_from_json(raw: &str) -> Result<Vec<QuestionId>, StorageError> {
    let values: Vec<u64> = serde_json::from_str(raw).map_err(ser)?;
    Ok(values.into_iter().map(QuestionId::new).collect())
}

pub(crate) fn answers_to_json(answers: &[Option<u32>]) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn answers_from_json(raw: &str) -> Result<Vec<Option<u32>>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn options_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

//
// ─── ROW MAPPING ───────────────────────────────────────────────────────────────
//

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let options = options_from_json(row.try_get::<String, _>("options").map_err(ser)?.as_str())?;
    let correct_index_i64: i64 = row.try_get("correct_index").map_err(ser)?;
    let correct_index = u32::try_from(correct_index_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_index: {correct_index_i64}"))
    })?;
    let difficulty_str: String = row.try_get("difficulty").map_err(ser)?;

    Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        options,
        correct_index,
        row.try_get::<String, _>("category").map_err(ser)?,
        parse_difficulty(difficulty_str.as_str())?,
    )
    .map_err(ser)
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<Session, StorageError> {
    let question_ids =
        question_ids_from_json(row.try_get::<String, _>("question_ids").map_err(ser)?.as_str())?;
    let answers = answers_from_json(row.try_get::<String, _>("answers").map_err(ser)?.as_str())?;

    let mode_str: String = row.try_get("mode").map_err(ser)?;
    let status_str: String = row.try_get("status").map_err(ser)?;

    let time_spent_secs = u32_from_i64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;
    let time_limit_secs = row
        .try_get::<Option<i64>, _>("time_limit_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_secs", v))
        .transpose()?;

    let last_index_i64: i64 = row.try_get("last_question_index").map_err(ser)?;
    let last_question_index = usize::try_from(last_index_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid last_question_index: {last_index_i64}"))
    })?;

    let abandon_reason = row
        .try_get::<Option<String>, _>("abandon_reason")
        .map_err(ser)?
        .map(|s| parse_reason(s.as_str()))
        .transpose()?;

    let score = row
        .try_get::<Option<i64>, _>("score")
        .map_err(ser)?
        .map(|v| {
            u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid score: {v}")))
        })
        .transpose()?;

    Session::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        parse_mode(mode_str.as_str())?,
        question_ids,
        answers,
        time_spent_secs,
        parse_status(status_str.as_str())?,
        time_limit_secs,
        last_question_index,
        row.try_get::<bool, _>("recoverable").map_err(ser)?,
        row.try_get("started_at").map_err(ser)?,
        row.try_get("abandoned_at").map_err(ser)?,
        abandon_reason,
        row.try_get("resumed_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        score,
    )
    .map_err(ser)
}
