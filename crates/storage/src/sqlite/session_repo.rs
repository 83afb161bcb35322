use quiz_core::model::{Session, SessionDraft, SessionId, SessionStatus, UserId};

use super::mapping::{
    answers_to_json, id_i64, map_session_row, mode_to_str, question_ids_to_json, reason_to_str,
    session_id_from_i64, status_to_str,
};
use super::SqliteRepository;
use crate::repository::{SessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, mode, question_ids, answers, time_spent_secs, status,
    time_limit_secs, last_question_index, recoverable, started_at,
    abandoned_at, abandon_reason, resumed_at, completed_at, score
";

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<Session, StorageError> {
        let user_id = id_i64("user_id", draft.user_id().value())?;
        let question_ids = question_ids_to_json(draft.question_ids())?;
        let answers = answers_to_json(&vec![None::<u32>; draft.question_ids().len()])?;

        let res = sqlx::query(
            r"
                INSERT INTO sessions (
                    user_id, mode, question_ids, answers, time_spent_secs,
                    status, time_limit_secs, last_question_index, recoverable,
                    started_at
                )
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, 0, 0, ?7)
            ",
        )
        .bind(user_id)
        .bind(mode_to_str(draft.mode()))
        .bind(question_ids)
        .bind(answers)
        .bind(status_to_str(SessionStatus::Active))
        .bind(draft.time_limit_secs().map(i64::from))
        .bind(draft.started_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = session_id_from_i64(res.last_insert_rowid())?;
        Ok(draft.clone().assign_id(id))
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

        map_session_row(&row)
    }

    async fn update_session(&self, session: &Session) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE sessions SET
                    answers = ?2,
                    time_spent_secs = ?3,
                    status = ?4,
                    last_question_index = ?5,
                    recoverable = ?6,
                    abandoned_at = ?7,
                    abandon_reason = ?8,
                    resumed_at = ?9,
                    completed_at = ?10,
                    score = ?11
                WHERE id = ?1
            ",
        )
        .bind(id_i64("session_id", session.id().value())?)
        .bind(answers_to_json(session.answers())?)
        .bind(i64::from(session.time_spent_secs()))
        .bind(status_to_str(session.status()))
        .bind(i64::try_from(session.last_question_index()).map_err(|_| {
            StorageError::Serialization("last_question_index overflow".into())
        })?)
        .bind(session.recoverable())
        .bind(session.abandoned_at())
        .bind(session.abandon_reason().map(reason_to_str))
        .bind(session.resumed_at())
        .bind(session.completed_at())
        .bind(session.score().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError> {
        let mut sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1");
        let mut bind_index = 2;
        if status.is_some() {
            sql.push_str(" AND status = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        sql.push_str(" ORDER BY started_at DESC, id DESC LIMIT ?");
        sql.push_str(&bind_index.to_string());

        let mut query = sqlx::query(&sql).bind(id_i64("user_id", user_id.value())?);
        if let Some(status) = status {
            query = query.bind(status_to_str(status));
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }

    async fn list_recoverable(&self, user_id: UserId) -> Result<Vec<Session>, StorageError> {
        let sql = format!(
            r"
                SELECT {SESSION_COLUMNS} FROM sessions
                WHERE user_id = ?1 AND status = ?2 AND recoverable = 1
                ORDER BY abandoned_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(status_to_str(SessionStatus::Abandoned))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}
