use quiz_core::model::{Question, QuestionId};

use super::mapping::{
    difficulty_to_str, id_i64, map_question_row, options_to_json,
};
use super::SqliteRepository;
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let id = id_i64("question_id", question.id().value())?;
        let options = options_to_json(question.options())?;

        sqlx::query(
            r"
                INSERT INTO questions (id, prompt, options, correct_index, category, difficulty)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(id) DO UPDATE SET
                    prompt = excluded.prompt,
                    options = excluded.options,
                    correct_index = excluded.correct_index,
                    category = excluded.category,
                    difficulty = excluded.difficulty
            ",
        )
        .bind(id)
        .bind(question.prompt())
        .bind(options)
        .bind(i64::from(question.correct_index()))
        .bind(question.category())
        .bind(difficulty_to_str(question.difficulty()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        // Fetched one by one to preserve the caller's order; question sets
        // are small (a session's worth).
        let mut found = Vec::with_capacity(ids.len());
        for question_id in ids {
            let id = id_i64("question_id", question_id.value())?;
            let row = sqlx::query(
                r"
                    SELECT id, prompt, options, correct_index, category, difficulty
                    FROM questions
                    WHERE id = ?1
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;

            found.push(map_question_row(&row)?);
        }
        Ok(found)
    }

    async fn list_questions(
        &self,
        category: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = if let Some(category) = category {
            sqlx::query(
                r"
                    SELECT id, prompt, options, correct_index, category, difficulty
                    FROM questions
                    WHERE category = ?1
                    ORDER BY id ASC
                    LIMIT ?2
                ",
            )
            .bind(category)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(
                r"
                    SELECT id, prompt, options, correct_index, category, difficulty
                    FROM questions
                    ORDER BY id ASC
                    LIMIT ?1
                ",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }
}
