use async_trait::async_trait;
use quiz_core::model::{
    Question, QuestionId, Session, SessionDraft, SessionId, SessionStatus, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the read-only question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch questions by id, preserving the input order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any id is missing, or other
    /// storage errors.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// List questions, optionally filtered by category.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_questions(
        &self,
        category: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for session records.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a validated draft and return it with a storage-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be created.
    async fn create_session(&self, draft: &SessionDraft) -> Result<Session, StorageError>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError>;

    /// Replace the stored record with the given session state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the session does not exist.
    async fn update_session(&self, session: &Session) -> Result<(), StorageError>;

    /// List a user's sessions newest-first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError>;

    /// List a user's abandoned-but-recoverable sessions, newest abandonment
    /// first. Window filtering is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    async fn list_recoverable(&self, user_id: UserId) -> Result<Vec<Session>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    next_session_id: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match guard.get(id) {
                Some(question) => found.push(question.clone()),
                None => return Err(StorageError::NotFound),
            }
        }
        Ok(found)
    }

    async fn list_questions(
        &self,
        category: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<Question> = guard
            .values()
            .filter(|q| category.is_none_or(|c| q.category() == c))
            .cloned()
            .collect();
        out.sort_by_key(Question::id);
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn create_session(&self, draft: &SessionDraft) -> Result<Session, StorageError> {
        let id = SessionId::new(self.next_session_id.fetch_add(1, Ordering::SeqCst));
        let session = draft.clone().assign_id(id);
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn update_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        match guard.get_mut(&session.id()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
        limit: u32,
    ) -> Result<Vec<Session>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<Session> = guard
            .values()
            .filter(|s| s.user_id() == user_id && status.is_none_or(|st| s.status() == st))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at().cmp(&a.started_at()).then(b.id().cmp(&a.id())));
        out.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(out)
    }

    async fn list_recoverable(&self, user_id: UserId) -> Result<Vec<Session>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<Session> = guard
            .values()
            .filter(|s| {
                s.user_id() == user_id
                    && s.status() == SessionStatus::Abandoned
                    && s.recoverable()
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.abandoned_at().cmp(&a.abandoned_at()));
        Ok(out)
    }
}

/// Aggregates question and session repositories behind trait objects for
/// easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo);
        Self {
            questions,
            sessions,
        }
    }
}
