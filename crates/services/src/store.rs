//! The persistent half of the session core.
//!
//! `SessionStore` is the single source of truth for session records. It
//! enforces ownership, the state machine, and authoritative scoring: the
//! score is always recomputed from stored correct-answer indices, and no
//! operation accepts a score from a caller.

use std::sync::Arc;

use tracing::{debug, info};

use quiz_core::Clock;
use quiz_core::model::{
    AbandonReason, QuestionId, RecoveryDenied, Session, SessionDraft, SessionId, SessionMode,
    SessionStatus, UserId,
};
use storage::repository::{QuestionRepository, SessionRepository, Storage};

use crate::error::SessionError;

/// Result of a recovery attempt. An expired window is a normal outcome the
/// UI answers with "start a new attempt", not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovered(Session),
    Expired,
}

/// Server-side session operations over repository trait objects.
#[derive(Clone)]
pub struct SessionStore {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl SessionStore {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            sessions,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(clock, storage.questions.clone(), storage.sessions.clone())
    }

    /// Load a session and verify the acting user owns it.
    async fn fetch_owned(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Session, SessionError> {
        let session = self.sessions.get_session(session_id).await?;
        if session.user_id() != user_id {
            return Err(SessionError::Forbidden);
        }
        Ok(session)
    }

    /// Create a new attempt. Every assigned question must exist; a missing
    /// id is a fatal precondition failure.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for missing questions,
    /// `SessionError::Validation` for an empty question list or a bad time
    /// limit, and storage errors otherwise.
    pub async fn create_session(
        &self,
        user_id: UserId,
        mode: SessionMode,
        question_ids: Vec<QuestionId>,
        time_limit_secs: Option<u32>,
    ) -> Result<Session, SessionError> {
        let draft = SessionDraft::new(user_id, mode, question_ids, time_limit_secs, self.clock.now())?;
        self.questions.get_questions(draft.question_ids()).await?;

        let session = self.sessions.create_session(&draft).await?;
        info!(session_id = %session.id(), ?mode, questions = session.question_count(), "session created");
        Ok(session)
    }

    /// Fetch a session owned by the acting user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` or `SessionError::Forbidden`.
    pub async fn get_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<Session, SessionError> {
        self.fetch_owned(user_id, session_id).await
    }

    /// Record an answer for one question slot. Last write wins; time spent
    /// accumulates.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is active and
    /// `SessionError::Validation` for an out-of-range question index.
    pub async fn submit_answer(
        &self,
        user_id: UserId,
        session_id: SessionId,
        question_index: usize,
        selected_option: u32,
        time_spent_delta_secs: u32,
    ) -> Result<Session, SessionError> {
        let mut session = self.fetch_owned(user_id, session_id).await?;
        session.record_answer(question_index, selected_option, time_spent_delta_secs)?;
        self.sessions.update_session(&session).await?;
        debug!(session_id = %session_id, question_index, "answer recorded");
        Ok(session)
    }

    /// Complete a session, scoring it against the stored correct-answer
    /// indices. Unanswered slots count as incorrect. There is deliberately
    /// no way for a caller to supply a score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is active,
    /// `SessionError::NotFound` if an assigned question has vanished, and
    /// storage errors otherwise.
    pub async fn complete_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        final_time_spent_secs: u32,
    ) -> Result<Session, SessionError> {
        let mut session = self.fetch_owned(user_id, session_id).await?;
        if !session.is_active() {
            return Err(SessionError::InvalidState {
                status: session.status(),
            });
        }

        let questions = self.questions.get_questions(session.question_ids()).await?;
        let correct = questions
            .iter()
            .zip(session.answers())
            .filter(|(question, slot)| slot.is_some_and(|selected| question.is_correct(selected)))
            .count();

        session.complete(
            u32::try_from(correct).unwrap_or(u32::MAX),
            final_time_spent_secs,
            self.clock.now(),
        )?;
        self.sessions.update_session(&session).await?;
        info!(session_id = %session_id, score = session.score(), "session completed");
        Ok(session)
    }

    /// Abandon an active session, opening its recovery window.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` unless the session is active.
    pub async fn abandon_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
        reason: AbandonReason,
    ) -> Result<(), SessionError> {
        let mut session = self.fetch_owned(user_id, session_id).await?;
        session.abandon(reason, self.clock.now())?;
        self.sessions.update_session(&session).await?;
        info!(session_id = %session_id, ?reason, "session abandoned");
        Ok(())
    }

    /// Attempt to reactivate an abandoned session. Answers and elapsed time
    /// are preserved; denial past the window mutates nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is not abandoned
    /// or was marked unrecoverable. An expired window is reported as
    /// `RecoveryOutcome::Expired`, not an error.
    pub async fn recover_session(
        &self,
        user_id: UserId,
        session_id: SessionId,
    ) -> Result<RecoveryOutcome, SessionError> {
        let mut session = self.fetch_owned(user_id, session_id).await?;
        match session.try_recover(self.clock.now()) {
            Ok(()) => {
                self.sessions.update_session(&session).await?;
                info!(session_id = %session_id, "session recovered");
                Ok(RecoveryOutcome::Recovered(session))
            }
            Err(RecoveryDenied::WindowExpired) => {
                debug!(session_id = %session_id, "recovery window expired");
                Ok(RecoveryOutcome::Expired)
            }
            Err(RecoveryDenied::NotAbandoned | RecoveryDenied::NotRecoverable) => {
                Err(SessionError::InvalidState {
                    status: session.status(),
                })
            }
        }
    }

    /// A user's abandoned sessions still inside the recovery window, newest
    /// abandonment first.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn list_recoverable(&self, user_id: UserId) -> Result<Vec<Session>, SessionError> {
        let now = self.clock.now();
        let window = chrono::Duration::hours(quiz_core::model::RECOVERY_WINDOW_HOURS);
        let sessions = self.sessions.list_recoverable(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.abandoned_at().is_some_and(|at| now - at < window))
            .collect())
    }

    /// A user's session history, newest first.
    ///
    /// # Errors
    ///
    /// Returns storage errors.
    pub async fn list_sessions(
        &self,
        user_id: UserId,
        status: Option<SessionStatus>,
        limit: u32,
    ) -> Result<Vec<Session>, SessionError> {
        Ok(self.sessions.list_sessions(user_id, status, limit).await?)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
