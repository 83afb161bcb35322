use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, SessionId, UserId};

/// How long an abandoned session stays recoverable.
pub const RECOVERY_WINDOW_HOURS: i64 = 24;

//
// ─── SESSION ENUMS ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    Quick,
    Timed,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
    Abandoned,
}

/// Why a session was abandoned. Always recorded alongside the abandonment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbandonReason {
    UserNavigation,
    WindowClosed,
    Policy,
}

//
// ─── SESSION ERRORS ────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("session requires at least one question")]
    EmptyQuestionList,

    #[error("timed session requires a time limit")]
    MissingTimeLimit,

    #[error("time limit must be greater than zero")]
    ZeroTimeLimit,

    #[error("question index {index} out of bounds for {count} questions")]
    QuestionIndexOutOfBounds { index: usize, count: usize },

    #[error("operation not allowed while session is {from:?}")]
    InvalidTransition { from: SessionStatus },

    #[error("answer slot count ({answers}) does not match question count ({questions})")]
    AnswerCountMismatch { questions: usize, answers: usize },

    #[error("score must be present exactly when the session is completed")]
    ScoreStatusMismatch,

    #[error("invalid persisted session state: {0}")]
    InvalidPersistedState(String),
}

/// Why a recovery attempt was denied.
///
/// An expired window is an expected outcome, which is why this is a plain
/// value rather than part of `SessionStateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDenied {
    NotAbandoned,
    NotRecoverable,
    WindowExpired,
}

//
// ─── SESSION DRAFT ─────────────────────────────────────────────────────────────
//

/// A validated, not-yet-persisted session. Storage assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    user_id: UserId,
    mode: SessionMode,
    question_ids: Vec<QuestionId>,
    time_limit_secs: Option<u32>,
    started_at: DateTime<Utc>,
}

impl SessionDraft {
    /// Validate the inputs for a new attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::EmptyQuestionList` for an empty question
    /// list, `SessionStateError::MissingTimeLimit` for a timed session
    /// without a limit, and `SessionStateError::ZeroTimeLimit` for a limit
    /// of zero seconds.
    pub fn new(
        user_id: UserId,
        mode: SessionMode,
        question_ids: Vec<QuestionId>,
        time_limit_secs: Option<u32>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        if question_ids.is_empty() {
            return Err(SessionStateError::EmptyQuestionList);
        }
        if mode == SessionMode::Timed && time_limit_secs.is_none() {
            return Err(SessionStateError::MissingTimeLimit);
        }
        if time_limit_secs == Some(0) {
            return Err(SessionStateError::ZeroTimeLimit);
        }

        Ok(Self {
            user_id,
            mode,
            question_ids,
            time_limit_secs,
            started_at,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Attach the storage-assigned id, producing a live `Active` session.
    #[must_use]
    pub fn assign_id(self, id: SessionId) -> Session {
        let answers = vec![None; self.question_ids.len()];
        Session {
            id,
            user_id: self.user_id,
            mode: self.mode,
            question_ids: self.question_ids,
            answers,
            time_spent_secs: 0,
            status: SessionStatus::Active,
            time_limit_secs: self.time_limit_secs,
            last_question_index: 0,
            recoverable: false,
            started_at: self.started_at,
            abandoned_at: None,
            abandon_reason: None,
            resumed_at: None,
            completed_at: None,
            score: None,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at a fixed set of questions.
///
/// The question list is immutable after creation; every other field changes
/// only through the state-machine methods below. The score is computed here
/// from a correct-answer count and can never be set from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    mode: SessionMode,
    question_ids: Vec<QuestionId>,
    answers: Vec<Option<u32>>,
    time_spent_secs: u32,
    status: SessionStatus,
    time_limit_secs: Option<u32>,
    last_question_index: usize,
    recoverable: bool,
    started_at: DateTime<Utc>,
    abandoned_at: Option<DateTime<Utc>>,
    abandon_reason: Option<AbandonReason>,
    resumed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    score: Option<u8>,
}

/// Integer percentage, round half up. `total` must be non-zero.
fn score_percent(correct: u32, total: u32) -> u8 {
    let correct = correct.min(total);
    let pct = (u64::from(correct) * 100 + u64::from(total) / 2) / u64::from(total);
    u8::try_from(pct).unwrap_or(100)
}

impl Session {
    /// Rehydrate a session from persisted storage, re-checking invariants.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError` if the stored shape violates a structural
    /// invariant (slot counts, score/status pairing, missing timestamps).
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        user_id: UserId,
        mode: SessionMode,
        question_ids: Vec<QuestionId>,
        answers: Vec<Option<u32>>,
        time_spent_secs: u32,
        status: SessionStatus,
        time_limit_secs: Option<u32>,
        last_question_index: usize,
        recoverable: bool,
        started_at: DateTime<Utc>,
        abandoned_at: Option<DateTime<Utc>>,
        abandon_reason: Option<AbandonReason>,
        resumed_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
        score: Option<u8>,
    ) -> Result<Self, SessionStateError> {
        if question_ids.is_empty() {
            return Err(SessionStateError::EmptyQuestionList);
        }
        if answers.len() != question_ids.len() {
            return Err(SessionStateError::AnswerCountMismatch {
                questions: question_ids.len(),
                answers: answers.len(),
            });
        }
        if mode == SessionMode::Timed && time_limit_secs.is_none() {
            return Err(SessionStateError::MissingTimeLimit);
        }
        if last_question_index >= question_ids.len() {
            return Err(SessionStateError::QuestionIndexOutOfBounds {
                index: last_question_index,
                count: question_ids.len(),
            });
        }

        let completed = status == SessionStatus::Completed;
        if score.is_some() != completed {
            return Err(SessionStateError::ScoreStatusMismatch);
        }
        if completed_at.is_some() != completed {
            return Err(SessionStateError::InvalidPersistedState(
                "completed_at must be present exactly when completed".into(),
            ));
        }
        if status == SessionStatus::Abandoned && abandoned_at.is_none() {
            return Err(SessionStateError::InvalidPersistedState(
                "abandoned session is missing abandoned_at".into(),
            ));
        }

        Ok(Self {
            id,
            user_id,
            mode,
            question_ids,
            answers,
            time_spent_secs,
            status,
            time_limit_secs,
            last_question_index,
            recoverable,
            started_at,
            abandoned_at,
            abandon_reason,
            resumed_at,
            completed_at,
            score,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<u32>] {
        &self.answers
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    #[must_use]
    pub fn last_question_index(&self) -> usize {
        self.last_question_index
    }

    #[must_use]
    pub fn recoverable(&self) -> bool {
        self.recoverable
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn abandoned_at(&self) -> Option<DateTime<Utc>> {
        self.abandoned_at
    }

    #[must_use]
    pub fn abandon_reason(&self) -> Option<AbandonReason> {
        self.abandon_reason
    }

    #[must_use]
    pub fn resumed_at(&self) -> Option<DateTime<Utc>> {
        self.resumed_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.score
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.question_ids.len()
    }

    /// Number of answer slots that have been filled.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|slot| slot.is_some()).count()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    fn ensure_active(&self) -> Result<(), SessionStateError> {
        if self.status == SessionStatus::Active {
            Ok(())
        } else {
            Err(SessionStateError::InvalidTransition { from: self.status })
        }
    }

    /// Record an answer for the question at `index`. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidTransition` unless the session is
    /// active, and `SessionStateError::QuestionIndexOutOfBounds` for an
    /// index outside the question list.
    pub fn record_answer(
        &mut self,
        index: usize,
        selected_option: u32,
        time_spent_delta_secs: u32,
    ) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        if index >= self.answers.len() {
            return Err(SessionStateError::QuestionIndexOutOfBounds {
                index,
                count: self.answers.len(),
            });
        }

        self.answers[index] = Some(selected_option);
        self.time_spent_secs = self.time_spent_secs.saturating_add(time_spent_delta_secs);
        self.last_question_index = index;
        Ok(())
    }

    /// Complete the session with an externally counted number of correct
    /// answers. The score is derived here and nowhere else.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidTransition` unless the session is
    /// active.
    pub fn complete(
        &mut self,
        correct_count: u32,
        final_time_spent_secs: u32,
        now: DateTime<Utc>,
    ) -> Result<(), SessionStateError> {
        self.ensure_active()?;

        // question_ids is non-empty by construction, so the division is safe
        let total = u32::try_from(self.question_ids.len()).unwrap_or(u32::MAX);
        self.score = Some(score_percent(correct_count, total));
        self.time_spent_secs = final_time_spent_secs;
        self.status = SessionStatus::Completed;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Abandon the session, opening the recovery window.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidTransition` unless the session is
    /// active.
    pub fn abandon(
        &mut self,
        reason: AbandonReason,
        now: DateTime<Utc>,
    ) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        self.status = SessionStatus::Abandoned;
        self.abandoned_at = Some(now);
        self.abandon_reason = Some(reason);
        self.recoverable = true;
        Ok(())
    }

    /// Reactivate an abandoned session, preserving answers and elapsed time.
    ///
    /// Denial leaves the session untouched; an expired window is an expected
    /// outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RecoveryDenied` if the session is not abandoned, was marked
    /// unrecoverable, or the window has elapsed.
    pub fn try_recover(&mut self, now: DateTime<Utc>) -> Result<(), RecoveryDenied> {
        if self.status != SessionStatus::Abandoned {
            return Err(RecoveryDenied::NotAbandoned);
        }
        if !self.recoverable {
            return Err(RecoveryDenied::NotRecoverable);
        }
        let Some(abandoned_at) = self.abandoned_at else {
            return Err(RecoveryDenied::NotRecoverable);
        };
        if now - abandoned_at >= Duration::hours(RECOVERY_WINDOW_HOURS) {
            return Err(RecoveryDenied::WindowExpired);
        }

        self.status = SessionStatus::Active;
        self.resumed_at = Some(now);
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
