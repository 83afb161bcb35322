//! Typed lifecycle events emitted by the orchestrator.
//!
//! Events are transient: they drive UI reactivity (and optional read-only
//! analytics observers) and are never persisted. Every state-changing
//! orchestrator operation emits exactly one event, synchronously, after its
//! effect has been applied; each event carries the session snapshot taken
//! at that point.

use quiz_core::model::Session;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Created { session: Session },
    Started { session: Session },
    QuestionChanged { session: Session, index: usize },
    AnswerSubmitted { session: Session, question_index: usize },
    Completed { session: Session },
    Abandoned { session: Session },
    Recovered { session: Session },
    VisibilityChanged { visible: bool },
}

impl SessionEvent {
    /// Stable name of the event variant, for logs and observers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Created { .. } => "created",
            SessionEvent::Started { .. } => "started",
            SessionEvent::QuestionChanged { .. } => "question_changed",
            SessionEvent::AnswerSubmitted { .. } => "answer_submitted",
            SessionEvent::Completed { .. } => "completed",
            SessionEvent::Abandoned { .. } => "abandoned",
            SessionEvent::Recovered { .. } => "recovered",
            SessionEvent::VisibilityChanged { .. } => "visibility_changed",
        }
    }

    /// The session snapshot carried by the event, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionEvent::Created { session }
            | SessionEvent::Started { session }
            | SessionEvent::QuestionChanged { session, .. }
            | SessionEvent::AnswerSubmitted { session, .. }
            | SessionEvent::Completed { session }
            | SessionEvent::Abandoned { session }
            | SessionEvent::Recovered { session } => Some(session),
            SessionEvent::VisibilityChanged { .. } => None,
        }
    }
}
