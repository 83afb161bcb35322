mod ids;
mod question;
mod session;

pub use ids::{ParseIdError, QuestionId, SessionId, UserId};
pub use question::{Difficulty, Question, QuestionError};
pub use session::{
    AbandonReason, RecoveryDenied, Session, SessionDraft, SessionMode, SessionStateError,
    SessionStatus, RECOVERY_WINDOW_HOURS,
};
