#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod guard;
pub mod orchestrator;
pub mod store;
pub mod timer;

pub use quiz_core::Clock;

pub use error::SessionError;
pub use events::SessionEvent;
pub use guard::{LeavePrompt, NavigationDecision, NavigationGuard, StaticPrompt};
pub use orchestrator::SessionOrchestrator;
pub use store::{RecoveryOutcome, SessionStore};
pub use timer::{SessionTimer, TimerStatus};
