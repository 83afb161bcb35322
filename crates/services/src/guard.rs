//! Navigation interception for in-flight sessions.
//!
//! When the user tries to leave mid-session the guard asks the host for
//! confirmation before anything is mutated. Leaving means the attempt is
//! abandoned with [`AbandonReason::UserNavigation`], which keeps it inside
//! the recovery window rather than losing it.

use tracing::debug;

use quiz_core::model::AbandonReason;

use crate::error::SessionError;
use crate::orchestrator::SessionOrchestrator;

/// Outcome of an intercepted navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// The user confirmed leaving; the session was abandoned.
    Allowed,
    /// The user chose to stay; nothing changed.
    Blocked,
}

/// Host-side confirmation surface, e.g. a browser dialog or TUI prompt.
pub trait LeavePrompt {
    /// Ask whether the user really wants to leave. Returns true to leave.
    fn confirm_leave(&self) -> bool;
}

/// A prompt with a fixed answer, for embedding contexts without a UI and
/// for tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticPrompt(pub bool);

impl LeavePrompt for StaticPrompt {
    fn confirm_leave(&self) -> bool {
        self.0
    }
}

/// Intercepts navigation away from an active session.
pub struct NavigationGuard<P: LeavePrompt> {
    prompt: P,
}

impl<P: LeavePrompt> NavigationGuard<P> {
    pub fn new(prompt: P) -> Self {
        Self { prompt }
    }

    /// Handle a navigation attempt.
    ///
    /// Without an active session navigation passes through untouched. With
    /// one, the prompt decides: confirming abandons the session first, so
    /// the navigation only proceeds once the attempt is safely recoverable.
    ///
    /// # Errors
    ///
    /// Propagates storage failures from the abandonment itself; the caller
    /// should treat an error as a blocked navigation.
    pub async fn intercept(
        &self,
        orchestrator: &mut SessionOrchestrator,
    ) -> Result<NavigationDecision, SessionError> {
        if !orchestrator.has_active_session() {
            return Ok(NavigationDecision::Allowed);
        }

        if !self.prompt.confirm_leave() {
            debug!("navigation blocked, user chose to stay");
            return Ok(NavigationDecision::Blocked);
        }

        orchestrator
            .abandon_session(AbandonReason::UserNavigation)
            .await?;
        Ok(NavigationDecision::Allowed)
    }
}
