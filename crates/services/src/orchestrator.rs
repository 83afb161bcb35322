//! The client-resident half of the session core.
//!
//! `SessionOrchestrator` owns "the current session" for one browsing
//! context, delegates every mutation to the [`SessionStore`], and emits one
//! typed event per state change for UI adapters. It is meant to be owned by
//! the application root and passed by reference, not reached through a
//! global.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::warn;

use quiz_core::Clock;
use quiz_core::model::{AbandonReason, QuestionId, Session, SessionId, SessionMode, UserId};

use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::store::{RecoveryOutcome, SessionStore};
use crate::timer::{SessionTimer, TimerStatus};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Locally cached state for the one session this context is working on.
struct CurrentSession {
    session: Session,
    question_index: usize,
    last_activity: DateTime<Utc>,
    timer: Option<SessionTimer>,
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    u32::try_from((to - from).num_seconds().max(0)).unwrap_or(u32::MAX)
}

pub struct SessionOrchestrator {
    store: SessionStore,
    clock: Clock,
    user_id: UserId,
    events: broadcast::Sender<SessionEvent>,
    current: Option<CurrentSession>,
}

impl SessionOrchestrator {
    #[must_use]
    pub fn new(store: SessionStore, clock: Clock, user_id: UserId) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            clock,
            user_id,
            events,
            current: None,
        }
    }

    /// Subscribe to the lifecycle event stream. Observers must never block;
    /// slow subscribers simply lag and miss events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // send only fails when nobody is subscribed, which is fine
        let _ = self.events.send(event);
    }

    //
    // ─── DERIVED QUERIES ───────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn has_active_session(&self) -> bool {
        self.current.is_some()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref().map(|c| &c.session)
    }

    #[must_use]
    pub fn current_question_index(&self) -> Option<usize> {
        self.current.as_ref().map(|c| c.question_index)
    }

    #[must_use]
    pub fn can_navigate_next(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.question_index + 1 < c.session.question_count())
    }

    #[must_use]
    pub fn can_navigate_previous(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.question_index > 0)
    }

    //
    // ─── LIFECYCLE OPERATIONS ──────────────────────────────────────────────────
    //

    /// Create a new attempt and make it the current session.
    ///
    /// At most one session may be active per context: a second create is
    /// rejected rather than implicitly abandoning the first, so no progress
    /// is ever destroyed silently.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive` while a session is active, and
    /// otherwise whatever the store returns.
    pub async fn create_session(
        &mut self,
        mode: SessionMode,
        question_ids: Vec<QuestionId>,
        time_limit_secs: Option<u32>,
    ) -> Result<Session, SessionError> {
        if self.current.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let session = self
            .store
            .create_session(self.user_id, mode, question_ids, time_limit_secs)
            .await?;
        self.current = Some(CurrentSession {
            session: session.clone(),
            question_index: 0,
            last_activity: self.clock.now(),
            timer: None,
        });
        self.emit(SessionEvent::Created {
            session: session.clone(),
        });
        Ok(session)
    }

    /// Mark the current session as presented to the user, arming the timer
    /// for timed sessions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` without a current session.
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        let now = self.clock.now();
        let Some(current) = self.current.as_mut() else {
            return Err(SessionError::NoActiveSession);
        };

        if let Some(limit) = current.session.time_limit_secs() {
            current.timer = Some(SessionTimer::new(current.session.started_at(), limit));
        }
        current.last_activity = now;
        let snapshot = current.session.clone();
        self.emit(SessionEvent::Started { session: snapshot });
        Ok(())
    }

    /// Move the local cursor to `index`. Purely a client-side move: nothing
    /// is persisted until an answer is submitted. Returns false (and does
    /// nothing) for an out-of-bounds index or when no session is active.
    pub fn navigate_to(&mut self, index: usize) -> bool {
        let Some(current) = self.current.as_mut() else {
            return false;
        };
        if index >= current.session.question_count() {
            return false;
        }

        current.question_index = index;
        let snapshot = current.session.clone();
        self.emit(SessionEvent::QuestionChanged {
            session: snapshot,
            index,
        });
        true
    }

    /// Submit an answer for the currently focused question. The time-spent
    /// delta is derived from the last activity timestamp.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` without a current session,
    /// and otherwise whatever the store returns.
    pub async fn submit_answer(&mut self, selected_option: u32) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let Some(current) = self.current.as_mut() else {
            return Err(SessionError::NoActiveSession);
        };

        let question_index = current.question_index;
        let delta = elapsed_secs(current.last_activity, now);
        let updated = self
            .store
            .submit_answer(
                self.user_id,
                current.session.id(),
                question_index,
                selected_option,
                delta,
            )
            .await?;

        current.session = updated.clone();
        current.last_activity = now;
        self.emit(SessionEvent::AnswerSubmitted {
            session: updated.clone(),
            question_index,
        });
        Ok(updated)
    }

    /// Complete the current session. The score comes back from the store;
    /// nothing on this path accepts one from the caller.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` without a current session,
    /// and otherwise whatever the store returns.
    pub async fn complete_session(&mut self) -> Result<Session, SessionError> {
        let now = self.clock.now();
        let Some(current) = self.current.as_ref() else {
            return Err(SessionError::NoActiveSession);
        };

        let final_time = current
            .session
            .time_spent_secs()
            .saturating_add(elapsed_secs(current.last_activity, now));
        let completed = self
            .store
            .complete_session(self.user_id, current.session.id(), final_time)
            .await?;

        self.current = None;
        self.emit(SessionEvent::Completed {
            session: completed.clone(),
        });
        Ok(completed)
    }

    /// Abandon the current session, recording the reason, and release the
    /// current-session reference.
    ///
    /// On a storage failure the current session is kept and nothing is
    /// emitted, so local state keeps agreeing with the store and the caller
    /// can simply retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` without a current session,
    /// and otherwise whatever the store returns.
    pub async fn abandon_session(&mut self, reason: AbandonReason) -> Result<(), SessionError> {
        let now = self.clock.now();
        let Some(current) = self.current.take() else {
            return Err(SessionError::NoActiveSession);
        };
        let session_id = current.session.id();

        if let Err(err) = self
            .store
            .abandon_session(self.user_id, session_id, reason)
            .await
        {
            self.current = Some(current);
            return Err(err);
        }

        // mirror the persisted transition onto the cached copy for the
        // event snapshot; the cache is Active by invariant
        let mut snapshot = current.session;
        if snapshot.abandon(reason, now).is_ok() {
            self.emit(SessionEvent::Abandoned { session: snapshot });
        }
        Ok(())
    }

    /// Reactivate an abandoned session and make it current, restoring the
    /// cursor to the last visited question. For timed sessions the timer is
    /// re-anchored so previously spent time still counts against the limit.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive` while a session is active, and
    /// otherwise whatever the store returns. An expired window is a normal
    /// `RecoveryOutcome::Expired`, not an error.
    pub async fn recover_session(
        &mut self,
        session_id: SessionId,
    ) -> Result<RecoveryOutcome, SessionError> {
        if self.current.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let now = self.clock.now();
        match self.store.recover_session(self.user_id, session_id).await? {
            RecoveryOutcome::Recovered(session) => {
                let timer = session.time_limit_secs().map(|limit| {
                    let anchor = now - Duration::seconds(i64::from(session.time_spent_secs()));
                    SessionTimer::new(anchor, limit)
                });
                self.current = Some(CurrentSession {
                    session: session.clone(),
                    question_index: session.last_question_index(),
                    last_activity: now,
                    timer,
                });
                self.emit(SessionEvent::Recovered {
                    session: session.clone(),
                });
                Ok(RecoveryOutcome::Recovered(session))
            }
            RecoveryOutcome::Expired => Ok(RecoveryOutcome::Expired),
        }
    }

    /// Forward a visibility change from the host environment to observers.
    pub fn note_visibility(&self, visible: bool) {
        self.emit(SessionEvent::VisibilityChanged { visible });
    }

    #[cfg(test)]
    pub(crate) fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    //
    // ─── TIMER INTEGRATION ─────────────────────────────────────────────────────
    //

    /// One timer tick: recompute remaining time from the anchor and, at
    /// zero, auto-complete with whatever answers exist.
    ///
    /// Returns `None` when there is nothing to time (no current session or
    /// an untimed one), which tells the ticker to stop. A manual completion
    /// racing the expiry shows up as `InvalidState` from the store and is
    /// absorbed as a no-op. A transient storage failure leaves the current
    /// session in place and reports `Running` at zero, so the next tick
    /// retries the completion; the store's state check keeps those retries
    /// safe.
    pub async fn handle_timer_tick(&mut self) -> Option<TimerStatus> {
        let now = self.clock.now();
        let current = self.current.as_ref()?;
        let timer = current.timer.as_ref()?;

        let remaining = timer.remaining_secs(now);
        if remaining > 0 {
            return Some(TimerStatus::Running {
                remaining_secs: remaining,
            });
        }

        let final_time = current
            .session
            .time_spent_secs()
            .saturating_add(elapsed_secs(current.last_activity, now));
        let session_id = current.session.id();
        match self
            .store
            .complete_session(self.user_id, session_id, final_time)
            .await
        {
            Ok(completed) => {
                self.current = None;
                self.emit(SessionEvent::Completed { session: completed });
                Some(TimerStatus::Expired)
            }
            Err(SessionError::InvalidState { .. }) => {
                // already completed or abandoned elsewhere
                self.current = None;
                Some(TimerStatus::Expired)
            }
            Err(err) => {
                warn!(session_id = %session_id, %err, "auto-completion failed, retrying next tick");
                Some(TimerStatus::Running { remaining_secs: 0 })
            }
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Difficulty, Question, SessionDraft, SessionStatus};
    use quiz_core::time::fixed_now;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use storage::repository::{
        InMemoryRepository, QuestionRepository, SessionRepository, StorageError,
    };

    fn user() -> UserId {
        UserId::new(7)
    }

    /// Five questions with correct indices [0, 1, 3, 1, 0].
    async fn seed_questions(repo: &InMemoryRepository) -> Vec<QuestionId> {
        let correct = [0, 1, 3, 1, 0];
        let mut ids = Vec::new();
        for (i, correct_index) in correct.into_iter().enumerate() {
            let id = QuestionId::new(i as u64 + 1);
            let question = Question::new(
                id,
                format!("Question {i}?"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_index,
                "general",
                Difficulty::Medium,
            )
            .unwrap();
            repo.upsert_question(&question).await.unwrap();
            ids.push(id);
        }
        ids
    }

    fn orchestrator(repo: &InMemoryRepository, clock: Clock) -> SessionOrchestrator {
        let store = SessionStore::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()));
        SessionOrchestrator::new(store, clock, user())
    }

    /// Session repository that fails `update_session` a configurable number
    /// of times before delegating, for exercising transient-failure paths.
    struct UnreliableSessions {
        inner: InMemoryRepository,
        update_failures_left: AtomicU32,
    }

    #[async_trait::async_trait]
    impl SessionRepository for UnreliableSessions {
        async fn create_session(&self, draft: &SessionDraft) -> Result<Session, StorageError> {
            self.inner.create_session(draft).await
        }

        async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
            self.inner.get_session(id).await
        }

        async fn update_session(&self, session: &Session) -> Result<(), StorageError> {
            if self.update_failures_left.load(Ordering::SeqCst) > 0 {
                self.update_failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(StorageError::Connection("connection reset".into()));
            }
            self.inner.update_session(session).await
        }

        async fn list_sessions(
            &self,
            user_id: UserId,
            status: Option<SessionStatus>,
            limit: u32,
        ) -> Result<Vec<Session>, StorageError> {
            self.inner.list_sessions(user_id, status, limit).await
        }

        async fn list_recoverable(&self, user_id: UserId) -> Result<Vec<Session>, StorageError> {
            self.inner.list_recoverable(user_id).await
        }
    }

    fn unreliable_orchestrator(
        repo: &InMemoryRepository,
        clock: Clock,
    ) -> (SessionOrchestrator, Arc<UnreliableSessions>) {
        let sessions = Arc::new(UnreliableSessions {
            inner: repo.clone(),
            update_failures_left: AtomicU32::new(0),
        });
        let store = SessionStore::new(clock, Arc::new(repo.clone()), sessions.clone());
        (SessionOrchestrator::new(store, clock, user()), sessions)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        kinds
    }

    #[tokio::test]
    async fn full_flow_emits_one_event_per_operation() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        orch.create_session(SessionMode::Quick, ids, None)
            .await
            .unwrap();
        orch.start_session().unwrap();
        assert!(orch.navigate_to(1));
        orch.submit_answer(1).await.unwrap();
        let completed = orch.complete_session().await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                "created",
                "started",
                "question_changed",
                "answer_submitted",
                "completed"
            ]
        );
        assert_eq!(completed.score(), Some(20));
        assert!(!orch.has_active_session());
    }

    #[tokio::test]
    async fn navigation_is_bounds_checked_and_local() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));

        assert!(!orch.navigate_to(0), "no session yet");

        orch.create_session(SessionMode::Quick, ids, None)
            .await
            .unwrap();
        assert!(!orch.navigate_to(5));
        assert!(!orch.navigate_to(usize::MAX));
        assert_eq!(orch.current_question_index(), Some(0));

        assert!(orch.navigate_to(4));
        assert_eq!(orch.current_question_index(), Some(4));
        assert!(!orch.can_navigate_next());
        assert!(orch.can_navigate_previous());

        // cursor moves are not persisted
        let stored = orch
            .current_session()
            .map(|s| s.last_question_index())
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn second_create_is_rejected_while_active() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));

        orch.create_session(SessionMode::Quick, ids.clone(), None)
            .await
            .unwrap();
        let err = orch
            .create_session(SessionMode::Quick, ids, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::AlreadyActive));
    }

    #[tokio::test]
    async fn submit_without_session_is_rejected() {
        let repo = InMemoryRepository::new();
        seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));

        let err = orch.submit_answer(0).await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveSession));
    }

    #[tokio::test]
    async fn timer_expiry_completes_exactly_once() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        orch.create_session(SessionMode::Timed, ids, Some(60))
            .await
            .unwrap();
        orch.start_session().unwrap();
        orch.submit_answer(0).await.unwrap();

        let status = orch.handle_timer_tick().await.unwrap();
        assert_eq!(
            status,
            TimerStatus::Running { remaining_secs: 60 }
        );

        orch.set_clock(Clock::fixed(fixed_now() + Duration::seconds(61)));
        let status = orch.handle_timer_tick().await.unwrap();
        assert_eq!(status, TimerStatus::Expired);
        assert!(!orch.has_active_session());

        // subsequent ticks are inert
        assert_eq!(orch.handle_timer_tick().await, None);

        let kinds = drain(&mut rx);
        assert_eq!(
            kinds.iter().filter(|k| **k == "completed").count(),
            1,
            "expiry must complete exactly once"
        );
    }

    #[tokio::test]
    async fn timer_expiry_scores_recorded_answers_only() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));

        let session = orch
            .create_session(SessionMode::Timed, ids, Some(60))
            .await
            .unwrap();
        orch.start_session().unwrap();
        // answer the first question correctly, leave the rest blank
        orch.submit_answer(0).await.unwrap();

        orch.set_clock(Clock::fixed(fixed_now() + Duration::seconds(120)));
        orch.handle_timer_tick().await.unwrap();

        let store = SessionStore::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let stored = store.get_session(user(), session.id()).await.unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);
        assert_eq!(stored.score(), Some(20));
    }

    #[tokio::test]
    async fn tick_absorbs_a_racing_manual_completion() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        let session = orch
            .create_session(SessionMode::Timed, ids, Some(60))
            .await
            .unwrap();
        orch.start_session().unwrap();

        // another context completes the session out from under us
        let store = SessionStore::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        store
            .complete_session(user(), session.id(), 10)
            .await
            .unwrap();

        orch.set_clock(Clock::fixed(fixed_now() + Duration::seconds(61)));
        let status = orch.handle_timer_tick().await.unwrap();
        assert_eq!(status, TimerStatus::Expired);
        assert!(!orch.has_active_session());

        // the tick applied no effect, so it emitted no completion event
        let kinds = drain(&mut rx);
        assert!(!kinds.contains(&"completed"));
    }

    #[tokio::test]
    async fn abandon_and_recover_restore_cursor_and_timer() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let mut orch = orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        let session = orch
            .create_session(SessionMode::Timed, ids, Some(300))
            .await
            .unwrap();
        orch.start_session().unwrap();
        orch.navigate_to(2);
        orch.submit_answer(3).await.unwrap();
        orch.abandon_session(AbandonReason::WindowClosed)
            .await
            .unwrap();
        assert!(!orch.has_active_session());

        let resume_at = fixed_now() + Duration::hours(2);
        let resumed_repo_clock = Clock::fixed(resume_at);
        let mut orch = orchestrator(&repo, resumed_repo_clock);
        let outcome = orch.recover_session(session.id()).await.unwrap();
        assert!(matches!(outcome, RecoveryOutcome::Recovered(_)));
        assert_eq!(orch.current_question_index(), Some(2));

        // previously spent time is charged against the limit
        let status = orch.handle_timer_tick().await.unwrap();
        let spent = orch.current_session().unwrap().time_spent_secs();
        assert_eq!(
            status,
            TimerStatus::Running {
                remaining_secs: 300 - spent
            }
        );

        let kinds = drain(&mut rx);
        assert!(kinds.contains(&"abandoned"));
    }

    #[tokio::test]
    async fn timer_expiry_retries_after_transient_storage_failure() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let (mut orch, sessions) = unreliable_orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        let session = orch
            .create_session(SessionMode::Timed, ids, Some(60))
            .await
            .unwrap();
        orch.start_session().unwrap();
        orch.submit_answer(0).await.unwrap();

        // the expiry tick hits a connection failure; the session must stay
        // current so a later tick can retry
        sessions.update_failures_left.store(1, Ordering::SeqCst);
        orch.set_clock(Clock::fixed(fixed_now() + Duration::seconds(61)));
        let status = orch.handle_timer_tick().await.unwrap();
        assert_eq!(status, TimerStatus::Running { remaining_secs: 0 });
        assert!(orch.has_active_session());
        assert_eq!(
            repo.get_session(session.id()).await.unwrap().status(),
            SessionStatus::Active
        );

        // the next tick completes
        let status = orch.handle_timer_tick().await.unwrap();
        assert_eq!(status, TimerStatus::Expired);
        assert!(!orch.has_active_session());

        let stored = repo.get_session(session.id()).await.unwrap();
        assert_eq!(stored.status(), SessionStatus::Completed);
        assert_eq!(stored.score(), Some(20));

        let kinds = drain(&mut rx);
        assert_eq!(kinds.iter().filter(|k| **k == "completed").count(), 1);
    }

    #[tokio::test]
    async fn failed_abandon_keeps_local_and_stored_state_in_agreement() {
        let repo = InMemoryRepository::new();
        let ids = seed_questions(&repo).await;
        let (mut orch, sessions) = unreliable_orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        let session = orch
            .create_session(SessionMode::Quick, ids, None)
            .await
            .unwrap();
        orch.start_session().unwrap();

        sessions.update_failures_left.store(1, Ordering::SeqCst);
        let err = orch
            .abandon_session(AbandonReason::WindowClosed)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));

        // both sides still consider the session active, so a retry works
        assert!(orch.has_active_session());
        assert_eq!(
            repo.get_session(session.id()).await.unwrap().status(),
            SessionStatus::Active
        );

        orch.abandon_session(AbandonReason::WindowClosed)
            .await
            .unwrap();
        assert!(!orch.has_active_session());
        assert_eq!(
            repo.get_session(session.id()).await.unwrap().status(),
            SessionStatus::Abandoned
        );

        let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        let abandoned: Vec<_> = events
            .iter()
            .filter(|e| e.kind() == "abandoned")
            .collect();
        assert_eq!(abandoned.len(), 1, "only the successful abandon emits");
        assert_eq!(
            abandoned[0].session().map(Session::status),
            Some(SessionStatus::Abandoned)
        );
    }

    #[tokio::test]
    async fn visibility_changes_reach_subscribers() {
        let repo = InMemoryRepository::new();
        let orch = orchestrator(&repo, Clock::fixed(fixed_now()));
        let mut rx = orch.subscribe();

        orch.note_visibility(false);
        orch.note_visibility(true);

        assert_eq!(
            drain(&mut rx),
            vec!["visibility_changed", "visibility_changed"]
        );
    }
}
