//! Timer subsystem for timed sessions.
//!
//! Remaining time is always derived from a fixed anchor timestamp plus the
//! limit, never from decrementing a counter, so suspended tabs and slow
//! ticks cannot cause drift. The anchor is the session start, or
//! `now - time_spent` after a recovery, so time spent before abandonment
//! keeps counting against the limit while the abandoned gap does not.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::orchestrator::SessionOrchestrator;

/// Periodic report from the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Running { remaining_secs: u32 },
    Expired,
}

/// Countdown state for one timed session.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    anchor: DateTime<Utc>,
    limit_secs: u32,
}

impl SessionTimer {
    #[must_use]
    pub fn new(anchor: DateTime<Utc>, limit_secs: u32) -> Self {
        Self { anchor, limit_secs }
    }

    /// Seconds left on the clock, saturating at zero.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.anchor).num_seconds().max(0);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.limit_secs.saturating_sub(elapsed)
    }
}

/// Drive an orchestrator's timer at 1 Hz until the timed session has been
/// completed (including by expiry) or abandoned.
///
/// Each tick's status is handed to `on_tick` for UI republication. The
/// auto-completion itself happens inside the orchestrator, which keeps the
/// session current across transient storage failures so a later tick can
/// retry.
pub async fn run_ticker<F>(orchestrator: Arc<Mutex<SessionOrchestrator>>, mut on_tick: F)
where
    F: FnMut(TimerStatus),
{
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let status = orchestrator.lock().await.handle_timer_tick().await;
        match status {
            Some(status) => {
                on_tick(status);
                if status == TimerStatus::Expired {
                    break;
                }
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::Clock;
    use quiz_core::model::{Difficulty, Question, QuestionId, SessionMode, UserId};
    use quiz_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, QuestionRepository};

    use crate::store::SessionStore;

    #[test]
    fn remaining_is_derived_from_anchor_not_tick_count() {
        let timer = SessionTimer::new(fixed_now(), 300);
        assert_eq!(timer.remaining_secs(fixed_now()), 300);
        // a 250-second gap with no intermediate ticks is still accounted for
        assert_eq!(
            timer.remaining_secs(fixed_now() + Duration::seconds(250)),
            50
        );
        assert_eq!(
            timer.remaining_secs(fixed_now() + Duration::seconds(301)),
            0
        );
    }

    #[test]
    fn clock_skew_before_anchor_does_not_underflow() {
        let timer = SessionTimer::new(fixed_now(), 60);
        assert_eq!(
            timer.remaining_secs(fixed_now() - Duration::seconds(5)),
            60
        );
    }

    async fn timed_orchestrator(repo: &InMemoryRepository) -> SessionOrchestrator {
        let question = Question::new(
            QuestionId::new(1),
            "Ticker question?",
            vec!["a".into(), "b".into()],
            0,
            "general",
            Difficulty::Easy,
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();

        let store = SessionStore::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let mut orch = SessionOrchestrator::new(store, Clock::fixed(fixed_now()), UserId::new(7));
        orch.create_session(SessionMode::Timed, vec![QuestionId::new(1)], Some(60))
            .await
            .unwrap();
        orch.start_session().unwrap();
        orch
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_reports_expiry_and_stops() {
        let repo = InMemoryRepository::new();
        let mut orch = timed_orchestrator(&repo).await;
        orch.set_clock(Clock::fixed(fixed_now() + Duration::seconds(61)));
        let orch = Arc::new(Mutex::new(orch));

        let mut seen = Vec::new();
        run_ticker(orch.clone(), |status| seen.push(status)).await;

        assert_eq!(seen, vec![TimerStatus::Expired]);
        assert!(!orch.lock().await.has_active_session());
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_stops_when_nothing_is_timed() {
        let repo = InMemoryRepository::new();
        let store = SessionStore::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        let orch = Arc::new(Mutex::new(SessionOrchestrator::new(
            store,
            Clock::fixed(fixed_now()),
            UserId::new(7),
        )));

        let mut seen = Vec::new();
        run_ticker(orch, |status| seen.push(status)).await;
        assert!(seen.is_empty());
    }
}
