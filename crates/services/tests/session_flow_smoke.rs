use chrono::Duration;
use quiz_core::model::{AbandonReason, Difficulty, Question, QuestionId, SessionMode, UserId};
use quiz_core::time::fixed_now;
use services::{
    Clock, NavigationGuard, RecoveryOutcome, SessionOrchestrator, SessionStore, StaticPrompt,
};
use storage::repository::{InMemoryRepository, QuestionRepository, SessionRepository};

fn user() -> UserId {
    UserId::new(42)
}

async fn seed_questions(repo: &InMemoryRepository) -> Vec<QuestionId> {
    // correct options: b, a, c, a
    let correct = [1, 0, 2, 0];
    let mut ids = Vec::new();
    for (i, correct_index) in correct.into_iter().enumerate() {
        let id = QuestionId::new(i as u64 + 1);
        let question = Question::new(
            id,
            format!("Smoke question {i}?"),
            vec!["a".into(), "b".into(), "c".into()],
            correct_index,
            "smoke",
            Difficulty::Easy,
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();
        ids.push(id);
    }
    ids
}

fn store_at(repo: &InMemoryRepository, clock: Clock) -> SessionStore {
    SessionStore::new(
        clock,
        std::sync::Arc::new(repo.clone()),
        std::sync::Arc::new(repo.clone()),
    )
}

#[tokio::test]
async fn full_session_flow_scores_and_persists() {
    let repo = InMemoryRepository::new();
    let ids = seed_questions(&repo).await;
    let clock = Clock::fixed(fixed_now());

    let mut orch = SessionOrchestrator::new(store_at(&repo, clock), clock, user());
    let session = orch
        .create_session(SessionMode::Quick, ids, None)
        .await
        .unwrap();
    orch.start_session().unwrap();

    // answer every question, getting three of four right
    let picks = [1, 0, 2, 2];
    for (index, pick) in picks.into_iter().enumerate() {
        assert!(orch.navigate_to(index));
        orch.submit_answer(pick).await.unwrap();
    }

    let completed = orch.complete_session().await.unwrap();
    assert_eq!(completed.score(), Some(75));
    assert!(!orch.has_active_session());

    let stored = store_at(&repo, clock)
        .get_session(user(), session.id())
        .await
        .unwrap();
    assert_eq!(stored.score(), Some(75));
    assert_eq!(stored.answered_count(), 4);
}

#[tokio::test]
async fn abandon_via_guard_then_recover_next_day() {
    let repo = InMemoryRepository::new();
    let ids = seed_questions(&repo).await;
    let clock = Clock::fixed(fixed_now());

    let mut orch = SessionOrchestrator::new(store_at(&repo, clock), clock, user());
    let session = orch
        .create_session(SessionMode::Quick, ids, None)
        .await
        .unwrap();
    orch.start_session().unwrap();
    orch.navigate_to(1);
    orch.submit_answer(0).await.unwrap();

    let guard = NavigationGuard::new(StaticPrompt(true));
    guard.intercept(&mut orch).await.unwrap();
    assert!(!orch.has_active_session());

    // twelve hours later the session is offered for recovery
    let later = Clock::fixed(fixed_now() + Duration::hours(12));
    let recoverable = store_at(&repo, later)
        .list_recoverable(user())
        .await
        .unwrap();
    assert_eq!(recoverable.len(), 1);
    assert_eq!(
        recoverable[0].abandon_reason(),
        Some(AbandonReason::UserNavigation)
    );

    let mut orch = SessionOrchestrator::new(store_at(&repo, later), later, user());
    let outcome = orch.recover_session(session.id()).await.unwrap();
    let RecoveryOutcome::Recovered(recovered) = outcome else {
        panic!("expected recovery inside the window");
    };
    assert_eq!(orch.current_question_index(), Some(1));
    assert_eq!(recovered.answers()[1], Some(0));

    // finish the recovered attempt
    for index in [0usize, 2, 3] {
        orch.navigate_to(index);
        orch.submit_answer(1).await.unwrap();
    }
    let completed = orch.complete_session().await.unwrap();
    assert_eq!(completed.score(), Some(50));
}

#[tokio::test]
async fn recovery_is_refused_after_the_window_closes() {
    let repo = InMemoryRepository::new();
    let ids = seed_questions(&repo).await;
    let clock = Clock::fixed(fixed_now());

    let store = store_at(&repo, clock);
    let session = store
        .create_session(user(), SessionMode::Quick, ids, None)
        .await
        .unwrap();
    store
        .abandon_session(user(), session.id(), AbandonReason::WindowClosed)
        .await
        .unwrap();

    let later = Clock::fixed(fixed_now() + Duration::hours(25));
    let mut orch = SessionOrchestrator::new(store_at(&repo, later), later, user());
    let outcome = orch.recover_session(session.id()).await.unwrap();
    assert_eq!(outcome, RecoveryOutcome::Expired);
    assert!(!orch.has_active_session());

    // denial mutates nothing
    let stored = repo.get_session(session.id()).await.unwrap();
    assert!(stored.recoverable());
    assert_eq!(stored.abandoned_at(), Some(fixed_now()));
}
