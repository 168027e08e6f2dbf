//! Concurrent host actions and conflict retries

use std::sync::Arc;
use assert_matches::assert_matches;

use MicNight::models::{EventStatus, SignupListMode, SignupStatus};
use MicNight::MicNightError;

use crate::helpers::*;
use crate::integration::{init_test_logging, setup_integration_test};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_double_next_click_keeps_one_current_performer() {
    init_test_logging();
    let ctx = setup_integration_test();
    let (event, _) = ctx.live_event(SignupListMode::Bucket, 3).await;
    let event_id = event.id;

    let first = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.select_next_performer(event_id, &host()).await })
    };
    let second = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.select_next_performer(event_id, &host()).await })
    };
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();
    assert_ne!(a.id, b.id);

    let current = ctx.current_performers(event.id).await;
    assert_eq!(current.len(), 1);
    let performed = ctx
        .signups(event.id)
        .await
        .into_iter()
        .filter(|s| s.status == SignupStatus::Performed)
        .count();
    assert_eq!(performed, 1);
    assert_eq!(
        ctx.engine.get_event(event.id).await.unwrap().current_performer_id,
        Some(current[0].id)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_select_racing_cancel_never_leaves_cancelled_current() {
    let ctx = setup_integration_test();
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 1).await;
    let (event_id, target) = (event.id, signups[0].id);

    let select = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.select_next_performer(event_id, &host()).await })
    };
    let cancel = {
        let engine = ctx.engine.clone();
        tokio::spawn(async move { engine.cancel_signup(target, &performer(101)).await })
    };

    let selected = select.await.unwrap();
    cancel.await.unwrap().unwrap();
    if let Err(e) = selected {
        assert_matches!(e, MicNightError::NoCandidatesRemaining { .. });
    }

    let signup = ctx.engine.get_signup(target).await.unwrap();
    assert_eq!(signup.status, SignupStatus::Cancelled);
    assert!(!signup.is_current_performer);
    assert_eq!(ctx.engine.get_event(event.id).await.unwrap().current_performer_id, None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signups_never_exceed_capacity() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::SignupOrder, 5).await;
    let event_id = event.id;

    let mut tasks = Vec::new();
    for user_id in 300..310 {
        let engine = ctx.engine.clone();
        tasks.push(tokio::spawn(async move {
            engine
                .create_signup(event_id, &performer(user_id), signup_request("Racer"))
                .await
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(e) => assert_matches!(
                e,
                MicNightError::CapacityExceeded { .. } | MicNightError::Conflict { .. }
            ),
        }
    }

    let active = ctx.engine.queue(event.id).await.unwrap().len();
    assert_eq!(active, succeeded);
    assert!(active <= 5);
}

#[tokio::test]
async fn test_conflicts_are_retried() {
    let store = Arc::new(FlakyStore::new(2));
    let ctx = TestContext::with_store(store.clone());
    let event = ctx.create_event(SignupListMode::SignupOrder, 5).await;

    let live = ctx.engine.start_event(event.id, &host()).await.unwrap();

    assert_eq!(live.status, EventStatus::Live);
    assert_eq!(store.commit_attempts(), 3);
}

#[tokio::test]
async fn test_persistent_conflict_is_surfaced() {
    let store = Arc::new(FlakyStore::new(u32::MAX));
    let ctx = TestContext::with_store(store.clone());
    let event = ctx.create_event(SignupListMode::SignupOrder, 5).await;

    assert_matches!(
        ctx.engine.start_event(event.id, &host()).await,
        Err(MicNightError::Conflict { .. })
    );
    assert_eq!(store.commit_attempts(), 3);
    assert_eq!(ctx.engine.get_event(event.id).await.unwrap().status, EventStatus::Scheduled);
}

#[tokio::test]
async fn test_logical_errors_are_not_retried() {
    let store = Arc::new(FlakyStore::new(0));
    let ctx = TestContext::with_store(store.clone());
    let event = ctx.create_event(SignupListMode::SignupOrder, 1).await;
    ctx.sign_up_performers(event.id, 1).await;
    let before = store.commit_attempts();

    assert_matches!(
        ctx.engine.create_signup(event.id, &performer(150), signup_request("Full")).await,
        Err(MicNightError::CapacityExceeded { .. })
    );
    assert_eq!(store.commit_attempts(), before);
}
