//! Bucket mode integration tests

use std::sync::Arc;
use assert_matches::assert_matches;

use MicNight::models::{SignupListMode, SignupStatus};
use MicNight::services::QueueFact;
use MicNight::MicNightError;

use crate::helpers::*;
use crate::integration::{init_test_logging, setup_integration_test};

#[tokio::test]
async fn test_bucket_selection_with_two_performers() {
    init_test_logging();
    // first draw picks the second candidate in id order
    let mut ctx = TestContext::with_random(Arc::new(ScriptedRandom::new([1])));
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 2).await;
    let (a, b) = (&signups[0], &signups[1]);
    ctx.drain_facts();

    let first = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();
    assert_eq!(first.id, b.id);
    assert!(first.is_current_performer);
    assert_eq!(first.status, SignupStatus::Performing);

    let untouched = ctx.engine.get_signup(a.id).await.unwrap();
    assert!(!untouched.is_current_performer);
    assert_eq!(untouched.status, SignupStatus::Confirmed);
    assert_eq!(ctx.engine.get_event(event.id).await.unwrap().current_performer_id, Some(b.id));

    let second = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();
    assert_eq!(second.id, a.id);

    let previous = ctx.engine.get_signup(b.id).await.unwrap();
    assert!(previous.is_finished);
    assert!(!previous.is_current_performer);
    assert_eq!(previous.status, SignupStatus::Performed);
    assert_eq!(ctx.current_performers(event.id).await.len(), 1);

    assert_eq!(
        ctx.drain_facts(),
        vec![
            QueueFact::PerformerSelected { event_id: event.id, signup_id: b.id },
            QueueFact::PerformerSelected { event_id: event.id, signup_id: a.id },
        ]
    );
}

#[tokio::test]
async fn test_bucket_exhaustion() {
    let ctx = setup_integration_test();
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 1).await;

    let only = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();
    assert_eq!(only.id, signups[0].id);

    assert_matches!(
        ctx.engine.select_next_performer(event.id, &host()).await,
        Err(MicNightError::NoCandidatesRemaining { .. })
    );

    // the failed draw leaves the current performer in place
    let current = ctx.current_performers(event.id).await;
    assert_eq!(current.len(), 1);
    assert_eq!(current[0].id, only.id);
}

#[tokio::test]
async fn test_selection_skips_finished_and_cancelled() {
    let ctx = setup_integration_test();
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 3).await;

    ctx.engine.mark_finished(signups[0].id, &host()).await.unwrap();
    ctx.engine.cancel_signup(signups[1].id, &performer(102)).await.unwrap();

    let chosen = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();
    assert_eq!(chosen.id, signups[2].id);
    assert_matches!(
        ctx.engine.select_next_performer(event.id, &host()).await,
        Err(MicNightError::NoCandidatesRemaining { .. })
    );
}

#[tokio::test]
async fn test_unmark_returns_performer_to_bucket() {
    let ctx = setup_integration_test();
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 1).await;

    let finished = ctx.engine.mark_finished(signups[0].id, &host()).await.unwrap();
    assert!(finished.is_finished);
    assert_eq!(finished.status, SignupStatus::Performed);
    assert!(ctx.engine.mark_finished(signups[0].id, &host()).await.unwrap().is_finished);

    let restored = ctx.engine.unmark_finished(signups[0].id, &host()).await.unwrap();
    assert!(!restored.is_finished);
    assert_eq!(restored.finished_at, None);
    assert_eq!(restored.status, SignupStatus::Confirmed);

    let chosen = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();
    assert_eq!(chosen.id, signups[0].id);
}

#[tokio::test]
async fn test_cancelling_current_performer_clears_pointer() {
    let ctx = setup_integration_test();
    let (event, _) = ctx.live_event(SignupListMode::Bucket, 2).await;
    let current = ctx.engine.select_next_performer(event.id, &host()).await.unwrap();

    ctx.engine.cancel_signup(current.id, &host()).await.unwrap();

    assert!(ctx.current_performers(event.id).await.is_empty());
    assert_eq!(ctx.engine.get_event(event.id).await.unwrap().current_performer_id, None);
}

#[tokio::test]
async fn test_selection_is_bucket_only_and_live_only() {
    let ctx = setup_integration_test();
    let (ordered, _) = ctx.live_event(SignupListMode::SignupOrder, 2).await;
    assert_matches!(
        ctx.engine.select_next_performer(ordered.id, &host()).await,
        Err(MicNightError::Validation(_))
    );

    let scheduled = ctx.create_event(SignupListMode::Bucket, 5).await;
    assert_matches!(
        ctx.engine.select_next_performer(scheduled.id, &host()).await,
        Err(MicNightError::InvalidTransition { .. })
    );

    let (bucket, _) = ctx.live_event(SignupListMode::Bucket, 1).await;
    assert_matches!(
        ctx.engine.select_next_performer(bucket.id, &performer(101)).await,
        Err(MicNightError::Forbidden(_))
    );
}

#[tokio::test]
async fn test_bucket_rejects_explicit_order() {
    let ctx = setup_integration_test();
    let (event, signups) = ctx.live_event(SignupListMode::Bucket, 2).await;

    assert_matches!(
        ctx.engine.set_performer_order(event.id, &host(), &[signups[1].id, signups[0].id], None).await,
        Err(MicNightError::Validation(_))
    );
}
