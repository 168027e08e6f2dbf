//! Booked mic invitation integration tests

use assert_matches::assert_matches;

use MicNight::database::EventStore;
use MicNight::models::{InviteDecision, InviteStatus, SignupListMode, SignupStatus};
use MicNight::services::QueueFact;
use MicNight::MicNightError;

use crate::helpers::*;
use crate::integration::setup_integration_test;

#[tokio::test]
async fn test_invite_is_pending_and_reported() {
    let mut ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;

    let invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);
    assert_eq!(invite.invited_by, HOST_ID);
    assert_eq!(invite.responded_at, None);

    assert_eq!(
        ctx.drain_facts(),
        vec![QueueFact::InviteCreated {
            invite_id: invite.id,
            event_id: event.id,
            user_id: 201,
            invited_by: HOST_ID,
        }]
    );

    let mine = ctx.engine.invites_for_user(&performer(201)).await.unwrap();
    assert_eq!(mine, vec![invite.clone()]);
    let listed = ctx.engine.invites_for_event(event.id, &cohost(event.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_matches!(
        ctx.engine.invites_for_event(event.id, &performer(201)).await,
        Err(MicNightError::Forbidden(_))
    );
}

#[tokio::test]
async fn test_second_invite_for_same_user_is_rejected() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;
    ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();

    assert_matches!(
        ctx.engine.invite_performer(event.id, &host(), 201).await,
        Err(MicNightError::Validation(_))
    );

    ctx.engine
        .create_signup(event.id, &host(), signup_request("Host set"))
        .await
        .unwrap();
    assert_matches!(
        ctx.engine.invite_performer(event.id, &host(), HOST_ID).await,
        Err(MicNightError::DuplicateSignup { .. })
    );
}

#[tokio::test]
async fn test_declined_user_can_be_invited_again() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;
    let invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    ctx.engine
        .respond_to_invite(invite.id, &performer(201), InviteDecision::Decline, None)
        .await
        .unwrap();

    let again = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    assert_ne!(again.id, invite.id);
}

#[tokio::test]
async fn test_invites_require_booked_mic_and_manager() {
    let ctx = setup_integration_test();
    let open = ctx.create_event(SignupListMode::SignupOrder, 5).await;
    assert_matches!(
        ctx.engine.invite_performer(open.id, &host(), 201).await,
        Err(MicNightError::Validation(_))
    );

    let booked = ctx.create_event(SignupListMode::BookedMic, 5).await;
    assert_matches!(
        ctx.engine.invite_performer(booked.id, &performer(201), 202).await,
        Err(MicNightError::Forbidden(_))
    );
}

#[tokio::test]
async fn test_decline_then_accept_scenario() {
    let mut ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;

    let declined_invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    let declined = ctx
        .engine
        .respond_to_invite(declined_invite.id, &performer(201), InviteDecision::Decline, None)
        .await
        .unwrap();
    assert_eq!(declined.invite.status, InviteStatus::Declined);
    assert!(declined.invite.responded_at.is_some());
    assert!(declined.signup.is_none());
    assert!(ctx.signups(event.id).await.is_empty());

    let accepted_invite = ctx.engine.invite_performer(event.id, &host(), 202).await.unwrap();
    let accepted = ctx
        .engine
        .respond_to_invite(
            accepted_invite.id,
            &performer(202),
            InviteDecision::Accept,
            Some(accept_details("X")),
        )
        .await
        .unwrap();
    assert_eq!(accepted.invite.status, InviteStatus::Accepted);

    let signups = ctx.signups(event.id).await;
    assert_eq!(signups.len(), 1);
    assert_eq!(signups[0].status, SignupStatus::Confirmed);
    assert_eq!(signups[0].performance_name, "X");
    assert!(signups[0].belongs_to(202));
    assert_eq!(accepted.signup.map(|s| s.id), Some(signups[0].id));

    let responded: Vec<QueueFact> = ctx
        .drain_facts()
        .into_iter()
        .filter(|f| matches!(f, QueueFact::InviteResponded { .. }))
        .collect();
    assert_eq!(
        responded,
        vec![
            QueueFact::InviteResponded {
                invite_id: declined_invite.id,
                event_id: event.id,
                user_id: 201,
                status: InviteStatus::Declined,
            },
            QueueFact::InviteResponded {
                invite_id: accepted_invite.id,
                event_id: event.id,
                user_id: 202,
                status: InviteStatus::Accepted,
            },
        ]
    );
}

#[tokio::test]
async fn test_accept_without_details_uses_default_name() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;
    let invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();

    let response = ctx
        .engine
        .respond_to_invite(invite.id, &performer(201), InviteDecision::Accept, None)
        .await
        .unwrap();

    assert_eq!(response.signup.map(|s| s.performance_name), Some("Performance".to_string()));
}

#[tokio::test]
async fn test_respond_guards() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;
    let invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();

    assert_matches!(
        ctx.engine
            .respond_to_invite(invite.id, &performer(202), InviteDecision::Accept, None)
            .await,
        Err(MicNightError::Forbidden(_))
    );
    assert_matches!(
        ctx.engine
            .respond_to_invite(invite.id, &anonymous(), InviteDecision::Accept, None)
            .await,
        Err(MicNightError::Unauthorized)
    );

    ctx.engine
        .respond_to_invite(invite.id, &performer(201), InviteDecision::Accept, None)
        .await
        .unwrap();
    assert_matches!(
        ctx.engine
            .respond_to_invite(invite.id, &performer(201), InviteDecision::Decline, None)
            .await,
        Err(MicNightError::AlreadyResponded { .. })
    );
    assert_matches!(
        ctx.engine
            .respond_to_invite(9999, &performer(201), InviteDecision::Accept, None)
            .await,
        Err(MicNightError::NotFound { entity: "Invite", .. })
    );
}

#[tokio::test]
async fn test_accept_respects_capacity() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 1).await;
    let first = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    let second = ctx.engine.invite_performer(event.id, &host(), 202).await.unwrap();

    ctx.engine
        .respond_to_invite(first.id, &performer(201), InviteDecision::Accept, None)
        .await
        .unwrap();
    assert_matches!(
        ctx.engine
            .respond_to_invite(second.id, &performer(202), InviteDecision::Accept, None)
            .await,
        Err(MicNightError::CapacityExceeded { .. })
    );

    let still_pending = ctx.store.get_invite(second.id).await.unwrap().unwrap();
    assert_eq!(still_pending.status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_accepted_invitee_may_cancel_and_rejoin() {
    let ctx = setup_integration_test();
    let event = ctx.create_event(SignupListMode::BookedMic, 5).await;
    let invite = ctx.engine.invite_performer(event.id, &host(), 201).await.unwrap();
    let response = ctx
        .engine
        .respond_to_invite(invite.id, &performer(201), InviteDecision::Accept, None)
        .await
        .unwrap();
    let signup = response.signup.unwrap();

    ctx.engine.cancel_signup(signup.id, &performer(201)).await.unwrap();

    // the accepted invite still admits the user
    ctx.engine
        .create_signup(event.id, &performer(201), signup_request("Back again"))
        .await
        .unwrap();
}
