//! Booked mic invitations
//!
//! Hosts invite specific users; an accepted invite is what lets a user into a
//! booked mic line-up.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use crate::models::{
    Invite, InviteDecision, InviteResponseDetails, InviteStatus, NewInvite, NewSignup, Performer, Signup,
    SignupListMode,
};
use crate::services::auth::{self, Principal};
use crate::services::context::EngineContext;
use crate::services::notification::QueueFact;
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::log_event_action;

/// Outcome of answering an invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteResponse {
    pub invite: Invite,
    /// Present when the invite was accepted
    pub signup: Option<Signup>,
}

#[derive(Clone)]
pub struct InvitationWorkflow {
    ctx: EngineContext,
}

impl InvitationWorkflow {
    /// Create the invitation workflow over the shared engine context
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Every invite sent for an event; managers only
    pub async fn invites_for_event(&self, event_id: i64, principal: &dyn Principal) -> Result<Vec<Invite>> {
        let event = self.ctx.load_event(event_id).await?;
        auth::require_manager(principal, &event)?;
        self.ctx.store.invites_for_event(event_id).await
    }

    /// Invites addressed to the caller
    pub async fn invites_for_user(&self, principal: &dyn Principal) -> Result<Vec<Invite>> {
        let user_id = auth::require_user(principal)?;
        self.ctx.store.invites_for_user(user_id).await
    }

    /// Invite a registered user to a booked mic event
    pub async fn invite_performer(&self, event_id: i64, principal: &dyn Principal, user_id: i64) -> Result<Invite> {
        self.ctx
            .retry(event_id, "invite_performer", || self.try_invite(event_id, principal, user_id))
            .await
    }

    async fn try_invite(&self, event_id: i64, principal: &dyn Principal, user_id: i64) -> Result<Invite> {
        let aggregate = self.ctx.load_aggregate(event_id).await?;
        let invited_by = auth::require_manager(principal, &aggregate.event)?;
        if aggregate.event.signup_list_mode != SignupListMode::BookedMic {
            return Err(MicNightError::validation(format!(
                "invitations are only used in {} mode",
                SignupListMode::BookedMic
            )));
        }
        aggregate.require_not_finished("invite_performer")?;

        if aggregate.has_active_signup_for(user_id) {
            return Err(MicNightError::DuplicateSignup { event_id, user_id });
        }
        let already_invited = self
            .ctx
            .store
            .invites_for_event(event_id)
            .await?
            .iter()
            .any(|i| i.user_id == user_id && i.is_open_or_accepted());
        if already_invited {
            return Err(MicNightError::validation(format!(
                "user {} already has an invite for event {}",
                user_id, event_id
            )));
        }

        let committed = self
            .ctx
            .commit(aggregate.into_changes().with_new_invite(NewInvite { event_id, user_id, invited_by }))
            .await?;
        let invite = committed
            .new_invites
            .into_iter()
            .next()
            .ok_or_else(|| MicNightError::CorruptRecord("commit returned no invite".to_string()))?;

        log_event_action(event_id, "invite_performer", Some(invited_by), None);
        self.ctx.emit(QueueFact::InviteCreated {
            invite_id: invite.id,
            event_id,
            user_id,
            invited_by,
        });
        Ok(invite)
    }

    /// Accept or decline an invite addressed to the caller
    pub async fn respond_to_invite(
        &self,
        invite_id: i64,
        principal: &dyn Principal,
        decision: InviteDecision,
        details: Option<InviteResponseDetails>,
    ) -> Result<InviteResponse> {
        let event_id = self.ctx.load_invite(invite_id).await?.event_id;
        let details = details.unwrap_or_default();
        self.ctx
            .retry(event_id, "respond_to_invite", || {
                self.try_respond(event_id, invite_id, principal, decision, &details)
            })
            .await
    }

    async fn try_respond(
        &self,
        event_id: i64,
        invite_id: i64,
        principal: &dyn Principal,
        decision: InviteDecision,
        details: &InviteResponseDetails,
    ) -> Result<InviteResponse> {
        let aggregate = self.ctx.load_aggregate(event_id).await?;
        let mut invite = self.ctx.load_invite(invite_id).await?;
        let user_id = auth::require_user(principal)?;

        if invite.user_id != user_id {
            return Err(MicNightError::forbidden(format!(
                "invite {} is not addressed to user {}",
                invite_id, user_id
            )));
        }
        if invite.status != InviteStatus::Pending {
            return Err(MicNightError::AlreadyResponded { invite_id });
        }
        aggregate.require_not_finished("respond_to_invite")?;

        invite.responded_at = Some(Utc::now());
        let changes = match decision {
            InviteDecision::Decline => {
                invite.status = InviteStatus::Declined;
                aggregate.into_changes().with_invite(invite.clone())
            }
            InviteDecision::Accept => {
                if aggregate.has_active_signup_for(user_id) {
                    return Err(MicNightError::DuplicateSignup { event_id, user_id });
                }
                aggregate.require_capacity()?;

                invite.status = InviteStatus::Accepted;
                let performance_name = details
                    .performance_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or(self.ctx.config.default_performance_name.as_str())
                    .to_string();
                aggregate
                    .into_changes()
                    .with_invite(invite.clone())
                    .with_new_signup(NewSignup {
                        event_id,
                        performer: Performer::Registered { user_id },
                        performance_name,
                        performance_type: details.performance_type.clone(),
                        notes: details.notes.clone(),
                    })
            }
        };

        let committed = self.ctx.commit(changes).await?;
        let signup = committed.new_signups.into_iter().next();

        log_event_action(event_id, "respond_to_invite", Some(user_id), Some(invite.status.as_str()));
        self.ctx.emit(QueueFact::InviteResponded {
            invite_id,
            event_id,
            user_id,
            status: invite.status,
        });
        Ok(InviteResponse { invite, signup })
    }
}
