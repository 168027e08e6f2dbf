//! Signup registry
//!
//! Creation, cancellation and lookup of the performer signups of an event.

use chrono::Utc;
use tracing::debug;
use crate::models::{
    EventStatus, InviteStatus, ManualPerformerRequest, NewSignup, Performer, Signup, SignupRequest,
    SignupStatus,
};
use crate::services::auth::{self, Principal};
use crate::services::context::{EngineContext, EventAggregate};
use crate::services::queue::discipline_for;
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::log_event_action;

#[derive(Clone)]
pub struct SignupRegistry {
    ctx: EngineContext,
}

impl SignupRegistry {
    /// Create a registry over the shared engine context
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Look up a signup by id
    pub async fn get_signup(&self, signup_id: i64) -> Result<Signup> {
        self.ctx.load_signup(signup_id).await
    }

    /// Every signup the user holds, across events
    pub async fn signups_for_user(&self, principal: &dyn Principal) -> Result<Vec<Signup>> {
        let user_id = auth::require_user(principal)?;
        self.ctx.store.signups_for_user(user_id).await
    }

    /// Sign the caller up to perform
    pub async fn create_signup(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        request: SignupRequest,
    ) -> Result<Signup> {
        self.ctx
            .retry(event_id, "create_signup", || self.try_create_signup(event_id, principal, &request))
            .await
    }

    async fn try_create_signup(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        request: &SignupRequest,
    ) -> Result<Signup> {
        let aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_user(principal)?;
        let is_manager = auth::can_manage(principal, &aggregate.event);
        let discipline = discipline_for(aggregate.event.signup_list_mode);

        let open = match aggregate.event.status {
            EventStatus::Scheduled => true,
            EventStatus::Live => !discipline.allows_open_signup() && is_manager,
            EventStatus::Finished => false,
        };
        if !open {
            return Err(MicNightError::transition(aggregate.event.status, "create_signup"));
        }

        let performance_name = request.performance_name.trim();
        if performance_name.is_empty() {
            return Err(MicNightError::validation("performance name is required"));
        }

        if !discipline.allows_open_signup() && !is_manager {
            self.require_accepted_invite(event_id, user_id).await?;
        }

        if aggregate.has_active_signup_for(user_id) {
            return Err(MicNightError::DuplicateSignup { event_id, user_id });
        }

        if !is_manager && !aggregate.event.signup_window_contains(Utc::now()) {
            return Err(MicNightError::OutsideSignupWindow { event_id });
        }

        aggregate.require_capacity()?;

        let signup = NewSignup {
            event_id,
            performer: Performer::Registered { user_id },
            performance_name: performance_name.to_string(),
            performance_type: request.performance_type.clone(),
            notes: request.notes.clone(),
        };
        let signup = self.insert(aggregate, signup).await?;

        log_event_action(event_id, "create_signup", Some(user_id), Some(signup.performance_name.as_str()));
        Ok(signup)
    }

    async fn require_accepted_invite(&self, event_id: i64, user_id: i64) -> Result<()> {
        let invited = self
            .ctx
            .store
            .invites_for_event(event_id)
            .await?
            .iter()
            .any(|i| i.user_id == user_id && i.status == InviteStatus::Accepted);
        if !invited {
            return Err(MicNightError::forbidden(format!(
                "event {} is booked; user {} has no accepted invite",
                event_id, user_id
            )));
        }
        Ok(())
    }

    /// Host adds a performer without an account
    pub async fn add_manual_performer(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        request: ManualPerformerRequest,
    ) -> Result<Signup> {
        self.ctx
            .retry(event_id, "add_manual_performer", || self.try_add_manual(event_id, principal, &request))
            .await
    }

    async fn try_add_manual(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        request: &ManualPerformerRequest,
    ) -> Result<Signup> {
        let aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        aggregate.require_not_finished("add_manual_performer")?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(MicNightError::validation("walk-in performer name is required"));
        }
        aggregate.require_capacity()?;

        let performance_name = request
            .performance_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(name)
            .to_string();

        let signup = NewSignup {
            event_id,
            performer: Performer::WalkIn { name: name.to_string() },
            performance_name,
            performance_type: request.performance_type.clone(),
            notes: request.notes.clone(),
        };
        let signup = self.insert(aggregate, signup).await?;

        log_event_action(event_id, "add_manual_performer", Some(user_id), Some(name));
        Ok(signup)
    }

    async fn insert(&self, aggregate: EventAggregate, signup: NewSignup) -> Result<Signup> {
        let committed = self
            .ctx
            .commit(aggregate.into_changes().with_new_signup(signup))
            .await?;
        committed
            .new_signups
            .into_iter()
            .next()
            .ok_or_else(|| MicNightError::CorruptRecord("commit returned no signup".to_string()))
    }

    /// Withdraw a signup. Cancelling twice returns the cancelled signup.
    pub async fn cancel_signup(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        let event_id = self.ctx.load_signup(signup_id).await?.event_id;
        self.ctx
            .retry(event_id, "cancel_signup", || self.try_cancel(event_id, signup_id, principal))
            .await
    }

    async fn try_cancel(&self, event_id: i64, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let current = aggregate
            .signup(signup_id)
            .cloned()
            .ok_or_else(|| MicNightError::not_found("Signup", signup_id))?;
        let user_id = auth::require_owner_or_manager(principal, &aggregate.event, &current)?;

        if current.status == SignupStatus::Cancelled {
            debug!(signup_id = signup_id, "Signup already cancelled");
            return Ok(current);
        }
        aggregate.require_not_finished("cancel_signup")?;

        let signup = aggregate.signup_mut(signup_id)?;
        let was_current = signup.is_current_performer;
        signup.status = SignupStatus::Cancelled;
        signup.performance_order = None;
        signup.is_current_performer = false;
        let cancelled = signup.clone();
        if was_current {
            aggregate.event.current_performer_id = None;
        }

        self.ctx.commit(aggregate.into_changes()).await?;

        log_event_action(event_id, "cancel_signup", Some(user_id), None);
        Ok(cancelled)
    }
}
