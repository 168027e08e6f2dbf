//! Host-driven reordering and slot lengths

use std::collections::{HashMap, HashSet};
use tracing::debug;
use crate::models::Signup;
use crate::services::auth::{self, Principal};
use crate::services::context::EngineContext;
use crate::services::queue::{apply_order, natural_order, require_mode};
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::{log_event_action, log_queue_change};

#[derive(Clone)]
pub struct ReorderService {
    ctx: EngineContext,
}

impl ReorderService {
    /// Create the reorder service over the shared engine context
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Replace the running order in one commit.
    ///
    /// `ordered_ids` take positions 1..k; active signups not listed follow in
    /// their previous order. `lengths` optionally sets per-signup minutes in
    /// the same commit. Returns the resulting queue.
    pub async fn set_performer_order(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        ordered_ids: &[i64],
        lengths: Option<&HashMap<i64, i32>>,
    ) -> Result<Vec<Signup>> {
        self.ctx
            .retry(event_id, "set_performer_order", || {
                self.try_set_order(event_id, principal, ordered_ids, lengths)
            })
            .await
    }

    async fn try_set_order(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        ordered_ids: &[i64],
        lengths: Option<&HashMap<i64, i32>>,
    ) -> Result<Vec<Signup>> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        aggregate.require_not_finished("set_performer_order")?;
        require_mode(&aggregate, |d| d.allows_reorder(), "set the performer order")?;

        let mut seen = HashSet::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            if !seen.insert(*id) {
                return Err(MicNightError::validation(format!("signup {} is listed twice", id)));
            }
            self.require_active_member(&aggregate.signups, event_id, *id)?;
        }

        if let Some(lengths) = lengths {
            for (id, minutes) in lengths {
                self.require_active_member(&aggregate.signups, event_id, *id)?;
                self.ctx.validate_length(*minutes)?;
            }
        }

        apply_order(&mut aggregate.signups, ordered_ids);
        if let Some(lengths) = lengths {
            for signup in aggregate.signups.iter_mut() {
                if let Some(minutes) = lengths.get(&signup.id) {
                    signup.individual_performance_length = Some(*minutes);
                }
            }
        }

        let mut queue: Vec<Signup> = aggregate.active().cloned().collect();
        natural_order(&mut queue);

        self.ctx.commit(aggregate.into_changes()).await?;

        log_queue_change(event_id, "set_performer_order", queue.len());
        log_event_action(event_id, "set_performer_order", Some(user_id), None);
        Ok(queue)
    }

    fn require_active_member(&self, signups: &[Signup], event_id: i64, signup_id: i64) -> Result<()> {
        match signups.iter().find(|s| s.id == signup_id) {
            Some(signup) if signup.is_active() => Ok(()),
            Some(_) => Err(MicNightError::validation(format!("signup {} is cancelled", signup_id))),
            None => {
                debug!(event_id = event_id, signup_id = signup_id, "Rejected foreign signup id");
                Err(MicNightError::validation(format!(
                    "signup {} does not belong to event {}",
                    signup_id, event_id
                )))
            }
        }
    }

    /// Set one performer's slot length in minutes
    pub async fn update_length(&self, signup_id: i64, principal: &dyn Principal, minutes: i32) -> Result<Signup> {
        self.ctx.validate_length(minutes)?;
        let event_id = self.ctx.load_signup(signup_id).await?.event_id;
        self.ctx
            .retry(event_id, "update_performer_length", || {
                self.try_update_length(event_id, signup_id, principal, minutes)
            })
            .await
    }

    async fn try_update_length(
        &self,
        event_id: i64,
        signup_id: i64,
        principal: &dyn Principal,
        minutes: i32,
    ) -> Result<Signup> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        aggregate.require_not_finished("update_performer_length")?;

        let signup = aggregate.signup_mut(signup_id)?;
        if !signup.is_active() {
            return Err(MicNightError::validation(format!("signup {} is cancelled", signup_id)));
        }
        signup.individual_performance_length = Some(minutes);
        let updated = signup.clone();

        self.ctx.commit(aggregate.into_changes()).await?;

        log_event_action(event_id, "update_performer_length", Some(user_id), None);
        Ok(updated)
    }
}
