//! Services module
//!
//! This module contains the queue engine: lifecycle, signup registry, queue
//! disciplines, reordering and invitations, plus the [`QueueEngine`] facade
//! that exposes them as one operation surface.

pub mod auth;
pub mod context;
pub mod invitation;
pub mod lifecycle;
pub mod notification;
pub mod queue;
pub mod registry;
pub mod reorder;

// Re-export commonly used services
pub use auth::{AuthContext, Principal};
pub use context::{EngineContext, EventAggregate};
pub use invitation::{InvitationWorkflow, InviteResponse};
pub use lifecycle::EventLifecycle;
pub use notification::{ChannelNotifier, QueueFact, QueueNotifier, TracingNotifier};
pub use queue::{discipline_for, QueueDiscipline, QueueEntry, QueueService};
pub use registry::SignupRegistry;
pub use reorder::ReorderService;

use std::collections::HashMap;
use std::sync::Arc;
use crate::config::QueueConfig;
use crate::database::EventStore;
use crate::models::{
    CreateEventRequest, Event, Invite, InviteDecision, InviteResponseDetails, ManualPerformerRequest, Signup,
    SignupRequest,
};
use crate::utils::errors::Result;
use crate::utils::random::{RandomSource, ThreadRandom};

/// Entry point for every queue engine operation
#[derive(Clone)]
pub struct QueueEngine {
    pub lifecycle: EventLifecycle,
    pub registry: SignupRegistry,
    pub queue: QueueService,
    pub reorder: ReorderService,
    pub invitations: InvitationWorkflow,
    ctx: EngineContext,
}

impl QueueEngine {
    /// Create an engine with all services sharing the given collaborators
    pub fn new(
        store: Arc<dyn EventStore>,
        random: Arc<dyn RandomSource>,
        notifier: Arc<dyn QueueNotifier>,
        config: QueueConfig,
    ) -> Self {
        let ctx = EngineContext::new(store, random, notifier, config);
        Self {
            lifecycle: EventLifecycle::new(ctx.clone()),
            registry: SignupRegistry::new(ctx.clone()),
            queue: QueueService::new(ctx.clone()),
            reorder: ReorderService::new(ctx.clone()),
            invitations: InvitationWorkflow::new(ctx.clone()),
            ctx,
        }
    }

    /// Production wiring: OS randomness and log-only notifications
    pub fn with_defaults(store: Arc<dyn EventStore>, config: QueueConfig) -> Self {
        Self::new(store, Arc::new(ThreadRandom), Arc::new(TracingNotifier), config)
    }

    /// Check that the backing store answers
    pub async fn health_check(&self) -> Result<()> {
        self.ctx.store.health_check().await
    }

    /// Create a scheduled event hosted by the caller
    pub async fn create_event(&self, principal: &dyn Principal, request: CreateEventRequest) -> Result<Event> {
        self.lifecycle.create_event(principal, request).await
    }

    /// Look up an event by id
    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.lifecycle.get_event(event_id).await
    }

    /// Take a scheduled event live
    pub async fn start_event(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        self.lifecycle.start(event_id, principal).await
    }

    /// End a live event
    pub async fn finish_event(&self, event_id: i64, principal: &dyn Principal) -> Result<Event> {
        self.lifecycle.finish(event_id, principal).await
    }

    /// Sign the caller up to perform at an event
    pub async fn create_signup(&self, event_id: i64, principal: &dyn Principal, request: SignupRequest) -> Result<Signup> {
        self.registry.create_signup(event_id, principal, request).await
    }

    /// Withdraw a signup
    pub async fn cancel_signup(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        self.registry.cancel_signup(signup_id, principal).await
    }

    /// Add a walk-in or registered performer on the host's authority
    pub async fn add_manual_performer(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        request: ManualPerformerRequest,
    ) -> Result<Signup> {
        self.registry.add_manual_performer(event_id, principal, request).await
    }

    /// Look up a signup by id
    pub async fn get_signup(&self, signup_id: i64) -> Result<Signup> {
        self.registry.get_signup(signup_id).await
    }

    /// Every signup the caller holds
    pub async fn signups_for_user(&self, principal: &dyn Principal) -> Result<Vec<Signup>> {
        self.registry.signups_for_user(principal).await
    }

    /// Replace the running order, optionally with slot lengths
    pub async fn set_performer_order(
        &self,
        event_id: i64,
        principal: &dyn Principal,
        ordered_ids: &[i64],
        lengths: Option<&HashMap<i64, i32>>,
    ) -> Result<Vec<Signup>> {
        self.reorder.set_performer_order(event_id, principal, ordered_ids, lengths).await
    }

    /// Set one performer's slot length in minutes
    pub async fn update_performer_length(&self, signup_id: i64, principal: &dyn Principal, minutes: i32) -> Result<Signup> {
        self.reorder.update_length(signup_id, principal, minutes).await
    }

    /// Bucket mode: draw the next performer
    pub async fn select_next_performer(&self, event_id: i64, principal: &dyn Principal) -> Result<Signup> {
        self.queue.select_next_performer(event_id, principal).await
    }

    /// Mark a signup as having performed
    pub async fn mark_finished(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        self.queue.mark_finished(signup_id, principal).await
    }

    /// Return a finished signup to the queue
    pub async fn unmark_finished(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        self.queue.unmark_finished(signup_id, principal).await
    }

    /// Random order mode: shuffle the whole queue
    pub async fn randomize_order(&self, event_id: i64, principal: &dyn Principal) -> Result<Vec<Signup>> {
        self.queue.randomize_order(event_id, principal).await
    }

    /// Active signups in running order
    pub async fn queue(&self, event_id: i64) -> Result<Vec<Signup>> {
        self.queue.queue(event_id).await
    }

    /// The queue with slot lengths and start offsets
    pub async fn running_order(&self, event_id: i64) -> Result<Vec<QueueEntry>> {
        self.queue.running_order(event_id).await
    }

    /// Invite a registered user to a booked mic event
    pub async fn invite_performer(&self, event_id: i64, principal: &dyn Principal, user_id: i64) -> Result<Invite> {
        self.invitations.invite_performer(event_id, principal, user_id).await
    }

    /// Accept or decline an invite addressed to the caller
    pub async fn respond_to_invite(
        &self,
        invite_id: i64,
        principal: &dyn Principal,
        decision: InviteDecision,
        details: Option<InviteResponseDetails>,
    ) -> Result<InviteResponse> {
        self.invitations.respond_to_invite(invite_id, principal, decision, details).await
    }

    /// Every invite sent for an event
    pub async fn invites_for_event(&self, event_id: i64, principal: &dyn Principal) -> Result<Vec<Invite>> {
        self.invitations.invites_for_event(event_id, principal).await
    }

    /// Invites addressed to the caller
    pub async fn invites_for_user(&self, principal: &dyn Principal) -> Result<Vec<Invite>> {
        self.invitations.invites_for_user(principal).await
    }
}
