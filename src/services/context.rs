//! Shared plumbing for the queue services
//!
//! Every mutating operation follows the same shape: load an [`EventAggregate`],
//! change it in memory, then commit the difference through the store under
//! the event's version. [`EngineContext::retry`] re-runs the whole shape when
//! the commit loses a race.

use std::future::Future;
use std::sync::Arc;
use crate::config::{QueueConfig, MAX_PERFORMANCE_LENGTH, MIN_PERFORMANCE_LENGTH};
use crate::database::store::{Committed, EventChanges, EventStore};
use crate::models::{Event, Invite, Signup};
use crate::services::notification::{QueueFact, QueueNotifier};
use crate::utils::errors::{MicNightError, Result};
use crate::utils::random::RandomSource;
use crate::utils::retry::retry_on_conflict;

/// Collaborators shared by all queue services
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn EventStore>,
    pub random: Arc<dyn RandomSource>,
    pub notifier: Arc<dyn QueueNotifier>,
    pub config: QueueConfig,
}

impl EngineContext {
    /// Bundle the store, randomness, notifier and tuning
    pub fn new(
        store: Arc<dyn EventStore>,
        random: Arc<dyn RandomSource>,
        notifier: Arc<dyn QueueNotifier>,
        config: QueueConfig,
    ) -> Self {
        Self { store, random, notifier, config }
    }

    /// Fetch an event or fail with `NotFound`
    pub async fn load_event(&self, event_id: i64) -> Result<Event> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| MicNightError::not_found("Event", event_id))
    }

    /// Fetch a signup or fail with `NotFound`
    pub async fn load_signup(&self, signup_id: i64) -> Result<Signup> {
        self.store
            .get_signup(signup_id)
            .await?
            .ok_or_else(|| MicNightError::not_found("Signup", signup_id))
    }

    /// Fetch an invite or fail with `NotFound`
    pub async fn load_invite(&self, invite_id: i64) -> Result<Invite> {
        self.store
            .get_invite(invite_id)
            .await?
            .ok_or_else(|| MicNightError::not_found("Invite", invite_id))
    }

    /// Read an event together with all of its signups
    pub async fn load_aggregate(&self, event_id: i64) -> Result<EventAggregate> {
        let event = self.load_event(event_id).await?;
        let signups = self.store.signups_for_event(event_id).await?;
        Ok(EventAggregate::new(event, signups))
    }

    /// Write a change set guarded by the event version
    pub async fn commit(&self, changes: EventChanges) -> Result<Committed> {
        self.store.commit(changes).await
    }

    /// Hand a committed fact to the notifier
    pub fn emit(&self, fact: QueueFact) {
        self.notifier.notify(fact);
    }

    /// Run one attempt of an operation, retrying on `Conflict`
    pub async fn retry<T, F, Fut>(&self, event_id: i64, operation: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_on_conflict(event_id, operation, self.config.conflict_retries, op).await
    }

    /// Check a per-performer length in minutes against the configured bounds,
    /// which can only narrow the hard 1..=60 range
    pub fn validate_length(&self, minutes: i32) -> Result<()> {
        let min = self.config.min_performance_length.max(MIN_PERFORMANCE_LENGTH);
        let max = self.config.max_performance_length.min(MAX_PERFORMANCE_LENGTH);
        if minutes < min || minutes > max {
            return Err(MicNightError::validation(format!(
                "performance length must be between {} and {} minutes, got {}",
                min, max, minutes
            )));
        }
        Ok(())
    }
}

/// An event and its signups as read at one version
#[derive(Debug, Clone)]
pub struct EventAggregate {
    pub event: Event,
    pub signups: Vec<Signup>,
    original: Vec<Signup>,
}

impl EventAggregate {
    /// Bundle the store, randomness, notifier and tuning
    pub fn new(event: Event, signups: Vec<Signup>) -> Self {
        Self {
            event,
            original: signups.clone(),
            signups,
        }
    }

    pub fn active(&self) -> impl Iterator<Item = &Signup> {
        self.signups.iter().filter(|s| s.is_active())
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    pub fn has_active_signup_for(&self, user_id: i64) -> bool {
        self.active().any(|s| s.belongs_to(user_id))
    }

    pub fn signup(&self, signup_id: i64) -> Option<&Signup> {
        self.signups.iter().find(|s| s.id == signup_id)
    }

    pub fn signup_mut(&mut self, signup_id: i64) -> Result<&mut Signup> {
        self.signups
            .iter_mut()
            .find(|s| s.id == signup_id)
            .ok_or_else(|| MicNightError::not_found("Signup", signup_id))
    }

    /// Fail with `CapacityExceeded` when another active signup would not fit
    pub fn require_capacity(&self) -> Result<()> {
        if self.active_count() >= self.event.max_performers.max(0) as usize {
            return Err(MicNightError::CapacityExceeded {
                event_id: self.event.id,
                max_performers: self.event.max_performers,
            });
        }
        Ok(())
    }

    /// Finished events are read-only
    pub fn require_not_finished(&self, action: &str) -> Result<()> {
        if self.event.is_finished() {
            return Err(MicNightError::transition(self.event.status, action));
        }
        Ok(())
    }

    /// Build a commit containing the event and every signup that changed
    pub fn into_changes(self) -> EventChanges {
        let original = self.original;
        let changed = self
            .signups
            .into_iter()
            .filter(|s| original.iter().find(|o| o.id == s.id) != Some(s));
        EventChanges::new(self.event).with_signups(changed)
    }
}
