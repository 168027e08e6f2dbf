//! In-memory store
//!
//! Keeps the same guarantees as the PostgreSQL store: version-guarded commits,
//! one active signup per user and event, one open invite per user and event.

use std::collections::BTreeMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use crate::database::store::{Committed, EventChanges, EventStore};
use crate::models::{Event, EventStatus, Invite, InviteStatus, NewEvent, Signup, SignupStatus};
use crate::utils::errors::{MicNightError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    events: BTreeMap<i64, Event>,
    signups: BTreeMap<i64, Signup>,
    invites: BTreeMap<i64, Invite>,
    last_event_id: i64,
    last_signup_id: i64,
    last_invite_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryState {
    /// Check every write in `changes` before touching anything
    fn check(&self, changes: &EventChanges) -> Result<()> {
        let event_id = changes.event_id();
        let stored = self
            .events
            .get(&event_id)
            .ok_or_else(|| MicNightError::not_found("Event", event_id))?;
        if stored.version != changes.event.version {
            return Err(MicNightError::Conflict { event_id });
        }

        for signup in &changes.updated_signups {
            match self.signups.get(&signup.id) {
                Some(existing) if existing.event_id == event_id => {}
                _ => return Err(MicNightError::not_found("Signup", signup.id)),
            }
        }
        for invite in &changes.updated_invites {
            match self.invites.get(&invite.id) {
                Some(existing) if existing.event_id == event_id => {}
                _ => return Err(MicNightError::not_found("Invite", invite.id)),
            }
        }

        for new in &changes.new_signups {
            let Some(user_id) = new.performer.user_id() else { continue };
            let taken = self.signups.values().any(|s| {
                s.event_id == event_id && s.is_active() && s.belongs_to(user_id)
                    && !changes.updated_signups.iter().any(|u| u.id == s.id && !u.is_active())
            });
            if taken {
                return Err(MicNightError::DuplicateSignup { event_id, user_id });
            }
        }
        for new in &changes.new_invites {
            let taken = self.invites.values().any(|i| {
                i.event_id == event_id && i.user_id == new.user_id && i.is_open_or_accepted()
            });
            if taken {
                return Err(MicNightError::Conflict { event_id });
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, request: NewEvent) -> Result<Event> {
        let mut state = self.state.write().await;
        state.last_event_id += 1;
        let now = Utc::now();
        let event = Event {
            id: state.last_event_id,
            host_id: request.host_id,
            title: request.title,
            status: EventStatus::Scheduled,
            signup_list_mode: request.signup_list_mode,
            max_performers: request.max_performers,
            performance_length: request.performance_length,
            current_performer_id: None,
            started_at: None,
            finished_at: None,
            signup_opens: request.signup_opens,
            signup_deadline: request.signup_deadline,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn get_signup(&self, id: i64) -> Result<Option<Signup>> {
        Ok(self.state.read().await.signups.get(&id).cloned())
    }

    async fn signups_for_event(&self, event_id: i64) -> Result<Vec<Signup>> {
        let state = self.state.read().await;
        Ok(state.signups.values().filter(|s| s.event_id == event_id).cloned().collect())
    }

    async fn signups_for_user(&self, user_id: i64) -> Result<Vec<Signup>> {
        let state = self.state.read().await;
        Ok(state.signups.values().filter(|s| s.belongs_to(user_id)).cloned().collect())
    }

    async fn get_invite(&self, id: i64) -> Result<Option<Invite>> {
        Ok(self.state.read().await.invites.get(&id).cloned())
    }

    async fn invites_for_event(&self, event_id: i64) -> Result<Vec<Invite>> {
        let state = self.state.read().await;
        Ok(state.invites.values().filter(|i| i.event_id == event_id).cloned().collect())
    }

    async fn invites_for_user(&self, user_id: i64) -> Result<Vec<Invite>> {
        let state = self.state.read().await;
        Ok(state.invites.values().filter(|i| i.user_id == user_id).cloned().collect())
    }

    async fn commit(&self, changes: EventChanges) -> Result<Committed> {
        let mut state = self.state.write().await;
        state.check(&changes)?;

        let now = Utc::now();
        let event_id = changes.event_id();

        let mut event = changes.event;
        event.version += 1;
        event.updated_at = now;
        state.events.insert(event_id, event.clone());

        for mut signup in changes.updated_signups {
            signup.updated_at = now;
            state.signups.insert(signup.id, signup);
        }
        for invite in changes.updated_invites {
            state.invites.insert(invite.id, invite);
        }

        let mut new_signups = Vec::with_capacity(changes.new_signups.len());
        for new in changes.new_signups {
            state.last_signup_id += 1;
            let signup = Signup {
                id: state.last_signup_id,
                event_id,
                performer: new.performer,
                performance_name: new.performance_name,
                performance_type: new.performance_type,
                notes: new.notes,
                status: SignupStatus::Confirmed,
                performance_order: None,
                individual_performance_length: None,
                is_finished: false,
                finished_at: None,
                is_current_performer: false,
                created_at: now,
                updated_at: now,
            };
            state.signups.insert(signup.id, signup.clone());
            new_signups.push(signup);
        }

        let mut new_invites = Vec::with_capacity(changes.new_invites.len());
        for new in changes.new_invites {
            state.last_invite_id += 1;
            let invite = Invite {
                id: state.last_invite_id,
                event_id,
                user_id: new.user_id,
                status: InviteStatus::Pending,
                invited_by: new.invited_by,
                invited_at: now,
                responded_at: None,
            };
            state.invites.insert(invite.id, invite.clone());
            new_invites.push(invite);
        }

        debug!(event_id = event_id, version = event.version, "Committed event changes");
        Ok(Committed { event, new_signups, new_invites })
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
