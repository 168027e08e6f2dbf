//! Abstract ordered-record store
//!
//! The queue engine only talks to persistence through [`EventStore`]. All
//! writes go through [`EventStore::commit`], which applies a whole change set
//! for one event atomically and only if the event's version is unchanged
//! since it was read. That conditional write is what serializes mutations
//! per event.

use async_trait::async_trait;
use crate::models::{Event, Invite, NewEvent, NewInvite, NewSignup, Signup};
use crate::utils::errors::Result;

/// Everything one operation wants to write for a single event
#[derive(Debug, Clone)]
pub struct EventChanges {
    /// New event state. `event.version` must be the version it was read at.
    pub event: Event,
    pub updated_signups: Vec<Signup>,
    pub new_signups: Vec<NewSignup>,
    pub updated_invites: Vec<Invite>,
    pub new_invites: Vec<NewInvite>,
}

impl EventChanges {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            updated_signups: Vec::new(),
            new_signups: Vec::new(),
            updated_invites: Vec::new(),
            new_invites: Vec::new(),
        }
    }

    pub fn event_id(&self) -> i64 {
        self.event.id
    }

    pub fn with_signups(mut self, signups: impl IntoIterator<Item = Signup>) -> Self {
        self.updated_signups.extend(signups);
        self
    }

    pub fn with_new_signup(mut self, signup: NewSignup) -> Self {
        self.new_signups.push(signup);
        self
    }

    pub fn with_invite(mut self, invite: Invite) -> Self {
        self.updated_invites.push(invite);
        self
    }

    pub fn with_new_invite(mut self, invite: NewInvite) -> Self {
        self.new_invites.push(invite);
        self
    }
}

/// Result of a successful commit
#[derive(Debug, Clone)]
pub struct Committed {
    /// Event as stored, with its bumped version
    pub event: Event,
    /// Signups inserted by this commit, in request order
    pub new_signups: Vec<Signup>,
    /// Invites inserted by this commit, in request order
    pub new_invites: Vec<Invite>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    async fn get_event(&self, id: i64) -> Result<Option<Event>>;

    async fn get_signup(&self, id: i64) -> Result<Option<Signup>>;

    /// All signups of an event, cancelled included, ordered by id
    async fn signups_for_event(&self, event_id: i64) -> Result<Vec<Signup>>;

    async fn signups_for_user(&self, user_id: i64) -> Result<Vec<Signup>>;

    async fn get_invite(&self, id: i64) -> Result<Option<Invite>>;

    async fn invites_for_event(&self, event_id: i64) -> Result<Vec<Invite>>;

    async fn invites_for_user(&self, user_id: i64) -> Result<Vec<Invite>>;

    /// Apply `changes` atomically. Fails with `Conflict` when the stored
    /// event version differs from `changes.event.version`, in which case
    /// nothing is written.
    async fn commit(&self, changes: EventChanges) -> Result<Committed>;

    async fn health_check(&self) -> Result<()>;
}
