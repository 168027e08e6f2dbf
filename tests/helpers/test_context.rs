//! Test context for unified test setup
//!
//! Builds a [`QueueEngine`] over an in-memory store with deterministic
//! randomness and a channel notifier whose facts the test can inspect.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;

use MicNight::config::QueueConfig;
use MicNight::database::{Committed, EventChanges, EventStore, MemoryStore};
use MicNight::models::{CreateEventRequest, Event, Invite, NewEvent, Signup, SignupListMode};
use MicNight::services::{ChannelNotifier, QueueFact};
use MicNight::utils::random::RandomSource;
use MicNight::{MicNightError, QueueEngine, Result};

use super::test_data::{event_request, host, performer, signup_request};

/// Random source that replays scripted indices, then always answers 0
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    picks: Mutex<VecDeque<usize>>,
}

impl ScriptedRandom {
    pub fn new(picks: impl IntoIterator<Item = usize>) -> Self {
        Self {
            picks: Mutex::new(picks.into_iter().collect()),
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn index(&self, upper: usize) -> usize {
        let next = self.picks.lock().unwrap().pop_front().unwrap_or(0);
        next % upper
    }
}

/// Memory store whose first `failures` commits lose a version race
pub struct FlakyStore {
    inner: MemoryStore,
    failures: u32,
    pub commits: AtomicU32,
}

impl FlakyStore {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures,
            commits: AtomicU32::new(0),
        }
    }

    pub fn commit_attempts(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventStore for FlakyStore {
    async fn create_event(&self, event: NewEvent) -> Result<Event> {
        self.inner.create_event(event).await
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        self.inner.get_event(id).await
    }

    async fn get_signup(&self, id: i64) -> Result<Option<Signup>> {
        self.inner.get_signup(id).await
    }

    async fn signups_for_event(&self, event_id: i64) -> Result<Vec<Signup>> {
        self.inner.signups_for_event(event_id).await
    }

    async fn signups_for_user(&self, user_id: i64) -> Result<Vec<Signup>> {
        self.inner.signups_for_user(user_id).await
    }

    async fn get_invite(&self, id: i64) -> Result<Option<Invite>> {
        self.inner.get_invite(id).await
    }

    async fn invites_for_event(&self, event_id: i64) -> Result<Vec<Invite>> {
        self.inner.invites_for_event(event_id).await
    }

    async fn invites_for_user(&self, user_id: i64) -> Result<Vec<Invite>> {
        self.inner.invites_for_user(user_id).await
    }

    async fn commit(&self, changes: EventChanges) -> Result<Committed> {
        let attempt = self.commits.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(MicNightError::Conflict { event_id: changes.event_id() });
        }
        self.inner.commit(changes).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub engine: QueueEngine,
    pub store: Arc<dyn EventStore>,
    pub facts: UnboundedReceiver<QueueFact>,
}

impl TestContext {
    /// Memory store, scripted randomness that always picks index 0
    pub fn new() -> Self {
        Self::with_parts(Arc::new(MemoryStore::new()), Arc::new(ScriptedRandom::default()))
    }

    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self::with_parts(Arc::new(MemoryStore::new()), random)
    }

    pub fn with_store(store: Arc<dyn EventStore>) -> Self {
        Self::with_parts(store, Arc::new(ScriptedRandom::default()))
    }

    /// Memory store with custom queue tuning
    pub fn with_config(config: QueueConfig) -> Self {
        Self::build(Arc::new(MemoryStore::new()), Arc::new(ScriptedRandom::default()), config)
    }

    pub fn with_parts(store: Arc<dyn EventStore>, random: Arc<dyn RandomSource>) -> Self {
        Self::build(store, random, QueueConfig::default())
    }

    fn build(store: Arc<dyn EventStore>, random: Arc<dyn RandomSource>, config: QueueConfig) -> Self {
        let (notifier, facts) = ChannelNotifier::new();
        let engine = QueueEngine::new(store.clone(), random, Arc::new(notifier), config);
        Self { engine, store, facts }
    }

    /// Every fact emitted since the last drain
    pub fn drain_facts(&mut self) -> Vec<QueueFact> {
        let mut facts = Vec::new();
        while let Ok(fact) = self.facts.try_recv() {
            facts.push(fact);
        }
        facts
    }

    pub async fn create_event(&self, mode: SignupListMode, max_performers: i32) -> Event {
        self.create_event_with(event_request(mode, max_performers)).await
    }

    pub async fn create_event_with(&self, request: CreateEventRequest) -> Event {
        self.engine
            .create_event(&host(), request)
            .await
            .expect("Failed to create event")
    }

    /// Sign up `count` performers with user ids 101, 102, ...
    pub async fn sign_up_performers(&self, event_id: i64, count: i64) -> Vec<Signup> {
        let mut signups = Vec::new();
        for n in 1..=count {
            let signup = self
                .engine
                .create_signup(event_id, &performer(100 + n), signup_request(&format!("Act {}", n)))
                .await
                .expect("Failed to create signup");
            signups.push(signup);
        }
        signups
    }

    /// Scheduled event with `count` signups, then started
    pub async fn live_event(&self, mode: SignupListMode, count: i64) -> (Event, Vec<Signup>) {
        let event = self.create_event(mode, 10).await;
        let signups = self.sign_up_performers(event.id, count).await;
        let event = self
            .engine
            .start_event(event.id, &host())
            .await
            .expect("Failed to start event");
        (event, signups)
    }

    pub async fn signups(&self, event_id: i64) -> Vec<Signup> {
        self.store
            .signups_for_event(event_id)
            .await
            .expect("Failed to read signups")
    }

    pub async fn current_performers(&self, event_id: i64) -> Vec<Signup> {
        self.signups(event_id)
            .await
            .into_iter()
            .filter(|s| s.is_current_performer)
            .collect()
    }
}
