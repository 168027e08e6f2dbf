//! Queue disciplines
//!
//! Each [`SignupListMode`] maps to a [`QueueDiscipline`] that says which
//! queue operations make sense for it. This module also owns all ordering
//! helpers and every use of randomness in the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use crate::models::{Event, EventStatus, Signup, SignupListMode, SignupStatus};
use crate::services::auth::{self, Principal};
use crate::services::context::{EngineContext, EventAggregate};
use crate::services::notification::QueueFact;
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::{log_event_action, log_queue_change};
use crate::utils::random::RandomSource;

/// Ordering and selection rules of one signup list mode
pub trait QueueDiscipline: Send + Sync {
    fn mode(&self) -> SignupListMode;

    /// Performers may sign themselves up without an invitation
    fn allows_open_signup(&self) -> bool {
        true
    }

    /// Hosts may submit an explicit order
    fn allows_reorder(&self) -> bool {
        true
    }

    /// Hosts may reshuffle the whole queue while live
    fn allows_randomize(&self) -> bool {
        false
    }

    /// Hosts pick the next performer at random from the pool
    fn allows_selection(&self) -> bool {
        false
    }

    /// Initialize the queue when the event goes live
    fn on_start(&self, _signups: &mut [Signup], _random: &dyn RandomSource) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignupOrderDiscipline;

impl QueueDiscipline for SignupOrderDiscipline {
    fn mode(&self) -> SignupListMode {
        SignupListMode::SignupOrder
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOrderDiscipline;

impl QueueDiscipline for RandomOrderDiscipline {
    fn mode(&self) -> SignupListMode {
        SignupListMode::RandomOrder
    }

    fn allows_randomize(&self) -> bool {
        true
    }

    fn on_start(&self, signups: &mut [Signup], random: &dyn RandomSource) {
        shuffle_order(signups, random);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BucketDiscipline;

impl QueueDiscipline for BucketDiscipline {
    fn mode(&self) -> SignupListMode {
        SignupListMode::Bucket
    }

    fn allows_reorder(&self) -> bool {
        false
    }

    fn allows_selection(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BookedMicDiscipline;

impl QueueDiscipline for BookedMicDiscipline {
    fn mode(&self) -> SignupListMode {
        SignupListMode::BookedMic
    }

    fn allows_open_signup(&self) -> bool {
        false
    }
}

/// Discipline implementing the given mode
pub fn discipline_for(mode: SignupListMode) -> &'static dyn QueueDiscipline {
    match mode {
        SignupListMode::SignupOrder => &SignupOrderDiscipline,
        SignupListMode::RandomOrder => &RandomOrderDiscipline,
        SignupListMode::Bucket => &BucketDiscipline,
        SignupListMode::BookedMic => &BookedMicDiscipline,
    }
}

/// Sort signups into natural order: assigned positions first, ascending,
/// then unassigned ones by creation time, then by id.
pub fn natural_order(signups: &mut [Signup]) {
    signups.sort_by_key(natural_key);
}

fn natural_key(signup: &Signup) -> (bool, Option<i32>, DateTime<Utc>, i64) {
    (signup.performance_order.is_none(), signup.performance_order, signup.created_at, signup.id)
}

/// In-place Fisher–Yates shuffle driven by `random`
pub fn fisher_yates<T>(items: &mut [T], random: &dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = random.index(i + 1);
        items.swap(i, j);
    }
}

/// Give active signups positions 1..N following `leading` first, then the
/// remaining active signups in their current natural order. Cancelled
/// signups lose their position.
pub fn apply_order(signups: &mut [Signup], leading: &[i64]) {
    let mut rest: Vec<&Signup> = signups
        .iter()
        .filter(|s| s.is_active() && !leading.contains(&s.id))
        .collect();
    rest.sort_by_key(|s| natural_key(s));
    let sequence: Vec<i64> = leading.iter().copied().chain(rest.iter().map(|s| s.id)).collect();

    for signup in signups.iter_mut() {
        signup.performance_order = if signup.is_active() {
            sequence
                .iter()
                .position(|id| *id == signup.id)
                .map(|index| index as i32 + 1)
        } else {
            None
        };
    }
}

/// Assign a fresh uniform permutation of 1..N over the active signups
pub fn shuffle_order(signups: &mut [Signup], random: &dyn RandomSource) {
    let mut ids: Vec<i64> = signups.iter().filter(|s| s.is_active()).map(|s| s.id).collect();
    ids.sort_unstable();
    fisher_yates(&mut ids, random);
    apply_order(signups, &ids);
}

/// Finish a signup's performance at the current time
fn finish_performance(signup: &mut Signup) {
    signup.is_finished = true;
    signup.finished_at = Some(Utc::now());
    signup.is_current_performer = false;
    signup.status = SignupStatus::Performed;
}

/// One row of the running order with its timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// 1-based place in the running order
    pub position: usize,
    /// Individual length if set, otherwise the event default
    pub length_minutes: i32,
    /// Minutes after the show starts at which this slot begins
    pub starts_after_minutes: i32,
    pub signup: Signup,
}

/// Build timing rows for already ordered signups
pub fn running_order(event: &Event, ordered: Vec<Signup>) -> Vec<QueueEntry> {
    let mut offset = 0;
    ordered
        .into_iter()
        .enumerate()
        .map(|(index, signup)| {
            let length = signup.individual_performance_length.unwrap_or(event.performance_length);
            let entry = QueueEntry {
                position: index + 1,
                length_minutes: length,
                starts_after_minutes: offset,
                signup,
            };
            offset += length;
            entry
        })
        .collect()
}

/// Live queue operations: selection, finish marks and reshuffles
#[derive(Clone)]
pub struct QueueService {
    ctx: EngineContext,
}

impl QueueService {
    /// Create the queue service over the shared engine context
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Active signups of an event in natural order
    pub async fn queue(&self, event_id: i64) -> Result<Vec<Signup>> {
        let aggregate = self.ctx.load_aggregate(event_id).await?;
        let mut active: Vec<Signup> = aggregate.active().cloned().collect();
        natural_order(&mut active);
        Ok(active)
    }

    /// The queue with per-slot lengths and start offsets
    pub async fn running_order(&self, event_id: i64) -> Result<Vec<QueueEntry>> {
        let event = self.ctx.load_event(event_id).await?;
        let queue = self.queue(event_id).await?;
        Ok(running_order(&event, queue))
    }

    /// Bucket mode: finish the current performer and draw the next one
    pub async fn select_next_performer(&self, event_id: i64, principal: &dyn Principal) -> Result<Signup> {
        self.ctx
            .retry(event_id, "select_next_performer", || self.try_select_next(event_id, principal))
            .await
    }

    async fn try_select_next(&self, event_id: i64, principal: &dyn Principal) -> Result<Signup> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        require_mode(&aggregate, |d| d.allows_selection(), "select the next performer")?;
        require_live(&aggregate, "select_next_performer")?;

        let mut pool: Vec<i64> = aggregate
            .signups
            .iter()
            .filter(|s| s.status == SignupStatus::Confirmed && !s.is_finished && !s.is_current_performer)
            .map(|s| s.id)
            .collect();
        if pool.is_empty() {
            debug!(event_id = event_id, "Bucket is empty");
            return Err(MicNightError::NoCandidatesRemaining { event_id });
        }
        pool.sort_unstable();

        for signup in aggregate.signups.iter_mut().filter(|s| s.is_current_performer) {
            finish_performance(signup);
        }

        let chosen_id = pool[self.ctx.random.index(pool.len())];
        let chosen = aggregate.signup_mut(chosen_id)?;
        chosen.is_current_performer = true;
        chosen.status = SignupStatus::Performing;
        let chosen = chosen.clone();
        aggregate.event.current_performer_id = Some(chosen_id);

        self.ctx.commit(aggregate.into_changes()).await?;

        log_event_action(event_id, "select_next_performer", Some(user_id), Some(chosen.performance_name.as_str()));
        self.ctx.emit(QueueFact::PerformerSelected { event_id, signup_id: chosen_id });
        Ok(chosen)
    }

    /// Mark a signup as having performed
    pub async fn mark_finished(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        let event_id = self.ctx.load_signup(signup_id).await?.event_id;
        self.ctx
            .retry(event_id, "mark_finished", || self.try_set_finished(event_id, signup_id, true, principal))
            .await
    }

    /// Undo a finish mark, returning the signup to the queue
    pub async fn unmark_finished(&self, signup_id: i64, principal: &dyn Principal) -> Result<Signup> {
        let event_id = self.ctx.load_signup(signup_id).await?.event_id;
        self.ctx
            .retry(event_id, "unmark_finished", || self.try_set_finished(event_id, signup_id, false, principal))
            .await
    }

    async fn try_set_finished(
        &self,
        event_id: i64,
        signup_id: i64,
        finished: bool,
        principal: &dyn Principal,
    ) -> Result<Signup> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        let action = if finished { "mark_finished" } else { "unmark_finished" };
        require_live(&aggregate, action)?;

        let signup = aggregate.signup_mut(signup_id)?;
        if !signup.is_active() {
            return Err(MicNightError::validation(format!("signup {} is cancelled", signup_id)));
        }
        if signup.is_finished == finished {
            return Ok(signup.clone());
        }

        let was_current = signup.is_current_performer;
        if finished {
            finish_performance(signup);
        } else {
            signup.is_finished = false;
            signup.finished_at = None;
            signup.status = SignupStatus::Confirmed;
        }
        let updated = signup.clone();
        if was_current {
            aggregate.event.current_performer_id = None;
        }

        self.ctx.commit(aggregate.into_changes()).await?;
        log_event_action(event_id, action, Some(user_id), None);
        Ok(updated)
    }

    /// Random order mode: draw a fresh permutation of the whole queue
    pub async fn randomize_order(&self, event_id: i64, principal: &dyn Principal) -> Result<Vec<Signup>> {
        self.ctx
            .retry(event_id, "randomize_order", || self.try_randomize(event_id, principal))
            .await
    }

    async fn try_randomize(&self, event_id: i64, principal: &dyn Principal) -> Result<Vec<Signup>> {
        let mut aggregate = self.ctx.load_aggregate(event_id).await?;
        let user_id = auth::require_manager(principal, &aggregate.event)?;
        require_mode(&aggregate, |d| d.allows_randomize(), "randomize the order")?;
        require_live(&aggregate, "randomize_order")?;

        shuffle_order(&mut aggregate.signups, self.ctx.random.as_ref());
        let mut queue: Vec<Signup> = aggregate.active().cloned().collect();
        natural_order(&mut queue);

        self.ctx.commit(aggregate.into_changes()).await?;
        log_queue_change(event_id, "randomize_order", queue.len());
        info!(event_id = event_id, user_id = user_id, "Queue reshuffled");
        Ok(queue)
    }
}

/// Fail with `Validation` when the event's discipline does not support an action
pub(crate) fn require_mode(
    aggregate: &EventAggregate,
    supported: impl Fn(&dyn QueueDiscipline) -> bool,
    action: &str,
) -> Result<()> {
    let mode = aggregate.event.signup_list_mode;
    if !supported(discipline_for(mode)) {
        return Err(MicNightError::validation(format!("cannot {} in {} mode", action, mode)));
    }
    Ok(())
}

fn require_live(aggregate: &EventAggregate, action: &str) -> Result<()> {
    if aggregate.event.status != EventStatus::Live {
        return Err(MicNightError::transition(aggregate.event.status, action));
    }
    Ok(())
}
