//! PostgreSQL store implementation

use std::time::Instant;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use crate::database::store::{Committed, EventChanges, EventStore};
use crate::models::{Event, Invite, NewEvent, NewInvite, NewSignup, Performer, Signup};
use crate::utils::errors::{MicNightError, Result};
use crate::utils::logging::log_store_operation;

const EVENT_COLUMNS: &str = "id, host_id, title, status, signup_list_mode, max_performers, performance_length, current_performer_id, started_at, finished_at, signup_opens, signup_deadline, version, created_at, updated_at";

const SIGNUP_COLUMNS: &str = "id, event_id, user_id, walk_in_name, performance_name, performance_type, notes, status, performance_order, individual_performance_length, is_finished, finished_at, is_current_performer, created_at, updated_at";

const INVITE_COLUMNS: &str = "id, event_id, user_id, status, invited_by, invited_at, responded_at";

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, FromRow)]
struct EventRow {
    id: i64,
    host_id: i64,
    title: String,
    status: String,
    signup_list_mode: String,
    max_performers: i32,
    performance_length: i32,
    current_performer_id: Option<i64>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    signup_opens: Option<DateTime<Utc>>,
    signup_deadline: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = MicNightError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Event {
            id: row.id,
            host_id: row.host_id,
            title: row.title,
            status: row.status.parse()?,
            signup_list_mode: row.signup_list_mode.parse()?,
            max_performers: row.max_performers,
            performance_length: row.performance_length,
            current_performer_id: row.current_performer_id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            signup_opens: row.signup_opens,
            signup_deadline: row.signup_deadline,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SignupRow {
    id: i64,
    event_id: i64,
    user_id: Option<i64>,
    walk_in_name: Option<String>,
    performance_name: String,
    performance_type: Option<String>,
    notes: Option<String>,
    status: String,
    performance_order: Option<i32>,
    individual_performance_length: Option<i32>,
    is_finished: bool,
    finished_at: Option<DateTime<Utc>>,
    is_current_performer: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SignupRow> for Signup {
    type Error = MicNightError;

    fn try_from(row: SignupRow) -> Result<Self> {
        let performer = match (row.user_id, row.walk_in_name) {
            (Some(user_id), None) => Performer::Registered { user_id },
            (None, Some(name)) => Performer::WalkIn { name },
            _ => {
                return Err(MicNightError::CorruptRecord(format!(
                    "signup {} must have exactly one of user_id or walk_in_name",
                    row.id
                )))
            }
        };

        Ok(Signup {
            id: row.id,
            event_id: row.event_id,
            performer,
            performance_name: row.performance_name,
            performance_type: row.performance_type,
            notes: row.notes,
            status: row.status.parse()?,
            performance_order: row.performance_order,
            individual_performance_length: row.individual_performance_length,
            is_finished: row.is_finished,
            finished_at: row.finished_at,
            is_current_performer: row.is_current_performer,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct InviteRow {
    id: i64,
    event_id: i64,
    user_id: i64,
    status: String,
    invited_by: i64,
    invited_at: DateTime<Utc>,
    responded_at: Option<DateTime<Utc>>,
}

impl TryFrom<InviteRow> for Invite {
    type Error = MicNightError;

    fn try_from(row: InviteRow) -> Result<Self> {
        Ok(Invite {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            status: row.status.parse()?,
            invited_by: row.invited_by,
            invited_at: row.invited_at,
            responded_at: row.responded_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = MicNightError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn split_performer(performer: &Performer) -> (Option<i64>, Option<&str>) {
    match performer {
        Performer::Registered { user_id } => (Some(*user_id), None),
        Performer::WalkIn { name } => (None, Some(name.as_str())),
    }
}

#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_signup(tx: &mut Transaction<'_, Postgres>, signup: &Signup, now: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE signups
            SET performance_name = $3,
                performance_type = $4,
                notes = $5,
                status = $6,
                performance_order = $7,
                individual_performance_length = $8,
                is_finished = $9,
                finished_at = $10,
                is_current_performer = $11,
                updated_at = $12
            WHERE id = $1 AND event_id = $2
            "#
        )
        .bind(signup.id)
        .bind(signup.event_id)
        .bind(&signup.performance_name)
        .bind(&signup.performance_type)
        .bind(&signup.notes)
        .bind(signup.status.as_str())
        .bind(signup.performance_order)
        .bind(signup.individual_performance_length)
        .bind(signup.is_finished)
        .bind(signup.finished_at)
        .bind(signup.is_current_performer)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(MicNightError::not_found("Signup", signup.id));
        }
        Ok(())
    }

    async fn insert_signup(tx: &mut Transaction<'_, Postgres>, signup: &NewSignup, now: DateTime<Utc>) -> Result<Signup> {
        let (user_id, walk_in_name) = split_performer(&signup.performer);
        let row = sqlx::query_as::<_, SignupRow>(&format!(
            r#"
            INSERT INTO signups (event_id, user_id, walk_in_name, performance_name, performance_type, notes, status, is_finished, is_current_performer, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'confirmed', false, false, $7, $7)
            RETURNING {}
            "#,
            SIGNUP_COLUMNS
        ))
        .bind(signup.event_id)
        .bind(user_id)
        .bind(walk_in_name)
        .bind(&signup.performance_name)
        .bind(&signup.performance_type)
        .bind(&signup.notes)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Signup::try_from(row)
    }

    async fn update_invite(tx: &mut Transaction<'_, Postgres>, invite: &Invite) -> Result<()> {
        let result = sqlx::query(
            "UPDATE invites SET status = $3, responded_at = $4 WHERE id = $1 AND event_id = $2"
        )
        .bind(invite.id)
        .bind(invite.event_id)
        .bind(invite.status.as_str())
        .bind(invite.responded_at)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(MicNightError::not_found("Invite", invite.id));
        }
        Ok(())
    }

    async fn insert_invite(tx: &mut Transaction<'_, Postgres>, invite: &NewInvite, now: DateTime<Utc>) -> Result<Invite> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            r#"
            INSERT INTO invites (event_id, user_id, status, invited_by, invited_at)
            VALUES ($1, $2, 'pending', $3, $4)
            RETURNING {}
            "#,
            INVITE_COLUMNS
        ))
        .bind(invite.event_id)
        .bind(invite.user_id)
        .bind(invite.invited_by)
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Invite::try_from(row)
    }

    async fn apply(&self, changes: EventChanges) -> Result<Committed> {
        let event_id = changes.event_id();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET status = $3,
                current_performer_id = $4,
                started_at = $5,
                finished_at = $6,
                version = version + 1,
                updated_at = $7
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(event_id)
        .bind(changes.event.version)
        .bind(changes.event.status.as_str())
        .bind(changes.event.current_performer_id)
        .bind(changes.event.started_at)
        .bind(changes.event.finished_at)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls it back
        let Some(row) = row else {
            return Err(MicNightError::Conflict { event_id });
        };
        let event = Event::try_from(row)?;

        // Clear current-performer flags before setting new ones so the
        // partial unique index never sees two at once.
        let mut updated = changes.updated_signups;
        updated.sort_by_key(|s| s.is_current_performer);
        for signup in &updated {
            Self::update_signup(&mut tx, signup, now).await?;
        }
        for invite in &changes.updated_invites {
            Self::update_invite(&mut tx, invite).await?;
        }

        let mut new_signups = Vec::with_capacity(changes.new_signups.len());
        for signup in &changes.new_signups {
            new_signups.push(Self::insert_signup(&mut tx, signup, now).await?);
        }
        let mut new_invites = Vec::with_capacity(changes.new_invites.len());
        for invite in &changes.new_invites {
            new_invites.push(Self::insert_invite(&mut tx, invite, now).await?);
        }

        tx.commit().await?;
        Ok(Committed { event, new_signups, new_invites })
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create_event(&self, request: NewEvent) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (host_id, title, status, signup_list_mode, max_performers, performance_length, signup_opens, signup_deadline, version, created_at, updated_at)
            VALUES ($1, $2, 'scheduled', $3, $4, $5, $6, $7, 0, $8, $8)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(request.host_id)
        .bind(request.title)
        .bind(request.signup_list_mode.as_str())
        .bind(request.max_performers)
        .bind(request.performance_length)
        .bind(request.signup_opens)
        .bind(request.signup_deadline)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Event::try_from(row)
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Event::try_from).transpose()
    }

    async fn get_signup(&self, id: i64) -> Result<Option<Signup>> {
        let row = sqlx::query_as::<_, SignupRow>(&format!("SELECT {} FROM signups WHERE id = $1", SIGNUP_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Signup::try_from).transpose()
    }

    async fn signups_for_event(&self, event_id: i64) -> Result<Vec<Signup>> {
        let rows = sqlx::query_as::<_, SignupRow>(&format!(
            "SELECT {} FROM signups WHERE event_id = $1 ORDER BY id ASC",
            SIGNUP_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn signups_for_user(&self, user_id: i64) -> Result<Vec<Signup>> {
        let rows = sqlx::query_as::<_, SignupRow>(&format!(
            "SELECT {} FROM signups WHERE user_id = $1 ORDER BY id ASC",
            SIGNUP_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn get_invite(&self, id: i64) -> Result<Option<Invite>> {
        let row = sqlx::query_as::<_, InviteRow>(&format!("SELECT {} FROM invites WHERE id = $1", INVITE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Invite::try_from).transpose()
    }

    async fn invites_for_event(&self, event_id: i64) -> Result<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE event_id = $1 ORDER BY id ASC",
            INVITE_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn invites_for_user(&self, user_id: i64) -> Result<Vec<Invite>> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE user_id = $1 ORDER BY id ASC",
            INVITE_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        convert_all(rows)
    }

    async fn commit(&self, changes: EventChanges) -> Result<Committed> {
        let event_id = changes.event_id();
        let started = Instant::now();
        let result = self.apply(changes).await;
        log_store_operation("commit", event_id, started.elapsed().as_millis() as u64, result.is_ok());

        match result {
            // A unique index caught a concurrent duplicate; the retry re-reads
            // and reports the logical error.
            Err(MicNightError::Database(sqlx::Error::Database(db)))
                if db.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(MicNightError::Conflict { event_id })
            }
            other => other,
        }
    }

    async fn health_check(&self) -> Result<()> {
        crate::database::connection::health_check(&self.pool).await
    }
}
