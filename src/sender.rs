//! Mailing delivery and the cache layer in front of it.
//!
//! A mailing is delivered sequentially, one recipient at a time. Caches
//! keep repeated triggers cheap and stop recent duplicates from going out
//! again:
//!
//! - the aggregate result of a run is cached for an hour, so re-triggering
//!   a mailing inside that window returns the previous tally without
//!   touching the transport
//! - each recipient's outcome is cached individually (an hour for a
//!   success, fifteen minutes for a failure) so a partial rerun skips
//!   clients that were already handled
//! - a content hash of the message lets a rerun after cache loss detect
//!   "same mailing, same content, sent to this client in the last day"
//!   from the attempt log and count it as delivered without resending
//!
//! Caches live in [`SendCaches`] on the application state rather than in
//! statics so every test gets its own.

use std::time::{Duration, Instant};

use chrono::Utc;
use md5::{Digest, Md5};
use moka::{future::Cache, Expiry};
use tracing::{debug, info, warn};

use crate::api::models::attempts::AttemptStatus;
use crate::api::models::dashboard::DashboardResponse;
use crate::api::models::mailings::MailingStatsResponse;
use crate::api::models::users::ManagerOverview;
use crate::db::handlers::{Attempts, Clients, Mailings, Messages, Repository, Users};
use crate::db::models::attempts::AttemptCreateDBRequest;
use crate::db::models::mailings::MailingDBResponse;
use crate::errors::Result;
use crate::types::{ClientId, MailingId};
use crate::AppState;

const MAILING_RESULT_TTL: Duration = Duration::from_secs(3600);
const CLIENT_SUCCESS_TTL: Duration = Duration::from_secs(3600);
const CLIENT_FAILURE_TTL: Duration = Duration::from_secs(900);
const MANUAL_SENT_TTL: Duration = Duration::from_secs(3600);
const MANUAL_RECENT_TTL: Duration = Duration::from_secs(1800);
const MANUAL_NOT_FOUND_TTL: Duration = Duration::from_secs(300);
const STATS_TTL: Duration = Duration::from_secs(300);

/// Look back this far in the attempt log for content-hash deduplication.
const DEDUP_WINDOW: chrono::Duration = chrono::Duration::hours(24);
/// A successful manual send inside this window short-circuits the next one.
const MANUAL_RECENT_WINDOW: chrono::Duration = chrono::Duration::minutes(30);

/// A manually triggered send result, with the TTL its outcome class gets.
#[derive(Debug, Clone)]
struct ManualResult {
    message: String,
    ttl: Duration,
}

struct ManualResultExpiry;

impl Expiry<MailingId, ManualResult> for ManualResultExpiry {
    fn expire_after_create(
        &self,
        _key: &MailingId,
        value: &ManualResult,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

struct ClientOutcomeExpiry;

impl Expiry<(MailingId, ClientId), AttemptStatus> for ClientOutcomeExpiry {
    fn expire_after_create(
        &self,
        _key: &(MailingId, ClientId),
        value: &AttemptStatus,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(match value {
            AttemptStatus::Success => CLIENT_SUCCESS_TTL,
            AttemptStatus::Failed => CLIENT_FAILURE_TTL,
        })
    }
}

/// All delivery and reporting caches, carried on the application state.
#[derive(Clone)]
pub struct SendCaches {
    /// Aggregate (successful, failed) per mailing run
    mailing_results: Cache<MailingId, (i64, i64)>,
    /// Per-recipient outcome of the current run
    client_outcomes: Cache<(MailingId, ClientId), AttemptStatus>,
    /// Human-readable result of a manually triggered send
    manual_results: Cache<MailingId, ManualResult>,
    /// Attempt statistics per mailing
    stats: Cache<MailingId, MailingStatsResponse>,
    /// Dashboard counters (single entry)
    dashboard: Cache<(), DashboardResponse>,
    /// User role counters (single entry)
    overview: Cache<(), ManagerOverview>,
}

impl Default for SendCaches {
    fn default() -> Self {
        Self {
            mailing_results: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(MAILING_RESULT_TTL)
                .build(),
            client_outcomes: Cache::builder()
                .max_capacity(100_000)
                .expire_after(ClientOutcomeExpiry)
                .build(),
            manual_results: Cache::builder()
                .max_capacity(10_000)
                .expire_after(ManualResultExpiry)
                .build(),
            stats: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(STATS_TTL)
                .build(),
            dashboard: Cache::builder()
                .max_capacity(1)
                .time_to_live(STATS_TTL)
                .build(),
            overview: Cache::builder()
                .max_capacity(1)
                .time_to_live(STATS_TTL)
                .build(),
        }
    }
}

/// Hex MD5 of the message content, used for the 24h dedup heuristic.
fn content_hash(subject: &str, body: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(subject.as_bytes());
    hasher.update(body.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Deliver a mailing to its recipients, one at a time.
///
/// Returns the (successful, failed) tally. A cached aggregate from a run
/// inside the last hour is returned as-is without contacting anyone.
pub async fn send_mailing(state: &AppState, mailing: &MailingDBResponse) -> Result<(i64, i64)> {
    if let Some(cached) = state.caches.mailing_results.get(&mailing.id).await {
        debug!(mailing_id = mailing.id, "returning cached mailing result");
        return Ok(cached);
    }

    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let message = Messages::new(&mut conn)
        .get_by_id(mailing.message_id)
        .await?
        .ok_or(crate::errors::Error::NotFound {
            resource: "message".to_string(),
            id: mailing.message_id.to_string(),
        })?;
    let clients = Clients::new(&mut conn).list_for_mailing(mailing.id).await?;
    drop(conn);

    let hash = content_hash(&message.subject, &message.body);
    let dedup_since = Utc::now() - DEDUP_WINDOW;

    let mut successful: i64 = 0;
    let mut failed: i64 = 0;

    info!(
        mailing_id = mailing.id,
        recipients = clients.len(),
        "sending mailing"
    );

    for client in &clients {
        if let Some(outcome) = state
            .caches
            .client_outcomes
            .get(&(mailing.id, client.id))
            .await
        {
            debug!(
                mailing_id = mailing.id,
                client_id = client.id,
                "recipient outcome cached, skipping"
            );
            match outcome {
                AttemptStatus::Success => successful += 1,
                AttemptStatus::Failed => failed += 1,
            }
            continue;
        }

        if client.email.trim().is_empty() {
            let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
            Attempts::new(&mut conn)
                .create(&AttemptCreateDBRequest {
                    mailing_id: mailing.id,
                    client_id: Some(client.id),
                    status: AttemptStatus::Failed,
                    server_response: "client has no email address".to_string(),
                    content_hash: None,
                })
                .await?;
            state
                .caches
                .client_outcomes
                .insert((mailing.id, client.id), AttemptStatus::Failed)
                .await;
            failed += 1;
            continue;
        }

        // Content unchanged and already delivered to this client in the
        // last day: count it as sent without going to the transport again.
        let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
        let recent = Attempts::new(&mut conn)
            .latest_for_client_since(mailing.id, client.id, dedup_since)
            .await?;
        drop(conn);
        if let Some(attempt) = recent {
            if attempt.status == AttemptStatus::Success
                && attempt.content_hash.as_deref() == Some(hash.as_str())
            {
                debug!(
                    mailing_id = mailing.id,
                    client_id = client.id,
                    "identical content already delivered recently, skipping"
                );
                state
                    .caches
                    .client_outcomes
                    .insert((mailing.id, client.id), AttemptStatus::Success)
                    .await;
                successful += 1;
                continue;
            }
        }

        let (status, server_response) = match state
            .email
            .send_mail(&client.email, &message.subject, &message.body)
            .await
        {
            Ok(()) => (AttemptStatus::Success, "Email sent successfully".to_string()),
            Err(e) => {
                warn!(
                    mailing_id = mailing.id,
                    client_id = client.id,
                    error = %e,
                    "delivery failed"
                );
                (AttemptStatus::Failed, e.to_string())
            }
        };

        let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
        Attempts::new(&mut conn)
            .create(&AttemptCreateDBRequest {
                mailing_id: mailing.id,
                client_id: Some(client.id),
                status,
                server_response,
                content_hash: Some(hash.clone()),
            })
            .await?;
        state
            .caches
            .client_outcomes
            .insert((mailing.id, client.id), status)
            .await;
        match status {
            AttemptStatus::Success => successful += 1,
            AttemptStatus::Failed => failed += 1,
        }
    }

    info!(
        mailing_id = mailing.id,
        successful, failed, "mailing run finished"
    );
    state
        .caches
        .mailing_results
        .insert(mailing.id, (successful, failed))
        .await;
    Ok((successful, failed))
}

/// Trigger a mailing by id and return a human-readable result.
///
/// This is the entry point for the send endpoint and the CLI. A
/// successful run inside the last half hour is not repeated; the result
/// string itself is cached so hammering the trigger is harmless.
pub async fn send_mailing_manual(state: &AppState, mailing_id: MailingId) -> Result<String> {
    if let Some(cached) = state.caches.manual_results.get(&mailing_id).await {
        debug!(mailing_id, "returning cached manual send result");
        return Ok(cached.message);
    }

    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let mailing = Mailings::new(&mut conn).get_by_id(mailing_id).await?;

    let Some(mailing) = mailing else {
        let message = format!("Mailing with id {mailing_id} not found");
        state
            .caches
            .manual_results
            .insert(
                mailing_id,
                ManualResult {
                    message: message.clone(),
                    ttl: MANUAL_NOT_FOUND_TTL,
                },
            )
            .await;
        return Ok(message);
    };

    let subject = Messages::new(&mut conn)
        .get_by_id(mailing.message_id)
        .await?
        .map(|m| m.subject)
        .unwrap_or_default();

    let recent = Attempts::new(&mut conn)
        .latest_since(mailing_id, Utc::now() - MANUAL_RECENT_WINDOW)
        .await?;
    drop(conn);

    if let Some(attempt) = recent {
        if attempt.status == AttemptStatus::Success {
            let message = format!("Mailing '{subject}' was already sent recently");
            state
                .caches
                .manual_results
                .insert(
                    mailing_id,
                    ManualResult {
                        message: message.clone(),
                        ttl: MANUAL_RECENT_TTL,
                    },
                )
                .await;
            return Ok(message);
        }
    }

    let (successful, failed) = send_mailing(state, &mailing).await?;
    let message = format!("Mailing '{subject}' sent. Successful: {successful}, failed: {failed}");
    state
        .caches
        .manual_results
        .insert(
            mailing_id,
            ManualResult {
                message: message.clone(),
                ttl: MANUAL_SENT_TTL,
            },
        )
        .await;
    Ok(message)
}

/// Attempt statistics for a mailing, cached for five minutes.
pub async fn mailing_stats(state: &AppState, mailing_id: MailingId) -> Result<MailingStatsResponse> {
    if let Some(cached) = state.caches.stats.get(&mailing_id).await {
        return Ok(cached);
    }
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let stats = Attempts::new(&mut conn).stats(mailing_id).await?;
    state.caches.stats.insert(mailing_id, stats.clone()).await;
    Ok(stats)
}

/// Dashboard counters, cached for five minutes.
pub async fn dashboard_counts(state: &AppState) -> Result<DashboardResponse> {
    if let Some(cached) = state.caches.dashboard.get(&()).await {
        return Ok(cached);
    }
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let total_mailings = Mailings::new(&mut conn).count().await?;
    let active_mailings = Mailings::new(&mut conn).count_active().await?;
    let total_clients = Clients::new(&mut conn).count().await?;
    let counts = DashboardResponse {
        total_mailings,
        active_mailings,
        total_clients,
    };
    state.caches.dashboard.insert((), counts.clone()).await;
    Ok(counts)
}

/// User role counters, cached for five minutes.
pub async fn manager_overview(state: &AppState) -> Result<ManagerOverview> {
    if let Some(cached) = state.caches.overview.get(&()).await {
        return Ok(cached);
    }
    let mut conn = state.db.acquire().await.map_err(crate::db::errors::DbError::from)?;
    let overview = Users::new(&mut conn).role_counts().await?;
    state.caches.overview.insert((), overview.clone()).await;
    Ok(overview)
}
