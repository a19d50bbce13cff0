//! API models for the dashboard aggregate counts.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Aggregate counts shown on the dashboard. Cached for five minutes with
/// no invalidation on writes, so values may lag reality by up to the TTL.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub total_mailings: i64,
    pub active_mailings: i64,
    pub total_clients: i64,
}
