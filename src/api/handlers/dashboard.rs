//! Home dashboard counters.

use axum::extract::State;
use axum::Json;
use tracing::instrument;

use crate::api::models::dashboard::DashboardResponse;
use crate::api::models::users::CurrentUser;
use crate::errors::Result;
use crate::sender;
use crate::AppState;

/// Site-wide counters, cached briefly.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    responses((status = 200, description = "Counters", body = DashboardResponse))
)]
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<DashboardResponse>> {
    Ok(Json(sender::dashboard_counts(&state).await?))
}

#[cfg(test)]
mod tests {
    use crate::api::models::dashboard::DashboardResponse;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use sqlx::SqlitePool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_dashboard_counts(pool: SqlitePool) {
        let (app, _email_dir) = create_test_app(pool.clone()).await;
        let user = create_test_user(&pool).await;
        let auth = add_auth_headers(&user);

        app.get("/api/v1/dashboard").await.assert_status(StatusCode::UNAUTHORIZED);

        app.post("/api/v1/clients")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"email": "one@example.com", "full_name": "One"}))
            .await
            .assert_status(StatusCode::CREATED);

        let message: crate::api::models::messages::MessageResponse = app
            .post("/api/v1/messages")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"subject": "Weekly digest", "body": "All the news that fits"}))
            .await
            .json();
        let mailing: crate::api::models::mailings::MailingResponse = app
            .post("/api/v1/mailings")
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({
                "start_at": Utc::now(),
                "end_at": Utc::now() + Duration::hours(1),
                "message_id": message.id,
            }))
            .await
            .json();
        // Only mailings whose status is started count as active
        app.put(&format!("/api/v1/mailings/{}", mailing.id))
            .add_header(auth.0.clone(), auth.1.clone())
            .json(&json!({"status": "started"}))
            .await
            .assert_status(StatusCode::OK);

        let counts: DashboardResponse = app
            .get("/api/v1/dashboard")
            .add_header(auth.0, auth.1)
            .await
            .json();
        assert_eq!(counts.total_mailings, 1);
        assert_eq!(counts.active_mailings, 1);
        assert_eq!(counts.total_clients, 1);
    }
}
