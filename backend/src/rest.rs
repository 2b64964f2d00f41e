//! # REST API for Expiry Notifications
//!
//! - `POST /api/notifications/test`: run the expiry check now, without the daily gate
//! - `GET /api/notifications`: the caller's in-app notifications, newest first
//! - `GET /api/notifications/status`: last run date and scheduler state
//!
//! The caller is identified by the `X-User-Id` header set by the
//! authenticating proxy in front of the service.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shared::{NotificationListResponse, RunStatusResponse, TestRunResponse};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use crate::domain::formatter;
use crate::domain::ExpiryScheduler;
use crate::storage::{GroupDirectory, NotificationRepository};

pub const USER_ID_HEADER: &str = "x-user-id";

/// Application state shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<ExpiryScheduler>,
    pub directory: Arc<dyn GroupDirectory>,
    pub notifications: NotificationRepository,
    /// Link used for notifications stored without one
    pub app_url: String,
}

impl AppState {
    pub fn new(
        scheduler: Arc<ExpiryScheduler>,
        directory: Arc<dyn GroupDirectory>,
        notifications: NotificationRepository,
        app_url: String,
    ) -> Self {
        Self {
            scheduler,
            directory,
            notifications,
            app_url,
        }
    }
}

/// Query parameters for the notification list
#[derive(Deserialize, Debug)]
pub struct NotificationListQuery {
    pub limit: Option<u32>,
}

fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Members of the recipient group and administrators may trigger test runs
async fn may_trigger_test(state: &AppState, user_id: &str) -> anyhow::Result<bool> {
    if state.directory.is_admin(user_id).await? {
        return Ok(true);
    }

    let group = &state.scheduler.settings().recipient_group;
    let members = state.directory.members_of(group).await?.unwrap_or_default();
    Ok(members.iter().any(|member| member.id == user_id))
}

/// Axum handler function for POST /api/notifications/test
pub async fn test_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let Some(user_id) = caller_id(&headers) else {
        warn!("POST /api/notifications/test - missing caller identity");
        return (StatusCode::UNAUTHORIZED, "User not logged in").into_response();
    };
    info!("POST /api/notifications/test - user: {}", user_id);

    match may_trigger_test(&state, &user_id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("User {} may not trigger test notifications", user_id);
            return (
                StatusCode::FORBIDDEN,
                "Access denied. Only members of the notification group or administrators can test notifications.",
            )
                .into_response();
        }
        Err(e) => {
            error!("Error checking permissions for {}: {:#}", user_id, e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error checking permissions")
                .into_response();
        }
    }

    match state.scheduler.run_test().await {
        Ok(summary) => {
            let message = if summary.total_count == 0 {
                format!(
                    "No drivers found with licenses expiring within {} days",
                    state.scheduler.settings().horizon_days
                )
            } else {
                format!(
                    "Test notification completed for {} drivers. Check your email and notifications.",
                    summary.total_count
                )
            };
            let response = TestRunResponse {
                message,
                total_count: summary.total_count,
                outcome: summary.outcome,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Test notification failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response()
        }
    }
}

/// Axum handler function for GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<NotificationListQuery>,
) -> impl IntoResponse {
    let Some(user_id) = caller_id(&headers) else {
        return (StatusCode::UNAUTHORIZED, "User not logged in").into_response();
    };
    info!("GET /api/notifications - user: {}, query: {:?}", user_id, query);

    match state.notifications.list_for_user(&user_id, query.limit).await {
        Ok(stored) => {
            let notifications = stored
                .iter()
                .map(|notification| formatter::prepare(notification, &state.app_url))
                .collect();
            (StatusCode::OK, Json(NotificationListResponse { notifications })).into_response()
        }
        Err(e) => {
            error!("Error listing notifications: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error listing notifications").into_response()
        }
    }
}

/// Axum handler function for GET /api/notifications/status
pub async fn notification_status(State(state): State<AppState>) -> impl IntoResponse {
    info!("GET /api/notifications/status");

    match state.scheduler.last_run_date().await {
        Ok(last_run_date) => {
            let response = RunStatusResponse {
                last_run_date,
                state: state.scheduler.state().to_string(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            error!("Error reading run status: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error reading run status").into_response()
        }
    }
}

/// Notification routes, to be nested under `/api`
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/test", post(test_notification))
        .route("/notifications/status", get(notification_status))
}

/// Full application router with CORS for the given origin
pub fn create_router(state: AppState, allowed_origin: &str) -> Router {
    let cors = match allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new().allow_origin(origin),
        Err(_) => {
            warn!("Invalid allowed origin '{}', allowing any origin", allowed_origin);
            CorsLayer::new().allow_origin(Any)
        }
    }
    .allow_methods([Method::GET, Method::POST])
    .allow_headers(Any);

    Router::new()
        .nest("/api", router())
        .layer(cors)
        .with_state(state)
}
