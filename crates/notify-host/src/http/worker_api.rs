//! Worker routes: run reconciliation batches over HTTP and send single pushes.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use notify_core::{Account, PushMessage};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use super::error::ApiError;
use super::openapi;
use crate::adapters::push::PushRelay;
use crate::modes::batch::{BatchReport, BatchRunner};
use crate::reconciler::{AccountReport, Outcome, ReconcileMode};

const SERVICE_NAME: &str = "Portal Notification Worker";

#[derive(Clone)]
pub struct WorkerState {
    pub runner: BatchRunner,
    pub relay: Arc<dyn PushRelay>,
}

impl WorkerState {
    pub fn new(runner: BatchRunner, relay: Arc<dyn PushRelay>) -> Self {
        Self { runner, relay }
    }
}

pub fn app(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/info", get(info))
        .route("/api/openapi.json", get(openapi::worker_openapi))
        .route("/api/check-notifications", post(check_notifications))
        .route("/api/check-and-notify", post(check_and_notify))
        .route("/api/send-push", post(send_push))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn info() -> impl IntoResponse {
    Json(json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "info": "GET /api/info",
            "checkNotifications": "POST /api/check-notifications",
            "checkAndNotify": "POST /api/check-and-notify",
            "sendPush": "POST /api/send-push",
        },
        "example": {
            "method": "POST",
            "url": "/api/check-notifications",
            "body": {
                "users": [
                    { "id": "user1", "name": "Patient", "username": "2299", "password": "secret" }
                ]
            }
        }
    }))
}

#[derive(Debug, Deserialize)]
struct BatchBody {
    #[serde(default)]
    users: Option<Vec<Account>>,
}

/// Per-account entry of a check-only batch.
fn check_entry(report: &AccountReport) -> Result<Value, ApiError> {
    let entry = match &report.outcome {
        Outcome::Completed(summary) => {
            let is_new = !summary.new_items.is_empty();
            let notifications = if is_new {
                serde_json::to_value(&summary.new_items)
            } else {
                serde_json::to_value(&summary.observed)
            }
            .map_err(|err| ApiError::internal(format!("encode observed items: {err}")))?;
            json!({
                "userId": report.account_id,
                "userName": report.display_name,
                "success": true,
                "notifications": notifications,
                "isNew": is_new,
                "totalCount": summary.observed.len(),
                "latestVisitId": summary.latest_visit.as_ref().map(|v| &v.visit_id),
                "resultsUrl": summary.result_url,
            })
        }
        Outcome::Failed(failure) => json!({
            "userId": report.account_id,
            "userName": report.display_name,
            "success": false,
            "error": failure.message,
            "errorKind": failure.kind,
            "notifications": [],
        }),
    };
    Ok(entry)
}

/// Per-account entry of a check-and-notify batch.
fn notify_entry(report: &AccountReport) -> Value {
    match &report.outcome {
        Outcome::Completed(summary) if summary.new_items.is_empty() => json!({
            "userId": report.account_id,
            "userName": report.display_name,
            "notificationsFound": 0,
            "isNew": false,
        }),
        Outcome::Completed(summary) if summary.deliveries.is_empty() => json!({
            "userId": report.account_id,
            "userName": report.display_name,
            "notificationsFound": summary.new_items.len(),
            "pushSent": false,
            "reason": "No push token",
        }),
        Outcome::Completed(summary) => json!({
            "userId": report.account_id,
            "userName": report.display_name,
            "notificationsFound": summary.new_items.len(),
            "pushSent": summary.push_sent(),
            "resultsUrl": summary.result_url,
            "deliveries": summary.deliveries,
        }),
        Outcome::Failed(failure) => json!({
            "userId": report.account_id,
            "userName": report.display_name,
            "error": failure.message,
            "errorKind": failure.kind,
        }),
    }
}

fn check_response(report: &BatchReport) -> Result<Value, ApiError> {
    let results = report
        .accounts
        .iter()
        .map(check_entry)
        .collect::<Result<Vec<_>, _>>()?;
    let new_notifications = report
        .with_new_items()
        .map(check_entry)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "success": true,
        "totalUsers": report.accounts.len(),
        "successCount": report.success_count(),
        "newNotificationsCount": new_notifications.len(),
        "results": results,
        "newNotifications": new_notifications,
    }))
}

async fn check_notifications(
    State(state): State<WorkerState>,
    payload: Result<Json<BatchBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let users = body
        .users
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid users array"))?;
    let report = state.runner.run(&users, ReconcileMode::CheckOnly).await;
    Ok(Json(check_response(&report)?))
}

async fn check_and_notify(
    State(state): State<WorkerState>,
    payload: Result<Json<BatchBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let users = body
        .users
        .ok_or_else(|| ApiError::bad_request("Invalid users array"))?;
    let report = state.runner.run(&users, ReconcileMode::CheckAndNotify).await;
    let results: Vec<Value> = report.accounts.iter().map(notify_entry).collect();
    let sent = report
        .accounts
        .iter()
        .filter_map(|r| r.summary())
        .filter(|s| s.push_sent())
        .count();
    info!(accounts = report.accounts.len(), sent, "check-and-notify finished");
    Ok(Json(json!({ "success": true, "results": results })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendPushBody {
    #[serde(default)]
    push_token: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

async fn send_push(
    State(state): State<WorkerState>,
    payload: Result<Json<SendPushBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
    if !(present(&req.push_token) && present(&req.title) && present(&req.body)) {
        return Err(ApiError::bad_request(
            "Missing required fields: pushToken, title, body",
        ));
    }
    let mut message = PushMessage::new(
        req.push_token.unwrap_or_default(),
        req.title.unwrap_or_default(),
        req.body.unwrap_or_default(),
        req.data.unwrap_or_else(|| json!({})),
    );
    message.sound = Some("default".into());
    let result = state.relay.deliver(message).await;
    Ok(Json(result))
}
