//! Notification store service routes, mounted under `/api/v1`.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use notify_store::{
    BroadcastRequest, BulkSendRequest, DeliveryDecision, DeviceRegistration, ListQuery,
    Notification, NotificationStore, PreferencesPatch, SendRequest,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::error::ApiError;
use super::openapi;
use crate::adapters::push::{PushRelay, token_preview};

#[derive(Clone)]
pub struct StoreState {
    pub store: NotificationStore,
    pub relay: Arc<dyn PushRelay>,
}

impl StoreState {
    pub fn new(store: NotificationStore, relay: Arc<dyn PushRelay>) -> Self {
        Self { store, relay }
    }
}

/// Full application: versioned routes plus the OpenAPI document.
pub fn app(state: StoreState) -> Router {
    Router::new()
        .nest("/api/v1", router())
        .route("/api/openapi.json", get(openapi::store_openapi))
        .with_state(state)
}

pub fn router() -> Router<StoreState> {
    Router::new()
        .route("/health", get(health))
        .route("/notifications/send", post(send))
        .route("/notifications/send-bulk", post(send_bulk))
        .route("/notifications/broadcast", post(broadcast))
        .route("/notifications/read-all", put(read_all))
        .route("/notifications/clear-all", delete(clear_all))
        .route("/notifications/sync", post(sync))
        .route("/notifications/preferences", put(update_preferences))
        .route("/notifications/preferences/{patient_id}", get(preferences))
        .route("/notifications/{id}", get(list).delete(remove))
        .route("/notifications/{id}/read", put(mark_read))
        .route("/devices/register", post(register_device))
        .route("/devices/unregister", delete(unregister_device))
}

/// Pushes a stored notification to its recipient's devices. Returns whether
/// any device accepted it; failures never fail the write.
async fn dispatch(state: &StoreState, notification: &Notification) -> bool {
    match state.store.delivery_plan(notification) {
        DeliveryDecision::Skip(reason) => {
            debug!(id = %notification.id, patient = %notification.patient_id, %reason, "push skipped");
            false
        }
        DeliveryDecision::Deliver(messages) => {
            let mut delivered = false;
            for message in messages {
                let token = token_preview(&message.to);
                let result = state.relay.deliver(message).await;
                if result.success {
                    delivered = true;
                    info!(id = %notification.id, token = %token, "push sent");
                } else {
                    warn!(
                        id = %notification.id,
                        token = %token,
                        reason = result.reason.as_deref().unwrap_or_default(),
                        "push failed"
                    );
                }
            }
            delivered
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

async fn send(
    State(state): State<StoreState>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let notification = state.store.send(req)?;
    info!(id = %notification.id, patient = %notification.patient_id, "notification stored");
    dispatch(&state, &notification).await;
    Ok(Json(json!({
        "success": true,
        "notificationId": notification.id,
        "deliveredAt": Utc::now(),
    })))
}

async fn send_bulk(
    State(state): State<StoreState>,
    payload: Result<Json<BulkSendRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let created = state.store.send_bulk(req)?;
    info!(count = created.len(), "bulk notifications stored");
    let mut results = Vec::with_capacity(created.len());
    for notification in &created {
        dispatch(&state, notification).await;
        results.push(json!({
            "patientId": notification.patient_id,
            "notificationId": notification.id,
            "success": true,
        }));
    }
    Ok(Json(json!({ "success": true, "results": results })))
}

async fn broadcast(
    State(state): State<StoreState>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let broadcast = state.store.broadcast(req)?;
    let mut delivered = 0usize;
    for notification in &broadcast.notifications {
        if dispatch(&state, notification).await {
            delivered += 1;
        }
    }
    info!(
        broadcast = %broadcast.broadcast_id,
        recipients = broadcast.notifications.len(),
        delivered,
        "broadcast stored"
    );
    Ok(Json(json!({
        "success": true,
        "broadcastId": broadcast.broadcast_id,
        "totalRecipients": broadcast.notifications.len(),
        "deliveredCount": delivered,
    })))
}

async fn list(
    State(state): State<StoreState>,
    Path(patient_id): Path<String>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let page = state.store.list(&patient_id, &query)?;
    Ok(Json(json!({
        "success": true,
        "total": page.total,
        "unreadCount": page.unread_count,
        "notifications": page.notifications,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatientBody {
    #[serde(default)]
    patient_id: Option<String>,
}

impl PatientBody {
    fn patient_id(&self) -> Result<&str, ApiError> {
        self.patient_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing patientId"))
    }
}

async fn mark_read(
    State(state): State<StoreState>,
    Path(id): Path<String>,
    payload: Result<Json<PatientBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    state.store.mark_read(&id, body.patient_id()?)?;
    Ok(Json(json!({ "success": true })))
}

async fn read_all(
    State(state): State<StoreState>,
    payload: Result<Json<PatientBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let updated = state.store.mark_all_read(body.patient_id()?);
    Ok(Json(json!({ "success": true, "updated": updated })))
}

async fn remove(
    State(state): State<StoreState>,
    Path(id): Path<String>,
    payload: Result<Json<PatientBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    state.store.delete(&id, body.patient_id()?)?;
    Ok(Json(json!({ "success": true })))
}

async fn clear_all(
    State(state): State<StoreState>,
    payload: Result<Json<PatientBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let removed = state.store.clear_all(body.patient_id()?);
    Ok(Json(json!({ "success": true, "removed": removed })))
}

async fn register_device(
    State(state): State<StoreState>,
    payload: Result<Json<DeviceRegistration>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(reg) = payload?;
    let device = state.store.register_device(reg)?;
    info!(patient = %device.patient_id, token = %token_preview(&device.token), platform = %device.platform, "device registered");
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnregisterBody {
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

async fn unregister_device(
    State(state): State<StoreState>,
    payload: Result<Json<UnregisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let (Some(patient_id), Some(token)) = (body.patient_id.as_deref(), body.token.as_deref())
    else {
        return Err(ApiError::bad_request("Missing patientId or token"));
    };
    let removed = state.store.unregister_device(patient_id, token);
    Ok(Json(json!({ "success": true, "removed": removed })))
}

async fn preferences(
    State(state): State<StoreState>,
    Path(patient_id): Path<String>,
) -> impl IntoResponse {
    Json(state.store.preferences(&patient_id))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferencesBody {
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    preferences: Option<PreferencesPatch>,
}

async fn update_preferences(
    State(state): State<StoreState>,
    payload: Result<Json<PreferencesBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let prefs = state
        .store
        .update_preferences(body.patient_id.as_deref(), body.preferences)?;
    Ok(Json(json!({ "success": true, "preferences": prefs })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncBody {
    #[serde(default)]
    patient_id: Option<String>,
    #[serde(default)]
    last_sync_time: Option<String>,
}

async fn sync(
    State(state): State<StoreState>,
    payload: Result<Json<SyncBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let patient_id = body
        .patient_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing patientId"))?;
    let page = state.store.sync(patient_id, body.last_sync_time.as_deref())?;
    Ok(Json(json!({
        "success": true,
        "notifications": page.notifications,
        "deletedIds": page.deleted_ids,
        "syncTime": page.sync_time,
    })))
}
