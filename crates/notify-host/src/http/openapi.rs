//! OpenAPI documents for both services.
//!
//! The path items below only carry documentation; the handlers live in
//! `store_api` and `worker_api`.
#![allow(dead_code)]

use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Notification Store API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Stores patient notifications, device tokens and delivery preferences."
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "notifications", description = "Notification log"),
        (name = "devices", description = "Device token registry"),
        (name = "preferences", description = "Delivery preferences")
    ),
    paths(
        store_health,
        send,
        send_bulk,
        broadcast,
        list,
        mark_read,
        read_all,
        remove,
        clear_all,
        register_device,
        unregister_device,
        get_preferences,
        update_preferences,
        sync
    )
)]
pub struct StoreApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portal Notification Worker API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Checks patient portal accounts for new notifications and forwards them as pushes."
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "worker", description = "Reconciliation batches and push delivery")
    ),
    paths(worker_health, info, check_notifications, check_and_notify, send_push)
)]
pub struct WorkerApiDoc;

pub async fn store_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(StoreApiDoc::openapi())
}

pub async fn worker_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(WorkerApiDoc::openapi())
}

#[utoipa::path(get, path = "/api/v1/health", tag = "health",
    responses((status = 200, description = "Service is up")))]
async fn store_health() {}

#[utoipa::path(post, path = "/api/v1/notifications/send", tag = "notifications",
    responses(
        (status = 200, description = "Notification stored and pushed when allowed"),
        (status = 400, description = "patientId, title or message missing")
    ))]
async fn send() {}

#[utoipa::path(post, path = "/api/v1/notifications/send-bulk", tag = "notifications",
    responses(
        (status = 200, description = "One notification per recipient"),
        (status = 400, description = "patientIds is not an array")
    ))]
async fn send_bulk() {}

#[utoipa::path(post, path = "/api/v1/notifications/broadcast", tag = "notifications",
    responses((status = 200, description = "Notification stored for every patient with a device")))]
async fn broadcast() {}

#[utoipa::path(get, path = "/api/v1/notifications/{patientId}", tag = "notifications",
    params(
        ("patientId" = String, Path, description = "Recipient"),
        ("limit" = Option<usize>, Query, description = "Page size, default 50"),
        ("offset" = Option<usize>, Query, description = "Page start"),
        ("unread" = Option<String>, Query, description = "`true` keeps unread only"),
        ("types" = Option<String>, Query, description = "Comma separated types"),
        ("since" = Option<String>, Query, description = "RFC 3339 lower bound, exclusive")
    ),
    responses((status = 200, description = "Newest first, with total and unread counts")))]
async fn list() {}

#[utoipa::path(put, path = "/api/v1/notifications/{id}/read", tag = "notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read"),
        (status = 404, description = "No such notification for this patient")
    ))]
async fn mark_read() {}

#[utoipa::path(put, path = "/api/v1/notifications/read-all", tag = "notifications",
    responses((status = 200, description = "Every notification of the patient marked read")))]
async fn read_all() {}

#[utoipa::path(delete, path = "/api/v1/notifications/{id}", tag = "notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "No such notification for this patient")
    ))]
async fn remove() {}

#[utoipa::path(delete, path = "/api/v1/notifications/clear-all", tag = "notifications",
    responses((status = 200, description = "Every notification of the patient removed")))]
async fn clear_all() {}

#[utoipa::path(post, path = "/api/v1/devices/register", tag = "devices",
    responses(
        (status = 200, description = "Token registered"),
        (status = 400, description = "patientId or token missing")
    ))]
async fn register_device() {}

#[utoipa::path(delete, path = "/api/v1/devices/unregister", tag = "devices",
    responses((status = 200, description = "Token removed")))]
async fn unregister_device() {}

#[utoipa::path(get, path = "/api/v1/notifications/preferences/{patientId}", tag = "preferences",
    params(("patientId" = String, Path, description = "Recipient")),
    responses((status = 200, description = "Stored or default preferences")))]
async fn get_preferences() {}

#[utoipa::path(put, path = "/api/v1/notifications/preferences", tag = "preferences",
    responses(
        (status = 200, description = "Preferences merged"),
        (status = 400, description = "patientId or preferences missing")
    ))]
async fn update_preferences() {}

#[utoipa::path(post, path = "/api/v1/notifications/sync", tag = "notifications",
    responses((status = 200, description = "Notifications newer than lastSyncTime")))]
async fn sync() {}

#[utoipa::path(get, path = "/health", tag = "health",
    responses((status = 200, description = "Worker is up")))]
async fn worker_health() {}

#[utoipa::path(get, path = "/api/info", tag = "worker",
    responses((status = 200, description = "Service name, version and endpoints")))]
async fn info() {}

#[utoipa::path(post, path = "/api/check-notifications", tag = "worker",
    responses(
        (status = 200, description = "Per-account check results"),
        (status = 400, description = "users missing or empty")
    ))]
async fn check_notifications() {}

#[utoipa::path(post, path = "/api/check-and-notify", tag = "worker",
    responses(
        (status = 200, description = "Per-account check and push results"),
        (status = 400, description = "users missing")
    ))]
async fn check_and_notify() {}

#[utoipa::path(post, path = "/api/send-push", tag = "worker",
    responses(
        (status = 200, description = "Delivery result"),
        (status = 400, description = "pushToken, title or body missing")
    ))]
async fn send_push() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_list_their_paths() {
        let store = serde_json::to_value(StoreApiDoc::openapi()).expect("encode");
        assert!(store["paths"]["/api/v1/notifications/send"].is_object());
        assert!(store["paths"]["/api/v1/notifications/{patientId}"]["get"].is_object());
        let worker = serde_json::to_value(WorkerApiDoc::openapi()).expect("encode");
        assert!(worker["paths"]["/api/check-notifications"]["post"].is_object());
    }
}
