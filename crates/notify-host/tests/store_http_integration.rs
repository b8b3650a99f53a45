mod helpers;

use std::net::SocketAddr;
use std::sync::Arc;

use notify_host::adapters::mock::RecordingRelay;
use notify_host::config::HttpServerConfig;
use notify_host::http::spawn_http_server;
use notify_host::http::store_api::{StoreState, app};
use notify_store::NotificationStore;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::sync::broadcast;

struct StoreServer {
    base: String,
    relay: RecordingRelay,
    client: reqwest::Client,
    _shutdown: broadcast::Sender<()>,
}

impl StoreServer {
    async fn start() -> Self {
        let relay = RecordingRelay::new();
        let state = StoreState::new(NotificationStore::new(), Arc::new(relay.clone()));
        let (shutdown_tx, _) = broadcast::channel(1);
        let bind: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let (addr, _handle) =
            spawn_http_server(HttpServerConfig::new(bind), app(state), shutdown_tx.clone())
                .await
                .unwrap();
        Self {
            base: format!("http://{addr}/api/v1"),
            relay,
            client: reqwest::Client::new(),
            _shutdown: shutdown_tx,
        }
    }

    async fn call(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = self.client.request(method, format!("{}{path}", self.base));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::POST, path, Some(body)).await
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::PUT, path, Some(body)).await
    }

    async fn delete(&self, path: &str, body: Value) -> (StatusCode, Value) {
        self.call(reqwest::Method::DELETE, path, Some(body)).await
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        self.call(reqwest::Method::GET, path, None).await
    }

    async fn register(&self, patient: &str, token: &str) {
        let (status, _) = self
            .post(
                "/devices/register",
                json!({ "patientId": patient, "token": token, "platform": "ios" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn send_list_and_read_flow() {
    if !helpers::loopback_available().await {
        eprintln!("skipping send_list_and_read_flow: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;
    server.register("p1", "ExponentPushToken[p1]").await;

    let (status, sent) = server
        .post(
            "/notifications/send",
            json!({
                "patientId": "p1",
                "type": "result_ready",
                "priority": "urgent",
                "title": { "ar": "نتيجة", "en": "Result" },
                "message": "Your result is ready",
                "data": { "visitId": "42" }
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["success"], true);
    let id = sent["notificationId"].as_str().unwrap().to_string();

    let pushes = server.relay.sent();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].title, "نتيجة");
    assert_eq!(pushes[0].priority.as_deref(), Some("high"));
    assert_eq!(pushes[0].data["visitId"], "42");

    let (_, listed) = server.get("/notifications/p1").await;
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["unreadCount"], 1);
    assert_eq!(listed["notifications"][0]["id"], id.as_str());

    let (status, err) = server
        .put(&format!("/notifications/{id}/read"), json!({ "patientId": "p2" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["error"]["code"], "NOT_FOUND");

    let (status, _) = server
        .put(&format!("/notifications/{id}/read"), json!({ "patientId": "p1" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = server.get("/notifications/p1?unread=true").await;
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn invalid_writes_are_rejected() {
    if !helpers::loopback_available().await {
        eprintln!("skipping invalid_writes_are_rejected: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;

    let (status, body) = server
        .post("/notifications/send", json!({ "patientId": "p1", "title": "t" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_DATA");

    let (status, _) = server
        .post(
            "/notifications/send-bulk",
            json!({ "patientIds": "p1", "title": "t", "message": "m" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .post("/devices/register", json!({ "patientId": "p1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "Missing patientId or token");

    let (status, _) = server.get("/notifications/p1?since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_and_broadcast_reach_each_recipient() {
    if !helpers::loopback_available().await {
        eprintln!("skipping bulk_and_broadcast_reach_each_recipient: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;
    server.register("p1", "ExponentPushToken[p1]").await;
    server.register("p2", "ExponentPushToken[p2]").await;
    server.register("p3", "ExponentPushToken[p3]").await;

    let (_, bulk) = server
        .post(
            "/notifications/send-bulk",
            json!({ "patientIds": ["p1", "p2"], "title": "t", "message": "m" }),
        )
        .await;
    assert_eq!(bulk["results"].as_array().map(Vec::len), Some(2));
    assert_eq!(bulk["results"][1]["patientId"], "p2");

    let (_, sent) = server
        .post(
            "/notifications/broadcast",
            json!({ "title": "Offer", "message": "m", "excludePatientIds": ["p3"] }),
        )
        .await;
    assert_eq!(sent["totalRecipients"], 2);
    assert_eq!(sent["deliveredCount"], 2);
    let broadcast_id = sent["broadcastId"].as_str().unwrap();
    let (_, listed) = server.get("/notifications/p1").await;
    assert_eq!(
        listed["notifications"][0]["id"],
        format!("{broadcast_id}_p1").as_str()
    );
    let (_, p3) = server.get("/notifications/p3").await;
    assert_eq!(p3["total"], 0);
}

#[tokio::test]
async fn preferences_gate_pushes_but_not_storage() {
    if !helpers::loopback_available().await {
        eprintln!("skipping preferences_gate_pushes_but_not_storage: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;
    server.register("p1", "ExponentPushToken[p1]").await;

    let (_, defaults) = server.get("/notifications/preferences/p1").await;
    assert_eq!(defaults["enabled"], true);
    assert_eq!(defaults["quietHoursStart"], "22:00");

    let (status, updated) = server
        .put(
            "/notifications/preferences",
            json!({ "patientId": "p1", "preferences": { "offers": false } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["preferences"]["offers"], false);
    assert_eq!(updated["preferences"]["sound"], true);

    server
        .post(
            "/notifications/send",
            json!({ "patientId": "p1", "type": "offer", "title": "t", "message": "m" }),
        )
        .await;
    assert!(server.relay.sent().is_empty());
    let (_, listed) = server.get("/notifications/p1").await;
    assert_eq!(listed["total"], 1);
}

#[tokio::test]
async fn delete_clear_and_sync() {
    if !helpers::loopback_available().await {
        eprintln!("skipping delete_clear_and_sync: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;
    let mut ids = Vec::new();
    for i in 0..3 {
        let (_, sent) = server
            .post(
                "/notifications/send",
                json!({ "patientId": "p1", "title": format!("t{i}"), "message": "m" }),
            )
            .await;
        ids.push(sent["notificationId"].as_str().unwrap().to_string());
    }

    let (status, _) = server
        .delete(&format!("/notifications/{}", ids[0]), json!({ "patientId": "p1" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, synced) = server
        .post("/notifications/sync", json!({ "patientId": "p1" }))
        .await;
    assert_eq!(synced["notifications"].as_array().map(Vec::len), Some(2));
    assert_eq!(synced["deletedIds"], json!([]));
    let sync_time = synced["syncTime"].as_str().unwrap().to_string();

    let (_, later) = server
        .post(
            "/notifications/sync",
            json!({ "patientId": "p1", "lastSyncTime": sync_time }),
        )
        .await;
    assert_eq!(later["notifications"], json!([]));

    let (_, marked) = server
        .put("/notifications/read-all", json!({ "patientId": "p1" }))
        .await;
    assert_eq!(marked["updated"], 2);

    let (_, cleared) = server
        .delete("/notifications/clear-all", json!({ "patientId": "p1" }))
        .await;
    assert_eq!(cleared["removed"], 2);
    let (_, listed) = server.get("/notifications/p1").await;
    assert_eq!(listed["total"], 0);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    if !helpers::loopback_available().await {
        eprintln!("skipping health_and_openapi_are_served: loopback bind not permitted");
        return;
    }
    let server = StoreServer::start().await;
    let (status, health) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let doc: Value = server
        .client
        .get(server.base.replace("/api/v1", "/api/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(doc["paths"]["/api/v1/devices/register"].is_object());
}
